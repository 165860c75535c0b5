// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

use mylicula::{
    link::{LinkRequest, Linker, Outcome},
    manifest::{LinkEntry, Manifest},
    path::default_manifest_path,
    pkglist::PackageList,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  mylicula [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<i32> {
        match self.command {
            Command::Link(opts) => run_link(opts),
            Command::Apply(opts) => run_apply(opts),
            Command::Init(opts) => run_init(opts),
            Command::Packages(opts) => run_packages(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Reconcile a single symlink.
    #[command(override_usage = "mylicula link [options] <source> <link_path>")]
    Link(LinkOptions),

    /// Reconcile every link listed in the manifest.
    #[command(override_usage = "mylicula apply [options]")]
    Apply(ApplyOptions),

    /// Write a starter manifest.
    #[command(override_usage = "mylicula init [options]")]
    Init(InitOptions),

    /// Parse a package list and print its groups.
    #[command(override_usage = "mylicula packages [options] <file>")]
    Packages(PackagesOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LinkOptions {
    /// Path the link should point at.
    #[arg(value_name = "source")]
    pub source: PathBuf,

    /// Path the symbolic link should exist at.
    #[arg(value_name = "link_path")]
    pub link_path: PathBuf,

    /// Print a status line for the outcome.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ApplyOptions {
    /// Path to manifest instead of the default location.
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,

    /// Print a status line per reconciled link.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Brief description of what the manifest provisions.
    #[arg(short, long, value_name = "summary")]
    pub description: Option<String>,

    /// Path to write the manifest to instead of the default location.
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PackagesOptions {
    /// Path to package list file.
    #[arg(value_name = "file")]
    pub file: PathBuf,
}

fn main() {
    let layer = fmt::layer().compact().with_target(false).without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    match run() {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn run() -> Result<i32> {
    Cli::parse().run()
}

fn run_link(opts: LinkOptions) -> Result<i32> {
    let linker = Linker::new(opts.verbose);
    let request = LinkRequest::new(opts.source, opts.link_path);
    let outcome = linker.reconcile(&request)?;

    Ok(outcome.exit_code())
}

fn run_apply(opts: ApplyOptions) -> Result<i32> {
    let path = match opts.manifest {
        Some(path) => path,
        None => default_manifest_path()?,
    };
    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest at {}", path.display()))?;
    let manifest: Manifest = data.parse()?;
    let requests = manifest.requests()?;

    let linker = Linker::new(opts.verbose);
    let (mut created, mut updated, mut skipped, mut failed) = (0usize, 0usize, 0usize, 0usize);
    for request in &requests {
        match linker.reconcile(request) {
            Ok(Outcome::Created) => created += 1,
            Ok(Outcome::Updated) => updated += 1,
            Ok(Outcome::Skipped) => skipped += 1,
            Err(error) => {
                failed += 1;
                warn!("{error}");
            }
        }
    }

    info!("{created} created, {updated} updated, {skipped} skipped, {failed} failed");

    // Same convention as a single link: 2 means "nothing to do".
    if failed > 0 {
        Ok(1)
    } else if created == 0 && updated == 0 && !requests.is_empty() {
        Ok(2)
    } else {
        Ok(0)
    }
}

fn run_init(opts: InitOptions) -> Result<i32> {
    let path = match opts.manifest {
        Some(path) => path,
        None => default_manifest_path()?,
    };
    if path.exists() {
        bail!("manifest already exists at {}", path.display());
    }

    let mut manifest = Manifest::default();
    manifest.settings.description = match opts.description {
        Some(description) => description,
        None => "<put one sentence description here>".into(),
    };
    manifest.links = Some(vec![LinkEntry {
        source: "<put path the link should point at here>".into(),
        target: Some(PathBuf::from("<put path the link should live at here>")),
        target_dir: None,
    }]);

    if let Some(parent) = path.parent() {
        mkdirp::mkdirp(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(&path, manifest.to_string())
        .with_context(|| format!("failed to write manifest at {}", path.display()))?;
    info!("wrote starter manifest to {}", path.display());

    Ok(0)
}

fn run_packages(opts: PackagesOptions) -> Result<i32> {
    let data = fs::read_to_string(&opts.file)
        .with_context(|| format!("failed to read package list at {}", opts.file.display()))?;
    let list: PackageList = data.parse()?;

    for group in &list.groups {
        if let Some(repository) = &group.repository {
            println!("repo {repository}");
        }
        if let Some(gpg_key) = &group.gpg_key {
            println!("key {gpg_key}");
        }
        for package in &group.packages {
            println!("package {package}");
        }
    }
    info!(
        "{} packages in {} groups",
        list.package_count(),
        list.groups.len()
    );

    Ok(0)
}
