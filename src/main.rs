//! Overpak CLI - inspect and extract overlaid expansion archives.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use overpak::prelude::*;
use overpak::EntryRecord;

/// Overpak - read main/patch expansion archives as one file tree
#[derive(Parser)]
#[command(name = "overpak")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which archives to load.
#[derive(Args)]
struct SourceArgs {
    /// Archive to load; repeat in overlay order (later wins)
    #[arg(
        short,
        long = "archive",
        env = "OVERPAK_ARCHIVES",
        value_delimiter = ',',
        global = true
    )]
    archives: Vec<PathBuf>,

    /// Shared storage root holding one directory per package
    #[arg(long, env = "OVERPAK_OBB_DIR", global = true, requires = "package")]
    obb_dir: Option<PathBuf>,

    /// Package id used to name the expansion files
    #[arg(long, env = "OVERPAK_PACKAGE", global = true)]
    package: Option<String>,

    /// Main expansion version (0 picks the latest present)
    #[arg(long, default_value_t = 0, global = true)]
    main_version: u32,

    /// Patch expansion version (0 picks the latest present)
    #[arg(long, default_value_t = 0, global = true)]
    patch_version: u32,

    /// Reject local headers that disagree with the central directory
    #[arg(long, global = true)]
    strict: bool,

    /// Verify CRC-32 of inflated entries
    #[arg(long, global = true)]
    verify_crc: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the direct children of a directory
    Ls {
        /// Directory, e.g. "textures" (empty for the root)
        #[arg(default_value = "")]
        prefix: String,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one entry to stdout
    Cat {
        /// Entry path
        path: String,
    },

    /// Show which archive serves an entry and where its bytes are
    Locate {
        /// Entry path
        path: String,
    },

    /// Extract every entry to a directory
    Extract {
        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Only extract paths matching this glob pattern
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let set = open_set(&cli.source)?;

    match &cli.command {
        Commands::Ls { prefix, json } => cmd_ls(&set, prefix, *json)?,
        Commands::Cat { path } => cmd_cat(&set, path)?,
        Commands::Locate { path } => cmd_locate(&set, path)?,
        Commands::Extract { output, filter } => cmd_extract(&set, output, filter.as_deref())?,
    }

    set.close();
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_set(source: &SourceArgs) -> Result<ArchiveSet> {
    let config = ArchiveSetConfig::default()
        .with_strict_local_headers(source.strict)
        .with_crc_verification(source.verify_crc);

    let start = Instant::now();
    let set = match (&source.obb_dir, &source.package) {
        _ if !source.archives.is_empty() => {
            ArchiveSet::load(&source.archives, config).context("Failed to load archives")?
        }
        (Some(root), Some(package)) => {
            let locator = ExpansionLocator::new(root, package.as_str())
                .main_version(source.main_version)
                .patch_version(source.patch_version);
            ArchiveSet::discover(&locator, config).with_context(|| {
                format!("Failed to load expansion files from {}", locator.package_dir().display())
            })?
        }
        _ => bail!("No archives given: pass --archive or --obb-dir with --package"),
    };

    info!(
        archives = set.archives().len(),
        entries = set.len(),
        elapsed = ?start.elapsed(),
        "archive set ready"
    );
    Ok(set)
}

/// One `ls --json` row.
#[derive(Serialize)]
struct Listing<'a> {
    archive: &'a Path,
    #[serde(flatten)]
    entry: &'a EntryRecord,
}

fn cmd_ls(set: &ArchiveSet, prefix: &str, json: bool) -> Result<()> {
    if !prefix.is_empty() && !set.is_directory(prefix) {
        bail!("Not a directory: {prefix}");
    }

    let prefix = directory_prefix(prefix);
    let entries = set.list(&prefix);

    if json {
        let rows: Vec<_> = entries
            .iter()
            .map(|entry| Listing {
                archive: entry.archive_path(),
                entry: entry.record(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for dir in set.subdirectories(&prefix) {
        println!("{:>12} {:>8} {}", "-", "dir", dir);
    }
    for entry in &entries {
        println!(
            "{:>12} {:>8} {}",
            entry.uncompressed_size(),
            method_label(entry),
            entry.path()
        );
    }

    Ok(())
}

fn cmd_cat(set: &ArchiveSet, path: &str) -> Result<()> {
    let entry = set
        .lookup(path)
        .with_context(|| format!("No such entry: {path}"))?;

    let mut reader = set.open(entry)?.into_reader();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut reader, &mut out).with_context(|| format!("Failed to read {path}"))?;
    out.flush()?;

    Ok(())
}

fn cmd_locate(set: &ArchiveSet, path: &str) -> Result<()> {
    let entry = set
        .lookup(path)
        .with_context(|| format!("No such entry: {path}"))?;

    println!("path:       {}", entry.path());
    println!("archive:    {} ({})", entry.archive_path().display(), entry.archive_id());
    println!("method:     {}", method_label(&entry));
    println!("offset:     {}", entry.data_offset());
    println!("compressed: {}", entry.compressed_size());
    println!("size:       {}", entry.uncompressed_size());
    println!("crc32:      {:08x}", entry.crc32());

    let shadowed = set
        .archives()
        .iter()
        .take(entry.archive_id().index())
        .filter(|archive| archive.find(entry.path()).is_some())
        .count();
    if shadowed > 0 {
        println!("shadows:    {shadowed} earlier archive(s)");
    }

    Ok(())
}

fn cmd_extract(set: &ArchiveSet, output: &Path, filter: Option<&str>) -> Result<()> {
    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let entries: Vec<_> = set
        .entries()
        .filter(|entry| !entry.is_dir())
        .filter(|entry| pattern.as_ref().map_or(true, |p| p.matches(entry.path())))
        .collect();

    println!("Extracting {} entries to {}...", entries.len(), output.display());
    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let failures: Vec<(String, anyhow::Error)> = entries
        .par_iter()
        .filter_map(|entry| {
            let result = extract_entry(set, *entry, output);
            pb.inc(1);
            result.err().map(|err| (entry.path().to_string(), err))
        })
        .collect();
    pb.finish_with_message("Done");

    for (path, err) in &failures {
        eprintln!("Error extracting {path}: {err:#}");
    }
    println!(
        "Extracted {} entries in {:?} ({} errors)",
        entries.len() - failures.len(),
        start.elapsed(),
        failures.len()
    );

    Ok(())
}

fn extract_entry(set: &ArchiveSet, entry: EntryDescriptor<'_>, output: &Path) -> Result<()> {
    let relative = Path::new(entry.path());
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        warn!(path = entry.path(), "refusing to extract path outside the output directory");
        bail!("unsafe path");
    }

    let output_path = output.join(relative);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut reader = set.open(entry)?.into_reader();
    let mut file = fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    io::copy(&mut reader, &mut file)?;

    Ok(())
}

fn method_label(entry: &EntryRecord) -> String {
    match entry.compression_method() {
        Ok(method) => method.to_string(),
        Err(code) => format!("method {code}"),
    }
}
