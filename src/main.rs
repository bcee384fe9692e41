//! Command-line entry point: discover snapshot files in a directory,
//! filter them, and run one import per file on a worker pool.

use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use workerpool::thunk::{Thunk, ThunkWorker};
use workerpool::Pool;

use gridload::pipeline::{ImportReport, ImportRun};
use gridload::store::{HttpStore, StoreClient};

/// File suffix produced by the exporter.
const SNAPSHOT_SUFFIX: &str = ".snap.gz";

#[derive(Debug, Parser)]
struct Command {
    /// Base URL of the grid, e.g. http://grid-host:9600
    #[arg(short = 'u', long)]
    store_url: String,
    /// Directory containing the exported snapshot files
    #[arg(short, long)]
    directory: PathBuf,
    /// Records per bulk write
    #[arg(short, long, default_value = "1000")]
    batch: usize,
    /// Only import snapshots of these classes - comma separated
    #[arg(short, long, value_delimiter = ',')]
    classes: Vec<String>,
    /// Only import snapshots of these partitions - comma separated
    #[arg(short, long, value_delimiter = ',')]
    partitions: Vec<u32>,
    /// Concurrent import runs
    #[arg(short, long, default_value = "4")]
    workers: usize,
    #[arg(short, long)]
    verbose: bool,
}

/// A snapshot file name split into its class and optional partition,
/// e.g. `Customer.2.snap.gz` -> ("Customer", Some(2)).
fn parse_snapshot_name(file_name: &str) -> Option<(String, Option<u32>)> {
    let stem = file_name.strip_suffix(SNAPSHOT_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    match stem.rsplit_once('.') {
        Some((class, partition)) => {
            if class.is_empty() {
                return None;
            }
            match partition.parse::<u32>() {
                Ok(partition) => Some((class.to_string(), Some(partition))),
                // A dotted class name with no partition suffix.
                Err(_) => Some((stem.to_string(), None)),
            }
        }
        None => Some((stem.to_string(), None)),
    }
}

/// Snapshot files in `directory` that pass the class and partition
/// filters, sorted for a stable run order.
fn discover_snapshots(
    directory: &Path,
    classes: &[String],
    partitions: &[u32],
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("reading snapshot directory {}", directory.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some((class, partition)) = parse_snapshot_name(name) else {
            continue;
        };
        if !classes.is_empty() && !classes.contains(&class) {
            continue;
        }
        if !partitions.is_empty() {
            match partition {
                Some(p) if partitions.contains(&p) => {}
                _ => continue,
            }
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn main() -> Result<()> {
    let opts = Command::parse();

    let default_level = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if opts.batch == 0 {
        bail!("--batch must be at least 1");
    }

    let paths = discover_snapshots(&opts.directory, &opts.classes, &opts.partitions)?;
    if paths.is_empty() {
        bail!(
            "no snapshot files matched in {}",
            opts.directory.display()
        );
    }
    info!("importing {} snapshot file(s)", paths.len());

    let store: Arc<dyn StoreClient> = Arc::new(
        HttpStore::connect(&opts.store_url)
            .with_context(|| format!("connecting to store at {}", opts.store_url))?,
    );

    // One run per file, fanned out over the pool; each run owns its
    // audit log and sends its report back over the channel.
    let pool = Pool::<ThunkWorker<ImportReport>>::new(opts.workers.max(1));
    let (tx, rx) = channel();
    let total = paths.len();
    for path in paths {
        let run = ImportRun::new(store.clone(), path, opts.batch);
        pool.execute_to(tx.clone(), Thunk::of(move || run.run()));
    }
    drop(tx);

    let mut failed = 0usize;
    let mut records = 0u64;
    for report in rx.iter().take(total) {
        records += report.records_written;
        if !report.succeeded() {
            failed += 1;
        }
    }

    info!("imported {records} record(s) from {total} snapshot file(s)");
    if failed > 0 {
        bail!("{failed} of {total} import run(s) failed");
    }
    Ok(())
}
