//! CLI binary for batchconv.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs the batch, and renders per-file results.

use anyhow::{bail, Context, Result};
use batchconv::{profile, BatchConfig, BatchEntry, BatchRunner, EntryStatus, HttpConversionService};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Batch-convert files through a remote conversion service.
#[derive(Parser, Debug)]
#[command(name = "batchconv", version, about, long_about = None)]
struct Cli {
    /// Input files to convert.
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Conversion profile id (see --list-profiles).
    #[arg(short, long, value_name = "ID")]
    profile: Option<String>,

    /// Output directory; created if absent.
    #[arg(short, long, default_value = "converted", value_name = "DIR")]
    out: PathBuf,

    /// Number of files converted in parallel (1-8 is sensible).
    #[arg(short, long, default_value_t = 2, value_name = "N")]
    concurrency: usize,

    /// API key for the conversion service.
    #[arg(long, env = "BATCHCONV_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the conversion service API.
    #[arg(long, default_value = "https://api.cloudconvert.com", value_name = "URL")]
    base_url: String,

    /// Load the profile catalogue from a JSON file instead of the built-ins.
    #[arg(long, value_name = "PATH")]
    profiles: Option<PathBuf>,

    /// List available profiles and exit.
    #[arg(long)]
    list_profiles: bool,

    /// Print the final per-file results as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalogue = match &cli.profiles {
        Some(path) => profile::load_catalogue(path)
            .with_context(|| format!("loading profile catalogue from {}", path.display()))?,
        None => profile::builtin(),
    };

    if cli.list_profiles {
        println!("{}", bold("Available profiles:"));
        for p in &catalogue {
            println!(
                "  {:<12} {}  {}",
                p.id,
                p.display_name,
                dim(&format!("(.{} → .{})", p.input_format, p.output_format))
            );
        }
        return Ok(());
    }

    if cli.inputs.is_empty() {
        bail!("no input files given (try --help)");
    }
    let profile_id = cli
        .profile
        .as_deref()
        .context("--profile is required (see --list-profiles)")?;
    let chosen = profile::find(&catalogue, profile_id)
        .with_context(|| format!("unknown profile '{profile_id}' (see --list-profiles)"))?
        .clone();
    let api_key = cli
        .api_key
        .as_deref()
        .context("no API key: pass --api-key or set BATCHCONV_API_KEY")?;

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output directory {}", cli.out.display()))?;

    let service = Arc::new(HttpConversionService::with_base_url(api_key, &cli.base_url)?);
    let config = BatchConfig::builder().concurrency(cli.concurrency).build()?;
    let runner = Arc::new(BatchRunner::new(service, &catalogue, config));

    let entries: Vec<Arc<BatchEntry>> = cli
        .inputs
        .iter()
        .map(|input| Arc::new(BatchEntry::new(input.clone(), cli.out.clone(), chosen.clone())))
        .collect();

    // Ctrl-C requests cooperative cancellation; in-flight entries settle at
    // their next checkpoint.
    {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n{}", yellow("Cancel requested — finishing checkpoints…"));
                runner.cancel();
            }
        });
    }

    let bar = progress_bar(entries.len());
    let run = {
        let runner = Arc::clone(&runner);
        let entries = entries.clone();
        tokio::spawn(async move { runner.run(&entries).await })
    };

    while !run.is_finished() {
        let done = entries
            .iter()
            .filter(|e| e.status().is_terminal())
            .count();
        bar.set_position(done as u64);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    run.await.ok();
    bar.finish_and_clear();

    report(&entries, cli.json)
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "batchconv=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    bar.set_style(style);
    bar.set_prefix("Converting");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn report(entries: &[Arc<BatchEntry>], as_json: bool) -> Result<()> {
    if as_json {
        let snapshots: Vec<_> = entries.iter().map(|e| e.snapshot()).collect();
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for entry in entries {
            let snap = entry.snapshot();
            let line = match snap.status {
                EntryStatus::Done => format!(
                    "{} {} {}",
                    green("✔"),
                    entry.input().display(),
                    dim(&format!(
                        "→ {}",
                        snap.output_path
                            .as_deref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default()
                    ))
                ),
                EntryStatus::Canceled => {
                    format!("{} {} canceled", yellow("●"), entry.input().display())
                }
                EntryStatus::Skipped => format!(
                    "{} {} skipped: {}",
                    yellow("○"),
                    entry.input().display(),
                    snap.message
                ),
                _ => format!(
                    "{} {} {}",
                    red("✘"),
                    entry.input().display(),
                    snap.message
                ),
            };
            println!("{line}");
        }
    }

    let failed = entries
        .iter()
        .filter(|e| e.status() == EntryStatus::Failed)
        .count();
    let done = entries
        .iter()
        .filter(|e| e.status() == EntryStatus::Done)
        .count();
    eprintln!(
        "{}",
        dim(&format!("{done} converted, {failed} failed, {} total", entries.len()))
    );
    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}
