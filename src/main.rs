//! median-degree CLI
//!
//! Rolling median degree of a payment interaction graph.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use median_degree::{
    config::Config,
    ingest::{IngestMessage, Reader},
    output::{ErrorLog, MedianWriter, OutputFormat},
    stats::{create_shared_stats_with_persistence, read_persisted, SharedRunStats},
    WindowedDegreeAggregator, VERSION,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "median-degree")]
#[command(version = VERSION)]
#[command(about = "Rolling median degree of a payment interaction graph", long_about = None)]
struct Cli {
    /// Log debug detail (evictions, skipped late events) to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the rolling median degree for an input file
    Process {
        /// Newline-delimited JSON payments, or `-` for stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Directory for the median output and error log
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Window horizon in seconds
        #[arg(long)]
        window_secs: Option<u64>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show cumulative statistics from previous runs
    Status,

    /// Show configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input,
            output_dir,
            window_secs,
            format,
        } => cmd_process(input, output_dir, window_secs, format),
        Commands::Status => cmd_status(),
        Commands::Config { init } => cmd_config(init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("median_degree=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("median_degree=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_process(
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    window_secs: Option<u64>,
    format: Option<OutputFormat>,
) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    if let Some(input) = input {
        config.input_path = input;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(secs) = window_secs {
        config.window_duration = Duration::from_secs(secs);
    }
    if let Some(format) = format {
        config.output_format = format;
    }
    config.validate()?;
    config.ensure_directories()?;

    println!("median-degree v{VERSION}");
    println!();
    println!("  Input: {}", config.input_path.display());
    println!("  Output: {}", config.output_path().display());
    println!("  Error log: {}", config.error_log_path().display());
    println!("  Window duration: {}s", config.window_duration.as_secs());
    println!("  Format: {}", config.output_format.as_str());
    println!();

    let stats = create_shared_stats_with_persistence(config.stats_path());

    let source_name = if config.reads_stdin() {
        "stdin".to_string()
    } else {
        config
            .input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.input_path.display().to_string())
    };

    let output = File::create(config.output_path())
        .with_context(|| format!("creating {}", config.output_path().display()))?;
    let mut medians = MedianWriter::new(BufWriter::new(output), config.output_format);

    let error_file = File::create(config.error_log_path())
        .with_context(|| format!("creating {}", config.error_log_path().display()))?;
    let mut errors = ErrorLog::new(BufWriter::new(error_file), &source_name)?;

    let mut aggregator = WindowedDegreeAggregator::from_std(config.window_duration)?;

    let mut reader = Reader::new(stats.clone());
    if config.reads_stdin() {
        reader.start(BufReader::new(std::io::stdin()))?;
    } else {
        let file = File::open(&config.input_path)
            .with_context(|| format!("opening {}", config.input_path.display()))?;
        reader.start(BufReader::new(file))?;
    }

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let result = run_feed(
        &reader,
        &running,
        &mut aggregator,
        &mut medians,
        &mut errors,
        &stats,
    );

    reader.stop();

    // Whatever happened, keep what was published so far
    medians.flush().context("flushing median output")?;
    errors.flush().context("flushing error log")?;
    if let Err(e) = stats.save() {
        tracing::warn!("Could not save run stats: {e}");
    }

    println!("{}", stats.summary());
    println!();
    println!(
        "Wrote {} medians to {} ({} rejected records logged)",
        medians.written(),
        config.output_path().display(),
        errors.logged()
    );

    result
}

/// Drain the reader's feed into the aggregator, one message at a time.
fn run_feed<W: Write, E: Write>(
    reader: &Reader,
    running: &AtomicBool,
    aggregator: &mut WindowedDegreeAggregator,
    medians: &mut MedianWriter<W>,
    errors: &mut ErrorLog<E>,
    stats: &SharedRunStats,
) -> anyhow::Result<()> {
    let receiver = reader.receiver();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(IngestMessage::Accepted(tx)) => {
                stats.record_accepted();
                let update = aggregator
                    .process_transaction(&tx)
                    .with_context(|| format!("processing event {}", aggregator.processed() + 1))?;

                if update.late {
                    stats.record_late_skipped();
                }
                stats.record_evicted(update.evicted as u64);

                medians.publish(&update).context("writing median")?;
                stats.record_published();
            }
            Ok(IngestMessage::Rejected(rejection)) => {
                errors.record(&rejection).context("writing error log")?;
            }
            Ok(IngestMessage::Failed(e)) => {
                return Err(e).context("reading input");
            }
            Ok(IngestMessage::Finished) => return Ok(()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                bail!("Reader disconnected unexpectedly");
            }
        }
    }

    tracing::info!("Interrupted; stopping after {} events", aggregator.processed());
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("median-degree Status");
    println!("====================");
    println!();
    println!("Configuration:");
    println!("  Input: {}", config.input_path.display());
    println!("  Output: {}", config.output_path().display());
    println!("  Window duration: {}s", config.window_duration.as_secs());
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let stats = read_persisted(&stats_path)
            .with_context(|| format!("reading {}", stats_path.display()))?;
        println!("Cumulative Statistics:");
        println!("  Records read: {}", stats.records_read);
        println!("  Accepted: {}", stats.accepted);
        println!("  Rejected: {}", stats.rejected);
        println!("  Late events skipped: {}", stats.late_skipped);
        println!("  Edges evicted: {}", stats.edges_evicted);
        println!("  Medians published: {}", stats.medians_published);
        println!("  Last updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
    } else {
        println!("No previous run data found.");
    }
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    if init {
        let config = Config::default();
        config.save().context("saving configuration")?;
        println!("Wrote default configuration to {:?}", Config::config_path());
        return Ok(());
    }

    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
