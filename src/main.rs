use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use evalview::config::Config;
use evalview::output::{self, OutputFormat};
use evalview::{DataLoader, FsStore, LoaderError};

/// Evaluation results viewer - browse runs, benchmark scores and sample predictions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding index.json and the run folders (overrides the config file)
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log every store read and cache lookup
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all evaluation runs
    Runs,
    /// Show metadata and benchmark results of one run
    Run {
        run_id: String,
    },
    /// Browse sample predictions of one dataset in a run
    Samples {
        run_id: String,

        /// Dataset to show samples for
        #[arg(short, long)]
        dataset: String,

        /// Show full fields instead of truncated previews
        #[arg(long)]
        full: bool,
    },
}

fn init_tracing(config: &Config, verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        config.log_filter.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data_root) = args.data_root {
        config.data_root = data_root;
    }
    init_tracing(&config, args.verbose);

    let loader = DataLoader::new(FsStore::new(config.data_root.clone()));

    let result = match &args.command {
        Command::Runs => loader
            .get_runs_index()
            .await
            .map(|index| output::print_runs(&index, args.output)),
        Command::Run { run_id } => loader
            .get_run_data(run_id)
            .await
            .map(|data| output::print_run(run_id, &data, args.output)),
        Command::Samples {
            run_id,
            dataset,
            full,
        } => show_samples(&loader, &config, run_id, dataset, *full, args.output).await,
    };

    match result {
        Err(err) if err.is_empty_store() => {
            output::print_setup_instructions(loader.store().root());
            std::process::exit(1);
        }
        other => other.with_context(|| {
            format!("Failed to load data from {}", config.data_root.display())
        }),
    }
}

async fn show_samples(
    loader: &DataLoader<FsStore>,
    config: &Config,
    run_id: &str,
    dataset: &str,
    full: bool,
    format: OutputFormat,
) -> Result<(), LoaderError> {
    let meta = loader.get_run_meta(run_id).await?;
    let samples = loader.get_samples(run_id, dataset).await?;
    let truncate_at = (!full).then_some(config.truncate_at);

    output::print_samples(run_id, &meta, dataset, &samples, truncate_at, format);
    Ok(())
}
