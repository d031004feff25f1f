use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};

use clipindex::browse::{forwarded_config_path, Browser, DetachedProcess};
use clipindex::config::{self, IndexerConfig};
use clipindex::external::Toolbox;
use clipindex::indexer::IndexCoordinator;
use clipindex::logging;
use clipindex::search::TypeFilter;

#[derive(Parser)]
#[command(
    name = "clipindex",
    version,
    about = "Clipboard history search with cached thumbnails and OCR"
)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/clipindex/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print matching entries as JSON
    List {
        query: Option<String>,
        /// Only show `images` or `text`
        #[arg(long, default_value_t = TypeFilter::None)]
        filter: TypeFilter,
        /// First display: also start a background index run
        #[arg(long)]
        initial: bool,
    },
    /// Build thumbnails and OCR text for the current history
    Index,
    /// Delete one entry, given its raw line (the result id)
    Delete { raw_line: String },
    /// Clear the whole clipboard history
    Wipe,
    /// Copy one entry back to the clipboard
    Copy { raw_line: String },
}

fn main() {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());
    let _guard = logging::init(&config);

    if let Err(e) = run(cli, config) {
        error!(error = ?e, "Command failed");
        eprintln!("clipindex: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: IndexerConfig) -> Result<()> {
    let tools = Toolbox::system(&config);
    let config_path = cli.config;

    match cli.command {
        Commands::Index => match IndexCoordinator::new(config, tools).run() {
            Ok(report) => {
                let report = serde_json::to_string(&report).context("Failed to encode report")?;
                info!(%report, "Index complete");
            }
            // Nobody is watching a background run; the next one retries
            Err(e) if e.is_transient() => warn!(error = %e, "Index run skipped"),
            Err(e) => return Err(e).context("Index run failed"),
        },
        Commands::List {
            query,
            filter,
            initial,
        } => {
            let results = browser(config, tools, config_path).list(
                query.as_deref().unwrap_or(""),
                filter,
                initial,
            );
            let json = serde_json::to_string(&results).context("Failed to encode results")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write results")?;
        }
        Commands::Delete { raw_line } => browser(config, tools, config_path)
            .delete(&raw_line)
            .context("Delete failed")?,
        Commands::Wipe => browser(config, tools, config_path)
            .wipe()
            .context("Wipe failed")?,
        Commands::Copy { raw_line } => browser(config, tools, config_path)
            .copy(&raw_line)
            .context("Copy failed")?,
    }
    Ok(())
}

/// Interactive side; background runs re-use our `--config`
fn browser(config: IndexerConfig, tools: Toolbox, config_path: Option<PathBuf>) -> Browser {
    let scheduler = DetachedProcess::new(forwarded_config_path(config_path.as_deref()));
    Browser::new(config, tools, Box::new(scheduler))
}
