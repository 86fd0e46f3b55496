use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::platform::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "transcript",
    version,
    about = "Transcribe audio and video files into Google Docs or Markdown"
)]
pub struct Cli {
    /// Dotenv file holding the configuration.
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    /// Ledger database [default: $TRANSCRIPT_LEDGER_PATH or ~/.transcript/history.db]
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Where diagnostic logs go.
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::File)]
    pub log_to: LogDestination,

    /// Include debug-level diagnostics.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Transcribe and export the given media files.
    Run {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Language code passed to the speech service (es, en, multi, fr, ...).
        #[arg(short, long, default_value = "es")]
        language: String,
    },
    /// Show or change the stored configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List completed jobs recorded in the ledger.
    History {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Start the HTTP API used by the web front end.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Largest accepted upload request, in megabytes.
        #[arg(long, default_value_t = 4096)]
        max_upload_mb: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    /// Set one key, e.g. `config set PREFIX Clase`.
    Set { key: String, value: String },
}
