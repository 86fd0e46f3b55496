use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use owo_colors::OwoColorize;
use transcript_app::cli::{Cli, Command, ConfigAction};
use transcript_app::platform::commands::{self, Context};
use transcript_app::platform::logging;
use transcript_app::server::{self, ServerState};
use transcript_engine::{DocsEndpoints, PipelineRunner, SpeechSettings};
use transcript_logging::{error_chain, transcript_error, transcript_info};

const BYTES_PER_MB: usize = 1024 * 1024;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log_to, cli.verbose);
    transcript_info!("transcript {} starting", env!("CARGO_PKG_VERSION"));

    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            let chain = error_chain(err.as_ref());
            transcript_error!("{}", chain);
            eprintln!("{} {}", "error:".red().bold(), chain);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = Context::new(cli.env_file, cli.ledger);
    let mut stdout = io::stdout();

    match cli.command {
        Command::Run { files, language } => commands::run_files(&ctx, files, &language),
        Command::Config {
            action: ConfigAction::Show,
        } => commands::show_config(&ctx, &mut stdout).map(|()| ExitCode::SUCCESS),
        Command::Config {
            action: ConfigAction::Set { key, value },
        } => commands::set_config(&ctx, &key, &value, &mut stdout).map(|()| ExitCode::SUCCESS),
        Command::History { prefix } => {
            commands::show_history(&ctx, prefix.as_deref(), &mut stdout).map(|()| ExitCode::SUCCESS)
        }
        Command::Serve {
            host,
            port,
            max_upload_mb,
        } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .context("invalid host/port bind address")?;
            let runner = PipelineRunner::with_settings(
                &ctx.ledger_path,
                SpeechSettings::default(),
                DocsEndpoints::default(),
            )?;
            let state = ServerState::new(ctx.store.clone(), runner)
                .context("cannot create the upload directory")?;
            let runtime = tokio::runtime::Runtime::new().context("cannot start tokio runtime")?;
            runtime.block_on(server::serve(
                addr,
                state,
                max_upload_mb.saturating_mul(BYTES_PER_MB),
            ))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
