use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use chrono::Local;
use transcript_core::{is_supported_media, mask_secret, AppConfig, FileSelection, Severity};
use transcript_engine::{
    ConfigStore, DocsEndpoints, EngineHandle, EnvConfigStore, Ledger, PipelineRunner,
    SpeechSettings, CONFIG_KEYS,
};
use transcript_logging::transcript_info;

use super::dashboard::{watch_interrupts, Dashboard};
use super::render::Renderer;

/// Exit status for a run rejected before any job started.
const CONFIG_EXIT: u8 = 2;

/// Where the commands find their configuration and ledger.
#[derive(Debug, Clone)]
pub struct Context {
    pub store: EnvConfigStore,
    pub ledger_path: PathBuf,
}

impl Context {
    pub fn new(env_file: PathBuf, ledger: Option<PathBuf>) -> Self {
        Self {
            store: EnvConfigStore::new(env_file),
            ledger_path: ledger.unwrap_or_else(Ledger::default_path),
        }
    }
}

pub fn run_files(ctx: &Context, files: Vec<PathBuf>, language: &str) -> anyhow::Result<ExitCode> {
    let config = ctx.store.load()?;
    let mut renderer = Renderer::stdout();
    if let Err(err) = config.validate() {
        renderer.notice(
            &format!("{err}. Set it with `transcript config set DEEPGRAM_API_KEY <key>`."),
            Severity::Warning,
        );
        return Ok(ExitCode::from(CONFIG_EXIT));
    }

    let (selections, rejected) = selections_for(files, language);
    for path in &rejected {
        renderer.notice(
            &format!("Skipping unsupported file {}", path.display()),
            Severity::Warning,
        );
    }
    if selections.is_empty() {
        renderer.notice("No supported media files to process", Severity::Warning);
        return Ok(ExitCode::from(CONFIG_EXIT));
    }

    transcript_info!(
        "Run requested for {} file(s), ledger {:?}",
        selections.len(),
        ctx.ledger_path
    );
    let runner = PipelineRunner::with_settings(
        &ctx.ledger_path,
        SpeechSettings::default(),
        DocsEndpoints::default(),
    )?;
    let engine = EngineHandle::new(runner).context("cannot start the engine thread")?;
    let interrupts = watch_interrupts().context("cannot install the Ctrl-C handler")?;

    let dashboard = Dashboard::new(engine, config, renderer);
    let (outcome, mut renderer) = dashboard.run(selections, &interrupts);
    if let Some(summary) = outcome.summary {
        renderer.notice(
            &format!(
                "{} completed, {} skipped, {} failed",
                summary.completed, summary.skipped, summary.failed
            ),
            Severity::Information,
        );
    }

    Ok(if outcome.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Splits command-line paths into runnable selections and unsupported files.
///
/// Paths are made absolute so ledger entries do not depend on the working directory.
pub fn selections_for(files: Vec<PathBuf>, language: &str) -> (Vec<FileSelection>, Vec<PathBuf>) {
    let mut selections = Vec::new();
    let mut rejected = Vec::new();
    for path in files {
        if !is_supported_media(&path) {
            rejected.push(path);
            continue;
        }
        let path = std::path::absolute(&path).unwrap_or(path);
        selections.push(FileSelection {
            path,
            language: language.to_string(),
        });
    }
    (selections, rejected)
}

pub fn show_config(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let config = ctx.store.load()?;
    for (label, value) in describe_config(&config, ctx.store.path(), &ctx.ledger_path) {
        writeln!(out, "{label:<18} {value}")?;
    }
    Ok(())
}

pub fn set_config(
    ctx: &Context,
    key: &str,
    value: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let config = ctx.store.set(key, value).with_context(|| {
        format!("cannot set {key} (known keys: {})", CONFIG_KEYS.join(", "))
    })?;
    writeln!(
        out,
        "Saved {key} to {}. Output: {}",
        ctx.store.path().display(),
        config.destination().display_name()
    )?;
    Ok(())
}

fn describe_config(
    config: &AppConfig,
    env_file: &Path,
    ledger_path: &Path,
) -> Vec<(&'static str, String)> {
    let or_unset = |value: String| {
        if value.is_empty() {
            "(not set)".to_string()
        } else {
            value
        }
    };
    vec![
        ("Config file", env_file.display().to_string()),
        ("Speech API key", or_unset(mask_secret(&config.speech_api_key))),
        ("Credentials", or_unset(config.credentials_path.clone())),
        ("Drive folder", or_unset(config.folder_id.clone())),
        ("Naming mode", config.naming_mode.as_str().to_string()),
        ("Prefix", config.prefix.clone()),
        ("Output directory", config.output_directory.display().to_string()),
        ("Destination", config.destination().display_name().to_string()),
        ("Ledger", ledger_path.display().to_string()),
    ]
}

pub fn show_history(
    ctx: &Context,
    prefix: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !ctx.ledger_path.exists() {
        writeln!(out, "No completed jobs recorded yet.")?;
        return Ok(());
    }
    let ledger = Ledger::open(&ctx.ledger_path)?;
    let records = ledger.records(prefix)?;
    ledger.close()?;

    if records.is_empty() {
        writeln!(out, "No completed jobs recorded yet.")?;
        return Ok(());
    }
    for record in records {
        writeln!(
            out,
            "{}  {:<24}  {:<14}  {}  <- {}",
            record.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.output_title,
            record.destination.display_name(),
            record.output_locator.as_deref().unwrap_or("-"),
            record.source_path
        )?;
    }
    Ok(())
}
