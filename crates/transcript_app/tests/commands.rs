use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use transcript_app::platform::commands::{set_config, show_config, show_history, Context};
use transcript_core::{DestinationMode, NamingMode};
use transcript_engine::{ConfigStore, Ledger, LedgerRecord};

fn context(temp: &TempDir) -> Context {
    Context::new(temp.path().join(".env"), Some(temp.path().join("history.db")))
}

fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
    let mut out = Vec::new();
    f(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn history_without_a_ledger_does_not_create_one() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let text = output(|out| show_history(&ctx, None, out));
    assert_eq!(text, "No completed jobs recorded yet.\n");
    assert!(!ctx.ledger_path.exists());
}

#[test]
fn history_lists_records_for_a_prefix() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let ledger = Ledger::open(&ctx.ledger_path).unwrap();
    for (prefix, n) in [("Clase", 1), ("Other", 1), ("Clase", 2)] {
        ledger
            .append(&LedgerRecord {
                source_path: format!("/media/{prefix}_{n}.mp3"),
                prefix: prefix.to_string(),
                naming_mode: NamingMode::Sequential,
                sequential_number: Some(n),
                output_title: format!("{prefix}_{n}"),
                destination: DestinationMode::DocumentService,
                output_locator: Some(format!("doc-{prefix}-{n}")),
                language: Some("es".to_string()),
                completed_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            })
            .unwrap();
    }
    ledger.close().unwrap();

    let text = output(|out| show_history(&ctx, Some("Clase"), out));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Clase_1"), "{text}");
    assert!(lines[0].contains("Google Docs"), "{text}");
    assert!(lines[0].ends_with("doc-Clase-1  <- /media/Clase_1.mp3"), "{text}");
    assert!(lines[1].contains("Clase_2"), "{text}");
}

#[test]
fn set_then_show_config() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);

    let text = output(|out| set_config(&ctx, "PREFIX", "Clase", out));
    assert!(text.starts_with("Saved PREFIX to "), "{text}");
    assert!(text.trim_end().ends_with("Output: Local Markdown"), "{text}");
    assert_eq!(ctx.store.load().unwrap().prefix, "Clase");

    output(|out| set_config(&ctx, "DEEPGRAM_API_KEY", "dg-0123456789abcdef", out));
    let text = output(|out| show_config(&ctx, out));
    assert!(text.contains("Speech API key     dg-0***cdef"), "{text}");
    assert!(text.contains("Prefix             Clase"), "{text}");
    assert!(!text.contains("0123456789"), "{text}");
}

#[test]
fn unknown_key_lists_the_known_ones() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let mut out = Vec::new();
    let err = set_config(&ctx, "COLOR", "blue", &mut out).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("cannot set COLOR"), "{message}");
    assert!(message.contains("NAMING_MODE"), "{message}");
}
