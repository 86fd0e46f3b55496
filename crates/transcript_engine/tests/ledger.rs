use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use transcript_core::{DestinationMode, NamingMode};
use transcript_engine::{Ledger, LedgerRecord};

fn record(source: &str, prefix: &str, number: Option<u32>, title: &str) -> LedgerRecord {
    LedgerRecord {
        source_path: source.to_string(),
        prefix: prefix.to_string(),
        naming_mode: if number.is_some() {
            NamingMode::Sequential
        } else {
            NamingMode::Original
        },
        sequential_number: number,
        output_title: title.to_string(),
        destination: DestinationMode::LocalFiles,
        output_locator: Some(format!("/out/{title}.md")),
        language: Some("es".to_string()),
        completed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

#[test]
fn empty_ledger_starts_numbering_at_one() {
    let temp = TempDir::new().unwrap();
    let ledger = Ledger::open(&temp.path().join("history.db")).unwrap();
    assert_eq!(ledger.next_sequential_number("Clase").unwrap(), 1);
    assert!(!ledger
        .already_processed("/v/a.mp4", "Clase", DestinationMode::LocalFiles)
        .unwrap());
    assert!(!ledger.title_used("Clase_1", DestinationMode::LocalFiles).unwrap());
}

#[test]
fn next_number_follows_the_highest_sequential_record_of_the_prefix() {
    let temp = TempDir::new().unwrap();
    let ledger = Ledger::open(&temp.path().join("history.db")).unwrap();
    ledger.append(&record("/v/a.mp4", "Clase", Some(1), "Clase_1")).unwrap();
    ledger.append(&record("/v/b.mp4", "Clase", Some(7), "Clase_7")).unwrap();
    ledger.append(&record("/v/c.mp4", "Clase", None, "Clase_c")).unwrap();
    ledger.append(&record("/v/d.mp4", "Other", Some(40), "Other_40")).unwrap();

    assert_eq!(ledger.next_sequential_number("Clase").unwrap(), 8);
    assert_eq!(ledger.next_sequential_number("Other").unwrap(), 41);
    assert_eq!(ledger.next_sequential_number("Nuevo").unwrap(), 1);
}

#[test]
fn lookups_match_exactly_on_prefix_and_destination() {
    let temp = TempDir::new().unwrap();
    let ledger = Ledger::open(&temp.path().join("history.db")).unwrap();
    ledger.append(&record("/v/a.mp4", "Clase", Some(1), "Clase_1")).unwrap();

    assert!(ledger
        .already_processed("/v/a.mp4", "Clase", DestinationMode::LocalFiles)
        .unwrap());
    assert!(!ledger
        .already_processed("/v/a.mp4", "clase", DestinationMode::LocalFiles)
        .unwrap());
    assert!(!ledger
        .already_processed("/v/a.mp4", "Clase", DestinationMode::DocumentService)
        .unwrap());
    assert!(ledger.title_used("Clase_1", DestinationMode::LocalFiles).unwrap());
    assert!(!ledger
        .title_used("Clase_1", DestinationMode::DocumentService)
        .unwrap());
}

#[test]
fn records_survive_reopening() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("history.db");

    let ledger = Ledger::open(&path).unwrap();
    let first = record("/v/a.mp4", "Clase", Some(1), "Clase_1");
    ledger.append(&first).unwrap();
    ledger.close().unwrap();

    let reopened = Ledger::open(&path).unwrap();
    assert_eq!(reopened.records(None).unwrap(), vec![first]);
    assert_eq!(reopened.next_sequential_number("Clase").unwrap(), 2);
}

#[test]
fn records_can_be_filtered_by_prefix() {
    let temp = TempDir::new().unwrap();
    let ledger = Ledger::open(&temp.path().join("history.db")).unwrap();
    ledger.append(&record("/v/a.mp4", "Clase", Some(1), "Clase_1")).unwrap();
    ledger.append(&record("/v/b.mp4", "Other", Some(1), "Other_1")).unwrap();

    let titles: Vec<String> = ledger
        .records(Some("Other"))
        .unwrap()
        .into_iter()
        .map(|r| r.output_title)
        .collect();
    assert_eq!(titles, vec!["Other_1".to_string()]);
    assert_eq!(ledger.records(None).unwrap().len(), 2);
}
