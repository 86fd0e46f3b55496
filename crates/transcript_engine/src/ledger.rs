//! Durable record of completed jobs.
//!
//! The ledger answers three questions for a run: has this (source, prefix,
//! destination) combination been completed already, which sequential number
//! comes next for a prefix, and has an output title already been used. Rows
//! are appended only after a job's export succeeded and are never updated.
//! Uniqueness is enforced by the runner's skip check, not by the schema.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use transcript_core::{DestinationMode, NamingMode};
use transcript_logging::transcript_debug;

use crate::LedgerError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_records (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path       TEXT NOT NULL,
    prefix            TEXT NOT NULL,
    naming_mode       TEXT NOT NULL,
    sequential_number INTEGER NULL,
    output_title      TEXT NOT NULL,
    destination_mode  TEXT NOT NULL,
    output_locator    TEXT NULL,
    language          TEXT NULL,
    completed_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_source ON ledger_records(source_path, prefix, destination_mode);
CREATE INDEX IF NOT EXISTS idx_ledger_title ON ledger_records(output_title, destination_mode);
CREATE INDEX IF NOT EXISTS idx_ledger_prefix ON ledger_records(prefix, naming_mode);
"#;

const LEDGER_PATH_ENV: &str = "TRANSCRIPT_LEDGER_PATH";

/// One successfully completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub source_path: String,
    pub prefix: String,
    pub naming_mode: NamingMode,
    /// Only set under sequential naming.
    pub sequential_number: Option<u32>,
    pub output_title: String,
    pub destination: DestinationMode,
    pub output_locator: Option<String>,
    pub language: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Single-writer connection to the ledger database. Closed on drop.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Location used when nothing else is configured:
    /// `$TRANSCRIPT_LEDGER_PATH`, else `~/.transcript/history.db`.
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(LEDGER_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".transcript")
            .join("history.db")
    }

    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LedgerError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;
        transcript_debug!("Opened ledger {:?} (journal_mode={})", path, mode);
        Ok(Self { conn })
    }

    /// 1 + highest sequential number recorded for `prefix`, or 1 when there is none.
    pub fn next_sequential_number(&self, prefix: &str) -> Result<u32, LedgerError> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sequential_number), 0) FROM ledger_records \
             WHERE prefix = ?1 AND naming_mode = ?2",
            params![prefix, NamingMode::Sequential.as_str()],
            |row| row.get(0),
        )?;
        let max = u32::try_from(max.max(0)).unwrap_or(u32::MAX - 1);
        Ok(max + 1)
    }

    pub fn already_processed(
        &self,
        source_path: &str,
        prefix: &str,
        destination: DestinationMode,
    ) -> Result<bool, LedgerError> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM ledger_records \
                 WHERE source_path = ?1 AND prefix = ?2 AND destination_mode = ?3 LIMIT 1",
                params![source_path, prefix, destination.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    pub fn title_used(
        &self,
        title: &str,
        destination: DestinationMode,
    ) -> Result<bool, LedgerError> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM ledger_records \
                 WHERE output_title = ?1 AND destination_mode = ?2 LIMIT 1",
                params![title, destination.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Durable insert; visible to the next query on this connection.
    pub fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT INTO ledger_records \
             (source_path, prefix, naming_mode, sequential_number, output_title, \
              destination_mode, output_locator, language, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.source_path,
                record.prefix,
                record.naming_mode.as_str(),
                record.sequential_number,
                record.output_title,
                record.destination.as_str(),
                record.output_locator,
                record.language,
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All rows in insertion order, optionally restricted to one prefix.
    pub fn records(&self, prefix: Option<&str>) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT source_path, prefix, naming_mode, sequential_number, output_title, \
                    destination_mode, output_locator, language, completed_at \
             FROM ledger_records \
             WHERE ?1 IS NULL OR prefix = ?1 \
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![prefix], read_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn close(self) -> Result<(), LedgerError> {
        self.conn.close().map_err(|(_, err)| LedgerError::Sqlite(err))
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<LedgerRecord> {
    let naming: String = row.get(2)?;
    let destination: String = row.get(5)?;
    let completed_at: String = row.get(8)?;
    Ok(LedgerRecord {
        source_path: row.get(0)?,
        prefix: row.get(1)?,
        naming_mode: naming
            .parse()
            .map_err(|e| conversion_error(2, Box::new(e)))?,
        sequential_number: row.get(3)?,
        output_title: row.get(4)?,
        destination: parse_destination(&destination)
            .ok_or_else(|| conversion_error(5, format!("unknown destination {destination}").into()))?,
        output_locator: row.get(6)?,
        language: row.get(7)?,
        completed_at: DateTime::parse_from_rfc3339(&completed_at)
            .map_err(|e| conversion_error(8, Box::new(e)))?
            .with_timezone(&Utc),
    })
}

fn parse_destination(value: &str) -> Option<DestinationMode> {
    [DestinationMode::DocumentService, DestinationMode::LocalFiles]
        .into_iter()
        .find(|mode| mode.as_str() == value)
}

fn conversion_error(
    column: usize,
    err: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, err)
}
