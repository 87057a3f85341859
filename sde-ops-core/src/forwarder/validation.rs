//! Ordered validation of an imported object.
//!
//! The checks run in a fixed order and stop at the first failure:
//! size, extension, duplicate in pending, then the content checks over a
//! single parse of the CSV. The `Display` text of [`ValidationFailure`] is the
//! reason sent to the uploader.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ForwarderConfig, MIN_OBJECT_SIZE_BYTES, REQUIRED_EXTENSION};
use crate::contract::ObjectStore;
use crate::forwarder::event::ImportObject;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("File is too small/empty ({0} bytes)")]
    TooSmall(i64),
    #[error("File is too large ({0} bytes)")]
    TooLarge(i64),
    #[error("File doesn't have required '.csv' extension{}", found_extension(.0))]
    WrongExtension(Option<String>),
    #[error("Unable to check if file already exists")]
    PendingCheckFailed,
    #[error(
        "A file with the same name is still being processed.\n\nPlease email {support_email} \
         if you would like the new file to replace the one being processed."
    )]
    AlreadyPending { support_email: String },
    #[error("Unable to read object for validation")]
    Unreadable,
    #[error("File is not a valid CSV file")]
    NotCsv,
    #[error("File has too few rows ({0})")]
    TooFewRows(usize),
    #[error("Headers within the file contain spaces or special characters.")]
    InvalidHeaders,
    #[error("Line {line} has {columns} columns, but the header row has {expected}")]
    ColumnCountMismatch {
        line: usize,
        columns: usize,
        expected: usize,
    },
    #[error("Data within the file contains line break")]
    LineBreak,
    #[error("There are {headers} headers, but the header at column {column} is empty.")]
    EmptyHeader { headers: usize, column: usize },
}

fn found_extension(extension: &Option<String>) -> String {
    extension
        .as_ref()
        .map(|ext| format!(" (.{ext})"))
        .unwrap_or_default()
}

/// Result of validating one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

impl From<Result<(), ValidationFailure>> for ValidationOutcome {
    fn from(result: Result<(), ValidationFailure>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Valid,
            Err(failure) => ValidationOutcome::Invalid(failure),
        }
    }
}

/// Runs every check against `object`, reading it from `store` at most once.
pub async fn validate_import<S>(
    object: &ImportObject,
    store: &S,
    config: &ForwarderConfig,
) -> ValidationOutcome
where
    S: ObjectStore + ?Sized,
{
    let outcome = ValidationOutcome::from(run_checks(object, store, config).await);
    match &outcome {
        ValidationOutcome::Valid => info!(uri = %object.s3_uri(), "[VALIDATE] Object passed validation"),
        ValidationOutcome::Invalid(reason) => {
            info!(uri = %object.s3_uri(), reason = %reason, "[VALIDATE] Object failed validation")
        }
    }
    outcome
}

async fn run_checks<S>(
    object: &ImportObject,
    store: &S,
    config: &ForwarderConfig,
) -> Result<(), ValidationFailure>
where
    S: ObjectStore + ?Sized,
{
    check_size(object.size, config.max_object_size_bytes)?;
    check_extension(object.file_name())?;

    let pending = store
        .list_keys(&config.pending_bucket, &object.key)
        .await
        .map_err(|e| {
            error!(error = ?e, bucket = %config.pending_bucket, "[VALIDATE] Failed to list pending bucket");
            ValidationFailure::PendingCheckFailed
        })?;
    if pending.iter().any(|key| key == &object.key) {
        return Err(ValidationFailure::AlreadyPending {
            support_email: config.support_email.clone(),
        });
    }

    let content = store
        .get_object(&object.bucket, &object.key)
        .await
        .map_err(|e| {
            error!(error = ?e, uri = %object.s3_uri(), "[VALIDATE] Unable to read object for validation");
            ValidationFailure::Unreadable
        })?;
    debug!(bytes = content.len(), "[VALIDATE] Object read for validation");

    let table = CsvTable::parse(&content)?;
    table.check()
}

pub fn check_size(size: i64, max_size: i64) -> Result<(), ValidationFailure> {
    if size < MIN_OBJECT_SIZE_BYTES {
        return Err(ValidationFailure::TooSmall(size));
    }
    if size > max_size {
        return Err(ValidationFailure::TooLarge(size));
    }
    Ok(())
}

pub fn check_extension(file_name: &str) -> Result<(), ValidationFailure> {
    if file_name.ends_with(REQUIRED_EXTENSION) {
        return Ok(());
    }
    let found = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_string());
    Err(ValidationFailure::WrongExtension(found))
}

const BYTE_ORDER_MARK: char = '\u{feff}';

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("header pattern is valid"))
}

/// Non-blank rows of a CSV file, header first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Decodes `content` as UTF-8 and splits it into rows. Blank lines are dropped.
    pub fn parse(content: &[u8]) -> Result<Self, ValidationFailure> {
        let text = std::str::from_utf8(content).map_err(|_| ValidationFailure::NotCsv)?;
        if text.contains('\0') {
            return Err(ValidationFailure::NotCsv);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                debug!(error = %e, "[VALIDATE] CSV parse failed");
                ValidationFailure::NotCsv
            })?;
            if record.is_empty() {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        // The reader drops a leading byte-order mark; keep it in the first
        // header token so the header check sees the raw bytes.
        if text.starts_with(BYTE_ORDER_MARK) {
            if let Some(first) = rows.first_mut().and_then(|header| header.first_mut()) {
                if !first.starts_with(BYTE_ORDER_MARK) {
                    first.insert(0, BYTE_ORDER_MARK);
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Structural checks over the parsed rows, in order.
    pub fn check(&self) -> Result<(), ValidationFailure> {
        if self.rows.len() < 2 {
            return Err(ValidationFailure::TooFewRows(self.rows.len()));
        }
        let header = &self.rows[0];

        if header.iter().any(|name| header_pattern().is_match(name)) {
            return Err(ValidationFailure::InvalidHeaders);
        }

        let expected = header.len();
        if let Some((index, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != expected)
        {
            return Err(ValidationFailure::ColumnCountMismatch {
                line: index + 1,
                columns: row.len(),
                expected,
            });
        }

        if self.rows.iter().flatten().any(|field| field.contains('\n')) {
            return Err(ValidationFailure::LineBreak);
        }

        if let Some(index) = header.iter().position(String::is_empty) {
            return Err(ValidationFailure::EmptyHeader {
                headers: expected,
                column: index + 1,
            });
        }

        Ok(())
    }
}
