use crate::error::{CursorError, ScanError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::core::{column::ColumnDescriptor, column::ScanType, value::Value};
use std::fmt;

/// What a cursor is asked to produce for one column of the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTarget {
    /// A nullable string cell. Never a raw byte buffer.
    Text,
    /// A validity flag plus a structured date-time.
    Timestamp,
    /// The driver's natural value for the given scan type.
    Native(ScanType),
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanTarget::Text => f.write_str("nullable text"),
            ScanTarget::Timestamp => f.write_str("nullable timestamp"),
            ScanTarget::Native(scan_type) => write!(f, "native {scan_type}"),
        }
    }
}

/// A timestamp cell that may be NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullTimestamp {
    pub valid: bool,
    pub time: DateTime<Utc>,
}

impl NullTimestamp {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn into_option(self) -> Option<DateTime<Utc>> {
        self.valid.then_some(self.time)
    }
}

impl From<Option<DateTime<Utc>>> for NullTimestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(time) => NullTimestamp { valid: true, time },
            None => NullTimestamp::null(),
        }
    }
}

/// A cell as read from the driver, shaped by its scan target.
#[derive(Debug, Clone, PartialEq)]
pub enum Scanned {
    Text(Option<String>),
    Timestamp(NullTimestamp),
    Native(Value),
}

impl Scanned {
    pub fn kind(&self) -> &'static str {
        match self {
            Scanned::Text(_) => "nullable text",
            Scanned::Timestamp(_) => "nullable timestamp",
            Scanned::Native(_) => "native value",
        }
    }
}

/// A forward-only handle over the rows of one result set.
///
/// `advance` must be called before the first row can be scanned. Once it
/// returns `false` the cursor is exhausted. `close` releases the underlying
/// result and is safe to call more than once.
#[async_trait]
pub trait RowCursor: Send {
    /// Moves to the next row. Returns `false` when no row is left.
    async fn advance(&mut self) -> Result<bool, CursorError>;

    /// Column descriptors of the result set.
    fn columns(&self) -> Result<Vec<ColumnDescriptor>, CursorError>;

    /// Reads the current row, one cell per target.
    fn scan(&self, targets: &[ScanTarget]) -> Result<Vec<Scanned>, ScanError>;

    async fn close(&mut self) -> Result<(), CursorError>;

    /// Releases the cursor without reading the rows the server has not sent
    /// yet. Used when a run is cancelled; defaults to `close`.
    async fn abort(&mut self) -> Result<(), CursorError> {
        self.close().await
    }
}

/// Checks that a row of `found` cells can be scanned into `targets`.
pub fn check_arity(targets: &[ScanTarget], found: usize) -> Result<(), ScanError> {
    if targets.len() != found {
        return Err(ScanError::Arity {
            expected: targets.len(),
            found,
        });
    }
    Ok(())
}
