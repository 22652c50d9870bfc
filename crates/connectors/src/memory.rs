use crate::{
    cursor::{NullTimestamp, RowCursor, ScanTarget, Scanned, check_arity},
    error::{CursorError, ScanError},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use model::core::{column::ColumnDescriptor, column::ScanType, value::Value};
use std::collections::VecDeque;

/// A cursor over rows held in memory.
///
/// Cells hold the values a driver would hand out; `scan` shapes them into the
/// requested targets the way a real driver would, including rejecting cells
/// that cannot be read into a target.
pub struct MemoryCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    fail_after: Option<usize>,
    advanced: usize,
    closed: bool,
}

impl MemoryCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
            fail_after: None,
            advanced: 0,
            closed: false,
        }
    }

    /// Makes `advance` fail once `rows` rows have been delivered.
    pub fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn advance(&mut self) -> Result<bool, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.fail_after == Some(self.advanced) {
            self.current = None;
            return Err(CursorError::Generic(format!(
                "connection lost after {} rows",
                self.advanced
            )));
        }
        self.current = self.rows.pop_front();
        if self.current.is_some() {
            self.advanced += 1;
        }
        Ok(self.current.is_some())
    }

    fn columns(&self) -> Result<Vec<ColumnDescriptor>, CursorError> {
        Ok(self.columns.clone())
    }

    fn scan(&self, targets: &[ScanTarget]) -> Result<Vec<Scanned>, ScanError> {
        let row = self.current.as_ref().ok_or(ScanError::NoRow)?;
        check_arity(targets, row.len())?;

        row.iter()
            .zip(targets)
            .enumerate()
            .map(|(column, (cell, target))| scan_cell(column, cell, *target))
            .collect()
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.closed = true;
        self.current = None;
        self.rows.clear();
        Ok(())
    }
}

fn scan_cell(column: usize, cell: &Value, target: ScanTarget) -> Result<Scanned, ScanError> {
    let mismatch = || ScanError::Mismatch {
        column,
        expected: target.to_string(),
        found: cell.kind().to_string(),
    };

    match target {
        ScanTarget::Text => match cell {
            Value::Null => Ok(Scanned::Text(None)),
            Value::Json(_) => Err(mismatch()),
            Value::Timestamp(ts) => Ok(Scanned::Text(Some(
                ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            ))),
            other => Ok(Scanned::Text(other.as_text().map(|t| t.into_owned()))),
        },
        ScanTarget::Timestamp => match cell {
            Value::Null => Ok(Scanned::Timestamp(NullTimestamp::null())),
            Value::Timestamp(ts) => Ok(Scanned::Timestamp(Some(*ts).into())),
            Value::String(s) => parse_timestamp(s)
                .map(|ts| Scanned::Timestamp(Some(ts).into()))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ScanTarget::Native(scan_type) => {
            scan_native(column, cell, scan_type).ok_or_else(mismatch)?
        }
    }
}

fn scan_native(
    column: usize,
    cell: &Value,
    scan_type: ScanType,
) -> Option<Result<Scanned, ScanError>> {
    let value = match (scan_type, cell) {
        (_, Value::Null) | (ScanType::Raw, _) => cell.clone(),
        (ScanType::Int, Value::Int(_)) | (ScanType::Uint, Value::Uint(_)) => cell.clone(),
        (ScanType::Int, Value::Uint(v)) => match i64::try_from(*v) {
            Ok(v) => Value::Int(v),
            Err(e) => return Some(Err(out_of_range(column, e))),
        },
        (ScanType::Uint, Value::Int(v)) => match u64::try_from(*v) {
            Ok(v) => Value::Uint(v),
            Err(e) => return Some(Err(out_of_range(column, e))),
        },
        (ScanType::Float, Value::Float(_) | Value::Float32(_)) => cell.clone(),
        (ScanType::Float, Value::Int(v)) => Value::Float(*v as f64),
        (ScanType::Float, Value::Uint(v)) => Value::Float(*v as f64),
        (ScanType::Bool, Value::Boolean(_)) => cell.clone(),
        (ScanType::Bool, Value::Int(v)) => Value::Boolean(*v != 0),
        (ScanType::Bytes, Value::Bytes(_)) => cell.clone(),
        (ScanType::Bytes, Value::String(s)) => Value::Bytes(s.clone().into_bytes()),
        (ScanType::Text | ScanType::Decimal | ScanType::Uuid, Value::String(_)) => cell.clone(),
        (ScanType::Json, Value::Json(_)) => cell.clone(),
        (ScanType::Json, Value::String(s)) => match serde_json::from_str(s) {
            Ok(json) => Value::Json(json),
            Err(e) => {
                return Some(Err(ScanError::Driver {
                    column,
                    message: format!("invalid JSON: {e}"),
                }));
            }
        },
        (ScanType::Timestamp, Value::Timestamp(_)) => cell.clone(),
        _ => return None,
    };
    Some(Ok(Scanned::Native(value)))
}

fn out_of_range(column: usize, err: impl std::fmt::Display) -> ScanError {
    ScanError::OutOfRange {
        column,
        reason: err.to_string(),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
