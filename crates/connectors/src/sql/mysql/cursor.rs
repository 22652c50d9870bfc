use crate::{
    cursor::{NullTimestamp, RowCursor, ScanTarget, Scanned, check_arity},
    error::{CursorError, ScanError},
    sql::mysql::data_type::{MySqlColumnDescriptor, database_type_name},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use model::core::{column::ColumnDescriptor, column::ScanType, value::Value};
use mysql_async::{
    BinaryProtocol, Column, Conn, Opts, QueryResult, Row, Value as MySqlValue, prelude::Queryable,
};
use tracing::{info, warn};

/// Stops a running statement from a second connection.
#[derive(Debug, Clone)]
pub struct QueryKiller {
    opts: Opts,
    connection_id: u32,
}

impl QueryKiller {
    pub fn new(opts: Opts, connection_id: u32) -> Self {
        Self {
            opts,
            connection_id,
        }
    }

    pub fn statement(&self) -> String {
        format!("KILL QUERY {}", self.connection_id)
    }

    async fn kill(&self) -> Result<(), CursorError> {
        let mut side = Conn::new(self.opts.clone()).await?;
        let killed = side.query_drop(self.statement()).await;
        if let Err(e) = side.disconnect().await {
            warn!("Failed to disconnect the kill connection: {}", e);
        }
        killed?;
        info!(connection_id = self.connection_id, "Running query killed");
        Ok(())
    }
}

/// Cursor over a prepared-statement result set.
///
/// Prepared statements use the binary protocol, which keeps the column types
/// visible; textual queries would report every column as a string.
pub struct MySqlCursor<'a> {
    result: Option<QueryResult<'a, 'static, BinaryProtocol>>,
    current: Option<Row>,
    killer: QueryKiller,
}

impl<'a> MySqlCursor<'a> {
    pub fn new(result: QueryResult<'a, 'static, BinaryProtocol>, killer: QueryKiller) -> Self {
        Self {
            result: Some(result),
            current: None,
            killer,
        }
    }
}

#[async_trait]
impl RowCursor for MySqlCursor<'_> {
    async fn advance(&mut self) -> Result<bool, CursorError> {
        let result = self.result.as_mut().ok_or(CursorError::Closed)?;
        self.current = result.next().await?;
        Ok(self.current.is_some())
    }

    fn columns(&self) -> Result<Vec<ColumnDescriptor>, CursorError> {
        let row = self
            .current
            .as_ref()
            .ok_or(CursorError::ColumnsUnavailable)?;
        Ok(row
            .columns_ref()
            .iter()
            .map(ColumnDescriptor::from_mysql_column)
            .collect())
    }

    fn scan(&self, targets: &[ScanTarget]) -> Result<Vec<Scanned>, ScanError> {
        let row = self.current.as_ref().ok_or(ScanError::NoRow)?;
        check_arity(targets, row.len())?;

        let columns = row.columns_ref();
        targets
            .iter()
            .enumerate()
            .map(|(idx, target)| {
                let value = row.as_ref(idx).unwrap_or(&MySqlValue::NULL);
                scan_value(idx, &columns[idx], value, *target)
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.current = None;
        if let Some(result) = self.result.take() {
            result.drop_result().await?;
        }
        Ok(())
    }

    /// Leaves the unread rows on the wire and kills the statement so the
    /// server stops sending them. The connection must be dropped, not reused.
    async fn abort(&mut self) -> Result<(), CursorError> {
        self.current = None;
        if self.result.take().is_some() {
            self.killer.kill().await?;
        }
        Ok(())
    }
}

fn scan_value(
    idx: usize,
    column: &Column,
    value: &MySqlValue,
    target: ScanTarget,
) -> Result<Scanned, ScanError> {
    match target {
        ScanTarget::Text => Ok(Scanned::Text(text_of(column, value))),
        ScanTarget::Timestamp => timestamp_of(idx, value).map(Scanned::Timestamp),
        ScanTarget::Native(scan_type) => native_of(idx, column, value, scan_type).map(Scanned::Native),
    }
}

fn text_of(column: &Column, value: &MySqlValue) -> Option<String> {
    match value {
        MySqlValue::NULL => None,
        MySqlValue::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        MySqlValue::Int(v) => Some(v.to_string()),
        MySqlValue::UInt(v) => Some(v.to_string()),
        MySqlValue::Float(v) => Some(v.to_string()),
        MySqlValue::Double(v) => Some(v.to_string()),
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            let date = format!("{year:04}-{month:02}-{day:02}");
            if database_type_name(column) == "DATE" {
                return Some(date);
            }
            Some(format!(
                "{date} {hour:02}:{minute:02}:{second:02}{}",
                fraction(*micros, column.decimals())
            ))
        }
        MySqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            Some(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}{}",
                fraction(*micros, column.decimals())
            ))
        }
    }
}

/// Fractional seconds with as many digits as the column declares.
fn fraction(micros: u32, decimals: u8) -> String {
    let digits = usize::from(decimals.min(6));
    if digits == 0 {
        return String::new();
    }
    let full = format!("{micros:06}");
    format!(".{}", &full[..digits])
}

fn timestamp_of(idx: usize, value: &MySqlValue) -> Result<NullTimestamp, ScanError> {
    match value {
        MySqlValue::NULL => Ok(NullTimestamp::null()),
        MySqlValue::Date(0, 0, 0, ..) => Ok(NullTimestamp::null()),
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .map(|naive| Some(naive.and_utc()).into())
                .ok_or_else(|| ScanError::OutOfRange {
                    column: idx,
                    reason: format!("invalid date-time {value:?}"),
                })
        }
        MySqlValue::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if text.starts_with("0000-00-00") {
                return Ok(NullTimestamp::null());
            }
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                .map(|naive| Some(naive.and_utc()).into())
                .map_err(|e| ScanError::Driver {
                    column: idx,
                    message: format!("cannot parse timestamp '{text}': {e}"),
                })
        }
        other => Err(ScanError::Mismatch {
            column: idx,
            expected: ScanTarget::Timestamp.to_string(),
            found: format!("{other:?}"),
        }),
    }
}

fn native_of(
    idx: usize,
    column: &Column,
    value: &MySqlValue,
    scan_type: ScanType,
) -> Result<Value, ScanError> {
    let value = match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(v) => Value::Int(*v),
        MySqlValue::UInt(v) => Value::Uint(*v),
        MySqlValue::Float(v) => Value::Float32(*v),
        MySqlValue::Double(v) => Value::Float(*v),
        MySqlValue::Bytes(bytes) => match scan_type {
            ScanType::Json => {
                serde_json::from_slice(bytes)
                    .map(Value::Json)
                    .map_err(|e| ScanError::Driver {
                        column: idx,
                        message: format!("invalid JSON document: {e}"),
                    })?
            }
            ScanType::Decimal | ScanType::Text => {
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => Value::Bytes(bytes.clone()),
        },
        MySqlValue::Date(..) if scan_type == ScanType::Timestamp => {
            return Ok(timestamp_of(idx, value)?
                .into_option()
                .map(Value::Timestamp)
                .unwrap_or(Value::Null));
        }
        MySqlValue::Date(..) | MySqlValue::Time(..) => text_of(column, value)
            .map(Value::String)
            .unwrap_or(Value::Null),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::consts::ColumnType;

    #[test]
    fn test_fraction_follows_declared_decimals() {
        assert_eq!(fraction(123_456, 0), "");
        assert_eq!(fraction(123_456, 3), ".123");
        assert_eq!(fraction(5, 6), ".000005");
        assert_eq!(fraction(5, 9), ".000005");
    }

    #[test]
    fn test_zero_date_is_null_timestamp() {
        let zero = MySqlValue::Date(0, 0, 0, 0, 0, 0, 0);
        assert_eq!(timestamp_of(0, &zero).unwrap(), NullTimestamp::null());

        let text_zero = MySqlValue::Bytes(b"0000-00-00 00:00:00".to_vec());
        assert_eq!(timestamp_of(0, &text_zero).unwrap(), NullTimestamp::null());
    }

    #[test]
    fn test_binary_timestamp_is_structured() {
        let value = MySqlValue::Date(2021, 7, 4, 12, 30, 15, 250_000);
        let ts = timestamp_of(0, &value).unwrap().into_option().unwrap();
        assert_eq!(
            ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            "2021-07-04 12:30:15.250000"
        );
    }

    #[test]
    fn test_single_precision_float_keeps_short_form() {
        let column = Column::new(ColumnType::MYSQL_TYPE_FLOAT);
        let value = native_of(0, &column, &MySqlValue::Float(1.1), ScanType::Float).unwrap();
        assert_eq!(value, Value::Float32(1.1));
        assert_eq!(value.to_string(), "1.1");
        assert_eq!(serde_json::to_string(&value).unwrap(), "1.1");
    }

    #[test]
    fn test_kill_targets_the_cursor_connection() {
        let opts = Opts::from_url("mysql://app@localhost/sakila").unwrap();
        assert_eq!(QueryKiller::new(opts, 42).statement(), "KILL QUERY 42");
    }

    #[test]
    fn test_invalid_date_is_out_of_range() {
        let value = MySqlValue::Date(2021, 2, 30, 0, 0, 0, 0);
        assert!(matches!(
            timestamp_of(3, &value),
            Err(ScanError::OutOfRange { column: 3, .. })
        ));
    }
}
