use crate::{
    cursor::{NullTimestamp, RowCursor, ScanTarget, Scanned, check_arity},
    error::{CursorError, ScanError},
    sql::postgres::{
        data_type::PgColumnDescriptor,
        decode::{PgNumeric, PgText},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use model::core::{column::ColumnDescriptor, column::ScanType, value::Value};
use std::pin::Pin;
use tokio_postgres::{
    Row, RowStream, Statement,
    types::{FromSql, Type},
};

/// Cursor over a streamed Postgres portal.
pub struct PgCursor {
    columns: Vec<ColumnDescriptor>,
    types: Vec<Type>,
    stream: Option<Pin<Box<RowStream>>>,
    current: Option<Row>,
}

impl PgCursor {
    pub fn new(statement: &Statement, stream: RowStream) -> Self {
        Self {
            columns: statement
                .columns()
                .iter()
                .map(ColumnDescriptor::from_pg_column)
                .collect(),
            types: statement
                .columns()
                .iter()
                .map(|c| c.type_().clone())
                .collect(),
            stream: Some(Box::pin(stream)),
            current: None,
        }
    }
}

#[async_trait]
impl RowCursor for PgCursor {
    async fn advance(&mut self) -> Result<bool, CursorError> {
        let stream = self.stream.as_mut().ok_or(CursorError::Closed)?;
        self.current = stream.try_next().await?;
        Ok(self.current.is_some())
    }

    fn columns(&self) -> Result<Vec<ColumnDescriptor>, CursorError> {
        Ok(self.columns.clone())
    }

    fn scan(&self, targets: &[ScanTarget]) -> Result<Vec<Scanned>, ScanError> {
        let row = self.current.as_ref().ok_or(ScanError::NoRow)?;
        check_arity(targets, row.len())?;

        targets
            .iter()
            .zip(&self.types)
            .enumerate()
            .map(|(idx, (target, ty))| match target {
                ScanTarget::Text => text_of(row, idx, ty).map(Scanned::Text),
                ScanTarget::Timestamp => timestamp_of(row, idx, ty).map(Scanned::Timestamp),
                ScanTarget::Native(scan_type) => {
                    native_of(row, idx, ty, *scan_type).map(Scanned::Native)
                }
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        // Dropping the stream closes the portal.
        self.current = None;
        self.stream = None;
        Ok(())
    }
}

fn get<'r, T: FromSql<'r>>(row: &'r Row, idx: usize) -> Result<Option<T>, ScanError> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| ScanError::Driver {
            column: idx,
            message: e.to_string(),
        })
}

fn text_of(row: &Row, idx: usize, ty: &Type) -> Result<Option<String>, ScanError> {
    if *ty == Type::DATE {
        return Ok(get::<NaiveDate>(row, idx)?.map(|d| d.format("%Y-%m-%d").to_string()));
    }
    if *ty == Type::TIME {
        return Ok(get::<NaiveTime>(row, idx)?.map(|t| t.format("%H:%M:%S%.f").to_string()));
    }
    if *ty == Type::TIMESTAMP {
        return Ok(get::<NaiveDateTime>(row, idx)?
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()));
    }
    Ok(get::<PgText>(row, idx)?.map(|text| text.0))
}

fn timestamp_of(row: &Row, idx: usize, ty: &Type) -> Result<NullTimestamp, ScanError> {
    let ts = if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(row, idx)?
    } else if *ty == Type::TIMESTAMP {
        get::<NaiveDateTime>(row, idx)?.map(|naive| naive.and_utc())
    } else if *ty == Type::DATE {
        get::<NaiveDate>(row, idx)?.map(|date| date.and_time(NaiveTime::MIN).and_utc())
    } else {
        return Err(ScanError::Mismatch {
            column: idx,
            expected: ScanTarget::Timestamp.to_string(),
            found: ty.name().to_string(),
        });
    };
    Ok(ts.into())
}

fn native_of(row: &Row, idx: usize, ty: &Type, scan_type: ScanType) -> Result<Value, ScanError> {
    let value = match scan_type {
        ScanType::Int if *ty == Type::INT2 => get::<i16>(row, idx)?.map(|v| Value::Int(v.into())),
        ScanType::Int if *ty == Type::INT4 => get::<i32>(row, idx)?.map(|v| Value::Int(v.into())),
        ScanType::Int => get::<i64>(row, idx)?.map(Value::Int),
        ScanType::Uint => get::<u32>(row, idx)?.map(|v| Value::Uint(v.into())),
        ScanType::Float if *ty == Type::FLOAT4 => {
            get::<f32>(row, idx)?.map(Value::Float32)
        }
        ScanType::Float => get::<f64>(row, idx)?.map(Value::Float),
        ScanType::Bool => get::<bool>(row, idx)?.map(Value::Boolean),
        ScanType::Bytes => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        ScanType::Decimal => get::<PgNumeric>(row, idx)?.map(|n| Value::String(n.0)),
        ScanType::Json => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        ScanType::Uuid => get::<uuid::Uuid>(row, idx)?.map(|u| Value::String(u.to_string())),
        ScanType::Timestamp => timestamp_of(row, idx, ty)?.into_option().map(Value::Timestamp),
        ScanType::Text | ScanType::Raw => text_of(row, idx, ty)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}
