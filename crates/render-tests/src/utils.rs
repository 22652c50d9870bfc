use chrono::{DateTime, TimeZone, Utc};
use connectors::{cursor::RowCursor, memory::MemoryCursor};
use model::core::{
    column::{ColumnDescriptor, ScanType, SemanticType},
    value::Value,
};
use render::{
    convert::ConverterRegistry,
    error::RenderError,
    registry::{OutputFormat, create_renderer},
    stream::{RunSummary, run},
};
use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;

/// Sink whose bytes stay readable after the renderer takes ownership of it.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().map(|buf| buf.clone()).unwrap_or_default()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).expect("sink holds UTF-8")
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("sink poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that accepts `limit` bytes, then fails every write.
pub struct BrokenSink {
    pub limit: usize,
    pub written: usize,
}

impl Write for BrokenSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `cursor` through the renderer for `format` and returns the bytes written.
pub async fn render<C: RowCursor>(
    format: OutputFormat,
    cursor: &mut C,
) -> (Result<RunSummary, RenderError>, Vec<u8>) {
    let sink = SharedSink::default();
    let mut renderer = create_renderer(format, Box::new(sink.clone()));
    let result = run(
        cursor,
        renderer.as_mut(),
        &ConverterRegistry::default(),
        &CancellationToken::new(),
    )
    .await;
    drop(renderer);
    (result, sink.bytes())
}

pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).expect("valid UTF-16")
}

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

/// Columns shaped like a MySQL `customer` table.
pub fn customer_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "INT", SemanticType::Other, ScanType::Int),
        ColumnDescriptor::new("name", "VARCHAR", SemanticType::ShortText, ScanType::Text)
            .with_length(45),
        ColumnDescriptor::new("joined", "DATE", SemanticType::Date, ScanType::Text),
        ColumnDescriptor::new(
            "last_seen",
            "TIMESTAMP",
            SemanticType::Timestamp,
            ScanType::Timestamp,
        ),
        ColumnDescriptor::new("notes", "BLOB", SemanticType::LongText, ScanType::Bytes)
            .with_length(65535),
    ]
}

pub fn customer_rows() -> Vec<Vec<Value>> {
    vec![
        vec![
            Value::Int(1),
            Value::from("Mary Smith"),
            Value::from("2006-02-14"),
            Value::Timestamp(created_at()),
            Value::Bytes(b"prefers email".to_vec()),
        ],
        vec![
            Value::Int(2),
            Value::from("O'Neil, \"Pat\""),
            Value::Null,
            Value::Null,
            Value::Null,
        ],
    ]
}

pub fn customer_cursor() -> MemoryCursor {
    MemoryCursor::new(customer_columns(), customer_rows())
}

pub fn empty_cursor() -> MemoryCursor {
    MemoryCursor::new(customer_columns(), Vec::new())
}
