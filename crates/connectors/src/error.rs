use thiserror::Error;

/// Errors raised while opening, advancing or closing a cursor.
#[derive(Debug, Error)]
pub enum CursorError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Column metadata is not available before the first row")]
    ColumnsUnavailable,

    #[error("Cursor is closed")]
    Closed,

    #[error("Invalid connection string: {0}")]
    InvalidConnection(String),

    #[error("Unknown connection kind: {0}")]
    UnknownKind(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error("Cursor error: {0}")]
    Generic(String),
}

/// Errors raised while reading the current row into scan targets.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("column {column}: expected {expected}, found {found}")]
    Mismatch {
        column: usize,
        expected: String,
        found: String,
    },

    #[error("row has {found} cells but {expected} scan targets were given")]
    Arity { expected: usize, found: usize },

    #[error("column {column}: value out of range: {reason}")]
    OutOfRange { column: usize, reason: String },

    #[error("column {column}: {message}")]
    Driver { column: usize, message: String },

    #[error("no current row to scan")]
    NoRow,
}
