use crate::core::data_type::{SqlDialect, classify};
use std::fmt;

/// Abstract classification of a column type, used to pick a safe conversion
/// independently of any database's native type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    ShortText,
    /// Long text or binary payloads.
    LongText,
    Date,
    Time,
    /// Date and time without zone information.
    DateTime,
    /// A point in time the driver can hand over as a structured value.
    Timestamp,
    Other,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::ShortText => "short-text",
            SemanticType::LongText => "long-text",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::DateTime => "datetime",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Other => "other",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value kind a driver naturally produces for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Int,
    Uint,
    Float,
    Bool,
    Bytes,
    Text,
    Decimal,
    Json,
    Uuid,
    Timestamp,
    /// Whatever the driver returns for the column.
    Raw,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanType::Int => "int",
            ScanType::Uint => "uint",
            ScanType::Float => "float",
            ScanType::Bool => "bool",
            ScanType::Bytes => "bytes",
            ScanType::Text => "text",
            ScanType::Decimal => "decimal",
            ScanType::Json => "json",
            ScanType::Uuid => "uuid",
            ScanType::Timestamp => "timestamp",
            ScanType::Raw => "raw",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type name as reported by the driver, e.g. `VARCHAR` or `timestamptz`.
    pub database_type: String,
    pub semantic_type: SemanticType,
    /// Declared display length, when the driver reports one.
    pub length: Option<u64>,
    pub scan_type: ScanType,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        database_type: impl Into<String>,
        semantic_type: SemanticType,
        scan_type: ScanType,
    ) -> Self {
        Self {
            name: name.into(),
            database_type: database_type.into(),
            semantic_type,
            length: None,
            scan_type,
        }
    }

    /// Builds a descriptor from a driver type name using the dialect's type map.
    pub fn from_type_name(
        name: impl Into<String>,
        dialect: SqlDialect,
        database_type: impl Into<String>,
    ) -> Self {
        let database_type = database_type.into();
        let (semantic_type, scan_type) = classify(dialect, &database_type);
        Self::new(name, database_type, semantic_type, scan_type)
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// `TYPE(length)` when a length is known, `TYPE` otherwise.
    pub fn type_label(&self) -> String {
        match self.length {
            Some(len) => format!("{}({len})", self.database_type),
            None => self.database_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_label_includes_length() {
        let col = ColumnDescriptor::from_type_name("name", SqlDialect::MySql, "VARCHAR")
            .with_length(45);
        assert_eq!(col.type_label(), "VARCHAR(45)");
        assert_eq!(col.semantic_type, SemanticType::ShortText);
        assert_eq!(col.scan_type, ScanType::Text);

        let col = ColumnDescriptor::from_type_name("id", SqlDialect::Postgres, "int8");
        assert_eq!(col.type_label(), "int8");
    }
}
