use crate::core::column::{ScanType, SemanticType};
use lazy_static::lazy_static;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
}

type TypeClass = (SemanticType, ScanType);

lazy_static! {
    static ref MYSQL_TYPE_MAP: HashMap<&'static str, TypeClass> = build_mysql_type_map();
    static ref POSTGRES_TYPE_MAP: HashMap<&'static str, TypeClass> = build_postgres_type_map();
}

const UNKNOWN: TypeClass = (SemanticType::Other, ScanType::Raw);

/// Maps a driver type name to its semantic tag and natural scan type.
///
/// Names are matched case-insensitively; unknown names classify as
/// `(Other, Raw)` so the driver's own value is used.
pub fn classify(dialect: SqlDialect, type_name: &str) -> TypeClass {
    let normalized = normalize_type_name(type_name);
    let map = match dialect {
        SqlDialect::MySql => &*MYSQL_TYPE_MAP,
        SqlDialect::Postgres => {
            if is_postgres_array(&normalized) {
                return UNKNOWN;
            }
            &*POSTGRES_TYPE_MAP
        }
    };
    map.get(normalized.as_str()).copied().unwrap_or(UNKNOWN)
}

fn normalize_type_name(type_name: &str) -> String {
    type_name.trim().to_uppercase()
}

fn is_postgres_array(normalized: &str) -> bool {
    normalized.starts_with('_') || normalized.ends_with("[]")
}

fn build_mysql_type_map() -> HashMap<&'static str, TypeClass> {
    use ScanType::*;
    use SemanticType::*;

    let entries = [
        ("CHAR", (ShortText, Text)),
        ("VARCHAR", (ShortText, Text)),
        ("TEXT", (LongText, Bytes)),
        ("TINYTEXT", (LongText, Bytes)),
        ("MEDIUMTEXT", (LongText, Bytes)),
        ("LONGTEXT", (LongText, Bytes)),
        ("BINARY", (LongText, Bytes)),
        ("VARBINARY", (LongText, Bytes)),
        ("BLOB", (LongText, Bytes)),
        ("TINYBLOB", (LongText, Bytes)),
        ("MEDIUMBLOB", (LongText, Bytes)),
        ("LONGBLOB", (LongText, Bytes)),
        ("GEOMETRY", (LongText, Bytes)),
        ("DATE", (Date, Text)),
        ("TIME", (Time, Text)),
        ("DATETIME", (DateTime, Text)),
        ("TIMESTAMP", (SemanticType::Timestamp, ScanType::Timestamp)),
        ("BOOL", (Other, Int)),
        ("BOOLEAN", (Other, Int)),
        ("TINYINT", (Other, Int)),
        ("SMALLINT", (Other, Int)),
        ("MEDIUMINT", (Other, Int)),
        ("INT", (Other, Int)),
        ("INTEGER", (Other, Int)),
        ("BIGINT", (Other, Int)),
        ("YEAR", (Other, Int)),
        ("TINYINT UNSIGNED", (Other, Uint)),
        ("SMALLINT UNSIGNED", (Other, Uint)),
        ("MEDIUMINT UNSIGNED", (Other, Uint)),
        ("INT UNSIGNED", (Other, Uint)),
        ("INTEGER UNSIGNED", (Other, Uint)),
        ("BIGINT UNSIGNED", (Other, Uint)),
        ("FLOAT", (Other, Float)),
        ("DOUBLE", (Other, Float)),
        ("DOUBLE PRECISION", (Other, Float)),
        ("DECIMAL", (Other, Decimal)),
        ("NUMERIC", (Other, Decimal)),
        ("BIT", (Other, Bytes)),
        ("ENUM", (Other, Bytes)),
        ("SET", (Other, Bytes)),
        ("JSON", (Other, Json)),
        ("NULL", (Other, Raw)),
    ];

    entries.into_iter().collect()
}

fn build_postgres_type_map() -> HashMap<&'static str, TypeClass> {
    use ScanType::*;
    use SemanticType::*;

    let entries = [
        ("VARCHAR", (ShortText, Text)),
        ("CHARACTER VARYING", (ShortText, Text)),
        ("BPCHAR", (ShortText, Text)),
        ("CHAR", (ShortText, Text)),
        ("CHARACTER", (ShortText, Text)),
        ("NAME", (ShortText, Text)),
        ("CITEXT", (ShortText, Text)),
        ("TEXT", (LongText, Text)),
        ("XML", (LongText, Text)),
        ("BYTEA", (LongText, Bytes)),
        ("DATE", (Date, Text)),
        ("TIME", (Time, Text)),
        ("TIME WITHOUT TIME ZONE", (Time, Text)),
        ("TIMESTAMP", (DateTime, Text)),
        ("TIMESTAMP WITHOUT TIME ZONE", (DateTime, Text)),
        ("TIMESTAMPTZ", (SemanticType::Timestamp, ScanType::Timestamp)),
        (
            "TIMESTAMP WITH TIME ZONE",
            (SemanticType::Timestamp, ScanType::Timestamp),
        ),
        ("INT2", (Other, Int)),
        ("SMALLINT", (Other, Int)),
        ("INT4", (Other, Int)),
        ("INT", (Other, Int)),
        ("INTEGER", (Other, Int)),
        ("INT8", (Other, Int)),
        ("BIGINT", (Other, Int)),
        ("OID", (Other, Uint)),
        ("FLOAT4", (Other, Float)),
        ("REAL", (Other, Float)),
        ("FLOAT8", (Other, Float)),
        ("DOUBLE PRECISION", (Other, Float)),
        ("NUMERIC", (Other, Decimal)),
        ("DECIMAL", (Other, Decimal)),
        ("BOOL", (Other, Bool)),
        ("BOOLEAN", (Other, Bool)),
        ("JSON", (Other, Json)),
        ("JSONB", (Other, Json)),
        ("UUID", (Other, Uuid)),
    ];

    entries.into_iter().collect()
}
