use model::core::{
    column::{ColumnDescriptor, SemanticType},
    data_type::SqlDialect,
};
use mysql_async::{
    Column,
    consts::{ColumnFlags, ColumnType},
};

/// Collation id MySQL reports for binary strings.
const BINARY_COLLATION_ID: u16 = 63;

pub trait MySqlColumnDescriptor {
    fn from_mysql_column(column: &Column) -> ColumnDescriptor;
}

impl MySqlColumnDescriptor for ColumnDescriptor {
    fn from_mysql_column(column: &Column) -> ColumnDescriptor {
        let descriptor = ColumnDescriptor::from_type_name(
            column.name_str().into_owned(),
            SqlDialect::MySql,
            database_type_name(column),
        );

        match descriptor.semantic_type {
            SemanticType::ShortText | SemanticType::LongText => {
                descriptor.with_length(u64::from(column.column_length()))
            }
            _ => descriptor,
        }
    }
}

/// Type name of a result column, spelled the way `information_schema` does.
pub fn database_type_name(column: &Column) -> &'static str {
    let flags = column.flags();
    let unsigned = flags.contains(ColumnFlags::UNSIGNED_FLAG);
    let binary = column.character_set() == BINARY_COLLATION_ID;
    let pick = |bin: &'static str, text: &'static str| if binary { bin } else { text };
    let sign = |uns: &'static str, sig: &'static str| if unsigned { uns } else { sig };

    match column.column_type() {
        ColumnType::MYSQL_TYPE_BIT => "BIT",
        ColumnType::MYSQL_TYPE_TINY_BLOB => pick("TINYBLOB", "TINYTEXT"),
        ColumnType::MYSQL_TYPE_MEDIUM_BLOB => pick("MEDIUMBLOB", "MEDIUMTEXT"),
        ColumnType::MYSQL_TYPE_LONG_BLOB => pick("LONGBLOB", "LONGTEXT"),
        ColumnType::MYSQL_TYPE_BLOB => pick("BLOB", "TEXT"),
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => "DATE",
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_DATETIME2 => "DATETIME",
        ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP",
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => "TIME",
        ColumnType::MYSQL_TYPE_YEAR => "YEAR",
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
        ColumnType::MYSQL_TYPE_FLOAT => "FLOAT",
        ColumnType::MYSQL_TYPE_DOUBLE => "DOUBLE",
        ColumnType::MYSQL_TYPE_TINY => sign("TINYINT UNSIGNED", "TINYINT"),
        ColumnType::MYSQL_TYPE_SHORT => sign("SMALLINT UNSIGNED", "SMALLINT"),
        ColumnType::MYSQL_TYPE_INT24 => sign("MEDIUMINT UNSIGNED", "MEDIUMINT"),
        ColumnType::MYSQL_TYPE_LONG => sign("INT UNSIGNED", "INT"),
        ColumnType::MYSQL_TYPE_LONGLONG => sign("BIGINT UNSIGNED", "BIGINT"),
        ColumnType::MYSQL_TYPE_ENUM => "ENUM",
        ColumnType::MYSQL_TYPE_SET => "SET",
        ColumnType::MYSQL_TYPE_JSON => "JSON",
        ColumnType::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        ColumnType::MYSQL_TYPE_NULL => "NULL",
        ColumnType::MYSQL_TYPE_STRING if flags.contains(ColumnFlags::ENUM_FLAG) => "ENUM",
        ColumnType::MYSQL_TYPE_STRING if flags.contains(ColumnFlags::SET_FLAG) => "SET",
        ColumnType::MYSQL_TYPE_STRING => pick("BINARY", "CHAR"),
        ColumnType::MYSQL_TYPE_VAR_STRING | ColumnType::MYSQL_TYPE_VARCHAR => {
            pick("VARBINARY", "VARCHAR")
        }
        _ => "UNKNOWN",
    }
}
