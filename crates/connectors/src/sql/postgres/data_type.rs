use model::core::{column::ColumnDescriptor, data_type::SqlDialect};
use tokio_postgres::Column as PgColumn;

pub trait PgColumnDescriptor {
    fn from_pg_column(column: &PgColumn) -> ColumnDescriptor;
}

impl PgColumnDescriptor for ColumnDescriptor {
    fn from_pg_column(column: &PgColumn) -> ColumnDescriptor {
        ColumnDescriptor::from_type_name(column.name(), SqlDialect::Postgres, column.type_().name())
    }
}
