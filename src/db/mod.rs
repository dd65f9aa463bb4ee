pub mod connection;
pub mod query;
pub mod schema;

pub use connection::{create_client, ConnectionConfig, SslMode};
pub use query::{
    CellValue, ColumnInfo, ErrorCategory, QueryOutcome, ResultSet, StructuredError,
};
