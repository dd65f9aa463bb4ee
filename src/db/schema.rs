use anyhow::Result;
use tokio_postgres::Client;

#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub table_type: TableType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableType {
    Table,
    View,
    MaterializedView,
    ForeignTable,
}

impl TableType {
    pub fn label(&self) -> &'static str {
        match self {
            TableType::Table => "TABLE",
            TableType::View => "VIEW",
            TableType::MaterializedView => "MVIEW",
            TableType::ForeignTable => "FOREIGN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDetails {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub default_value: Option<String>,
    pub ordinal_position: i32,
}

pub async fn get_tables(client: &Client, schema: &str) -> Result<Vec<TableInfo>> {
    let rows = client
        .query(
            r#"
            SELECT
                c.relname as name,
                n.nspname as schema,
                CASE c.relkind
                    WHEN 'r' THEN 'table'
                    WHEN 'v' THEN 'view'
                    WHEN 'm' THEN 'materialized_view'
                    WHEN 'f' THEN 'foreign_table'
                    ELSE 'other'
                END as table_type
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'v', 'm', 'f')
            ORDER BY c.relname
            "#,
            &[&schema],
        )
        .await?;

    let tables = rows
        .iter()
        .map(|row| {
            let type_str: String = row.get("table_type");
            let table_type = match type_str.as_str() {
                "table" => TableType::Table,
                "view" => TableType::View,
                "materialized_view" => TableType::MaterializedView,
                "foreign_table" => TableType::ForeignTable,
                _ => TableType::Table,
            };

            TableInfo {
                name: row.get("name"),
                schema: row.get("schema"),
                table_type,
            }
        })
        .collect();

    Ok(tables)
}

pub async fn get_columns(client: &Client, schema: &str, table: &str) -> Result<Vec<ColumnDetails>> {
    let rows = client
        .query(
            r#"
            SELECT
                c.column_name as name,
                c.data_type,
                c.is_nullable = 'YES' as is_nullable,
                COALESCE(tc.constraint_type = 'PRIMARY KEY', false) as is_primary_key,
                c.column_default as default_value,
                c.ordinal_position
            FROM information_schema.columns c
            LEFT JOIN information_schema.key_column_usage kcu
                ON c.table_schema = kcu.table_schema
                AND c.table_name = kcu.table_name
                AND c.column_name = kcu.column_name
            LEFT JOIN information_schema.table_constraints tc
                ON kcu.constraint_name = tc.constraint_name
                AND kcu.table_schema = tc.table_schema
                AND tc.constraint_type = 'PRIMARY KEY'
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
            "#,
            &[&schema, &table],
        )
        .await?;

    let columns = rows
        .iter()
        .map(|row| ColumnDetails {
            name: row.get("name"),
            data_type: row.get("data_type"),
            is_nullable: row.get("is_nullable"),
            is_primary_key: row.get("is_primary_key"),
            default_value: row.get("default_value"),
            ordinal_position: row.get("ordinal_position"),
        })
        .collect();

    Ok(columns)
}

/// Render one table's structure as CREATE TABLE DDL text.
pub fn render_table_ddl(schema: &str, table: &str, columns: &[ColumnDetails]) -> String {
    let mut ddl = format!("CREATE TABLE {}.{} (\n", schema, table);

    for (i, col) in columns.iter().enumerate() {
        let null_str = if col.is_nullable { "" } else { " NOT NULL" };
        let default_str = col
            .default_value
            .as_ref()
            .map(|d| format!(" DEFAULT {}", d))
            .unwrap_or_default();
        let pk_str = if col.is_primary_key {
            " PRIMARY KEY"
        } else {
            ""
        };

        let comma = if i < columns.len() - 1 { "," } else { "" };

        ddl.push_str(&format!(
            "    {} {}{}{}{}{}\n",
            col.name, col.data_type, null_str, default_str, pk_str, comma
        ));
    }

    ddl.push_str(");\n");

    ddl
}

/// Snapshot every table in the given schema as DDL text.
///
/// This is the schema description handed to the language model; it is
/// re-read on every request, never cached. An empty string means the schema
/// holds no tables (or introspection found nothing) and callers treat that
/// as a retrieval failure.
pub async fn describe_schema(client: &Client, schema: &str) -> Result<String> {
    let tables = get_tables(client, schema).await?;

    let mut out = String::new();
    for table in &tables {
        let columns = get_columns(client, schema, &table.name).await?;
        if table.table_type != TableType::Table {
            out.push_str(&format!("-- {} {}\n", table.table_type.label(), table.name));
        }
        out.push_str(&render_table_ddl(&table.schema, &table.name, &columns));
        out.push('\n');
    }

    Ok(out)
}
