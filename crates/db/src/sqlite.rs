use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};

use vidsage_core::{QueryResult, Row};

use crate::warehouse::{Warehouse, WarehouseError, WarehouseSession};

/// Local SQLite stand-in for the analytical warehouse.
#[derive(Clone, Debug)]
pub struct SqliteWarehouse {
    url: String,
}

impl SqliteWarehouse {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn provider(&self) -> &'static str {
        "sqlite"
    }

    async fn open(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        let connection = SqliteConnection::connect(&self.url).await?;
        Ok(Box::new(SqliteSession { connection }))
    }
}

struct SqliteSession {
    connection: SqliteConnection,
}

#[async_trait]
impl WarehouseSession for SqliteSession {
    async fn query(&mut self, statement: &str) -> Result<QueryResult, WarehouseError> {
        let rows = sqlx::query(statement).fetch_all(&mut self.connection).await?;
        let decoded = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult::new(decoded))
    }

    async fn close(self: Box<Self>) -> Result<(), WarehouseError> {
        self.connection.close().await?;
        Ok(())
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, WarehouseError> {
    let mut fields = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_value(row, column.ordinal())?;
        fields.push((column.name().to_string(), value));
    }
    Ok(Row::new(fields))
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, WarehouseError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "INT8" | "BIGINT" => {
            Value::from(row.try_get_unchecked::<i64, _>(index)?)
        }
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<i64, _>(index)? != 0),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let number = row.try_get_unchecked::<f64, _>(index)?;
            Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}
