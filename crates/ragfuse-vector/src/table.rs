//! LanceDB connection helpers and row projection.
use arrow_array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray, RecordBatch, StringArray,
};
use arrow_schema::DataType;
use lancedb::{connect, Connection};
use serde_json::{Number, Value};

use ragfuse_core::types::VectorItem;
use ragfuse_core::{Error, Result};

pub const DISTANCE_COLUMN: &str = "_distance";

pub(crate) fn lance_err(err: impl std::fmt::Display) -> Error {
    Error::backend("lancedb", err)
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(lance_err)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(lance_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Project the scalar columns of one row into a JSON map.
///
/// Strings, integers and floats are kept; vectors, nulls and other types are
/// dropped. `_distance` is kept as is so callers can derive a similarity.
pub fn row_to_item(batch: &RecordBatch, row: usize) -> VectorItem {
    let mut item = VectorItem::new();
    let schema = batch.schema();
    for (idx, field) in schema.fields().iter().enumerate() {
        let col = batch.column(idx);
        if col.is_null(row) {
            continue;
        }
        let any = col.as_any();
        let value = match field.data_type() {
            DataType::Utf8 => any.downcast_ref::<StringArray>().map(|a| Value::from(a.value(row))),
            DataType::LargeUtf8 => any.downcast_ref::<LargeStringArray>().map(|a| Value::from(a.value(row))),
            DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| Value::from(a.value(row))),
            DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| Value::from(a.value(row))),
            DataType::Float32 => any
                .downcast_ref::<Float32Array>()
                .and_then(|a| Number::from_f64(f64::from(a.value(row))).map(Value::Number)),
            DataType::Float64 => any
                .downcast_ref::<Float64Array>()
                .and_then(|a| Number::from_f64(a.value(row)).map(Value::Number)),
            _ => None,
        };
        if let Some(value) = value {
            item.insert(field.name().clone(), value);
        }
    }
    item
}
