use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use serde_json::{Number, Value};

use ragfuse_core::config::VectorSubtype;
use ragfuse_core::types::VectorItem;
use ragfuse_core::{Result, VectorStore};

use crate::table::{lance_err, open_db, row_to_item, table_exists, DISTANCE_COLUMN};

/// LanceDB store with one table per subtype, searched by cosine distance.
pub struct LanceVectorStore {
    db: Connection,
    tables: HashMap<String, String>,
}

impl LanceVectorStore {
    pub async fn connect(uri: &str, subtypes: &[VectorSubtype]) -> Result<Self> {
        let db = open_db(uri).await?;
        let tables = subtypes
            .iter()
            .map(|s| (s.label.clone(), s.table_name().to_string()))
            .collect();
        Ok(Self { db, tables })
    }

    fn table_for<'a>(&'a self, kind: &'a str) -> &'a str {
        self.tables.get(kind).map_or(kind, String::as_str)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn similarity_search(
        &self,
        kind: &str,
        vector: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<VectorItem>> {
        let table_name = self.table_for(kind);
        if !table_exists(&self.db, table_name).await? {
            tracing::debug!(kind, table = table_name, "vector table absent");
            return Ok(Vec::new());
        }
        let table = self.db.open_table(table_name).execute().await.map_err(lance_err)?;
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(lance_err)?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(lance_err)?;

        let mut items = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
            for row in 0..batch.num_rows() {
                let mut item = row_to_item(&batch, row);
                let distance = item.get(DISTANCE_COLUMN).and_then(Value::as_f64).unwrap_or(1.0);
                let similarity = 1.0 - distance;
                if similarity < f64::from(threshold) {
                    continue;
                }
                if let Some(n) = Number::from_f64(similarity) {
                    item.insert("similarity".to_string(), Value::Number(n));
                }
                items.push(item);
            }
        }
        Ok(items)
    }
}
