use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinSet;

use ragfuse_core::config::{Settings, VectorSubtype};
use ragfuse_core::types::{display_value, truncate_chars, VectorItem};
use ragfuse_core::{CollectContext, Collector, Embedder, Error, Result, SearchResult, VectorStore};

pub const SOURCE: &str = "vector";

const CONTENT_CHARS: usize = 200;
const NAME_FIELDS: [&str; 5] = ["title", "name", "code", "entity_name", "filename"];

/// Fans one query embedding out over every configured subtype.
pub struct VectorCollector {
    store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn Embedder>>,
    subtypes: Vec<VectorSubtype>,
}

impl VectorCollector {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Option<Arc<dyn Embedder>>, subtypes: Vec<VectorSubtype>) -> Self {
        Self { store, embedder, subtypes }
    }

    pub fn from_settings(store: Arc<dyn VectorStore>, embedder: Option<Arc<dyn Embedder>>, settings: &Settings) -> Self {
        Self::new(store, embedder, settings.vector.subtypes.clone())
    }

    async fn query_embedding(&self, ctx: &CollectContext) -> Result<Arc<Vec<f32>>> {
        if let Some(embedding) = &ctx.embedding {
            return Ok(Arc::clone(embedding));
        }
        let embedder = self
            .embedder
            .clone()
            .ok_or_else(|| Error::InvalidConfig("vector collector has no embedder".to_string()))?;
        let query = ctx.query.clone();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(|e| Error::Operation(format!("embedding worker panicked: {e}")))?
            .map_err(|e| Error::backend("embedder", e))?;
        Ok(Arc::new(vector))
    }
}

fn text_field<'a>(item: &'a VectorItem, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn field_or_unknown(item: &VectorItem, key: &str) -> String {
    item.get(key).map_or_else(|| "?".to_string(), display_value)
}

fn item_id(label: &str, item: &VectorItem) -> String {
    match label {
        "protocol" => format!("Protocol {}: {}", field_or_unknown(item, "code"), field_or_unknown(item, "name")),
        "session" => format!("Session {}: {}", field_or_unknown(item, "date"), field_or_unknown(item, "title")),
        "case_study" => format!("Case Study: {}", field_or_unknown(item, "title")),
        _ => NAME_FIELDS
            .iter()
            .find_map(|key| match item.get(*key) {
                Some(Value::String(s)) if s.is_empty() => None,
                Some(Value::Null) | None => None,
                Some(v) => Some(display_value(v)),
            })
            .unwrap_or_else(|| label.to_string()),
    }
}

/// Turn one raw store row into a result tagged with its subtype.
pub fn item_to_result(label: &str, item: &VectorItem) -> SearchResult {
    let content = text_field(item, "content").map_or("", |c| truncate_chars(c, CONTENT_CHARS));
    let similarity = item.get("similarity").and_then(Value::as_f64).unwrap_or(0.0);
    let mut result = SearchResult::new(item_id(label, item), content, label, similarity).with_meta("type", label);
    if let Some(path) = text_field(item, "file_path") {
        let path = path.split('?').next().unwrap_or(path);
        if !path.is_empty() {
            result = result.with_meta("path", path);
        }
    }
    result
}

#[async_trait]
impl Collector for VectorCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        let embedding = self.query_embedding(ctx).await?;
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for (slot, subtype) in self.subtypes.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let embedding = Arc::clone(&embedding);
            let subtype = subtype.clone();
            tasks.spawn(async move {
                let hits = store
                    .similarity_search(&subtype.label, &embedding, subtype.limit, subtype.threshold)
                    .await;
                (slot, subtype.label, hits)
            });
        }

        let mut per_subtype: Vec<Vec<SearchResult>> = vec![Vec::new(); self.subtypes.len()];
        loop {
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                () = ctx.cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(Error::Cancelled(SOURCE.to_string()));
                }
            };
            match joined {
                None => break,
                Some(Ok((slot, label, Ok(items)))) => {
                    per_subtype[slot] = items.iter().map(|item| item_to_result(&label, item)).collect();
                }
                Some(Ok((_, label, Err(err)))) => {
                    tracing::warn!(subtype = %label, error = %err, "vector subtype failed");
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "vector subtype task aborted");
                }
            }
        }

        let results: Vec<SearchResult> = per_subtype.into_iter().flatten().collect();
        tracing::debug!(
            subtypes = self.subtypes.len(),
            hits = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector fan-out finished"
        );
        Ok(results)
    }
}
