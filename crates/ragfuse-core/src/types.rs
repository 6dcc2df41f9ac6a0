//! Domain types shared by collectors, the fusion engine and presentation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type Meta = HashMap<String, String>;

/// A raw row returned by a vector store: column name to scalar value.
pub type VectorItem = serde_json::Map<String, serde_json::Value>;

/// One retrieval hit.
///
/// - `id`: human-readable identity, stable across calls for the same item so
///   fusion can accumulate contributions from several sources
/// - `source`: collector (or vector subtype) tag; selects the fusion weight
/// - `raw_score`: source-local relevance, never compared across sources
/// - `fused_score`/`signals`: filled in by fusion, `None`/empty before
/// - `rerank_score`: filled in only when the reranker reordered the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub source: String,
    pub raw_score: f64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fused_score: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signals: BTreeMap<String, Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
}

impl SearchResult {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        raw_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            raw_score,
            metadata: Meta::new(),
            fused_score: None,
            signals: BTreeMap::new(),
            rerank_score: None,
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Fused score, or zero for a result that never went through fusion.
    pub fn fused(&self) -> f64 {
        self.fused_score.unwrap_or(0.0)
    }

    pub fn path(&self) -> Option<&str> {
        self.metadata.get("path").map(String::as_str).filter(|p| !p.is_empty())
    }
}

/// Contribution of one source to a fused result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub rank: usize,
    pub contribution: f64,
}

/// Caller-facing switches for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    pub strict: bool,
    pub rerank: bool,
    pub debug: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 10, strict: false, rerank: false, debug: false }
    }
}

/// Item returned by the knowledge-graph index, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphItem {
    Community {
        #[serde(default)]
        community_id: serde_json::Value,
        #[serde(default)]
        size: u64,
        #[serde(default)]
        summary: String,
        #[serde(default)]
        members: Vec<serde_json::Value>,
        #[serde(default)]
        score: f64,
    },
    Entity {
        #[serde(default = "unknown_entity")]
        name: String,
        #[serde(default)]
        entity_type: Option<String>,
        #[serde(default)]
        description: String,
        #[serde(default)]
        neighbors: Vec<GraphNeighbor>,
        #[serde(default)]
        score: f64,
    },
    /// Vector hits are owned by the vector-store collector and ignored here.
    Vector {},
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphNeighbor {
    pub name: String,
}

fn unknown_entity() -> String {
    "Unknown".to_string()
}

/// Render a JSON scalar the way a human would write it (strings unquoted).
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "?".to_string(),
        other => other.to_string(),
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn graph_items_parse_by_tag() {
        let raw = r#"[
            {"type": "community", "community_id": 7, "size": 3, "summary": "s", "members": ["a", 2], "score": 4.0},
            {"type": "entity", "name": "Rust", "neighbors": [{"name": "Cargo", "weight": 1}], "score": 0.4},
            {"type": "vector", "title": "ignored", "similarity": 0.9},
            {"type": "hyperedge"}
        ]"#;
        let items: Vec<GraphItem> = serde_json::from_str(raw).expect("parse");
        assert!(matches!(&items[0], GraphItem::Community { size: 3, .. }));
        assert!(matches!(&items[1], GraphItem::Entity { name, .. } if name == "Rust"));
        assert_eq!(items[2], GraphItem::Vector {});
        assert_eq!(items[3], GraphItem::Unknown);
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(&serde_json::json!("c-1")), "c-1");
        assert_eq!(display_value(&serde_json::json!(12)), "12");
        assert_eq!(display_value(&serde_json::Value::Null), "?");
    }
}
