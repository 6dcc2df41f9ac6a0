//! Builds the search engine from configuration: every collector whose backend
//! is configured, plus the optional embedder and reranker.
use std::sync::Arc;

use anyhow::Context;

use ragfuse_core::config::{resolve_with_base, Settings};
use ragfuse_core::Embedder;
use ragfuse_graph::{CommandGraphIndex, GraphCollector};
use ragfuse_hybrid::{HttpReranker, HybridSearchEngine};
use ragfuse_local::{FilenameCollector, SqliteCollector};
use ragfuse_text::{CanonicalCollector, TagCollector};
use ragfuse_vector::{LanceVectorStore, VectorCollector};

fn load_embedder(settings: &Settings) -> Option<Arc<dyn Embedder>> {
    match ragfuse_embed::get_embedder(&settings.embedding) {
        Ok(embedder) => Some(Arc::from(embedder)),
        Err(err) => {
            tracing::warn!(provider = %settings.embedding.provider, error = %err, "embedder unavailable, semantic features disabled");
            None
        }
    }
}

fn vector_uri(settings: &Settings) -> Option<String> {
    let uri = settings.vector.uri.trim();
    if uri.is_empty() {
        return None;
    }
    if uri.contains("://") {
        return Some(uri.to_string());
    }
    Some(resolve_with_base(&settings.paths.root(), uri).to_string_lossy().into_owned())
}

pub async fn build_engine(settings: &Settings) -> anyhow::Result<HybridSearchEngine> {
    let embedder = load_embedder(settings);

    let mut engine = HybridSearchEngine::new(settings)
        .with_collector(Arc::new(CanonicalCollector::from_settings(settings)))
        .with_collector(Arc::new(TagCollector::from_settings(settings)));

    match CommandGraphIndex::from_settings(settings) {
        Some(index) => {
            engine = engine.with_collector(Arc::new(GraphCollector::from_settings(Arc::new(index), settings)));
        }
        None => tracing::debug!("no graph command configured"),
    }

    if let Some(uri) = vector_uri(settings) {
        match LanceVectorStore::connect(&uri, &settings.vector.subtypes).await {
            Ok(store) => {
                let collector = VectorCollector::from_settings(Arc::new(store), embedder.clone(), settings);
                engine = engine.with_collector(Arc::new(collector));
            }
            Err(err) => tracing::warn!(uri = %uri, error = %err, "vector store unavailable"),
        }
    }

    engine = engine
        .with_collector(Arc::new(SqliteCollector::from_settings(settings)))
        .with_collector(Arc::new(FilenameCollector::from_settings(settings)));

    if let Some(embedder) = embedder {
        engine = engine.with_embedder(embedder);
    }
    if let Some(reranker) = HttpReranker::from_settings(&settings.rerank).context("building reranker")? {
        engine = engine.with_reranker(Arc::new(reranker));
    }

    tracing::debug!(sources = ?engine.sources(), "engine ready");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_settings_wire_local_collectors_only() {
        let engine = build_engine(&Settings::default()).await.expect("engine");
        assert_eq!(engine.sources(), vec!["canonical", "tags", "sqlite", "filename"]);
    }

    #[test]
    fn relative_vector_uri_resolves_against_project_root() {
        let mut settings = Settings::default();
        assert_eq!(vector_uri(&settings), None);
        settings.paths.project_root = "/srv/kb".to_string();
        settings.vector.uri = "data/lance".to_string();
        assert_eq!(vector_uri(&settings).as_deref(), Some("/srv/kb/data/lance"));
        settings.vector.uri = "s3://bucket/lance".to_string();
        assert_eq!(vector_uri(&settings).as_deref(), Some("s3://bucket/lance"));
    }
}
