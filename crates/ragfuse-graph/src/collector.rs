use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragfuse_core::config::Settings;
use ragfuse_core::task::with_deadline;
use ragfuse_core::types::{display_value, truncate_chars, GraphItem};
use ragfuse_core::{CollectContext, Collector, GraphIndex, Result, SearchResult};

pub const SOURCE: &str = "graphrag";

const SNIPPET_CHARS: usize = 200;
const MAX_MEMBERS: usize = 5;
const MAX_NEIGHBORS: usize = 3;

pub struct GraphCollector {
    index: Arc<dyn GraphIndex>,
    limit: usize,
    timeout: Duration,
}

impl GraphCollector {
    pub fn new(index: Arc<dyn GraphIndex>, limit: usize, timeout: Duration) -> Self {
        Self { index, limit, timeout }
    }

    pub fn from_settings(index: Arc<dyn GraphIndex>, settings: &Settings) -> Self {
        Self::new(
            index,
            settings.collectors.graph_limit,
            Duration::from_millis(settings.collectors.graph_timeout_ms),
        )
    }
}

/// Render one graph item; vector hits and unknown kinds yield `None`.
pub fn render_item(item: &GraphItem) -> Option<SearchResult> {
    match item {
        GraphItem::Community { community_id, size, summary, members, score } => {
            let id = display_value(community_id);
            let mut content =
                format!("Community {id} ({size} members): {}...", truncate_chars(summary, SNIPPET_CHARS));
            if !members.is_empty() {
                let names: Vec<String> = members.iter().take(MAX_MEMBERS).map(display_value).collect();
                content.push_str(&format!("\nMembers: {}...", names.join(", ")));
            }
            Some(
                SearchResult::new(format!("Graph:Community:{id}"), content, SOURCE, score / 10.0)
                    .with_meta("type", "community")
                    .with_meta("id", id),
            )
        }
        GraphItem::Entity { name, entity_type, description, neighbors, score } => {
            let kind = entity_type.as_deref().unwrap_or("Entity");
            let mut content = format!("Entity: {name} ({kind})\n{}", truncate_chars(description, SNIPPET_CHARS));
            if !neighbors.is_empty() {
                let names: Vec<&str> = neighbors.iter().take(MAX_NEIGHBORS).map(|n| n.name.as_str()).collect();
                content.push_str(&format!("\nConnected to: {}", names.join(", ")));
            }
            Some(
                SearchResult::new(format!("Graph:Entity:{name}"), content, SOURCE, score.min(1.0))
                    .with_meta("type", "entity")
                    .with_meta("name", name.clone()),
            )
        }
        GraphItem::Vector {} | GraphItem::Unknown => None,
    }
}

#[async_trait]
impl Collector for GraphCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        let items = with_deadline(SOURCE, self.timeout, &ctx.cancel, self.index.query_graph(&ctx.query, true)).await?;
        Ok(items.iter().filter_map(render_item).take(self.limit).collect())
    }
}
