//! Text and JSON renderings of a search response. Both are pure projections
//! of the final ranking.

use serde::Serialize;
use serde_json::Value;

use ragfuse_core::types::truncate_chars;
use ragfuse_core::{SearchOptions, SearchResult};

use crate::confidence::{Confidence, ConfidenceThresholds};
use crate::engine::{ResultOrigin, SearchResponse};

const RULE_WIDTH: usize = 60;
const SNIPPET_CHARS: usize = 100;

#[derive(Serialize)]
struct ResultView<'a> {
    #[serde(flatten)]
    result: &'a SearchResult,
    confidence: Confidence,
}

#[derive(Serialize)]
struct Payload<'a> {
    results: Vec<ResultView<'a>>,
    suppressed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn empty_message(strict: bool) -> &'static str {
    if strict {
        "No high-confidence results"
    } else {
        "No results found"
    }
}

/// `{results, suppressed}` plus `message` when nothing survived.
pub fn render_json(response: &SearchResponse, options: &SearchOptions, thresholds: &ConfidenceThresholds) -> Value {
    let payload = Payload {
        results: response
            .results
            .iter()
            .map(|result| ResultView { result, confidence: thresholds.of(result) })
            .collect(),
        suppressed: response.suppressed,
        message: response.results.is_empty().then(|| empty_message(options.strict)),
    };
    serde_json::to_value(&payload).unwrap_or(Value::Null)
}

fn banner(query: &str, response: &SearchResponse, options: &SearchOptions) -> String {
    match response.origin {
        ResultOrigin::Exact => format!("⚡ CACHE HIT: \"{query}\""),
        ResultOrigin::Semantic => format!("🔥 SEMANTIC CACHE HIT: \"{query}\""),
        ResultOrigin::Fresh => {
            let mode = if options.rerank { " + Rerank" } else { "" };
            format!("🔍 SMART SEARCH (Parallel Hybrid RRF{mode}): \"{query}\"")
        }
    }
}

fn score_label(result: &SearchResult) -> String {
    match result.rerank_score {
        Some(score) => format!("Rerank:{score:.2}"),
        None => format!("RRF:{:.4}", result.fused()),
    }
}

/// Human-readable block for terminals and agent transcripts.
pub fn render_text(
    query: &str,
    response: &SearchResponse,
    options: &SearchOptions,
    thresholds: &ConfidenceThresholds,
) -> String {
    let mut lines = vec![String::new(), banner(query, response, options), "=".repeat(RULE_WIDTH)];

    if options.rerank && !response.reranked && !response.results.is_empty() {
        lines.push("   ⚠️ rerank unavailable, showing fused order".to_string());
    }
    if !response.timed_out.is_empty() {
        lines.push(format!("   ⚠️ incomplete sources: {}", response.timed_out.join(", ")));
    }
    if options.strict && response.suppressed > 0 {
        lines.push(String::new());
        lines.push(format!("   🛡️ STRICT MODE: {} low-confidence result(s) suppressed", response.suppressed));
    }

    if response.results.is_empty() {
        let note = if options.strict { "(No high-confidence results found)" } else { "(No results found)" };
        lines.push(format!("  {note}"));
        return lines.join("\n") + "\n";
    }

    lines.push(String::new());
    lines.push("<grounding>".to_string());
    lines.push(String::new());
    lines.push(format!("🏆 TOP {} RESULTS:", options.limit));
    for (i, result) in response.results.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "  {}. {} [{}] {}",
            i + 1,
            thresholds.of(result).badge(),
            score_label(result),
            result.id
        ));
        if options.debug {
            let signals = serde_json::to_string(&result.signals).unwrap_or_default();
            lines.push(format!("     Signals: {signals}"));
        }
        match result.path() {
            Some(path) => lines.push(format!("     📁 {path}")),
            None => lines.push(format!("     📄 {}...", truncate_chars(&result.content, SNIPPET_CHARS))),
        }
    }
    lines.push("-".repeat(RULE_WIDTH));
    lines.push("</grounding>".to_string());
    lines.join("\n") + "\n"
}
