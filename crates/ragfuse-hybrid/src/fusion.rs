//! Weighted Reciprocal Rank Fusion
//!
//! Every source list contributes, for each document at 1-indexed `rank`:
//! ```text
//! contribution = weight(source) * (0.5 + raw_score) / (k + rank)
//! ```
//! Contributions are summed per document id. The first copy of a document
//! seen is the one kept; later copies only add their contribution and signal.

use std::collections::HashMap;

use ragfuse_core::config::FusionSettings;
use ragfuse_core::{SearchResult, Signal};

pub const DEFAULT_K: f64 = 60.0;
pub const DEFAULT_FALLBACK_WEIGHT: f64 = 1.0;

const DEFAULT_WEIGHTS: [(&str, f64); 18] = [
    ("canonical", 3.5),
    ("case_study", 3.0),
    ("session", 3.0),
    ("protocol", 2.8),
    ("graphrag", 2.5),
    ("user_profile", 2.5),
    ("framework", 2.3),
    ("tags", 2.2),
    ("vector", 1.8),
    ("capability", 1.8),
    ("playbook", 1.8),
    ("workflow", 1.8),
    ("entity", 1.8),
    ("reference", 1.8),
    ("system_doc", 1.8),
    ("sqlite", 1.5),
    ("filename", 1.0),
    ("fallback", 1.0),
];

/// Source tag to weight, with a fallback for unknown tags.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionWeights {
    weights: HashMap<String, f64>,
    fallback: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.iter().map(|(s, w)| ((*s).to_string(), *w)).collect(),
            fallback: DEFAULT_FALLBACK_WEIGHT,
        }
    }
}

impl FusionWeights {
    pub fn from_settings(settings: &FusionSettings) -> Self {
        let mut weights = Self::default();
        weights.fallback = settings.fallback_weight;
        for (source, weight) in &settings.weights {
            weights.weights.insert(source.clone(), *weight);
        }
        weights
    }

    pub fn with_weight(mut self, source: &str, weight: f64) -> Self {
        self.weights.insert(source.to_string(), weight);
        self
    }

    pub fn weight(&self, source: &str) -> f64 {
        self.weights.get(source).copied().unwrap_or(self.fallback)
    }
}

/// Regroup collector output by each result's own `source` tag.
///
/// Groups appear in first-seen order and keep the relative order of their
/// members, so a collector emitting several subtypes yields one ranked list
/// per subtype.
pub fn group_by_source(lists: Vec<Vec<SearchResult>>) -> Vec<(String, Vec<SearchResult>)> {
    let mut groups: Vec<(String, Vec<SearchResult>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for result in lists.into_iter().flatten() {
        let slot = *index.entry(result.source.clone()).or_insert_with(|| {
            groups.push((result.source.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(result);
    }
    groups
}

/// Fuse ranked lists into one ranking, best first.
///
/// Deterministic for a given input. Ties keep first-seen order.
pub fn fuse(lists: &[(String, Vec<SearchResult>)], weights: &FusionWeights, k: f64) -> Vec<SearchResult> {
    let mut fused: Vec<SearchResult> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (source, results) in lists {
        let weight = weights.weight(source);
        for (i, result) in results.iter().enumerate() {
            let rank = i + 1;
            #[allow(clippy::cast_precision_loss)]
            let contribution = weight * (0.5 + result.raw_score).max(0.0) / (k + rank as f64);
            let slot = *by_id.entry(result.id.clone()).or_insert_with(|| {
                let mut first = result.clone();
                first.fused_score = Some(0.0);
                first.signals.clear();
                first.rerank_score = None;
                fused.push(first);
                fused.len() - 1
            });
            let doc = &mut fused[slot];
            doc.fused_score = Some(doc.fused() + contribution);
            doc.signals.insert(source.clone(), Signal { rank, contribution });
        }
    }

    fused.sort_by(|a, b| b.fused().partial_cmp(&a.fused()).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, source: &str, raw: f64) -> SearchResult {
        SearchResult::new(id, format!("{id} body"), source, raw)
    }

    #[test]
    fn default_table_and_fallback() {
        let w = FusionWeights::default();
        assert!((w.weight("canonical") - 3.5).abs() < f64::EPSILON);
        assert!((w.weight("session") - 3.0).abs() < f64::EPSILON);
        assert!((w.weight("sqlite") - 1.5).abs() < f64::EPSILON);
        assert!((w.weight("never-heard-of-it") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn settings_override_single_entries() {
        let mut settings = FusionSettings::default();
        settings.weights.insert("tags".into(), 9.0);
        settings.fallback_weight = 0.25;
        let w = FusionWeights::from_settings(&settings);
        assert!((w.weight("tags") - 9.0).abs() < f64::EPSILON);
        assert!((w.weight("canonical") - 3.5).abs() < f64::EPSILON);
        assert!((w.weight("mystery") - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn single_list_contribution() {
        let lists = vec![("canonical".to_string(), vec![hit("a", "canonical", 1.0)])];
        let out = fuse(&lists, &FusionWeights::default(), DEFAULT_K);
        let expected = 3.5 * 1.5 / 61.0;
        assert!((out[0].fused() - expected).abs() < 1e-12);
        let signal = out[0].signals["canonical"];
        assert_eq!(signal.rank, 1);
        assert!((signal.contribution - expected).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let lists = vec![
            ("filename".to_string(), vec![hit("x", "filename", 0.5)]),
            ("fallback".to_string(), vec![hit("y", "fallback", 0.5)]),
        ];
        let out = fuse(&lists, &FusionWeights::default(), DEFAULT_K);
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn grouping_splits_subtypes() {
        let groups = group_by_source(vec![
            vec![hit("p1", "protocol", 0.9), hit("s1", "session", 0.8), hit("p2", "protocol", 0.7)],
            vec![hit("t1", "tags", 1.0)],
        ]);
        let shape: Vec<_> = groups.iter().map(|(s, l)| (s.as_str(), l.len())).collect();
        assert_eq!(shape, vec![("protocol", 2), ("session", 1), ("tags", 1)]);
        assert_eq!(groups[0].1[1].id, "p2");
    }
}
