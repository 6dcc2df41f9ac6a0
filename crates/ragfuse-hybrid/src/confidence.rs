use serde::Serialize;

use ragfuse_core::config::ConfidenceSettings;
use ragfuse_core::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    #[serde(rename = "MED")]
    Medium,
    Low,
}

impl Confidence {
    pub fn badge(self) -> &'static str {
        match self {
            Self::High => "[HIGH]",
            Self::Medium => "[MED]",
            Self::Low => "[LOW]",
        }
    }
}

/// Fused-score bands. Anything under `medium` is LOW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self::from_settings(&ConfidenceSettings::default())
    }
}

impl ConfidenceThresholds {
    pub fn from_settings(settings: &ConfidenceSettings) -> Self {
        Self { high: settings.high, medium: settings.medium }
    }

    pub fn classify(&self, fused_score: f64) -> Confidence {
        if fused_score >= self.high {
            Confidence::High
        } else if fused_score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn of(&self, result: &SearchResult) -> Confidence {
        self.classify(result.fused())
    }

    /// Drop everything below MED when `strict`; returns the kept results and
    /// how many were removed. Non-strict calls pass the list through.
    pub fn apply(&self, results: Vec<SearchResult>, strict: bool) -> (Vec<SearchResult>, usize) {
        if !strict {
            return (results, 0);
        }
        let total = results.len();
        let kept: Vec<SearchResult> = results.into_iter().filter(|r| r.fused() >= self.medium).collect();
        let suppressed = total - kept.len();
        (kept, suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, fused: f64) -> SearchResult {
        let mut r = SearchResult::new(id, "", "canonical", 0.0);
        r.fused_score = Some(fused);
        r
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.classify(0.03), Confidence::High);
        assert_eq!(t.classify(0.0299), Confidence::Medium);
        assert_eq!(t.classify(0.02), Confidence::Medium);
        assert_eq!(t.classify(0.0199), Confidence::Low);
        assert_eq!(t.classify(0.0), Confidence::Low);
    }

    #[test]
    fn strict_keeps_order_and_counts_removed() {
        let t = ConfidenceThresholds::default();
        let list = vec![scored("a", 0.06), scored("b", 0.01), scored("c", 0.025), scored("d", 0.019)];
        let (kept, suppressed) = t.apply(list.clone(), true);
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(suppressed, 2);

        let (all, none) = t.apply(list, false);
        assert_eq!(all.len(), 4);
        assert_eq!(none, 0);
    }

    #[test]
    fn serializes_as_badge_word() {
        let json = serde_json::to_string(&[Confidence::High, Confidence::Medium, Confidence::Low]).unwrap_or_default();
        assert_eq!(json, r#"["HIGH","MED","LOW"]"#);
    }
}
