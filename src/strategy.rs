//! Tokenization strategy registry.
//!
//! A static table maps each [`ContentKind`] to the strategies that may be
//! applied to it, most accurate first. Every `(kind, strategy)` pair has a
//! fixed accuracy tag. Lookups are pure and the table is `'static`, so the
//! registry can be read from any number of threads.

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::error::CostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// BPE tokenizer over the full text.
    ExactTokenizer,
    /// `ceil(chars / 4)`.
    CharApproximation,
    /// Tiling formula over image dimensions.
    ResolutionBased,
    /// Exact tokenizer over a leading sample, extrapolated by character count.
    Hybrid,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::ExactTokenizer => write!(f, "exact_tokenizer"),
            Strategy::CharApproximation => write!(f, "char_approximation"),
            Strategy::ResolutionBased => write!(f, "resolution_based"),
            Strategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// How the caller trades accuracy for speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMode {
    /// Highest-accuracy strategy per kind.
    #[default]
    Hybrid,
    /// Character approximation wherever the kind has text.
    Fast,
    /// Exact tokenizer only; kinds without one are rejected.
    Precise,
}

impl std::fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimationMode::Hybrid => write!(f, "hybrid"),
            EstimationMode::Fast => write!(f, "fast"),
            EstimationMode::Precise => write!(f, "precise"),
        }
    }
}

impl std::str::FromStr for EstimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hybrid" | "default" => Ok(EstimationMode::Hybrid),
            "fast" => Ok(EstimationMode::Fast),
            "precise" | "exact" => Ok(EstimationMode::Precise),
            _ => Err(format!("Unknown mode: {s}. Valid: hybrid, fast, precise")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub strategy: Strategy,
    /// Fidelity estimate in percent.
    pub accuracy_tag: u8,
}

const fn entry(strategy: Strategy, accuracy_tag: u8) -> StrategyEntry {
    StrategyEntry {
        strategy,
        accuracy_tag,
    }
}

const PLAIN_TEXT: &[StrategyEntry] = &[
    entry(Strategy::ExactTokenizer, 100),
    entry(Strategy::Hybrid, 95),
    entry(Strategy::CharApproximation, 80),
];

const DOCUMENT_TEXT: &[StrategyEntry] = &[
    entry(Strategy::ExactTokenizer, 95),
    entry(Strategy::Hybrid, 90),
    entry(Strategy::CharApproximation, 80),
];

const TABULAR: &[StrategyEntry] = &[
    entry(Strategy::CharApproximation, 90),
    entry(Strategy::ExactTokenizer, 85),
];

const IMAGE: &[StrategyEntry] = &[entry(Strategy::ResolutionBased, 85)];

const SOURCE_CODE: &[StrategyEntry] = &[
    entry(Strategy::ExactTokenizer, 95),
    entry(Strategy::Hybrid, 90),
    entry(Strategy::CharApproximation, 75),
];

/// Strategies eligible for `kind`, most accurate first. The first entry is
/// the kind's default.
pub fn eligible(kind: ContentKind) -> &'static [StrategyEntry] {
    match kind {
        ContentKind::PlainText => PLAIN_TEXT,
        ContentKind::DocumentText => DOCUMENT_TEXT,
        ContentKind::Tabular => TABULAR,
        ContentKind::Image => IMAGE,
        ContentKind::SourceCode => SOURCE_CODE,
    }
}

/// The entry for a specific `(kind, strategy)` pair, if legal.
pub fn entry_for(kind: ContentKind, strategy: Strategy) -> Option<StrategyEntry> {
    eligible(kind).iter().copied().find(|e| e.strategy == strategy)
}

/// The kind's default (highest-accuracy) entry.
pub fn default_entry(kind: ContentKind) -> StrategyEntry {
    // every table above is non-empty
    eligible(kind)[0]
}

/// Pick the strategy `mode` requires for `kind`.
///
/// Fast mode has no character approximation for images; they keep the
/// resolution-based strategy, which is already constant-time.
pub fn select(kind: ContentKind, mode: EstimationMode) -> Result<StrategyEntry, CostError> {
    match mode {
        EstimationMode::Hybrid => Ok(default_entry(kind)),
        EstimationMode::Fast => Ok(entry_for(kind, Strategy::CharApproximation)
            .unwrap_or_else(|| default_entry(kind))),
        EstimationMode::Precise => entry_for(kind, Strategy::ExactTokenizer)
            .ok_or(CostError::UnsupportedStrategy { kind, mode }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_defaults_match_table() {
        let expected = [
            (ContentKind::PlainText, Strategy::ExactTokenizer, 100),
            (ContentKind::DocumentText, Strategy::ExactTokenizer, 95),
            (ContentKind::Tabular, Strategy::CharApproximation, 90),
            (ContentKind::Image, Strategy::ResolutionBased, 85),
            (ContentKind::SourceCode, Strategy::ExactTokenizer, 95),
        ];
        for (kind, strategy, tag) in expected {
            let e = select(kind, EstimationMode::Hybrid).unwrap();
            assert_eq!(e.strategy, strategy, "{kind}");
            assert_eq!(e.accuracy_tag, tag, "{kind}");
        }
    }

    #[test]
    fn test_eligible_sorted_by_accuracy() {
        for kind in ContentKind::ALL {
            let tags: Vec<u8> = eligible(kind).iter().map(|e| e.accuracy_tag).collect();
            let mut sorted = tags.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            assert_eq!(tags, sorted, "{kind}");
        }
    }

    #[test]
    fn test_fast_forces_char_approximation() {
        for kind in [
            ContentKind::PlainText,
            ContentKind::DocumentText,
            ContentKind::Tabular,
            ContentKind::SourceCode,
        ] {
            let e = select(kind, EstimationMode::Fast).unwrap();
            assert_eq!(e.strategy, Strategy::CharApproximation);
        }
    }

    #[test]
    fn test_fast_image_keeps_resolution_based() {
        let e = select(ContentKind::Image, EstimationMode::Fast).unwrap();
        assert_eq!(e.strategy, Strategy::ResolutionBased);
    }

    #[test]
    fn test_precise_plain_text_is_exact_100() {
        let e = select(ContentKind::PlainText, EstimationMode::Precise).unwrap();
        assert_eq!(e.strategy, Strategy::ExactTokenizer);
        assert_eq!(e.accuracy_tag, 100);
    }

    #[test]
    fn test_precise_tabular_is_legal() {
        let e = select(ContentKind::Tabular, EstimationMode::Precise).unwrap();
        assert_eq!(e.strategy, Strategy::ExactTokenizer);
    }

    #[test]
    fn test_precise_image_is_unsupported() {
        let err = select(ContentKind::Image, EstimationMode::Precise).unwrap_err();
        assert!(matches!(
            err,
            CostError::UnsupportedStrategy {
                kind: ContentKind::Image,
                mode: EstimationMode::Precise
            }
        ));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("fast".parse::<EstimationMode>().unwrap(), EstimationMode::Fast);
        assert_eq!("exact".parse::<EstimationMode>().unwrap(), EstimationMode::Precise);
        assert!("slow".parse::<EstimationMode>().is_err());
    }
}
