//! Token estimation engine.
//!
//! # Pipeline
//!
//! 1. **Validate** the unit: textual kinds need a text payload, images need
//!    positive dimensions. Failures are local to the unit.
//! 2. **Select** a strategy from the registry for `(kind, mode)`.
//! 3. **Apply** it: exact BPE count, `ceil(chars / 4)`, the image tiling
//!    function, or a sampled exact count extrapolated over the full text.
//!
//! Every step is a pure function of the unit, the mode and the engine's
//! immutable collaborators, so units can be estimated on any number of
//! threads. Batch results are always returned in input order.
//!
//! # Partial failure
//!
//! `estimate` reports every problem as an error. `estimate_outcome` and
//! `estimate_batch` turn per-unit problems into [`UnitOmission`] records so
//! the batch keeps going; only an unsupported strategy without a configured
//! fallback aborts the batch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::content::{ContentKind, ContentUnit, Payload};
use crate::error::{CostError, ReasonCode};
use crate::strategy::{self, EstimationMode, Strategy, StrategyEntry};
use crate::tiling::ImageTiling;
use crate::tokenizer::ExactTokenizer;

/// Average English characters per token for the approximation strategy.
pub const CHARS_PER_TOKEN: usize = 4;

/// `ceil(character_count / 4)`.
pub fn char_approximation(character_count: usize) -> u64 {
    character_count.div_ceil(CHARS_PER_TOKEN) as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub content_unit_id: String,
    pub origin_file_id: String,
    pub kind: ContentKind,
    pub token_count: u64,
    pub strategy_used: Strategy,
    pub accuracy_tag: u8,
    /// The requested mode had no strategy for this kind and the kind's
    /// default was used instead.
    #[serde(default)]
    pub fallback: bool,
}

/// A unit excluded from the totals, with the reason it was excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOmission {
    pub content_unit_id: String,
    pub origin_file_id: String,
    pub reason: ReasonCode,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Estimated(TokenEstimate),
    Omitted(UnitOmission),
}

impl UnitOutcome {
    pub fn origin_file_id(&self) -> &str {
        match self {
            UnitOutcome::Estimated(e) => &e.origin_file_id,
            UnitOutcome::Omitted(o) => &o.origin_file_id,
        }
    }

    pub fn estimate(&self) -> Option<&TokenEstimate> {
        match self {
            UnitOutcome::Estimated(e) => Some(e),
            UnitOutcome::Omitted(_) => None,
        }
    }
}

impl From<TokenEstimate> for UnitOutcome {
    fn from(e: TokenEstimate) -> Self {
        UnitOutcome::Estimated(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorSettings {
    /// Use the kind's default strategy when the mode has none, instead of
    /// aborting the batch.
    #[serde(default = "default_true")]
    pub fallback_on_unsupported: bool,
    /// In hybrid mode, texts longer than this many characters are sampled
    /// rather than tokenized in full.
    #[serde(default)]
    pub hybrid_sample_chars: Option<usize>,
    /// Worker threads for batch estimation.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            fallback_on_unsupported: true,
            hybrid_sample_chars: None,
            workers: 1,
        }
    }
}

pub struct Estimator {
    tokenizer: Arc<dyn ExactTokenizer>,
    tiling: Arc<dyn ImageTiling>,
    settings: EstimatorSettings,
}

impl Estimator {
    pub fn new(
        tokenizer: Arc<dyn ExactTokenizer>,
        tiling: Arc<dyn ImageTiling>,
        settings: EstimatorSettings,
    ) -> Self {
        Self {
            tokenizer,
            tiling,
            settings,
        }
    }

    pub fn settings(&self) -> &EstimatorSettings {
        &self.settings
    }

    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    /// Estimate one unit under `mode`.
    pub fn estimate(
        &self,
        unit: &ContentUnit,
        mode: EstimationMode,
    ) -> Result<TokenEstimate, CostError> {
        let payload = validate_unit(unit)?;
        let entry = strategy::select(unit.kind, mode)?;
        Ok(self.apply(unit, payload, entry, mode, false))
    }

    /// Estimate one unit, converting per-unit failures into an omission.
    ///
    /// Returns `Err` only for an unsupported strategy when fallback is off.
    pub fn estimate_outcome(
        &self,
        unit: &ContentUnit,
        mode: EstimationMode,
    ) -> Result<UnitOutcome, CostError> {
        match self.estimate(unit, mode) {
            Ok(e) => Ok(UnitOutcome::Estimated(e)),
            Err(CostError::InvalidContentUnit {
                unit_id,
                reason,
                detail,
            }) => {
                tracing::warn!(unit = %unit_id, %reason, "excluding content unit: {detail}");
                Ok(UnitOutcome::Omitted(UnitOmission {
                    content_unit_id: unit_id,
                    origin_file_id: unit.origin_file_id.clone(),
                    reason,
                    detail,
                }))
            }
            Err(CostError::UnsupportedStrategy { kind, mode }) => {
                if !self.settings.fallback_on_unsupported {
                    return Err(CostError::UnsupportedStrategy { kind, mode });
                }
                // estimate() validated the unit before selecting a strategy
                let payload = validate_unit(unit)?;
                let entry = strategy::default_entry(kind);
                tracing::warn!(
                    unit = %unit.id,
                    %kind,
                    %mode,
                    fallback = %entry.strategy,
                    "mode has no strategy for kind, falling back"
                );
                Ok(UnitOutcome::Estimated(self.apply(unit, payload, entry, mode, true)))
            }
            Err(other) => Err(other),
        }
    }

    /// Estimate every unit, returning outcomes in input order.
    ///
    /// With `workers > 1` the units are split across scoped threads; results
    /// are re-sorted by original index before returning, and the first error
    /// in input order wins.
    pub fn estimate_batch(
        &self,
        units: &[ContentUnit],
        mode: EstimationMode,
    ) -> Result<Vec<UnitOutcome>, CostError> {
        let workers = self.settings.workers.max(1).min(units.len().max(1));
        if workers == 1 {
            return units
                .iter()
                .map(|u| self.estimate_outcome(u, mode))
                .collect();
        }

        let chunk_size = units.len().div_ceil(workers);
        let mut indexed: Vec<(usize, Result<UnitOutcome, CostError>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = units
                    .chunks(chunk_size)
                    .enumerate()
                    .map(|(chunk_idx, chunk)| {
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .enumerate()
                                .map(|(i, u)| {
                                    (chunk_idx * chunk_size + i, self.estimate_outcome(u, mode))
                                })
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|h| match h.join() {
                        Ok(results) => results,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            });

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }

    fn apply(
        &self,
        unit: &ContentUnit,
        payload: &Payload,
        entry: StrategyEntry,
        mode: EstimationMode,
        fallback: bool,
    ) -> TokenEstimate {
        let (strategy_used, accuracy_tag, token_count) = match (payload, entry.strategy) {
            (Payload::Image(img), _) => {
                (Strategy::ResolutionBased, entry.accuracy_tag, self.tiling.tokens(img))
            }
            (Payload::Text { text }, Strategy::ExactTokenizer) => {
                let sample = match (mode, self.settings.hybrid_sample_chars) {
                    (EstimationMode::Hybrid, Some(limit)) if limit > 0 => {
                        strategy::entry_for(unit.kind, Strategy::Hybrid)
                            .filter(|_| text.chars().nth(limit).is_some())
                            .map(|hybrid| (hybrid, limit))
                    }
                    _ => None,
                };
                match sample {
                    Some((hybrid, limit)) => (
                        Strategy::Hybrid,
                        hybrid.accuracy_tag,
                        self.sampled_count(text, limit),
                    ),
                    None => (entry.strategy, entry.accuracy_tag, self.exact_count(text)),
                }
            }
            (Payload::Text { text }, Strategy::Hybrid) => {
                let count = match self.settings.hybrid_sample_chars {
                    Some(limit) if limit > 0 => self.sampled_count(text, limit),
                    _ => self.exact_count(text),
                };
                (Strategy::Hybrid, entry.accuracy_tag, count)
            }
            // resolution_based is never offered for a textual kind
            (Payload::Text { text }, Strategy::CharApproximation | Strategy::ResolutionBased) => (
                Strategy::CharApproximation,
                entry.accuracy_tag,
                char_approximation(text.chars().count()),
            ),
        };

        tracing::debug!(
            unit = %unit.id,
            kind = %unit.kind,
            strategy = %strategy_used,
            tokens = token_count,
            "estimated content unit"
        );

        TokenEstimate {
            content_unit_id: unit.id.clone(),
            origin_file_id: unit.origin_file_id.clone(),
            kind: unit.kind,
            token_count,
            strategy_used,
            accuracy_tag,
            fallback,
        }
    }

    fn exact_count(&self, text: &str) -> u64 {
        self.tokenizer.count(text) as u64
    }

    /// Tokenize the first `limit` characters exactly and scale the result by
    /// the full character count, rounding up.
    fn sampled_count(&self, text: &str, limit: usize) -> u64 {
        let total_chars = text.chars().count();
        if total_chars <= limit {
            return self.exact_count(text);
        }
        let cut = text
            .char_indices()
            .nth(limit)
            .map_or(text.len(), |(idx, _)| idx);
        let sample_tokens = self.tokenizer.count(&text[..cut]) as u128;
        let scaled = (sample_tokens * total_chars as u128).div_ceil(limit as u128);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

/// Check the payload requirements for the unit's kind and return the payload.
pub fn validate_unit(unit: &ContentUnit) -> Result<&Payload, CostError> {
    let invalid = |reason: ReasonCode, detail: String| CostError::InvalidContentUnit {
        unit_id: unit.id.clone(),
        reason,
        detail,
    };

    match (&unit.payload, unit.kind) {
        (None, kind) => Err(invalid(
            ReasonCode::MissingPayload,
            format!("{kind} unit has no extracted payload"),
        )),
        (Some(Payload::Image(_)), kind) if kind.is_textual() => Err(invalid(
            ReasonCode::PayloadKindMismatch,
            format!("{kind} unit carries an image payload"),
        )),
        (Some(Payload::Text { .. }), ContentKind::Image) => Err(invalid(
            ReasonCode::PayloadKindMismatch,
            "image unit carries a text payload".into(),
        )),
        (Some(Payload::Image(img)), ContentKind::Image) if img.width == 0 || img.height == 0 => {
            Err(invalid(
                ReasonCode::InvalidImageDimensions,
                format!("image dimensions {}x{} must be positive", img.width, img.height),
            ))
        }
        (Some(payload), _) => Ok(payload),
    }
}

/// Token total for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTokens {
    pub file_id: String,
    pub token_count: u64,
    pub estimated_units: usize,
    /// Units of this file excluded from the count.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<UnitOmission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedEstimate {
    pub total_input_tokens: u64,
    /// One entry per file, in upload order.
    pub per_file_breakdown: Vec<FileTokens>,
    /// Lowest accuracy tag among contributing estimates; `None` when nothing
    /// was estimated.
    pub worst_accuracy_tag: Option<u8>,
}

impl AggregatedEstimate {
    pub fn omitted_units(&self) -> impl Iterator<Item = &UnitOmission> {
        self.per_file_breakdown.iter().flat_map(|f| f.omitted.iter())
    }
}

/// Fold outcomes into per-file totals.
///
/// Files appear in the order their first unit appears in `outcomes`; the
/// fold itself is a plain sum and min, so the totals do not depend on
/// the order units were processed in.
pub fn aggregate(outcomes: &[UnitOutcome]) -> AggregatedEstimate {
    let mut files: Vec<FileTokens> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut total: u64 = 0;
    let mut worst: Option<u8> = None;

    for outcome in outcomes {
        let file_id = outcome.origin_file_id();
        let slot = *index.entry(file_id).or_insert_with(|| {
            files.push(FileTokens {
                file_id: file_id.to_string(),
                token_count: 0,
                estimated_units: 0,
                omitted: Vec::new(),
            });
            files.len() - 1
        });
        let file = &mut files[slot];

        match outcome {
            UnitOutcome::Estimated(e) => {
                file.token_count = file.token_count.saturating_add(e.token_count);
                file.estimated_units += 1;
                total = total.saturating_add(e.token_count);
                worst = Some(worst.map_or(e.accuracy_tag, |w| w.min(e.accuracy_tag)));
            }
            UnitOutcome::Omitted(o) => file.omitted.push(o.clone()),
        }
    }

    AggregatedEstimate {
        total_input_tokens: total,
        per_file_breakdown: files,
        worst_accuracy_tag: worst,
    }
}
