//! Cost comparison engine.
//!
//! Turns an [`AggregatedEstimate`] plus price records into per-model cost
//! projections and ranks them. Everything here is arithmetic over immutable
//! inputs; `compare` projects every requested model before the single final
//! sort, so ranking never sees a partial set.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CostError, ReasonCode};
use crate::estimate::AggregatedEstimate;
use crate::pricing::{ModelPriceRecord, ModelRef, PricingRegistry};

/// Output/input token ratio used when the caller gives none.
pub const DEFAULT_OUTPUT_RATIO: f64 = 0.3;

const TOKENS_PER_PRICE_UNIT: f64 = 1000.0;

/// Where batch discount rates come from: one global rate with optional
/// per-provider overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub providers: BTreeMap<String, f64>,
}

impl DiscountPolicy {
    pub fn flat(rate: f64) -> Self {
        Self {
            rate,
            providers: BTreeMap::new(),
        }
    }

    pub fn rate_for(&self, provider_id: &str) -> f64 {
        self.providers.get(provider_id).copied().unwrap_or(self.rate)
    }

    pub fn validate(&self) -> Result<(), CostError> {
        validate_discount_rate(self.rate)?;
        for rate in self.providers.values() {
            validate_discount_rate(*rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDiscount {
    pub rate: f64,
    pub discounted_total: f64,
    pub savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjection {
    pub provider_id: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
    pub input_cost: f64,
    pub output_cost: f64,
    /// `input_cost + output_cost`, always kept for display.
    pub undiscounted_cost: f64,
    /// The figure used for ranking: the discounted total when a batch
    /// discount applies, otherwise `undiscounted_cost`.
    pub total_cost: f64,
    pub context_window_tokens: u64,
    /// Advisory only; the model is still priced.
    pub exceeds_context_window: bool,
    pub long_context_pricing: bool,
    pub batch_discount_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_discount: Option<BatchDiscount>,
    pub price_version_timestamp: DateTime<Utc>,
}

impl CostProjection {
    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(&self.provider_id, &self.model_id)
    }
}

/// A requested model that could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOmission {
    pub provider_id: String,
    pub model_id: String,
    pub reason: ReasonCode,
    pub detail: String,
}

pub fn validate_ratio(ratio: f64) -> Result<f64, CostError> {
    if ratio.is_finite() && ratio >= 0.0 {
        Ok(ratio)
    } else {
        Err(CostError::InvalidRatio(ratio))
    }
}

pub fn validate_discount_rate(rate: f64) -> Result<f64, CostError> {
    if rate.is_finite() && (0.0..1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(CostError::InvalidDiscountRate(rate))
    }
}

/// `round(input_tokens * ratio)`, halves away from zero.
pub fn estimated_output_tokens(input_tokens: u64, ratio: f64) -> u64 {
    (input_tokens as f64 * ratio).round() as u64
}

/// Project the cost of one batch on one model.
pub fn project(
    estimate: &AggregatedEstimate,
    record: &ModelPriceRecord,
    output_token_ratio: f64,
    batch_discount_rate: f64,
) -> Result<CostProjection, CostError> {
    let ratio = validate_ratio(output_token_ratio)?;
    let discount_rate = validate_discount_rate(batch_discount_rate)?;

    let input_tokens = estimate.total_input_tokens;
    let output_tokens = estimated_output_tokens(input_tokens, ratio);

    let long = record
        .long_context
        .filter(|lc| input_tokens > lc.threshold_tokens);
    let (input_price, output_price) = match long {
        Some(lc) => (lc.input_price_per_1k, lc.output_price_per_1k),
        None => (record.input_price_per_1k, record.output_price_per_1k),
    };

    let input_cost = input_tokens as f64 / TOKENS_PER_PRICE_UNIT * input_price;
    let output_cost = output_tokens as f64 / TOKENS_PER_PRICE_UNIT * output_price;
    let undiscounted_cost = input_cost + output_cost;

    let batch_discount = (discount_rate > 0.0).then(|| {
        let discounted_total = undiscounted_cost * (1.0 - discount_rate);
        BatchDiscount {
            rate: discount_rate,
            discounted_total,
            savings: undiscounted_cost - discounted_total,
        }
    });
    let total_cost = batch_discount
        .as_ref()
        .map_or(undiscounted_cost, |d| d.discounted_total);

    let exceeds_context_window =
        input_tokens.saturating_add(output_tokens) > record.context_window_tokens;
    if exceeds_context_window {
        tracing::debug!(
            model = %record.model_ref(),
            tokens = input_tokens + output_tokens,
            window = record.context_window_tokens,
            "request exceeds context window"
        );
    }

    Ok(CostProjection {
        provider_id: record.provider_id.clone(),
        model_id: record.model_id.clone(),
        display_name: record.display_name.clone(),
        input_tokens,
        estimated_output_tokens: output_tokens,
        input_price_per_1k: input_price,
        output_price_per_1k: output_price,
        input_cost,
        output_cost,
        undiscounted_cost,
        total_cost,
        context_window_tokens: record.context_window_tokens,
        exceeds_context_window,
        long_context_pricing: long.is_some(),
        batch_discount_applied: batch_discount.is_some(),
        batch_discount,
        price_version_timestamp: record.price_version_timestamp,
    })
}

/// Sort by total cost ascending, then context window descending, then
/// model id and provider id lexically. Zero costs compare equal regardless
/// of sign.
pub fn rank(mut projections: Vec<CostProjection>) -> Vec<CostProjection> {
    projections.sort_by(|a, b| {
        (a.total_cost + 0.0)
            .total_cmp(&(b.total_cost + 0.0))
            .then_with(|| b.context_window_tokens.cmp(&a.context_window_tokens))
            .then_with(|| a.model_id.cmp(&b.model_id))
            .then_with(|| a.provider_id.cmp(&b.provider_id))
    });
    projections
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOptions {
    pub output_token_ratio: f64,
    pub discount: DiscountPolicy,
    /// Price as of this instant; `None` means now.
    pub priced_at: Option<DateTime<Utc>>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            output_token_ratio: DEFAULT_OUTPUT_RATIO,
            discount: DiscountPolicy::default(),
            priced_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub ranked: Vec<CostProjection>,
    pub excluded: Vec<ModelOmission>,
    pub output_token_ratio: f64,
    pub priced_at: DateTime<Utc>,
}

impl Comparison {
    pub fn cheapest(&self) -> Option<&CostProjection> {
        self.ranked.first()
    }
}

/// Project and rank every requested model.
///
/// Models without a price record are reported in `excluded`; bad ratio or
/// discount inputs fail the whole call before anything is priced.
pub fn compare(
    estimate: &AggregatedEstimate,
    registry: &PricingRegistry,
    models: &[ModelRef],
    options: &ProjectionOptions,
) -> Result<Comparison, CostError> {
    let ratio = validate_ratio(options.output_token_ratio)?;
    options.discount.validate()?;
    let priced_at = options.priced_at.unwrap_or_else(Utc::now);

    let mut seen = HashSet::new();
    let mut projections = Vec::with_capacity(models.len());
    let mut excluded = Vec::new();

    for model in models.iter().filter(|m| seen.insert(*m)) {
        match registry.lookup(&model.provider_id, &model.model_id, priced_at) {
            Ok(record) => {
                let rate = options.discount.rate_for(&record.provider_id);
                projections.push(project(estimate, record, ratio, rate)?);
            }
            Err(e @ CostError::PriceNotFound { .. }) => {
                tracing::warn!(model = %model, "excluding model: {e}");
                excluded.push(ModelOmission {
                    provider_id: model.provider_id.clone(),
                    model_id: model.model_id.clone(),
                    reason: ReasonCode::PriceNotFound,
                    detail: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Comparison {
        ranked: rank(projections),
        excluded,
        output_token_ratio: ratio,
        priced_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::FileTokens;
    use crate::pricing::LongContextPrice;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn batch(tokens: u64) -> AggregatedEstimate {
        AggregatedEstimate {
            total_input_tokens: tokens,
            per_file_breakdown: vec![FileTokens {
                file_id: "f1".into(),
                token_count: tokens,
                estimated_units: 1,
                omitted: Vec::new(),
            }],
            worst_accuracy_tag: Some(100),
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn price(provider: &str, model: &str, input: f64, output: f64, window: u64) -> ModelPriceRecord {
        ModelPriceRecord {
            provider_id: provider.into(),
            model_id: model.into(),
            display_name: None,
            input_price_per_1k: input,
            output_price_per_1k: output,
            context_window_tokens: window,
            capabilities: BTreeSet::new(),
            price_version_timestamp: at(2024, 1, 1),
            long_context: None,
        }
    }

    #[test]
    fn test_project_scenario() {
        let t = 1003;
        let p = project(&batch(t), &price("openai", "m", 0.005, 0.015, 128_000), 0.5, 0.0).unwrap();
        let expected_out = (t as f64 * 0.5).round() as u64;
        assert_eq!(p.estimated_output_tokens, expected_out);
        assert_eq!(p.estimated_output_tokens, 502);
        assert_eq!(p.input_cost, t as f64 / 1000.0 * 0.005);
        assert_eq!(p.output_cost, expected_out as f64 / 1000.0 * 0.015);
        assert_eq!(p.total_cost, p.input_cost + p.output_cost);
        assert_eq!(p.undiscounted_cost, p.total_cost);
        assert!(!p.batch_discount_applied);
        assert!(p.batch_discount.is_none());
        assert!(!p.exceeds_context_window);
    }

    #[test]
    fn test_zero_ratio_total_equals_input_cost() {
        let p = project(&batch(12_345), &price("a", "m", 0.0031, 0.02, 50_000), 0.0, 0.0).unwrap();
        assert_eq!(p.estimated_output_tokens, 0);
        assert_eq!(p.output_cost, 0.0);
        assert_eq!(p.total_cost, p.input_cost);
    }

    #[test]
    fn test_negative_ratio_rejected() {
        let err = project(&batch(10), &price("a", "m", 1.0, 1.0, 100), -0.1, 0.0).unwrap_err();
        assert!(matches!(err, CostError::InvalidRatio(_)));
        assert!(validate_ratio(f64::NAN).is_err());
        assert!(validate_ratio(f64::INFINITY).is_err());
    }

    #[test]
    fn test_discount_rate_bounds() {
        assert!(validate_discount_rate(0.0).is_ok());
        assert!(validate_discount_rate(0.5).is_ok());
        assert!(validate_discount_rate(1.0).is_err());
        assert!(validate_discount_rate(-0.2).is_err());
    }

    #[test]
    fn test_batch_discount_kept_side_by_side() {
        let p = project(&batch(2000), &price("a", "m", 0.01, 0.03, 100_000), 0.5, 0.5).unwrap();
        // 2000 in -> 0.02, 1000 out -> 0.03
        assert!((p.undiscounted_cost - 0.05).abs() < 1e-12);
        let d = p.batch_discount.as_ref().unwrap();
        assert!(p.batch_discount_applied);
        assert_eq!(d.rate, 0.5);
        assert!((d.discounted_total - 0.025).abs() < 1e-12);
        assert!((d.savings - 0.025).abs() < 1e-12);
        assert_eq!(p.total_cost, d.discounted_total);
    }

    #[test]
    fn test_exceeds_context_window_is_advisory() {
        let p = project(&batch(7000), &price("a", "m", 0.01, 0.01, 8000), 0.3, 0.0).unwrap();
        // 7000 + 2100 > 8000
        assert!(p.exceeds_context_window);
        assert!(p.total_cost > 0.0);

        let p = project(&batch(6000), &price("a", "m", 0.01, 0.01, 8000), 0.3, 0.0).unwrap();
        assert!(!p.exceeds_context_window);
    }

    #[test]
    fn test_long_context_prices_over_threshold() {
        let mut record = price("google", "g", 0.001, 0.002, 2_000_000);
        record.long_context = Some(LongContextPrice {
            threshold_tokens: 128_000,
            input_price_per_1k: 0.004,
            output_price_per_1k: 0.008,
        });
        let short = project(&batch(100_000), &record, 0.0, 0.0).unwrap();
        assert!(!short.long_context_pricing);
        assert_eq!(short.input_price_per_1k, 0.001);

        let long = project(&batch(200_000), &record, 0.0, 0.0).unwrap();
        assert!(long.long_context_pricing);
        assert_eq!(long.input_cost, 200_000.0 / 1000.0 * 0.004);
    }

    #[test]
    fn test_rank_equal_cost_prefers_larger_window() {
        let b = batch(1000);
        let small = project(&b, &price("a", "small", 0.01, 0.02, 8000), 0.5, 0.0).unwrap();
        let large = project(&b, &price("a", "large", 0.01, 0.02, 128_000), 0.5, 0.0).unwrap();
        let ranked = rank(vec![small, large]);
        assert_eq!(ranked[0].model_id, "large");
        assert_eq!(ranked[0].context_window_tokens, 128_000);
        assert_eq!(ranked[1].model_id, "small");
    }

    #[test]
    fn test_rank_negative_zero_cost_ties_on_window() {
        let b = batch(1000);
        let mut small = project(&b, &price("a", "small", 0.0, 0.0, 8000), 0.5, 0.0).unwrap();
        small.total_cost = -0.0;
        let large = project(&b, &price("a", "large", 0.0, 0.0, 128_000), 0.5, 0.0).unwrap();
        let ranked = rank(vec![small, large]);
        assert_eq!(ranked[0].model_id, "large");
        assert_eq!(ranked[1].model_id, "small");
    }

    #[test]
    fn test_rank_cost_then_model_id() {
        let b = batch(1000);
        let ranked = rank(vec![
            project(&b, &price("p", "zeta", 0.01, 0.0, 1000), 0.0, 0.0).unwrap(),
            project(&b, &price("p", "alpha", 0.01, 0.0, 1000), 0.0, 0.0).unwrap(),
            project(&b, &price("p", "cheap", 0.001, 0.0, 10), 0.0, 0.0).unwrap(),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|p| p.model_id.as_str()).collect();
        assert_eq!(ids, vec!["cheap", "alpha", "zeta"]);
    }

    #[test]
    fn test_compare_excludes_unknown_models() {
        let mut reg = PricingRegistry::new();
        reg.append(price("openai", "gpt-a", 0.01, 0.03, 128_000)).unwrap();
        reg.append(price("anthropic", "claude-b", 0.003, 0.015, 200_000)).unwrap();

        let models = vec![
            ModelRef::new("openai", "gpt-a"),
            ModelRef::new("nobody", "ghost"),
            ModelRef::new("anthropic", "claude-b"),
        ];
        let cmp = compare(&batch(5000), &reg, &models, &ProjectionOptions::default()).unwrap();
        assert_eq!(cmp.ranked.len(), 2);
        assert_eq!(cmp.ranked[0].model_id, "claude-b");
        assert_eq!(cmp.excluded.len(), 1);
        assert_eq!(cmp.excluded[0].model_id, "ghost");
        assert_eq!(cmp.excluded[0].reason, ReasonCode::PriceNotFound);
        assert_eq!(cmp.cheapest().unwrap().model_id, "claude-b");
    }

    #[test]
    fn test_compare_rejects_bad_ratio_before_pricing() {
        let reg = PricingRegistry::new();
        let options = ProjectionOptions {
            output_token_ratio: -1.0,
            ..ProjectionOptions::default()
        };
        let err = compare(&batch(1), &reg, &[ModelRef::new("a", "b")], &options).unwrap_err();
        assert!(matches!(err, CostError::InvalidRatio(_)));
    }

    #[test]
    fn test_compare_per_provider_discount() {
        let mut reg = PricingRegistry::new();
        reg.append(price("openai", "a", 0.01, 0.0, 1000)).unwrap();
        reg.append(price("google", "b", 0.01, 0.0, 1000)).unwrap();
        let mut discount = DiscountPolicy::flat(0.0);
        discount.providers.insert("openai".into(), 0.5);
        let options = ProjectionOptions {
            output_token_ratio: 0.0,
            discount,
            priced_at: Some(at(2025, 1, 1)),
        };
        let models = [ModelRef::new("google", "b"), ModelRef::new("openai", "a")];
        let cmp = compare(&batch(1000), &reg, &models, &options).unwrap();
        assert_eq!(cmp.ranked[0].provider_id, "openai");
        assert!(cmp.ranked[0].batch_discount_applied);
        assert!(!cmp.ranked[1].batch_discount_applied);
        assert_eq!(cmp.priced_at, at(2025, 1, 1));
    }

    #[test]
    fn test_compare_uses_point_in_time_price() {
        let mut reg = PricingRegistry::new();
        reg.append(price("a", "m", 0.01, 0.0, 1000)).unwrap();
        let mut newer = price("a", "m", 0.02, 0.0, 1000);
        newer.price_version_timestamp = at(2024, 6, 1);
        reg.append(newer).unwrap();

        let options = ProjectionOptions {
            output_token_ratio: 0.0,
            priced_at: Some(at(2024, 3, 1)),
            ..ProjectionOptions::default()
        };
        let cmp = compare(&batch(1000), &reg, &[ModelRef::new("a", "m")], &options).unwrap();
        assert_eq!(cmp.ranked[0].input_price_per_1k, 0.01);
    }

    #[test]
    fn test_compare_ignores_duplicate_requests() {
        let mut reg = PricingRegistry::new();
        reg.append(price("a", "m", 0.01, 0.0, 1000)).unwrap();
        let m = ModelRef::new("a", "m");
        let cmp = compare(&batch(10), &reg, &[m.clone(), m], &ProjectionOptions::default()).unwrap();
        assert_eq!(cmp.ranked.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_rank_ignores_input_order(
            specs in prop::collection::vec((0u32..5, 1u64..4, 0usize..6), 1..12),
            rotate in 0usize..12,
        ) {
            let b = batch(1000);
            let projections: Vec<CostProjection> = specs
                .iter()
                .enumerate()
                .map(|(i, (cost, window, name))| {
                    let record = price(
                        &format!("p{i}"),
                        &format!("m{name}"),
                        f64::from(*cost) / 100.0,
                        0.0,
                        window * 1000,
                    );
                    project(&b, &record, 0.0, 0.0).unwrap()
                })
                .collect();
            let mut reordered = projections.clone();
            let len = reordered.len();
            reordered.rotate_left(rotate % len);
            reordered.reverse();
            prop_assert_eq!(rank(projections), rank(reordered));
        }
    }
}
