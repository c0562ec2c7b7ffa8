//! One-call analysis: estimate a batch, aggregate it and compare models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::{self, CostProjection, DiscountPolicy, ModelOmission, ProjectionOptions};
use crate::content::ContentUnit;
use crate::error::{CostError, ReasonCode};
use crate::estimate::{self, AggregatedEstimate, Estimator, UnitOutcome};
use crate::pricing::{Capability, ModelRef, PricingRegistry};
use crate::strategy::EstimationMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub units: Vec<ContentUnit>,
    #[serde(default)]
    pub mode: EstimationMode,
    /// Falls back to the analyzer default when absent.
    #[serde(default)]
    pub output_token_ratio: Option<f64>,
    /// Empty means every model currently in the registry.
    #[serde(default)]
    pub selected_models: Vec<ModelRef>,
    /// Models without all of these are excluded as `missing_capability`.
    #[serde(default)]
    pub required_capabilities: Vec<Capability>,
    /// Overrides every provider's configured discount rate.
    #[serde(default)]
    pub batch_discount_rate: Option<f64>,
    #[serde(default)]
    pub priced_at: Option<DateTime<Utc>>,
}

/// Token estimates for a batch, without pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateReport {
    pub mode: EstimationMode,
    pub tokenizer: String,
    pub aggregate: AggregatedEstimate,
    pub estimates: Vec<UnitOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: EstimationMode,
    pub tokenizer: String,
    pub output_token_ratio: f64,
    pub priced_at: DateTime<Utc>,
    pub aggregate: AggregatedEstimate,
    pub estimates: Vec<UnitOutcome>,
    pub ranked: Vec<CostProjection>,
    pub excluded_models: Vec<ModelOmission>,
}

impl AnalysisReport {
    pub fn cheapest(&self) -> Option<&CostProjection> {
        self.ranked.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerDefaults {
    pub output_token_ratio: f64,
    pub discount: DiscountPolicy,
}

impl Default for AnalyzerDefaults {
    fn default() -> Self {
        Self {
            output_token_ratio: compare::DEFAULT_OUTPUT_RATIO,
            discount: DiscountPolicy::default(),
        }
    }
}

pub struct Analyzer {
    estimator: Estimator,
    registry: PricingRegistry,
    defaults: AnalyzerDefaults,
}

impl Analyzer {
    pub fn new(estimator: Estimator, registry: PricingRegistry, defaults: AnalyzerDefaults) -> Self {
        Self {
            estimator,
            registry,
            defaults,
        }
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn registry(&self) -> &PricingRegistry {
        &self.registry
    }

    /// Estimate and aggregate without pricing anything.
    pub fn estimate(
        &self,
        units: &[ContentUnit],
        mode: EstimationMode,
    ) -> Result<EstimateReport, CostError> {
        let estimates = self.estimator.estimate_batch(units, mode)?;
        let aggregate = estimate::aggregate(&estimates);
        tracing::info!(
            units = units.len(),
            files = aggregate.per_file_breakdown.len(),
            tokens = aggregate.total_input_tokens,
            "estimated batch"
        );
        Ok(EstimateReport {
            mode,
            tokenizer: self.estimator.tokenizer_name().to_string(),
            aggregate,
            estimates,
        })
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, CostError> {
        let options = self.projection_options(request)?;

        let EstimateReport {
            tokenizer,
            aggregate,
            estimates,
            ..
        } = self.estimate(&request.units, request.mode)?;

        let at = options.priced_at.unwrap_or_else(Utc::now);
        let (models, mut excluded_models) = self.select_models(request, at);

        let comparison = compare::compare(&aggregate, &self.registry, &models, &options)?;
        excluded_models.extend(comparison.excluded);

        Ok(AnalysisReport {
            mode: request.mode,
            tokenizer,
            output_token_ratio: comparison.output_token_ratio,
            priced_at: comparison.priced_at,
            aggregate,
            estimates,
            ranked: comparison.ranked,
            excluded_models,
        })
    }

    /// Pick the models to compare. An empty selection means every model
    /// priced at `at` with the required capabilities. An explicit selection
    /// keeps unpriced models so the comparison can record them, and turns
    /// priced models lacking a capability into omissions.
    fn select_models(
        &self,
        request: &AnalysisRequest,
        at: DateTime<Utc>,
    ) -> (Vec<ModelRef>, Vec<ModelOmission>) {
        let required = &request.required_capabilities;
        if request.selected_models.is_empty() {
            let models = self
                .registry
                .list_models_at(at, required)
                .into_iter()
                .map(|r| r.model_ref())
                .collect();
            return (models, Vec::new());
        }

        let mut models = Vec::new();
        let mut omitted = Vec::new();
        for model in &request.selected_models {
            match self.registry.lookup(&model.provider_id, &model.model_id, at) {
                Ok(record) if !record.has_capabilities(required) => {
                    let missing: Vec<String> = required
                        .iter()
                        .filter(|c| !record.capabilities.contains(c))
                        .map(|c| c.to_string())
                        .collect();
                    tracing::warn!(
                        provider = %model.provider_id,
                        model = %model.model_id,
                        "excluding model without required capabilities"
                    );
                    omitted.push(ModelOmission {
                        provider_id: model.provider_id.clone(),
                        model_id: model.model_id.clone(),
                        reason: ReasonCode::MissingCapability,
                        detail: format!("lacks capability {}", missing.join(", ")),
                    });
                }
                _ => models.push(model.clone()),
            }
        }
        (models, omitted)
    }

    /// Resolve request overrides against the defaults and validate them
    /// before any unit is estimated.
    fn projection_options(&self, request: &AnalysisRequest) -> Result<ProjectionOptions, CostError> {
        let output_token_ratio = compare::validate_ratio(
            request
                .output_token_ratio
                .unwrap_or(self.defaults.output_token_ratio),
        )?;
        let discount = match request.batch_discount_rate {
            Some(rate) => DiscountPolicy::flat(compare::validate_discount_rate(rate)?),
            None => self.defaults.discount.clone(),
        };
        discount.validate()?;
        Ok(ProjectionOptions {
            output_token_ratio,
            discount,
            priced_at: Some(request.priced_at.unwrap_or_else(Utc::now)),
        })
    }
}
