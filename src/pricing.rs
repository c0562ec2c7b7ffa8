//! Versioned per-model price records and point-in-time lookup.
//!
//! Records are keyed by `(provider, model)` and never mutated: a price
//! change is appended as a new record with a later `price_version_timestamp`,
//! which keeps the full history available for trend queries. Prices are USD
//! per 1,000 tokens.
//!
//! The registry is filled from a TOML price file (`pricing_file` in config)
//! or from the built-in table below. Refreshing that file is someone else's
//! job; the registry only reads what it was given.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vision,
    FunctionCalling,
    Search,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Vision => write!(f, "vision"),
            Capability::FunctionCalling => write!(f, "function_calling"),
            Capability::Search => write!(f, "search"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vision" => Ok(Capability::Vision),
            "function_calling" | "functions" | "tools" => Ok(Capability::FunctionCalling),
            "search" | "online_search" => Ok(Capability::Search),
            _ => Err(format!(
                "Unknown capability: {s}. Valid: vision, function_calling, search"
            )),
        }
    }
}

/// Alternate prices once the input crosses a length threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongContextPrice {
    pub threshold_tokens: u64,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPriceRecord {
    pub provider_id: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
    pub context_window_tokens: u64,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub price_version_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_context: Option<LongContextPrice>,
}

impl ModelPriceRecord {
    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(&self.provider_id, &self.model_id)
    }

    pub fn has_capabilities(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.capabilities.contains(c))
    }

    pub fn validate(&self) -> Result<(), CostError> {
        let invalid = |detail: &str| CostError::InvalidPriceRecord {
            provider_id: self.provider_id.clone(),
            model_id: self.model_id.clone(),
            detail: detail.to_string(),
        };
        if self.provider_id.is_empty() || self.model_id.is_empty() {
            return Err(invalid("provider_id and model_id must be non-empty"));
        }
        if !is_price(self.input_price_per_1k) || !is_price(self.output_price_per_1k) {
            return Err(invalid("prices must be finite and non-negative"));
        }
        if self.context_window_tokens == 0 {
            return Err(invalid("context_window_tokens must be positive"));
        }
        if let Some(long) = &self.long_context {
            if !is_price(long.input_price_per_1k) || !is_price(long.output_price_per_1k) {
                return Err(invalid("long_context prices must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

fn is_price(p: f64) -> bool {
    p.is_finite() && p.is_sign_positive()
}

/// `provider:model` pair naming one priced model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider_id: String,
    pub model_id: String,
}

impl ModelRef {
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.model_id)
    }
}

impl std::str::FromStr for ModelRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((p, m)) if !p.is_empty() && !m.is_empty() => Ok(ModelRef::new(p, m)),
            _ => Err(format!("Invalid model reference: {s}. Expected provider:model")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceFile {
    #[serde(default)]
    models: Vec<ModelPriceRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct PricingRegistry {
    /// Versions per model, sorted by timestamp ascending.
    records: BTreeMap<ModelRef, Vec<ModelPriceRecord>>,
}

impl PricingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price version. Existing versions are never touched.
    pub fn append(&mut self, record: ModelPriceRecord) -> Result<(), CostError> {
        record.validate()?;
        let versions = self.records.entry(record.model_ref()).or_default();
        let at = record.price_version_timestamp;
        match versions.binary_search_by(|r| r.price_version_timestamp.cmp(&at)) {
            Ok(_) => Err(CostError::DuplicatePriceVersion {
                provider_id: record.provider_id,
                model_id: record.model_id,
                timestamp: at.to_rfc3339(),
            }),
            Err(pos) => {
                versions.insert(pos, record);
                Ok(())
            }
        }
    }

    /// Latest record with `price_version_timestamp <= at`.
    pub fn lookup(
        &self,
        provider_id: &str,
        model_id: &str,
        at: DateTime<Utc>,
    ) -> Result<&ModelPriceRecord, CostError> {
        self.records
            .get(&ModelRef::new(provider_id, model_id))
            .and_then(|versions| {
                versions
                    .iter()
                    .rev()
                    .find(|r| r.price_version_timestamp <= at)
            })
            .ok_or_else(|| CostError::PriceNotFound {
                provider_id: provider_id.to_string(),
                model_id: model_id.to_string(),
            })
    }

    pub fn lookup_current(
        &self,
        provider_id: &str,
        model_id: &str,
    ) -> Result<&ModelPriceRecord, CostError> {
        self.lookup(provider_id, model_id, Utc::now())
    }

    /// Current record per model, optionally restricted to models having
    /// every capability in `required`. Ordered by provider then model.
    pub fn list_models(&self, required: &[Capability]) -> Vec<&ModelPriceRecord> {
        self.list_models_at(Utc::now(), required)
    }

    pub fn list_models_at(
        &self,
        at: DateTime<Utc>,
        required: &[Capability],
    ) -> Vec<&ModelPriceRecord> {
        self.records
            .values()
            .filter_map(|versions| {
                versions
                    .iter()
                    .rev()
                    .find(|r| r.price_version_timestamp <= at)
            })
            .filter(|r| r.has_capabilities(required))
            .collect()
    }

    /// Every version for a model, oldest first. Empty when unknown.
    pub fn history(&self, provider_id: &str, model_id: &str) -> &[ModelPriceRecord] {
        self.records
            .get(&ModelRef::new(provider_id, model_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve `provider:model`, or a bare model id when exactly one provider
    /// prices it.
    pub fn resolve(&self, name: &str) -> Result<ModelRef, CostError> {
        if let Ok(model_ref) = name.parse::<ModelRef>() {
            return Ok(model_ref);
        }
        let matches: Vec<&ModelRef> = self
            .records
            .keys()
            .filter(|k| k.model_id.eq_ignore_ascii_case(name))
            .collect();
        match matches.as_slice() {
            [only] => Ok((*only).clone()),
            [] => Err(CostError::PriceNotFound {
                provider_id: "*".into(),
                model_id: name.to_string(),
            }),
            many => Err(CostError::Other(format!(
                "Ambiguous model {name}: {}",
                many.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Resolve every requested name. Names with no price record are kept as
    /// `*:<name>` so the comparison reports them as excluded; only an
    /// ambiguous name fails.
    pub fn resolve_requested(&self, names: &[String]) -> Result<Vec<ModelRef>, CostError> {
        names
            .iter()
            .map(|name| match self.resolve(name) {
                Err(CostError::PriceNotFound {
                    provider_id,
                    model_id,
                }) => Ok(ModelRef::new(provider_id, model_id)),
                other => other,
            })
            .collect()
    }

    pub fn model_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse a TOML price file of `[[models]]` tables.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, CostError> {
        let file: PriceFile = toml::from_str(content).map_err(|e| CostError::Toml {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let mut registry = Self::new();
        for record in file.models {
            registry.append(record)?;
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, CostError> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_toml_str(&content, path)?;
        tracing::info!(
            path = %path.display(),
            models = registry.model_count(),
            "loaded price table"
        );
        Ok(registry)
    }

    /// The built-in price table.
    pub fn builtin() -> Self {
        let version = DateTime::<Utc>::from_timestamp(BUILTIN_PRICE_VERSION, 0).unwrap_or_default();
        let mut registry = Self::new();
        for b in BUILTIN_PRICES {
            let record = ModelPriceRecord {
                provider_id: b.provider.to_string(),
                model_id: b.model.to_string(),
                display_name: Some(b.name.to_string()),
                input_price_per_1k: b.input,
                output_price_per_1k: b.output,
                context_window_tokens: b.context_window,
                capabilities: b.capabilities.iter().copied().collect(),
                price_version_timestamp: version,
                long_context: b.long_context,
            };
            if let Err(e) = registry.append(record) {
                tracing::warn!("skipping built-in price: {e}");
            }
        }
        registry
    }
}

/// 2024-10-01T00:00:00Z
const BUILTIN_PRICE_VERSION: i64 = 1_727_740_800;

struct BuiltinPrice {
    provider: &'static str,
    model: &'static str,
    name: &'static str,
    input: f64,
    output: f64,
    context_window: u64,
    capabilities: &'static [Capability],
    long_context: Option<LongContextPrice>,
}

const VISION_TOOLS: &[Capability] = &[Capability::Vision, Capability::FunctionCalling];
const TOOLS: &[Capability] = &[Capability::FunctionCalling];

const BUILTIN_PRICES: &[BuiltinPrice] = &[
    // OpenAI
    BuiltinPrice { provider: "openai", model: "gpt-4o", name: "GPT-4o", input: 0.0025, output: 0.01, context_window: 128_000, capabilities: VISION_TOOLS, long_context: None },
    BuiltinPrice { provider: "openai", model: "gpt-4o-mini", name: "GPT-4o mini", input: 0.00015, output: 0.0006, context_window: 128_000, capabilities: VISION_TOOLS, long_context: None },
    BuiltinPrice { provider: "openai", model: "gpt-4-turbo", name: "GPT-4 Turbo", input: 0.01, output: 0.03, context_window: 128_000, capabilities: VISION_TOOLS, long_context: None },
    BuiltinPrice { provider: "openai", model: "gpt-4", name: "GPT-4", input: 0.03, output: 0.06, context_window: 8_192, capabilities: TOOLS, long_context: None },
    BuiltinPrice { provider: "openai", model: "gpt-3.5-turbo", name: "GPT-3.5 Turbo", input: 0.0005, output: 0.0015, context_window: 16_385, capabilities: TOOLS, long_context: None },
    BuiltinPrice { provider: "openai", model: "o1-preview", name: "o1-preview", input: 0.015, output: 0.06, context_window: 128_000, capabilities: &[], long_context: None },
    BuiltinPrice { provider: "openai", model: "o1-mini", name: "o1-mini", input: 0.003, output: 0.012, context_window: 128_000, capabilities: &[], long_context: None },
    // Anthropic
    BuiltinPrice { provider: "anthropic", model: "claude-3-opus", name: "Claude 3 Opus", input: 0.015, output: 0.075, context_window: 200_000, capabilities: VISION_TOOLS, long_context: None },
    BuiltinPrice { provider: "anthropic", model: "claude-3.5-sonnet", name: "Claude 3.5 Sonnet", input: 0.003, output: 0.015, context_window: 200_000, capabilities: VISION_TOOLS, long_context: None },
    BuiltinPrice { provider: "anthropic", model: "claude-3-haiku", name: "Claude 3 Haiku", input: 0.00025, output: 0.00125, context_window: 200_000, capabilities: VISION_TOOLS, long_context: None },
    // Google
    BuiltinPrice {
        provider: "google", model: "gemini-1.5-pro", name: "Gemini 1.5 Pro", input: 0.00125, output: 0.005, context_window: 2_000_000,
        capabilities: &[Capability::Vision, Capability::FunctionCalling, Capability::Search],
        long_context: Some(LongContextPrice { threshold_tokens: 128_000, input_price_per_1k: 0.0025, output_price_per_1k: 0.01 }),
    },
    BuiltinPrice {
        provider: "google", model: "gemini-1.5-flash", name: "Gemini 1.5 Flash", input: 0.000075, output: 0.0003, context_window: 1_000_000,
        capabilities: &[Capability::Vision, Capability::FunctionCalling, Capability::Search],
        long_context: Some(LongContextPrice { threshold_tokens: 128_000, input_price_per_1k: 0.00015, output_price_per_1k: 0.0006 }),
    },
    BuiltinPrice { provider: "google", model: "gemini-1.0-pro", name: "Gemini 1.0 Pro", input: 0.0005, output: 0.0015, context_window: 32_000, capabilities: TOOLS, long_context: None },
];

/// Format a USD cost for display. Sub-cent amounts keep four decimals.
pub fn format_cost(cost: f64) -> String {
    if cost == 0.0 {
        "$0.00".to_string()
    } else if cost < 0.0001 {
        "<$0.0001".to_string()
    } else if cost < 1.0 {
        format!("${:.4}", cost)
    } else if cost < 100.0 {
        format!("${:.2}", cost)
    } else {
        format!("${:.0}", cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn record(provider: &str, model: &str, input: f64, ts: DateTime<Utc>) -> ModelPriceRecord {
        ModelPriceRecord {
            provider_id: provider.into(),
            model_id: model.into(),
            display_name: None,
            input_price_per_1k: input,
            output_price_per_1k: input * 3.0,
            context_window_tokens: 128_000,
            capabilities: BTreeSet::new(),
            price_version_timestamp: ts,
            long_context: None,
        }
    }

    #[test]
    fn test_lookup_point_in_time() {
        let mut reg = PricingRegistry::new();
        reg.append(record("openai", "gpt-x", 0.01, at(2024, 1, 1))).unwrap();
        reg.append(record("openai", "gpt-x", 0.005, at(2024, 6, 1))).unwrap();

        let march = reg.lookup("openai", "gpt-x", at(2024, 3, 1)).unwrap();
        assert_eq!(march.input_price_per_1k, 0.01);
        let july = reg.lookup("openai", "gpt-x", at(2024, 7, 1)).unwrap();
        assert_eq!(july.input_price_per_1k, 0.005);
        let exact = reg.lookup("openai", "gpt-x", at(2024, 6, 1)).unwrap();
        assert_eq!(exact.input_price_per_1k, 0.005);
    }

    #[test]
    fn test_lookup_before_first_version() {
        let mut reg = PricingRegistry::new();
        reg.append(record("openai", "gpt-x", 0.01, at(2024, 1, 1))).unwrap();
        let err = reg.lookup("openai", "gpt-x", at(2023, 1, 1)).unwrap_err();
        assert!(matches!(err, CostError::PriceNotFound { .. }));
    }

    #[test]
    fn test_lookup_unknown_model() {
        let reg = PricingRegistry::builtin();
        let err = reg.lookup_current("openai", "gpt-nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "No price record for openai:gpt-nonexistent");
    }

    #[test]
    fn test_append_out_of_order_keeps_history_sorted() {
        let mut reg = PricingRegistry::new();
        reg.append(record("a", "m", 3.0, at(2024, 3, 1))).unwrap();
        reg.append(record("a", "m", 1.0, at(2024, 1, 1))).unwrap();
        reg.append(record("a", "m", 2.0, at(2024, 2, 1))).unwrap();
        let prices: Vec<f64> = reg.history("a", "m").iter().map(|r| r.input_price_per_1k).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
        assert!(reg.history("a", "other").is_empty());
    }

    #[test]
    fn test_append_duplicate_version_rejected() {
        let mut reg = PricingRegistry::new();
        reg.append(record("a", "m", 1.0, at(2024, 1, 1))).unwrap();
        let err = reg.append(record("a", "m", 2.0, at(2024, 1, 1))).unwrap_err();
        assert!(matches!(err, CostError::DuplicatePriceVersion { .. }));
        assert_eq!(reg.history("a", "m")[0].input_price_per_1k, 1.0);
    }

    #[test]
    fn test_append_invalid_record_rejected() {
        let mut reg = PricingRegistry::new();
        assert!(reg.append(record("a", "m", -1.0, at(2024, 1, 1))).is_err());
        let mut zero_ctx = record("a", "m", 1.0, at(2024, 1, 1));
        zero_ctx.context_window_tokens = 0;
        assert!(reg.append(zero_ctx).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_list_models_latest_and_filtered() {
        let mut reg = PricingRegistry::new();
        let mut vision = record("a", "seer", 1.0, at(2024, 1, 1));
        vision.capabilities.insert(Capability::Vision);
        reg.append(vision).unwrap();
        reg.append(record("a", "plain", 1.0, at(2024, 1, 1))).unwrap();
        reg.append(record("a", "plain", 0.5, at(2024, 2, 1))).unwrap();

        let all = reg.list_models_at(at(2024, 3, 1), &[]);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].model_id, "plain");
        assert_eq!(all[0].input_price_per_1k, 0.5);

        let seers = reg.list_models_at(at(2024, 3, 1), &[Capability::Vision]);
        assert_eq!(seers.len(), 1);
        assert_eq!(seers[0].model_id, "seer");
    }

    #[test]
    fn test_builtin_table_is_complete() {
        let reg = PricingRegistry::builtin();
        assert_eq!(reg.model_count(), BUILTIN_PRICES.len());
        let opus = reg.lookup_current("anthropic", "claude-3-opus").unwrap();
        assert_eq!(opus.input_price_per_1k, 0.015);
        assert_eq!(opus.context_window_tokens, 200_000);
        assert!(opus.capabilities.contains(&Capability::Vision));
        let search = reg.list_models(&[Capability::Search]);
        assert!(search.iter().all(|r| r.provider_id == "google"));
    }

    #[test]
    fn test_resolve_model_names() {
        let reg = PricingRegistry::builtin();
        assert_eq!(reg.resolve("openai:gpt-4o").unwrap(), ModelRef::new("openai", "gpt-4o"));
        assert_eq!(reg.resolve("claude-3-haiku").unwrap(), ModelRef::new("anthropic", "claude-3-haiku"));
        assert!(matches!(reg.resolve("llama-9"), Err(CostError::PriceNotFound { .. })));
    }

    #[test]
    fn test_resolve_ambiguous_bare_name() {
        let mut reg = PricingRegistry::new();
        reg.append(record("azure", "gpt-4o", 1.0, at(2024, 1, 1))).unwrap();
        reg.append(record("openai", "gpt-4o", 1.0, at(2024, 1, 1))).unwrap();
        assert!(matches!(reg.resolve("gpt-4o"), Err(CostError::Other(_))));
    }

    #[test]
    fn test_resolve_requested_keeps_unpriced_names() {
        let reg = PricingRegistry::builtin();
        let names = vec!["gpt-4o".to_string(), "llama-9".to_string()];
        let refs = reg.resolve_requested(&names).unwrap();
        assert_eq!(refs, vec![ModelRef::new("openai", "gpt-4o"), ModelRef::new("*", "llama-9")]);
    }

    #[test]
    fn test_resolve_requested_ambiguous_is_fatal() {
        let mut reg = PricingRegistry::new();
        reg.append(record("azure", "gpt-4o", 1.0, at(2024, 1, 1))).unwrap();
        reg.append(record("openai", "gpt-4o", 1.0, at(2024, 1, 1))).unwrap();
        assert!(reg.resolve_requested(&["gpt-4o".to_string()]).is_err());
    }

    #[test]
    fn test_append_negative_zero_price_rejected() {
        let mut reg = PricingRegistry::new();
        let mut rec = record("a", "m", 1.0, at(2024, 1, 1));
        rec.output_price_per_1k = -0.0;
        assert!(reg.append(rec).is_err());
        assert!(reg.append(record("a", "m", 0.0, at(2024, 1, 1))).is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
[[models]]
provider_id = "openai"
model_id = "gpt-4o"
input_price_per_1k = 0.005
output_price_per_1k = 0.015
context_window_tokens = 128000
capabilities = ["vision", "function_calling"]
price_version_timestamp = "2024-05-13T00:00:00Z"

[[models]]
provider_id = "openai"
model_id = "gpt-4o"
input_price_per_1k = 0.0025
output_price_per_1k = 0.01
context_window_tokens = 128000
price_version_timestamp = "2024-10-01T00:00:00Z"
"#;
        let reg = PricingRegistry::from_toml_str(toml, Path::new("prices.toml")).unwrap();
        assert_eq!(reg.model_count(), 1);
        assert_eq!(reg.history("openai", "gpt-4o").len(), 2);
        let may = reg.lookup("openai", "gpt-4o", at(2024, 6, 1)).unwrap();
        assert_eq!(may.input_price_per_1k, 0.005);
        assert!(may.has_capabilities(&[Capability::Vision]));
    }

    #[test]
    fn test_from_toml_str_bad_file() {
        let err = PricingRegistry::from_toml_str("[[models]]\nprovider_id = 3\n", Path::new("p.toml"))
            .unwrap_err();
        assert!(matches!(err, CostError::Toml { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.toml");
        std::fs::write(
            &path,
            "[[models]]\nprovider_id = \"x\"\nmodel_id = \"y\"\ninput_price_per_1k = 1.0\noutput_price_per_1k = 2.0\ncontext_window_tokens = 1000\nprice_version_timestamp = \"2024-01-01T00:00:00Z\"\n",
        )
        .unwrap();
        let reg = PricingRegistry::load(&path).unwrap();
        assert!(reg.lookup_current("x", "y").is_ok());
    }

    #[test]
    fn test_model_ref_parse() {
        let r: ModelRef = "anthropic:claude-3-opus".parse().unwrap();
        assert_eq!(r.provider_id, "anthropic");
        assert_eq!(r.to_string(), "anthropic:claude-3-opus");
        assert!("no-colon".parse::<ModelRef>().is_err());
        assert!(":m".parse::<ModelRef>().is_err());
    }

    #[test]
    fn test_capability_from_str() {
        assert_eq!("tools".parse::<Capability>().unwrap(), Capability::FunctionCalling);
        assert!("telepathy".parse::<Capability>().is_err());
    }

    #[test]
    fn test_format_cost_zero() {
        assert_eq!(format_cost(0.0), "$0.00");
    }

    #[test]
    fn test_format_cost_tiny() {
        assert_eq!(format_cost(0.00001), "<$0.0001");
    }

    #[test]
    fn test_format_cost_cents() {
        assert_eq!(format_cost(0.0123), "$0.0123");
    }

    #[test]
    fn test_format_cost_dollars() {
        assert_eq!(format_cost(12.345), "$12.35");
    }

    #[test]
    fn test_format_cost_large() {
        assert_eq!(format_cost(150.0), "$150");
    }
}
