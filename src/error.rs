use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::strategy::EstimationMode;

/// Machine-readable reason attached to every omitted unit or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MissingPayload,
    PayloadKindMismatch,
    InvalidImageDimensions,
    UnsupportedStrategy,
    PriceNotFound,
    MissingCapability,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonCode::MissingPayload => write!(f, "missing_payload"),
            ReasonCode::PayloadKindMismatch => write!(f, "payload_kind_mismatch"),
            ReasonCode::InvalidImageDimensions => write!(f, "invalid_image_dimensions"),
            ReasonCode::UnsupportedStrategy => write!(f, "unsupported_strategy"),
            ReasonCode::PriceNotFound => write!(f, "price_not_found"),
            ReasonCode::MissingCapability => write!(f, "missing_capability"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CostError {
    #[error("Invalid content unit {unit_id} ({reason}): {detail}")]
    InvalidContentUnit {
        unit_id: String,
        reason: ReasonCode,
        detail: String,
    },

    #[error("Mode {mode} has no strategy for {kind} content")]
    UnsupportedStrategy {
        kind: ContentKind,
        mode: EstimationMode,
    },

    #[error("No price record for {provider_id}:{model_id}")]
    PriceNotFound {
        provider_id: String,
        model_id: String,
    },

    #[error("Invalid output token ratio {0}: must be a finite, non-negative number")]
    InvalidRatio(f64),

    #[error("Invalid batch discount rate {0}: must be in [0, 1)")]
    InvalidDiscountRate(f64),

    #[error("Invalid price record for {provider_id}:{model_id}: {detail}")]
    InvalidPriceRecord {
        provider_id: String,
        model_id: String,
        detail: String,
    },

    #[error("Price version {timestamp} already exists for {provider_id}:{model_id}")]
    DuplicatePriceVersion {
        provider_id: String,
        model_id: String,
        timestamp: String,
    },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("TOML error at {path}: {detail}")]
    Toml { path: PathBuf, detail: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CostError {
    /// Reason code for errors that are reported per unit or per model
    /// instead of aborting the request.
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            CostError::InvalidContentUnit { reason, .. } => Some(*reason),
            CostError::UnsupportedStrategy { .. } => Some(ReasonCode::UnsupportedStrategy),
            CostError::PriceNotFound { .. } => Some(ReasonCode::PriceNotFound),
            _ => None,
        }
    }
}
