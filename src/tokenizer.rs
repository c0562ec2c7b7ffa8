//! Exact token counting.
//!
//! The estimation engine only needs a count, so any tokenizer that yields
//! one deterministically satisfies [`ExactTokenizer`]. [`BpeTokenizer`] wraps
//! the OpenAI byte-pair encodings shipped with `tiktoken-rs`.

use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

use crate::error::CostError;

pub trait ExactTokenizer: Send + Sync {
    /// Number of tokens in `text`. Must be deterministic.
    fn count(&self, text: &str) -> usize;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Cl100kBase,
    O200kBase,
}

impl Encoding {
    /// Pick the encoding a model family uses. Unknown models get cl100k.
    pub fn for_model(model_id: &str) -> Encoding {
        let lower = model_id.to_lowercase();
        if ["gpt-4o", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            Encoding::O200kBase
        } else {
            Encoding::Cl100kBase
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
            Encoding::O200kBase => write!(f, "o200k_base"),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cl100k_base" | "cl100k" => Ok(Encoding::Cl100kBase),
            "o200k_base" | "o200k" => Ok(Encoding::O200kBase),
            _ => Err(format!("Unknown encoding: {s}. Valid: cl100k_base, o200k_base")),
        }
    }
}

pub struct BpeTokenizer {
    bpe: CoreBPE,
    name: String,
}

impl BpeTokenizer {
    pub fn new(encoding: Encoding) -> Result<Self, CostError> {
        let bpe = match encoding {
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| CostError::Tokenizer(format!("failed to load {encoding}: {e}")))?;
        tracing::debug!(%encoding, "loaded BPE encoding");
        Ok(Self {
            bpe,
            name: encoding.to_string(),
        })
    }
}

impl ExactTokenizer for BpeTokenizer {
    fn count(&self, text: &str) -> usize {
        // Uploaded content is data; special-token markers inside it are plain text.
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer").field("name", &self.name).finish()
    }
}
