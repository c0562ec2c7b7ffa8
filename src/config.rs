use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml_edit::DocumentMut;

use crate::compare::{self, DiscountPolicy};
use crate::error::CostError;
use crate::estimate::EstimatorSettings;
use crate::formatter::OutputFormat;
use crate::pricing::PricingRegistry;
use crate::strategy::EstimationMode;
use crate::tiling::TilingConfig;
use crate::tokenizer::Encoding;

/// Written by `tokencost init`. Every key is commented out so the file
/// starts out equivalent to the built-in defaults.
const TEMPLATE: &str = r#"# tokencost configuration

# Estimation mode: hybrid, fast or precise.
# mode = "hybrid"

# Expected output tokens per input token.
# output_ratio = 0.3

# BPE encoding for exact counts: cl100k_base or o200k_base.
# encoding = "cl100k_base"

# Report format: text, json or csv.
# format = "text"

# TOML price table; the built-in table is used when unset.
# pricing_file = "~/.config/tokencost/prices.toml"

[estimation]
# fallback_on_unsupported = true
# hybrid_sample_chars = 200000
# workers = 1

[batch_discount]
# rate = 0.0

[batch_discount.providers]
# openai = 0.5

# [image_tiling]
# formula = "area_tiers"
# base_tokens = 85
# tile_side = 512
# tokens_per_tile = 170
"#;

/// Top-level config loaded from `~/.config/tokencost/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub mode: Option<EstimationMode>,
    pub output_ratio: Option<f64>,
    pub encoding: Option<Encoding>,
    pub format: Option<String>,
    pub pricing_file: Option<String>,
    #[serde(default)]
    pub estimation: EstimatorSettings,
    #[serde(default)]
    pub batch_discount: DiscountPolicy,
    pub image_tiling: Option<TilingConfig>,
}

impl Config {
    /// Load config from the default location.
    /// Returns `Config::default()` if the file is missing.
    pub fn load() -> Result<Config, CostError> {
        Config::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Config, CostError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Config::from_toml_str(&content, path)?;
                tracing::debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(CostError::Io(e)),
        }
    }

    pub fn from_toml_str(content: &str, path: &Path) -> Result<Config, CostError> {
        let config: Config = toml::from_str(content).map_err(|e| CostError::Toml {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CostError> {
        if let Some(ratio) = self.output_ratio {
            compare::validate_ratio(ratio)?;
        }
        self.batch_discount.validate()?;
        if let Some(tiling) = &self.image_tiling {
            tiling.validate()?;
        }
        if self.estimation.workers == 0 {
            return Err(CostError::Config("estimation.workers must be at least 1".into()));
        }
        self.output_format()?;
        Ok(())
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>, CostError> {
        self.format
            .as_deref()
            .map(|f| f.parse::<OutputFormat>().map_err(CostError::Config))
            .transpose()
    }

    pub fn output_ratio(&self) -> f64 {
        self.output_ratio.unwrap_or(compare::DEFAULT_OUTPUT_RATIO)
    }

    pub fn tiling(&self) -> TilingConfig {
        self.image_tiling.clone().unwrap_or_default()
    }

    /// Resolve the price table path with tilde expansion.
    pub fn pricing_path(&self) -> Option<PathBuf> {
        self.pricing_file.as_deref().map(expand_tilde)
    }

    /// The configured price table, or the built-in one.
    pub fn registry(&self) -> Result<PricingRegistry, CostError> {
        match self.pricing_path() {
            Some(path) => PricingRegistry::load(&path),
            None => Ok(PricingRegistry::builtin()),
        }
    }
}

/// Get a config value by dotted key (e.g. "estimation.workers" or "mode").
pub fn get_value(path: &Path, key: &str) -> Result<String, CostError> {
    let doc = read_document(path)?;
    resolve_key(&doc, key)
        .map(format_item)
        .ok_or_else(|| CostError::Config(format!("Key not found: {key}")))
}

/// Set a config value by dotted key (e.g. "batch_discount.providers.openai 0.5").
/// Creates the file and any intermediate tables as needed. The edited file
/// must still load as a valid config, otherwise nothing is written.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<(), CostError> {
    let content = read_config_file(path).unwrap_or_default();
    let mut doc = parse_document(&content)?;

    let (table_path, field) = split_key(key)?;

    let mut table = doc.as_table_mut();
    for segment in &table_path {
        if !table.contains_key(segment) {
            table.insert(segment, toml_edit::Item::Table(toml_edit::Table::new()));
        }
        table = table[segment.as_str()]
            .as_table_mut()
            .ok_or_else(|| CostError::Config(format!("'{segment}' is not a table")))?;
    }

    table.insert(&field, toml_edit::Item::Value(infer_value(value)));

    let updated = doc.to_string();
    Config::from_toml_str(&updated, path)?;
    write_config_file(path, &updated)
}

/// Unset (remove) a config value by dotted key.
pub fn unset_value(path: &Path, key: &str) -> Result<(), CostError> {
    let mut doc = read_document(path)?;
    let (table_path, field) = split_key(key)?;

    let mut table = doc.as_table_mut();
    for segment in &table_path {
        table = table
            .get_mut(segment)
            .and_then(|item| item.as_table_mut())
            .ok_or_else(|| CostError::Config(format!("Key not found: {key}")))?;
    }

    if table.remove(&field).is_none() {
        return Err(CostError::Config(format!("Key not found: {key}")));
    }

    write_config_file(path, &doc.to_string())
}

/// All set values as `(dotted key, display value)` pairs, in file order.
pub fn list_values(path: &Path) -> Result<Vec<(String, String)>, CostError> {
    let doc = read_document(path)?;
    let mut entries = Vec::new();
    collect_entries(doc.as_table(), "", &mut entries);
    Ok(entries)
}

/// Write the commented template. Refuses to overwrite unless `force`.
pub fn init(path: &Path, force: bool) -> Result<(), CostError> {
    if path.exists() && !force {
        return Err(CostError::Config(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    write_config_file(path, TEMPLATE)
}

pub fn config_path() -> Result<PathBuf, CostError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CostError::Config("Cannot determine home directory".into()))?;
    Ok(home.join(".config/tokencost/config.toml"))
}

// --- helpers ---

fn read_config_file(path: &Path) -> Result<String, CostError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CostError::Config(format!("Config file not found: {}", path.display()))
        } else {
            CostError::Io(e)
        }
    })
}

fn read_document(path: &Path) -> Result<DocumentMut, CostError> {
    parse_document(&read_config_file(path)?)
}

fn parse_document(content: &str) -> Result<DocumentMut, CostError> {
    content
        .parse()
        .map_err(|e| CostError::Config(format!("Failed to parse config: {e}")))
}

fn write_config_file(path: &Path, content: &str) -> Result<(), CostError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Split "estimation.workers" into (["estimation"], "workers") or "mode" into ([], "mode").
fn split_key(key: &str) -> Result<(Vec<String>, String), CostError> {
    let mut parts: Vec<String> = key.split('.').map(str::to_string).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(CostError::Config(format!("Invalid key: {key}")));
    }
    let field = parts
        .pop()
        .ok_or_else(|| CostError::Config(format!("Invalid key: {key}")))?;
    Ok((parts, field))
}

fn resolve_key<'a>(doc: &'a DocumentMut, key: &str) -> Option<&'a toml_edit::Item> {
    let mut current: &toml_edit::Item = doc.as_item();
    for part in key.split('.') {
        current = current.as_table_like()?.get(part)?;
    }
    Some(current)
}

fn format_item(item: &toml_edit::Item) -> String {
    match item {
        toml_edit::Item::Value(toml_edit::Value::String(s)) => s.value().clone(),
        toml_edit::Item::Value(v) => format_value(v),
        toml_edit::Item::Table(t) => {
            let mut entries = Vec::new();
            collect_entries(t, "", &mut entries);
            entries
                .iter()
                .map(|(k, v)| format!("{k} = {v}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
        other => other.to_string(),
    }
}

fn collect_entries(table: &toml_edit::Table, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, item) in table.iter() {
        let full_key = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        match item {
            toml_edit::Item::Value(v) => out.push((full_key, format_value(v))),
            toml_edit::Item::Table(t) => collect_entries(t, &full_key, out),
            _ => {}
        }
    }
}

/// Format a TOML value without its decoration whitespace.
fn format_value(v: &toml_edit::Value) -> String {
    match v {
        toml_edit::Value::String(s) => format!("\"{}\"", s.value()),
        toml_edit::Value::Integer(i) => i.value().to_string(),
        toml_edit::Value::Float(f) => f.value().to_string(),
        toml_edit::Value::Boolean(b) => b.value().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Infer a TOML value type from a string input.
fn infer_value(s: &str) -> toml_edit::Value {
    if s == "true" {
        return toml_edit::Value::from(true);
    }
    if s == "false" {
        return toml_edit::Value::from(false);
    }
    if let Ok(n) = s.parse::<i64>() {
        return toml_edit::Value::from(n);
    }
    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return toml_edit::Value::from(f);
        }
    }
    toml_edit::Value::from(s)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
