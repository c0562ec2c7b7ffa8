//! CLI entry point for tokencost.
//!
//! `main.rs` is the thin coordination layer between the CLI surface and the
//! library crate:
//!
//! 1. Parse CLI arguments (via `clap`)
//! 2. Load configuration from `~/.config/tokencost/config.toml` unless
//!    `--detached`, then let CLI flags override it
//! 3. Dispatch: config subcommands (`init`, `get`, `set`, `unset`) touch
//!    only the config file; `estimate`, `compare`, `models` and
//!    `history` build the library objects and render a report to stdout.
//!
//! Logs go to stderr so the report on stdout can be piped.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use tokencost::analysis::{AnalysisRequest, Analyzer, AnalyzerDefaults};
use tokencost::config::{self, Config};
use tokencost::content::ContentUnit;
use tokencost::error::CostError;
use tokencost::estimate::Estimator;
use tokencost::extract;
use tokencost::formatter::OutputFormat;
use tokencost::pricing::{Capability, PricingRegistry};
use tokencost::strategy::EstimationMode;
use tokencost::tokenizer::{BpeTokenizer, Encoding};

#[derive(Parser)]
#[command(
    name = "tokencost",
    version,
    about = "Estimate tokens and compare LLM API costs before sending anything"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format: text, json, csv
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Estimation mode: hybrid, fast, precise
    #[arg(short, long, global = true)]
    mode: Option<EstimationMode>,

    /// Expected output tokens per input token
    #[arg(long, global = true)]
    ratio: Option<f64>,

    /// Batch discount rate in [0, 1), applied to every model
    #[arg(long, global = true)]
    discount: Option<f64>,

    /// TOML price table (default: built-in prices)
    #[arg(long, global = true)]
    pricing: Option<PathBuf>,

    /// BPE encoding for exact counts: cl100k_base, o200k_base
    #[arg(long, global = true)]
    encoding: Option<Encoding>,

    /// Worker threads for estimation
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Price as of this RFC 3339 instant instead of now
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,

    /// Config file to use instead of ~/.config/tokencost/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignore config file; all options must be explicit
    #[arg(long, global = true)]
    detached: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate input tokens for files
    Estimate {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Estimate tokens and rank models by projected cost
    Compare {
        #[command(flatten)]
        input: InputArgs,
        /// Model to compare, as provider:model or a unique model id (repeatable)
        #[arg(long = "model", value_name = "MODEL")]
        models: Vec<String>,
        /// Only compare models with this capability (repeatable)
        #[arg(long = "capability", value_name = "CAP")]
        capabilities: Vec<Capability>,
    },
    /// List priced models
    Models {
        /// Only models from this provider
        #[arg(long)]
        provider: Option<String>,
        /// Only models with this capability (repeatable)
        #[arg(long = "capability", value_name = "CAP")]
        capabilities: Vec<Capability>,
    },
    /// Show every price version of a model
    History {
        /// provider:model or a unique model id
        model: String,
    },
    /// Create a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Get a config value (e.g. `tokencost get estimation.workers`)
    Get {
        /// Dotted config key; omit to list all values
        key: Option<String>,
    },
    /// Set a config value (e.g. `tokencost set batch_discount.rate 0.5`)
    Set {
        /// Dotted config key
        key: String,
        /// Value to set
        value: String,
    },
    /// Remove a config value
    Unset {
        /// Dotted config key
        key: String,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Files or directories to estimate
    paths: Vec<PathBuf>,
    /// JSON list of content units from an external extractor
    #[arg(long)]
    manifest: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .compact();
    if let Err(e) = subscriber.try_init() {
        eprintln!("Warning: logging disabled: {e}");
    }
}

fn run(cli: Cli) -> Result<(), CostError> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };

    // Config subcommands never read the rest of the config.
    match &cli.command {
        Command::Init { force } => {
            config::init(&config_path, *force)?;
            eprintln!("Wrote {}", config_path.display());
            return Ok(());
        }
        Command::Get { key: Some(key) } => {
            println!("{}", config::get_value(&config_path, key)?);
            return Ok(());
        }
        Command::Get { key: None } => {
            let entries = config::list_values(&config_path)?;
            if entries.is_empty() {
                eprintln!("No config values set.");
            }
            for (key, value) in entries {
                println!("{key} = {value}");
            }
            return Ok(());
        }
        Command::Set { key, value } => return config::set_value(&config_path, key, value),
        Command::Unset { key } => return config::unset_value(&config_path, key),
        _ => {}
    }

    let config = if cli.detached {
        Config::default()
    } else {
        Config::load_from(&config_path)?
    };

    let format = match &cli.format {
        Some(f) => f.parse::<OutputFormat>().map_err(CostError::Config)?,
        None => config.output_format()?.unwrap_or_default(),
    };
    let formatter = format.formatter();
    let registry = match &cli.pricing {
        Some(path) => PricingRegistry::load(path)?,
        None => config.registry()?,
    };
    let priced_at = cli.at.unwrap_or_else(Utc::now);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Estimate { input } => {
            let units = load_units(input)?;
            let analyzer = build_analyzer(&cli, &config, registry, None)?;
            let report = analyzer.estimate(&units, mode(&cli, &config))?;
            formatter.estimate(&report, &mut out)?;
        }
        Command::Compare {
            input,
            models,
            capabilities,
        } => {
            let units = load_units(input)?;
            let selected = registry.resolve_requested(models)?;

            // A single target model picks its own encoding unless one is set.
            let model_hint = match selected.as_slice() {
                [only] => Some(only.model_id.as_str()),
                _ => None,
            };
            let analyzer = build_analyzer(&cli, &config, registry, model_hint)?;
            let request = AnalysisRequest {
                units,
                mode: mode(&cli, &config),
                output_token_ratio: cli.ratio,
                selected_models: selected,
                required_capabilities: capabilities.clone(),
                batch_discount_rate: cli.discount,
                priced_at: Some(priced_at),
            };
            let report = analyzer.analyze(&request)?;
            formatter.comparison(&report, &mut out)?;
        }
        Command::Models {
            provider,
            capabilities,
        } => {
            let records: Vec<_> = registry
                .list_models_at(priced_at, capabilities)
                .into_iter()
                .filter(|r| provider.as_deref().is_none_or(|p| r.provider_id == p))
                .collect();
            formatter.models(&records, &mut out)?;
        }
        Command::History { model } => {
            let model = registry.resolve(model)?;
            let records: Vec<_> = registry
                .history(&model.provider_id, &model.model_id)
                .iter()
                .collect();
            formatter.models(&records, &mut out)?;
        }
        Command::Init { .. } | Command::Get { .. } | Command::Set { .. } | Command::Unset { .. } => {
        }
    }

    out.flush()?;
    Ok(())
}

fn mode(cli: &Cli, config: &Config) -> EstimationMode {
    cli.mode.or(config.mode).unwrap_or_default()
}

fn load_units(input: &InputArgs) -> Result<Vec<ContentUnit>, CostError> {
    let mut units = extract::collect(&input.paths)?;
    if let Some(manifest) = &input.manifest {
        units.extend(extract::load_manifest(manifest)?);
    }
    if units.is_empty() {
        return Err(CostError::Other(
            "No input: pass files or directories, or --manifest".into(),
        ));
    }
    Ok(units)
}

fn build_analyzer(
    cli: &Cli,
    config: &Config,
    registry: PricingRegistry,
    model_hint: Option<&str>,
) -> Result<Analyzer, CostError> {
    let encoding = cli
        .encoding
        .or(config.encoding)
        .or_else(|| model_hint.map(Encoding::for_model))
        .unwrap_or_default();
    let tokenizer = BpeTokenizer::new(encoding)?;

    let mut settings = config.estimation.clone();
    if let Some(workers) = cli.workers {
        settings.workers = workers.max(1);
    }

    let estimator = Estimator::new(Arc::new(tokenizer), Arc::new(config.tiling()), settings);
    let defaults = AnalyzerDefaults {
        output_token_ratio: config.output_ratio(),
        discount: config.batch_discount.clone(),
    };
    Ok(Analyzer::new(estimator, registry, defaults))
}
