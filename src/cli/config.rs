use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::layer::semantic::LayerConfig;
use crate::selection::selection_model::BatchConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "ui-match",
    version,
    about = "Locate and select elements in Android UI hierarchy dumps"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ui-match.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a path expression against a dump
    Query {
        /// uiautomator XML dump
        #[arg(long)]
        dump: String,

        /// Positional path or `//tag[predicate]`
        #[arg(long)]
        xpath: String,

        /// Print every match instead of the first
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Classify layers, optionally hit-test a point
    Layers {
        #[arg(long)]
        dump: String,

        /// Point to hit-test, as X,Y
        #[arg(long)]
        hit: Option<String>,

        /// Only report overlay layers
        #[arg(long, default_value_t = false)]
        overlay_only: bool,
    },

    /// Capture the fingerprint of the element at a path
    Fingerprint {
        #[arg(long)]
        dump: String,

        #[arg(long)]
        xpath: String,
    },

    /// Run a stored selection protocol against a dump
    Select {
        #[arg(long)]
        dump: String,

        /// SmartSelectionProtocol JSON file
        #[arg(long)]
        protocol: String,

        /// Tap the selected elements through adb
        #[arg(long, default_value_t = false)]
        execute: bool,

        /// adb device serial
        #[arg(long)]
        device: Option<String>,

        /// JSONL trace file
        #[arg(long)]
        trace: Option<String>,
    },

    /// Ask the scoring service which matching strategy to use
    Recommend {
        #[arg(long)]
        dump: String,

        #[arg(long)]
        xpath: String,

        /// Container path sent along with the request
        #[arg(long)]
        container: Option<String>,

        /// Scoring endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `ui-match.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub layer: LayerConfig,
    /// Used by `select --execute` when the protocol carries no batch config
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub adb: AdbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdbConfig {
    #[serde(default = "default_adb")]
    pub path: String,

    pub device: Option<String>,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            path: default_adb(),
            device: None,
        }
    }
}

// Serde default helpers
fn default_timeout() -> u64 { 10 }
fn default_adb() -> String { "adb".to_string() }

pub const DEFAULT_SCORING_ENDPOINT: &str = "http://127.0.0.1:8765/recommend_structure_mode_v2";

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("ui-match.yaml");
    match read_config(config_path) {
        Ok(config) => config,
        Err(AppError::Io(_)) => AppConfig::default(),
        Err(e) => {
            log::warn!("ignoring malformed config '{}': {}", config_path, e);
            AppConfig::default()
        }
    }
}

/// Strict variant of [`load_config`]: read and parse one YAML file.
pub fn read_config(path: &str) -> Result<AppConfig, AppError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Map `-v` occurrences onto a log level filter.
pub fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
