use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collect::CollectorSettings;
use crate::overlay::{IconSettings, InlineMenuVisibility, OverlaySettings};

pub const DEFAULT_CONFIG_PATH: &str = "autofill-engine.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "autofill-engine",
    version,
    about = "Collects autofill page details from HTML pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: autofill-engine.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect forms and fields from a page
    Collect {
        /// Page URL to fetch
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Local HTML file to load instead of fetching
        #[arg(long)]
        file: Option<String>,

        /// Output format: json, table
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Append a JSONL trace record of the run to this file
        #[arg(long)]
        trace: Option<String>,

        /// Maximum number of fields to collect (overrides the config file)
        #[arg(long)]
        field_limit: Option<usize>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `autofill-engine.yaml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_field_limit")]
    pub field_limit: usize,

    #[serde(default = "default_debounce_ms")]
    pub mutation_debounce_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub mutation_max_wait_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub mutation_batch_timeout_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub shadow_dom_check_timeout_ms: u64,

    #[serde(default = "default_rescan_timeout_ms")]
    pub rescan_timeout_ms: u64,

    #[serde(default = "default_rescan_timeout_ms")]
    pub field_build_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            field_limit: default_field_limit(),
            mutation_debounce_ms: default_debounce_ms(),
            mutation_max_wait_ms: default_idle_timeout_ms(),
            mutation_batch_timeout_ms: default_idle_timeout_ms(),
            shadow_dom_check_timeout_ms: default_idle_timeout_ms(),
            rescan_timeout_ms: default_rescan_timeout_ms(),
            field_build_timeout_ms: default_rescan_timeout_ms(),
        }
    }
}

impl CollectorConfig {
    pub fn to_settings(&self) -> CollectorSettings {
        CollectorSettings {
            field_limit: self.field_limit,
            mutation_debounce_ms: self.mutation_debounce_ms,
            mutation_max_wait_ms: self.mutation_max_wait_ms,
            mutation_batch_timeout_ms: self.mutation_batch_timeout_ms,
            shadow_dom_check_timeout_ms: self.shadow_dom_check_timeout_ms,
            rescan_timeout_ms: self.rescan_timeout_ms,
            field_build_timeout_ms: self.field_build_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_icons_url")]
    pub icons_url: String,

    #[serde(default = "default_true")]
    pub show_favicons: bool,

    #[serde(default)]
    pub inline_menu_visibility: InlineMenuVisibility,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            icons_url: default_icons_url(),
            show_favicons: true,
            inline_menu_visibility: InlineMenuVisibility::default(),
        }
    }
}

impl OverlayConfig {
    pub fn to_settings(&self) -> OverlaySettings {
        OverlaySettings {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            icons: IconSettings {
                icons_url: self.icons_url.clone(),
                show_favicons: self.show_favicons,
            },
            inline_menu_visibility: self.inline_menu_visibility,
        }
    }
}

// Serde default helpers
fn default_field_limit() -> usize { 100 }
fn default_debounce_ms() -> u64 { 100 }
fn default_idle_timeout_ms() -> u64 { 500 }
fn default_rescan_timeout_ms() -> u64 { 1000 }
fn default_settle_delay_ms() -> u64 { 650 }
fn default_icons_url() -> String { "https://icons.bitwarden.net".to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|error| {
            warn!(path = config_path, %error, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Collector settings with the CLI override applied on top of the config file.
pub fn build_collector_settings(config: &AppConfig, field_limit: Option<usize>) -> CollectorSettings {
    let mut settings = config.collector.to_settings();
    if let Some(limit) = field_limit {
        settings.field_limit = limit;
    }
    settings
}
