// =============================================================================
// Runtime Configuration — Dashboard settings with atomic save
// =============================================================================
//
// Every field carries a serde default so an older or partial JSON file still
// loads. Persistence uses the tmp + rename pattern.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Symbol, SymbolSet};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "btcusdt".to_string(),
        "ethusdt".to_string(),
        "bnbusdt".to_string(),
        "solusdt".to_string(),
        "adausdt".to_string(),
        "xrpusdt".to_string(),
    ]
}

fn default_symbol() -> String {
    "btcusdt".to_string()
}

fn default_stream_base_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_rest_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_kline_interval() -> String {
    "1m".to_string()
}

fn default_history_limit() -> u32 {
    100
}

fn default_preferences_path() -> String {
    "dashboard_prefs.json".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the dashboard process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Symbols -------------------------------------------------------------

    /// Symbols offered in every selector and on the ticker board.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Symbol the chart, order book and trades panels start on.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    // --- Endpoints -----------------------------------------------------------

    #[serde(default = "default_stream_base_url")]
    pub stream_base_url: String,

    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,

    /// Kline interval for both the REST bootstrap and the candle stream.
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,

    /// Number of historical candles requested at bootstrap.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    // --- Local ---------------------------------------------------------------

    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            default_symbol: default_symbol(),
            stream_base_url: default_stream_base_url(),
            rest_base_url: default_rest_base_url(),
            kline_interval: default_kline_interval(),
            history_limit: default_history_limit(),
            preferences_path: default_preferences_path(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` using an atomic write (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `TICKERDECK_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(syms) = std::env::var("TICKERDECK_SYMBOLS") {
            self.symbols = syms
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(addr) = std::env::var("TICKERDECK_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
    }

    /// The allowed symbol set. An empty or entirely invalid list falls back
    /// to the built-in default set.
    pub fn symbol_set(&self) -> SymbolSet {
        let set = SymbolSet::from_raw(&self.symbols);
        if set.is_empty() {
            warn!(configured = ?self.symbols, "no usable symbols configured, using defaults");
            return SymbolSet::from_raw(default_symbols());
        }
        set
    }

    /// Starting symbol for the single-symbol panels, constrained to `set`.
    pub fn initial_symbol(&self, set: &SymbolSet) -> Option<Symbol> {
        set.resolve(&self.default_symbol).or_else(|| {
            warn!(default_symbol = %self.default_symbol, "default symbol not in allowed set");
            set.first().cloned()
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sym;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.symbols.len(), 6);
        assert_eq!(cfg.symbols[0], "btcusdt");
        assert_eq!(cfg.symbols[5], "xrpusdt");
        assert_eq!(cfg.kline_interval, "1m");
        assert_eq!(cfg.history_limit, 100);
        assert_eq!(cfg.stream_base_url, "wss://stream.binance.com:9443/ws");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbols": ["ETHUSDT", "dogeusdt"], "default_symbol": "dogeusdt" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        let set = cfg.symbol_set();
        assert_eq!(set.len(), 2);
        assert_eq!(cfg.initial_symbol(&set), Some(sym("dogeusdt")));
        assert_eq!(cfg.history_limit, 100);
        assert_eq!(cfg.preferences_path, "dashboard_prefs.json");
    }

    #[test]
    fn empty_symbol_list_falls_back_to_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str(r#"{ "symbols": ["", "b a d"] }"#).unwrap();
        let set = cfg.symbol_set();
        assert_eq!(set.len(), 6);
        assert!(set.contains(&sym("adausdt")));
    }

    #[test]
    fn unknown_default_symbol_uses_first_allowed() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{ "symbols": ["solusdt", "ethusdt"] }"#).unwrap();
        let set = cfg.symbol_set();
        assert_eq!(cfg.initial_symbol(&set), Some(sym("solusdt")));
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "tickerdeck_cfg_{}_{}.json",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut cfg = RuntimeConfig::default();
        cfg.bind_addr = "0.0.0.0:9000".into();
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.bind_addr, "0.0.0.0:9000");
        assert_eq!(loaded.symbols, cfg.symbols);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(RuntimeConfig::load("/definitely/not/here/tickerdeck.json").is_err());
    }
}
