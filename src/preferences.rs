// =============================================================================
// Dashboard Preferences — which tickers and panels are visible
// =============================================================================
//
// Read once at startup, written after every visibility or ticker-set change.
// Every failure is logged and swallowed: an unreadable file means defaults,
// a failed write means the previous file stays in place.
// =============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{Symbol, SymbolSet};

fn default_visible_tickers() -> Vec<Symbol> {
    ["btcusdt", "ethusdt", "solusdt", "bnbusdt", "adausdt"]
        .iter()
        .filter_map(|s| Symbol::parse(s))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesRecord {
    #[serde(default = "default_visible_tickers")]
    pub visible_tickers: Vec<Symbol>,
    #[serde(default)]
    pub chart_visible: bool,
    #[serde(default)]
    pub orderbook_visible: bool,
    #[serde(default)]
    pub trades_visible: bool,
}

impl Default for PreferencesRecord {
    fn default() -> Self {
        Self {
            visible_tickers: default_visible_tickers(),
            chart_visible: false,
            orderbook_visible: false,
            trades_visible: false,
        }
    }
}

impl PreferencesRecord {
    /// Drop tickers outside `allowed` and duplicates.
    pub fn restrict_to(&mut self, allowed: &SymbolSet) {
        let mut kept: Vec<Symbol> = Vec::with_capacity(self.visible_tickers.len());
        for sym in self.visible_tickers.drain(..) {
            if allowed.contains(&sym) && !kept.contains(&sym) {
                kept.push(sym);
            } else {
                debug!(symbol = %sym, "dropping ticker preference");
            }
        }
        self.visible_tickers = kept;
    }
}

/// File-backed preference storage.
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the record, falling back to defaults when the file is absent or
    /// unreadable. Tickers are restricted to `allowed`.
    pub fn load_or_default(&self, allowed: &SymbolSet) -> PreferencesRecord {
        let mut record = match self.try_load() {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %format!("{e:#}"), "using default preferences");
                PreferencesRecord::default()
            }
        };
        record.restrict_to(allowed);
        record
    }

    fn try_load(&self) -> Result<PreferencesRecord> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read preferences from {}", self.path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse preferences from {}", self.path.display()))?;
        info!(path = %self.path.display(), "preferences loaded");
        Ok(record)
    }

    /// Write atomically. Errors are logged, never returned.
    pub fn save(&self, record: &PreferencesRecord) {
        if let Err(e) = self.try_save(record) {
            warn!(path = %self.path.display(), error = %format!("{e:#}"), "failed to save preferences");
        }
    }

    fn try_save(&self, record: &PreferencesRecord) -> Result<()> {
        let content =
            serde_json::to_string_pretty(record).context("failed to serialise preferences")?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename to {}", self.path.display()))?;
        debug!(path = %self.path.display(), "preferences saved");
        Ok(())
    }
}

#[cfg(test)]
pub fn temp_path(tag: &str) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    std::env::temp_dir().join(format!(
        "tickerdeck_{tag}_{}_{}.json",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ))
}
