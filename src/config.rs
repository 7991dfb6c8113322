//! Harvest configuration and persisted preferences

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collect::SourcePattern;
use crate::rendering::{FitMode, LayoutMode};

/// Configuration for a harvest run
///
/// The defaults are chosen to match what the stitcher is normally used
/// for: labeled gallery pages with a white contact-sheet background.
///
/// # Examples
///
/// ```
/// let cfg = pagestitch::HarvestConfig::default();
/// assert_eq!(cfg.padding, 16);
/// assert_eq!(cfg.background, "#ffffff");
/// ```
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Which images qualify for harvesting
    pub pattern: SourcePattern,
    /// Grid shape for the stitched canvas
    pub layout: LayoutMode,
    /// How images sit inside their cells
    pub fit: FitMode,
    /// Gutter around and between cells, in pixels
    pub padding: u32,
    /// Canvas background as a hex color
    pub background: String,
    /// How long a single-page harvest waits after ready before
    /// collecting, so late-inserted images make it into the sweep
    pub settle_ms: u64,
    /// Cap on sources collected from one page in a single-page harvest
    pub max_page_sources: usize,
    /// Cap on the merged, deduplicated list in a dual-page harvest
    pub max_merged_sources: usize,
    /// How long to wait for a page to signal ready
    pub navigation_timeout_ms: u64,
    /// Per-request timeout for page and image fetches
    pub request_timeout_ms: u64,
    /// How many image loads run at once
    pub load_concurrency: usize,
    /// User agent string to send with requests
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            pattern: SourcePattern::default(),
            layout: LayoutMode::default(),
            fit: FitMode::default(),
            padding: 16,
            background: "#ffffff".to_string(),
            settle_ms: 700,
            max_page_sources: 800,
            max_merged_sources: 1600,
            navigation_timeout_ms: 30000,
            request_timeout_ms: 30000,
            load_concurrency: num_cpus::get().clamp(2, 8),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Pagestitch/0.1".to_string(),
        }
    }
}

/// Preferences that survive between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Last explicitly chosen layout, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutMode>,
}

/// JSON-file-backed preference storage.
///
/// Reads are forgiving: a missing or unreadable file just means
/// defaults, the same way a fresh profile would. Writes report their
/// errors and leave retrying to the caller.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        PreferenceStore { path: path.into() }
    }

    /// `$PAGESTITCH_PREFS`, else `~/.config/pagestitch/prefs.json`,
    /// else a dotfile in the working directory
    pub fn default_path() -> PathBuf {
        if let Some(path) = env::var_os("PAGESTITCH_PREFS") {
            return PathBuf::from(path);
        }
        if let Some(home) = env::var_os("HOME") {
            return Path::new(&home)
                .join(".config")
                .join("pagestitch")
                .join("prefs.json");
        }
        PathBuf::from(".pagestitch-prefs.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Preferences {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Preferences::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!(
                    "ignoring unreadable preference file {}: {}",
                    self.path.display(),
                    e
                );
                Preferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(prefs)
            .map_err(|e| crate::error::Error::ConfigError(e.to_string()))?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_usual_harvest() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.padding, 16);
        assert_eq!(cfg.background, "#ffffff");
        assert_eq!(cfg.settle_ms, 700);
        assert_eq!(cfg.max_page_sources, 800);
        assert!(cfg.load_concurrency >= 2);
    }

    #[test]
    fn preferences_round_trip_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::at(dir.path().join("prefs.json"));

        let prefs = Preferences {
            layout: Some(LayoutMode::PerfectSquare),
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);

        // stored under the short name, like the CLI accepts
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"square\""));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::at(dir.path().join("nope.json"));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(PreferenceStore::at(&path).load(), Preferences::default());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::at(dir.path().join("deep").join("prefs.json"));
        store.save(&Preferences::default()).unwrap();
        assert!(store.path().exists());
    }
}
