use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Project-local config file name, looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = ".symnav.json";

/// Hard ceiling for files parsed during namespace-wide aggregation, regardless of config.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Quiet period after the last content-changed signal before symbols are re-fetched.
    pub debounce_ms: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl NavigatorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// How rows are decorated when rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_indicators: bool,

    /// Canonical icon token (e.g. "integer", "channel") to display glyph.
    /// Tokens without an entry render as the token itself.
    pub icons: BTreeMap<String, String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_indicators: true,
            icons: BTreeMap::new(),
        }
    }
}

impl DisplayConfig {
    pub fn glyph<'a>(&'a self, token: &'a str) -> &'a str {
        self.icons.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// Namespace-wide aggregation bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub enabled: bool,

    /// Stop walking the workspace after this many candidate source files.
    pub max_files: usize,

    /// Files larger than this are skipped (clamped to `ABSOLUTE_MAX_FILE_BYTES`).
    pub max_file_bytes: u64,

    /// Directory names skipped anywhere in the tree, on top of .gitignore.
    pub exclude_dir_names: Vec<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_files: 2_000,
            max_file_bytes: 512 * 1024,
            exclude_dir_names: vec![],
        }
    }
}

impl NamespaceConfig {
    pub fn effective_max_file_bytes(&self) -> u64 {
        self.max_file_bytes.min(ABSOLUTE_MAX_FILE_BYTES)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigator: NavigatorConfig,
    pub display: DisplayConfig,
    pub namespace: NamespaceConfig,
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("symnav").join("config.json"))
}

/// Load `<root>/.symnav.json`, then the per-user config, then defaults.
///
/// A file that exists but fails to parse is reported and treated as absent.
pub fn load_config(root: &Path) -> Config {
    let candidates = std::iter::once(root.join(CONFIG_FILE_NAME)).chain(user_config_path());

    for path in candidates {
        let Ok(text) = std::fs::read_to_string(&path) else { continue };
        match serde_json::from_str::<Config>(&text) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed config");
            }
        }
    }

    Config::default()
}
