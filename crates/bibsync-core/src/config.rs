//! Configuration for bibsync
//!
//! Loaded from TOML with every section optional:
//!
//! ```toml
//! [source]
//! database = "~/Zotero/zotero.sqlite"
//! key_manager = "~/Zotero/better-bibtex.sqlite"   # default: next to the database
//! use_key_manager = true
//!
//! [cache]
//! dir = "~/.cache/bibsync"
//!
//! [search]
//! debounce_ms = 150
//!
//! [merge]
//! policy = "preserve_section"
//! start_marker = "## Notes"
//! end_marker = ""
//! author_disambiguator = ""
//! double_spaced = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extract::SourceStore;
use crate::merge::{MergeOptions, MergePolicy};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "BIBSYNC_CONFIG";

/// Standard key-manager file name, looked up beside the reference database
pub const KEY_MANAGER_FILE: &str = "better-bibtex.sqlite";

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BibsyncConfig {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub merge: MergeConfig,
}

/// Location of the reference store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the reference database
    pub database: PathBuf,
    /// Citation-key manager database, when not at its standard location
    pub key_manager: Option<PathBuf>,
    /// Consult the key manager at all
    pub use_key_manager: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let zotero = dirs::home_dir().unwrap_or_default().join("Zotero");
        Self {
            database: zotero.join("zotero.sqlite"),
            key_manager: None,
            use_key_manager: true,
        }
    }
}

impl SourceConfig {
    /// Key-manager database to read, if enabled.
    ///
    /// Defaults to `better-bibtex.sqlite` beside the reference database.
    pub fn key_manager_path(&self) -> Option<PathBuf> {
        if !self.use_key_manager {
            return None;
        }
        self.key_manager.clone().or_else(|| {
            self.database
                .parent()
                .map(|dir| dir.join(KEY_MANAGER_FILE))
        })
    }
}

/// Where snapshots are persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for snapshot documents (default: user cache dir)
    pub dir: Option<PathBuf>,
}

/// Interactive search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet interval before a debounced query is scored
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 150 }
    }
}

/// Preservation policy names as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    OverwriteAll,
    PreserveAll,
    PreserveSection,
}

/// Note merge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub policy: PolicyKind,
    pub start_marker: String,
    pub end_marker: String,
    pub author_disambiguator: String,
    pub double_spaced: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::PreserveAll,
            start_marker: String::new(),
            end_marker: String::new(),
            author_disambiguator: String::new(),
            double_spaced: false,
        }
    }
}

impl MergeConfig {
    /// Build merge options, optionally overriding the configured policy
    pub fn to_options(&self, policy: Option<PolicyKind>) -> MergeOptions {
        let policy = match policy.unwrap_or(self.policy) {
            PolicyKind::OverwriteAll => MergePolicy::OverwriteAll,
            PolicyKind::PreserveAll => MergePolicy::PreserveAll,
            PolicyKind::PreserveSection => MergePolicy::PreserveSection {
                start_marker: self.start_marker.clone(),
                end_marker: self.end_marker.clone(),
            },
        };
        MergeOptions {
            policy,
            author_disambiguator: self.author_disambiguator.clone(),
            double_spaced: self.double_spaced,
        }
    }
}

impl BibsyncConfig {
    /// Parse a config document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: BibsyncConfig = toml::from_str(content)?;
        config.expand_home();
        Ok(config)
    }

    /// Load a config file from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `$BIBSYNC_CONFIG` or the user config dir, falling back to defaults
    pub fn load_standard() -> Result<Self, ConfigError> {
        match Self::standard_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Resolved config file location
    pub fn standard_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("bibsync").join("config.toml"))
    }

    /// Source handle for the configured database
    pub fn source_store(&self) -> SourceStore {
        SourceStore {
            database: self.source.database.clone(),
            key_manager: self.source.key_manager_path(),
        }
    }

    /// Directory holding snapshot documents
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("bibsync")
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    fn expand_home(&mut self) {
        self.source.database = expand_tilde(&self.source.database);
        self.source.key_manager = self.source.key_manager.as_deref().map(expand_tilde);
        self.cache.dir = self.cache.dir.as_deref().map(expand_tilde);
    }
}

/// Expand a leading `~` against the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
