//! Server configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `STATICBUST_DIR`: Primary directory to serve (default: `.`)
//! - `STATICBUST_ALT_DIR`: Alternate directory searched before the primary one
//! - `STATICBUST_ROOT`: URL prefix stripped before filesystem lookup
//! - `STATICBUST_INDEX_PAGE`: Index file served for directories (default: `index.html`)
//! - `STATICBUST_REDIRECT_TRAILING_SLASH`: "true" to normalise trailing slashes
//! - `STATICBUST_NO_HASH_QUERY_STRINGS`: "true" to skip hashing for requests with a query
//! - `STATICBUST_HASHING`: "false" to serve without content hashes

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::DEFAULT_HASH_LENGTH;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Configuration for a [`StaticServer`](crate::StaticServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Primary directory files are served from.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Alternate directory, searched first. Not-found falls back to `dir`.
    #[serde(default)]
    pub alt_dir: Option<PathBuf>,

    /// URL prefix stripped from request paths, e.g. `/static`.
    #[serde(default)]
    pub root: String,

    /// File served for directory requests. Empty disables index handling.
    #[serde(default = "default_index_page")]
    pub index_page: String,

    /// Redirect directories to `dir/` and files away from `file/`.
    #[serde(default)]
    pub redirect_trailing_slash: bool,

    /// Requests carrying a query string are served without hash rewriting.
    #[serde(default)]
    pub no_hash_query_strings: bool,

    /// Embed content digests in URLs.
    #[serde(default = "default_true")]
    pub hashing: bool,

    /// Digest length in hex characters.
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    /// Known on-disk filenames, used instead of globbing when recovering a
    /// digest from a hashed filename.
    #[serde(default)]
    pub filenames: Option<Vec<PathBuf>>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_index_page() -> String {
    "index.html".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hash_length() -> usize {
    DEFAULT_HASH_LENGTH
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            alt_dir: None,
            root: String::new(),
            index_page: default_index_page(),
            redirect_trailing_slash: false,
            no_hash_query_strings: false,
            hashing: true,
            hash_length: DEFAULT_HASH_LENGTH,
            filenames: None,
        }
    }
}

impl ServerConfig {
    /// Create a config serving `dir` with defaults for everything else.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay any `STATICBUST_*` environment variables onto this config.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = env::var("STATICBUST_DIR") {
            self.dir = PathBuf::from(dir);
        }
        if let Ok(alt) = env::var("STATICBUST_ALT_DIR") {
            self.alt_dir = (!alt.is_empty()).then(|| PathBuf::from(alt));
        }
        if let Ok(root) = env::var("STATICBUST_ROOT") {
            self.root = root;
        }
        if let Ok(index) = env::var("STATICBUST_INDEX_PAGE") {
            self.index_page = index;
        }
        if let Some(v) = env_flag("STATICBUST_REDIRECT_TRAILING_SLASH") {
            self.redirect_trailing_slash = v;
        }
        if let Some(v) = env_flag("STATICBUST_NO_HASH_QUERY_STRINGS") {
            self.no_hash_query_strings = v;
        }
        if let Some(v) = env_flag("STATICBUST_HASHING") {
            self.hashing = v;
        }
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[server]` section:
    /// ```toml
    /// [server]
    /// dir = "/srv/www/static"
    /// alt_dir = "/srv/www/overrides"
    /// root = "/static"
    /// redirect_trailing_slash = true
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents, path)
    }

    fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let table: toml::Table = contents
            .parse()
            .map_err(|e: toml::de::Error| parse_err(e.to_string()))?;

        match table.get("server") {
            Some(section) => section
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| parse_err(format!("[server]: {e}"))),
            None => Ok(Self::from_env()),
        }
    }

    /// Load from `path` when given, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::from_env()),
        }
    }

    /// The URL root in canonical form: empty, or `/segment[/segment…]`
    /// without a trailing slash.
    pub fn normalized_root(&self) -> String {
        let trimmed = self.root.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}
