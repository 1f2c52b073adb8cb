//! # Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config manhaj.toml`)
//! 3. environment variables (`MANHAJ_*`)
//! 4. command-line flags (applied by the CLI)
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! database = "manhaj.redb"
//! backend = "redb"        # or "memory"
//! locale = "ar"           # or "en"
//! rate_limit = 100        # requests/second, 0 disables
//! cors_origins = "https://manhaj.example"
//! ```
//!
//! `MANHAJ_API_KEY` is deliberately not a file setting; it is read from the
//! environment by the auth middleware only.

use manhaj_core::ManhajError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum size of a config or seed file read from disk (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// ENUMS
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database file (ACID, persistent)
    #[default]
    Redb,
    /// In-memory tables (volatile, for demos and tests)
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        })
    }
}

/// Language of user-facing error messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// Pick a locale from an `Accept-Language` value.
    ///
    /// Only the first listed language is considered: `ar*` is Arabic, `en*`
    /// is English, anything else (or no header) falls back to `default`.
    pub fn negotiate(accept_language: Option<&str>, default: Self) -> Self {
        let first = accept_language
            .and_then(|v| v.split(',').next())
            .map(|tag| tag.trim().to_ascii_lowercase());
        match first.as_deref() {
            Some(tag) if tag.starts_with("ar") => Self::Ar,
            Some(tag) if tag.starts_with("en") => Self::En,
            _ => default,
        }
    }
}

impl FromStr for Locale {
    type Err = ManhajError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(ManhajError::Validation(format!(
                "unknown locale '{other}' (expected en or ar)"
            ))),
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Effective runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub backend: Backend,
    pub locale: Locale,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Comma-separated origins, or `*`. `None` allows localhost only.
    pub cors_origins: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("manhaj.redb"),
            backend: Backend::Redb,
            locale: Locale::Ar,
            rate_limit: 100,
            cors_origins: None,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ManhajError> {
        toml::from_str(text).map_err(|e| ManhajError::Serialization(format!("config: {e}")))
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ManhajError> {
        let mut settings = match path {
            Some(path) => Self::from_toml_str(&read_text_file(path)?)?,
            None => Self::default(),
        };
        settings.apply_env_from(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay `MANHAJ_*` variables supplied by `lookup`.
    ///
    /// Invalid values are logged and ignored so a typo never prevents startup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("MANHAJ_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(rps) => self.rate_limit = rps,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring invalid MANHAJ_RATE_LIMIT"),
            }
        }
        if let Some(origins) = lookup("MANHAJ_CORS_ORIGINS").filter(|v| !v.trim().is_empty()) {
            self.cors_origins = Some(origins);
        }
        if let Some(raw) = lookup("MANHAJ_LOCALE") {
            match raw.parse() {
                Ok(locale) => self.locale = locale,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring invalid MANHAJ_LOCALE"),
            }
        }
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a small UTF-8 file, refusing anything over `MAX_CONFIG_FILE_SIZE`.
pub fn read_text_file(path: &Path) -> Result<String, ManhajError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        ManhajError::Storage(format!("cannot read '{}': {e}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(ManhajError::Validation(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ManhajError::Validation(format!(
            "'{}' is {} bytes, larger than the {MAX_CONFIG_FILE_SIZE} byte limit",
            path.display(),
            metadata.len()
        )));
    }
    std::fs::read_to_string(path)
        .map_err(|e| ManhajError::Storage(format!("cannot read '{}': {e}", path.display())))
}
