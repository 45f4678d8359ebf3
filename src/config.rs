// ⚙️ Ledger Configuration
// One explicit struct handed to each component at construction.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

/// The registry page listing certified vacancy-management organizations
pub const DEFAULT_TARGET_URL: &str = "https://keurmerkleegstandbeheer.nl/gecertificeerden/";
pub const DEFAULT_DATA_FILE: &str = "companies.json";
pub const DEFAULT_TEMPLATE_FILE: &str = "template.html";
pub const DEFAULT_OUTPUT_FILE: &str = "index.html";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_HEADING_NEEDLE: &str = "gecertificeerd";

/// Optional config file the binary looks for in the working directory
pub const CONFIG_FILE_NAME: &str = "ledger.json";

// ============================================================================
// CONFIG
// ============================================================================

/// Runtime configuration.
///
/// Every field has a default, so a partial JSON file only needs to name
/// what it overrides:
///
/// ```json
/// { "data_file": "state/companies.json", "fetch_timeout_secs": 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Page holding the list of accredited organizations
    pub target_url: String,

    /// Persisted registry state (JSON)
    pub data_file: PathBuf,

    /// HTML template with `{{STATUS_HTML}}` and `{{COMPANY_CARDS}}` tokens
    pub template_file: PathBuf,

    /// Rendered status page
    pub output_file: PathBuf,

    /// Upper bound on the single blocking fetch
    pub fetch_timeout_secs: u64,

    pub user_agent: String,

    /// Heading text that anchors the oldest (heading + list) markup scheme
    pub heading_needle: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            target_url: DEFAULT_TARGET_URL.to_string(),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            template_file: PathBuf::from(DEFAULT_TEMPLATE_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            heading_needle: DEFAULT_HEADING_NEEDLE.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a JSON file, then validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: LedgerConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Use `path` when it exists, defaults otherwise
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "target_url",
                message: "must not be empty".to_string(),
            });
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }

        if self.data_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "data_file",
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();

        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.data_file, PathBuf::from("companies.json"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "output_file": "public/index.html", "fetch_timeout_secs": 30 }}"#).unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();

        assert_eq!(config.output_file, PathBuf::from("public/index.html"));
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.template_file, PathBuf::from(DEFAULT_TEMPLATE_FILE));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fetch_timeout_secs": 0 }}"#).unwrap();

        let err = LedgerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fetch_timeout_secs", .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = LedgerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::from_file_or_default(dir.path().join("ledger.json")).unwrap();

        assert_eq!(config, LedgerConfig::default());
    }
}
