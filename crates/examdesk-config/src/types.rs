//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # backend connection
//! [cache]                  # site-settings cache
//! [storage]                # persisted client state
//! [site]                   # fallback branding
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default backend API root.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/api/";

/// Default timeout for general requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for the profile check, in seconds.
pub const DEFAULT_PROFILE_TIMEOUT_SECS: u64 = 10;

/// Default settings-cache TTL, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default site name shown before settings load.
pub const DEFAULT_SITE_NAME: &str = "Certification Exams";

/// Default logo shown before settings load.
pub const DEFAULT_LOGO_URL: &str = "/logo.png";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamdeskConfig {
    /// Backend connection settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Settings-cache configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,

    /// Persisted state location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Fallback site branding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteConfig>,
}

impl ExamdeskConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config with every section filled with defaults.
    pub fn with_defaults() -> Self {
        Self {
            server: Some(ServerConfig::default()),
            cache: Some(CacheSection::default()),
            storage: Some(StorageConfig::default()),
            site: Some(SiteConfig::default()),
        }
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: ExamdeskConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.storage.is_some() {
            self.storage = other.storage;
        }

        if other.site.is_some() {
            self.site = other.site;
        }
    }

    /// Effective server settings.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Effective cache settings.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Effective storage settings.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Effective site fallbacks.
    pub fn site(&self) -> SiteConfig {
        self.site.clone().unwrap_or_default()
    }

    /// Override the backend URL, keeping the rest of `[server]`.
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.server.get_or_insert_with(ServerConfig::default).url = url.into();
    }

    /// Override the storage directory.
    pub fn set_storage_dir(&mut self, dir: impl Into<PathBuf>) {
        self.storage.get_or_insert_with(StorageConfig::default).dir = Some(dir.into());
    }

    /// Check values that would make the client unusable.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        if !(server.url.starts_with("http://") || server.url.starts_with("https://")) {
            return Err(invalid("server.url", "must be an http:// or https:// URL"));
        }
        if server.timeout_secs == 0 {
            return Err(invalid("server.timeout_secs", "must be greater than zero"));
        }
        if server.profile_timeout_secs == 0 {
            return Err(invalid(
                "server.profile_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.cache().ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API root, e.g. `https://api.example.com/api/`.
    pub url: String,
    /// Timeout for general requests.
    pub timeout_secs: u64,
    /// Timeout for the profile check.
    pub profile_timeout_secs: u64,
    /// Custom User-Agent header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            profile_timeout_secs: DEFAULT_PROFILE_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings-cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// How long a fetched value stays fresh.
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Where persisted client state lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, else the platform default, else `./.examdesk`.
    pub fn effective_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(crate::default_data_dir)
            .unwrap_or_else(|| PathBuf::from(".examdesk"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Site Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Branding shown until public settings have been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub fallback_name: String,
    pub fallback_logo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_contact_email: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            fallback_name: DEFAULT_SITE_NAME.to_string(),
            fallback_logo_url: DEFAULT_LOGO_URL.to_string(),
            fallback_contact_email: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = ExamdeskConfig::new();
        assert!(config.server.is_none());
        assert!(config.cache.is_none());
        assert_eq!(config.server().url, DEFAULT_SERVER_URL);
        assert_eq!(config.cache().ttl(), Duration::from_secs(300));
        assert_eq!(config.site().fallback_name, DEFAULT_SITE_NAME);
    }

    #[test]
    fn test_parse_full() {
        let toml = r#"
[server]
url = "https://api.example.com/api/"
timeout_secs = 20
profile_timeout_secs = 5
user_agent = "examdesk-test"

[cache]
ttl_secs = 60

[storage]
dir = "/var/lib/examdesk"

[site]
fallback_name = "Cert Hub"
fallback_logo_url = "https://cdn.example.com/logo.svg"
fallback_contact_email = "help@example.com"
"#;
        let config = ExamdeskConfig::from_toml(toml).unwrap();
        let server = config.server();
        assert_eq!(server.url, "https://api.example.com/api/");
        assert_eq!(server.timeout(), Duration::from_secs(20));
        assert_eq!(server.profile_timeout(), Duration::from_secs(5));
        assert_eq!(server.user_agent.as_deref(), Some("examdesk-test"));
        assert_eq!(config.cache().ttl_secs, 60);
        assert_eq!(
            config.storage().effective_dir(),
            PathBuf::from("/var/lib/examdesk")
        );
        assert_eq!(
            config.site().fallback_contact_email.as_deref(),
            Some("help@example.com")
        );
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config = ExamdeskConfig::from_toml(
            r#"
[server]
url = "https://api.example.com/"
"#,
        )
        .unwrap();
        let server = config.server();
        assert_eq!(server.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(server.profile_timeout_secs, DEFAULT_PROFILE_TIMEOUT_SECS);
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_unknown_value_type_is_error() {
        let err = ExamdeskConfig::from_toml("[cache]\nttl_secs = \"five\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = ExamdeskConfig::from_toml(
            r#"
[server]
url = "https://base.example.com/"
timeout_secs = 45

[cache]
ttl_secs = 120
"#,
        )
        .unwrap();
        let overlay = ExamdeskConfig::from_toml(
            r#"
[server]
url = "https://project.example.com/"
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.server().url, "https://project.example.com/");
        assert_eq!(base.server().timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(base.cache().ttl_secs, 120);
    }

    #[test]
    fn test_overrides_keep_rest_of_section() {
        let mut config = ExamdeskConfig::from_toml("[server]\ntimeout_secs = 12\n").unwrap();
        config.set_server_url("https://cli.example.com/");
        config.set_storage_dir("/tmp/examdesk");

        assert_eq!(config.server().url, "https://cli.example.com/");
        assert_eq!(config.server().timeout_secs, 12);
        assert_eq!(
            config.storage().dir.as_deref(),
            Some(std::path::Path::new("/tmp/examdesk"))
        );
    }

    #[test]
    fn test_roundtrip_defaults() {
        let config = ExamdeskConfig::with_defaults();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[server]"));
        assert!(toml.contains("ttl_secs = 300"));
        let parsed = ExamdeskConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.server, config.server);
        assert_eq!(parsed.cache, config.cache);
        assert_eq!(parsed.site, config.site);
    }

    #[test]
    fn test_validate() {
        assert!(ExamdeskConfig::new().validate().is_ok());

        let mut config = ExamdeskConfig::new();
        config.set_server_url("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.url"
        ));

        let config = ExamdeskConfig::from_toml("[cache]\nttl_secs = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config =
            ExamdeskConfig::from_toml("[server]\nprofile_timeout_secs = 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
