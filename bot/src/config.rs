//! Bot configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use kahukura_types::MemberId;
use kahukura_utils::LogFormat;
use kahukura_verification::{DomainPolicy, VerificationParams};

use crate::BotError;

/// Configuration for the bot.
///
/// Can be loaded from a TOML file via [`BotConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    /// Data directory for the LMDB store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address the gateway HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Base URL of the chat-platform bridge.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Timeout for ordinary bridge requests.
    #[serde(default = "default_bridge_timeout_secs")]
    pub bridge_timeout_secs: u64,

    /// Institutional email domains accepted for verification.
    #[serde(default = "default_accepted_domains")]
    pub accepted_domains: Vec<String>,

    /// How long a verification code stays valid.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,

    /// Minimum gap between code requests. 0 disables the cooldown.
    #[serde(default)]
    pub code_resend_cooldown_secs: u64,

    /// Minimum gap between self-service data exports.
    #[serde(default = "default_export_throttle_secs")]
    pub export_throttle_secs: u64,

    /// How long confirm/cancel prompts wait before cancelling.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Members with the administrator role regardless of platform flags.
    #[serde(default)]
    pub admin_ids: Vec<MemberId>,

    /// Members allowed to hard-delete verification data.
    #[serde(default)]
    pub data_steward_ids: Vec<MemberId>,

    /// Members with the moderator role regardless of platform flags.
    #[serde(default)]
    pub moderator_ids: Vec<MemberId>,

    /// How the verify command is named in instructions sent to members.
    #[serde(default = "default_verify_command_hint")]
    pub verify_command_hint: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve the Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,

    /// LMDB map size in megabytes.
    #[serde(default = "default_lmdb_map_size_mb")]
    pub lmdb_map_size_mb: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./kahukura_data")
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7090))
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:7091".to_string()
}

fn default_bridge_timeout_secs() -> u64 {
    10
}

fn default_accepted_domains() -> Vec<String> {
    vec!["myvuw.ac.nz".to_string(), "vuw.ac.nz".to_string()]
}

fn default_code_ttl_secs() -> u64 {
    kahukura_verification::params::DEFAULT_CODE_TTL_SECS
}

fn default_export_throttle_secs() -> u64 {
    kahukura_verification::params::DEFAULT_EXPORT_THROTTLE_SECS
}

fn default_confirmation_timeout_secs() -> u64 {
    kahukura_verification::params::DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_verify_command_hint() -> String {
    "/verify".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lmdb_map_size_mb() -> usize {
    256
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, BotError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BotError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, BotError> {
        toml::from_str(s).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, BotError> {
        toml::to_string_pretty(self).map_err(|e| BotError::Config(e.to_string()))
    }

    pub fn verification_params(&self) -> VerificationParams {
        VerificationParams {
            code_ttl_secs: self.code_ttl_secs,
            resend_cooldown_secs: self.code_resend_cooldown_secs,
            export_throttle_secs: self.export_throttle_secs,
            confirmation_timeout_secs: self.confirmation_timeout_secs,
        }
    }

    pub fn domain_policy(&self) -> Result<DomainPolicy, BotError> {
        Ok(DomainPolicy::new(&self.accepted_domains)?)
    }

    /// Check the settings that would otherwise only fail at first use.
    pub fn validate(&self) -> Result<(), BotError> {
        self.verification_params().validate()?;
        self.domain_policy()?;
        if self.bridge_timeout_secs == 0 {
            return Err(BotError::Config("bridge_timeout_secs must be greater than zero".into()));
        }
        if self.lmdb_map_size_mb == 0 {
            return Err(BotError::Config("lmdb_map_size_mb must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listen_addr: default_listen_addr(),
            bridge_url: default_bridge_url(),
            bridge_timeout_secs: default_bridge_timeout_secs(),
            accepted_domains: default_accepted_domains(),
            code_ttl_secs: default_code_ttl_secs(),
            code_resend_cooldown_secs: 0,
            export_throttle_secs: default_export_throttle_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            admin_ids: Vec::new(),
            data_steward_ids: Vec::new(),
            moderator_ids: Vec::new(),
            verify_command_hint: default_verify_command_hint(),
            log_format: LogFormat::Human,
            log_level: default_log_level(),
            enable_metrics: false,
            lmdb_map_size_mb: default_lmdb_map_size_mb(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = BotConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = BotConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.listen_addr, config.listen_addr);
        assert_eq!(parsed.accepted_domains, config.accepted_domains);
        assert_eq!(parsed.log_format, LogFormat::Human);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = BotConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.code_ttl_secs, 600);
        assert_eq!(config.export_throttle_secs, 604_800);
        assert_eq!(config.confirmation_timeout_secs, 60);
        assert_eq!(config.accepted_domains, vec!["myvuw.ac.nz", "vuw.ac.nz"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            accepted_domains = ["uni.edu"]
            admin_ids = ["1001"]
            log_format = "json"
            code_resend_cooldown_secs = 120
        "#;
        let config = BotConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.accepted_domains, vec!["uni.edu"]);
        assert_eq!(config.admin_ids, vec![MemberId::new("1001").unwrap()]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.verification_params().resend_cooldown_secs, 120);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn invalid_member_id_rejected() {
        let result = BotConfig::from_toml_str(r#"admin_ids = [""]"#);
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn validate_catches_bad_domains() {
        let config = BotConfig {
            accepted_domains: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BotError::Verification(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = BotConfig::from_toml_file(Path::new("/nonexistent/kahukura.toml"));
        assert!(matches!(result, Err(BotError::Config(_))));
    }
}
