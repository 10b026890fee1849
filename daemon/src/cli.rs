//! Command-line interface and configuration layering.
//!
//! Settings come from the `--config` file (or the defaults), then from
//! flags, then from `KAHUKURA_*` environment variables. Clap resolves flag
//! versus environment, so each flag overrides the file only when set.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kahukura_bot::BotConfig;
use kahukura_utils::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "kahukura-daemon", about = "Kahukura member verification bot")]
pub struct Cli {
    /// Path to a TOML configuration file. Flags and env vars override it.
    #[arg(long, env = "KAHUKURA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "KAHUKURA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Address the gateway listens on for the platform bridge.
    #[arg(long, env = "KAHUKURA_LISTEN_ADDR")]
    pub listen_addr: Option<SocketAddr>,

    /// Base URL of the platform bridge.
    #[arg(long, env = "KAHUKURA_BRIDGE_URL")]
    pub bridge_url: Option<String>,

    /// Accepted email domains (comma-separated).
    #[arg(long, env = "KAHUKURA_ACCEPTED_DOMAINS", value_delimiter = ',')]
    pub accepted_domains: Vec<String>,

    /// Serve Prometheus metrics at /metrics.
    #[arg(long, env = "KAHUKURA_ENABLE_METRICS")]
    pub metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "KAHUKURA_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KAHUKURA_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bot until SIGINT or SIGTERM.
    Run,
    /// Show a member's verification record.
    Lookup { member: String },
    /// Show every record claiming an email.
    LookupEmail { email: String },
    /// Show recent moderation actions, newest first.
    Modlogs {
        #[arg(long)]
        member: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the database integrity check.
    CheckDb,
    /// Print the effective configuration as TOML.
    PrintConfig,
}

impl Cli {
    /// The file (or default) configuration with flags and env applied.
    pub fn load_config(&self) -> anyhow::Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => BotConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut BotConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(url) = &self.bridge_url {
            config.bridge_url = url.clone();
        }
        if !self.accepted_domains.is_empty() {
            config.accepted_domains = self.accepted_domains.clone();
        }
        config.enable_metrics |= self.metrics;
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}
