//! Kahukura daemon: runs the verification bot, or inspects its store offline.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use kahukura_bot::{Bot, BotConfig, Collaborators};
use kahukura_gateway::{BridgeClient, GatewayServer, ShutdownController};
use kahukura_store::{IdentityStore, ModerationLogStore};
use kahukura_store_lmdb::integrity::{check_data_dir, check_integrity};
use kahukura_store_lmdb::{LmdbEnvironment, Migrator};
use kahukura_types::{Email, MemberId, SystemClock};
use kahukura_verification::RandomCodeSource;

use crate::cli::{Cli, Command};

/// records, email_index, moderation_log, meta
const MAX_DBS: u32 = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    kahukura_utils::init_logging(config.log_format, &config.log_level);

    match &cli.command {
        Command::Run => run(config).await?,
        Command::Lookup { member } => {
            let env = open_store(&config)?;
            let member = MemberId::new(member.as_str())?;
            match env.identity_store().get(&member)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("no record for {member}"),
            }
        }
        Command::LookupEmail { email } => {
            let env = open_store(&config)?;
            let email = Email::parse(email)?;
            let store = env.identity_store();
            let mut found = Vec::new();
            if let Some(record) = store.get_by_email(&email)? {
                found.push(record.member_id.clone());
                found.extend(
                    store
                        .get_many_by_email_excluding(&email, &record.member_id)?
                        .into_iter()
                        .map(|r| r.member_id),
                );
            }
            if found.is_empty() {
                println!("no record claims {email}");
            }
            for member in found {
                if let Some(record) = store.get(&member)? {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
            }
        }
        Command::Modlogs { member, limit } => {
            let env = open_store(&config)?;
            let member = member.as_deref().map(MemberId::new).transpose()?;
            for stored in env.moderation_log_store().recent(member.as_ref(), *limit)? {
                println!("{}", serde_json::to_string(&stored.entry)?);
            }
        }
        Command::CheckDb => {
            let env = open_store(&config)?;
            let report = check_integrity(&env)?;
            println!(
                "checked {} databases, {} entries",
                report.databases_checked, report.total_entries
            );
            for error in &report.errors {
                println!("error: {error}");
            }
            if !report.is_healthy() {
                anyhow::bail!("{} integrity errors", report.errors.len());
            }
        }
        Command::PrintConfig => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn open_store(config: &BotConfig) -> anyhow::Result<LmdbEnvironment> {
    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let env = LmdbEnvironment::open(
        &config.data_dir,
        MAX_DBS,
        config.lmdb_map_size_mb * 1024 * 1024,
    )
    .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;
    Migrator::run(&env.meta_store()).context("schema migration failed")?;
    Ok(env)
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    tracing::info!(
        listen = %config.listen_addr,
        bridge = %config.bridge_url,
        domains = ?config.accepted_domains,
        "starting Kahukura"
    );

    let env = open_store(&config)?;
    let report = check_integrity(&env)?;
    if !report.is_healthy() {
        for error in &report.errors {
            tracing::error!(%error, "integrity check failed");
        }
        anyhow::bail!("store failed its integrity check; run check-db for details");
    }
    tracing::info!(
        databases = report.databases_checked,
        entries = report.total_entries,
        "store integrity check passed"
    );

    let bridge = Arc::new(BridgeClient::new(
        &config.bridge_url,
        Duration::from_secs(config.bridge_timeout_secs),
        Duration::from_secs(config.confirmation_timeout_secs),
    )?);
    let bot = Arc::new(Bot::new(
        &config,
        Collaborators {
            identity: Arc::new(env.identity_store()),
            moderation_log: Arc::new(env.moderation_log_store()),
            membership: bridge.clone(),
            notifier: bridge.clone(),
            mailer: bridge.clone(),
            prompt: bridge,
            clock: Arc::new(SystemClock),
            codes: Arc::new(RandomCodeSource),
        },
    )?);

    let shutdown = Arc::new(ShutdownController::new());
    let server = GatewayServer::new(bot, config.listen_addr, config.enable_metrics);
    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    server.serve(shutdown.signalled()).await?;
    signals.abort();
    tracing::info!("Kahukura exited cleanly");
    Ok(())
}
