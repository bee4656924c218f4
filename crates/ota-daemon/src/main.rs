// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use ota_daemon::{AppState, build_app};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Self-hosted update server for Expo-protocol OTA clients.
#[derive(Parser, Debug)]
#[command(name = "ota-daemon", version, about = "Self-hosted Expo-protocol OTA updates server")]
struct Args {
    /// Path to a TOML config file. Environment variables always override
    /// whatever this file sets (`ota-config`'s precedence).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address override; takes precedence over both the config file
    /// and `OTA_BIND_ADDR` if given.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ota_config::load_config(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let filter = config
        .log_level
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for warning in ota_config::validate_config(&config).context("configuration failed validation")? {
        tracing::warn!(%warning, "configuration advisory");
    }

    let pool = ota_db::connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;
    ota_db::run_migrations(&pool).await.context("failed to run migrations")?;

    let admin_token = config.bearer_secret.clone();
    let admin_password_hash = ota_core::hash::sha256_b64url(config.admin_password.as_bytes());
    ota_db::users::ensure_admin_user(&pool, "admin", &admin_password_hash, &admin_token)
        .await
        .context("failed to bootstrap admin user")?;

    let store = ota_store::BlobStore::from_config(&config.store).context("failed to initialize object store")?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState { pool, store, config });
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(bind = %bind_addr, "ota-daemon listening");

    axum::serve(listener, app).await.context("server exited")
}
