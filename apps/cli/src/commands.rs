//! Subcommand implementations

use anyhow::{Context, Result, anyhow, bail};
use locksmith_jwt::JwtManager;
use locksmith_rotation::notify::TracingNotifier;
use locksmith_rotation::store::{
    LocalSecretStore, LocalStoreConfig, MemorySecretStore, SecretStore,
};
use locksmith_rotation::StoreError;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, StoreKind};

/// Time given to detached rotation notifications before the process exits
const NOTIFY_SETTLE: Duration = Duration::from_millis(50);

fn open_store(config: &AppConfig) -> Result<Arc<dyn SecretStore>> {
    match config.store.kind {
        StoreKind::Memory => Ok(Arc::new(MemorySecretStore::new())),
        StoreKind::Local => {
            let path = config.store.path.as_ref().ok_or_else(|| {
                anyhow!("store.path is required for the local store (set LOCKSMITH_STORE__PATH or --store-path)")
            })?;
            let path = if path.is_absolute() {
                path.clone()
            } else {
                std::env::current_dir()
                    .context("cannot resolve relative store path")?
                    .join(path)
            };
            let store = LocalSecretStore::new(LocalStoreConfig::new(path))
                .context("invalid local store configuration")?;
            Ok(Arc::new(store))
        }
    }
}

async fn connect(config: &AppConfig) -> Result<JwtManager> {
    JwtManager::connect(
        open_store(config)?,
        config.policy,
        config.jwt.clone(),
        Arc::new(TracingNotifier),
    )
    .await
    .context("failed to initialize signing secrets")
}

/// Load the store and rotate once
pub async fn rotate(config: &AppConfig) -> Result<()> {
    let manager = connect(config).await?;
    let info = manager.rotate().await.context("rotation failed")?;
    println!("{info}");
    settle_notifications().await;
    Ok(())
}

/// Print the newest persisted secret without touching the store
pub async fn status(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    match store.get_latest().await {
        Ok(latest) => {
            let records = store.get_all().await.context("failed to list secrets")?;
            println!("active:  {}", latest.id);
            println!("created: {}", latest.created_at.to_rfc3339());
            println!("stored:  {}", records.len());
            Ok(())
        }
        Err(StoreError::Empty) => {
            println!("no secrets stored");
            Ok(())
        }
        Err(e) => Err(e).context("failed to read secrets"),
    }
}

/// Rotate on the configured interval until Ctrl-C
pub async fn run(config: &AppConfig) -> Result<()> {
    let manager = connect(config).await?;
    let engine = manager.engine();
    engine
        .start_periodic()
        .context("cannot start periodic rotation (is policy.rotation_interval set?)")?;

    tracing::info!(
        interval = ?config.policy.rotation_interval,
        grace_period = ?config.policy.grace_period,
        "Rotating until interrupted"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    engine.stop_periodic();
    tracing::info!("Shutting down");
    Ok(())
}

/// Sign a JSON claim set with the active secret
pub async fn sign(config: &AppConfig, claims: &str) -> Result<()> {
    let claims: Value = serde_json::from_str(claims).context("claims are not valid JSON")?;
    if !claims.is_object() {
        bail!("claims must be a JSON object");
    }

    let manager = connect(config).await?;
    let token = manager.sign(&claims).context("signing failed")?;
    println!("{token}");
    settle_notifications().await;
    Ok(())
}

/// Validate a token against the stored secrets
pub async fn verify(config: &AppConfig, token: &str) -> Result<()> {
    let manager = connect(config).await?;
    let validated = manager
        .validate::<Value>(token.trim())
        .context("token rejected")?;

    let report = json!({
        "kid": validated.key_id,
        "alg": validated.algorithm.as_str(),
        "claims": validated.claims,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the active secret as hex
pub async fn export(config: &AppConfig) -> Result<()> {
    let manager = connect(config).await?;
    println!("{}", manager.export_active_secret_hex());
    settle_notifications().await;
    Ok(())
}

/// Let notifications spawned by a rotation reach the log
async fn settle_notifications() {
    tokio::time::sleep(NOTIFY_SETTLE).await;
}
