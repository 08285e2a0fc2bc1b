//! Turso/libsql database bootstrap
//!
//! Supports three connection modes:
//! - **Local**: SQLite file, no network (like regular SQLite)
//! - **Remote**: Connect to Turso cloud or libsql-server
//! - **EmbeddedReplica**: Local SQLite that syncs with remote Turso

use std::time::Duration;

use crate::{
    config::{TursoConfig, TursoMode},
    error::{sanitize_url, DatabaseError, Error, Result},
};

/// Open a libsql database, retrying with exponential backoff
pub(crate) async fn create_database(config: &TursoConfig) -> Result<libsql::Database> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_database(config).await {
            Ok(db) => {
                if attempt > 0 {
                    tracing::info!(
                        "Turso database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!("Turso database connected: mode={:?}", config.mode);
                }
                return Ok(db);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to Turso database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Turso connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_database(config: &TursoConfig) -> Result<libsql::Database> {
    match config.mode {
        TursoMode::Local => build_local_database(config).await,
        TursoMode::Remote => build_remote_database(config).await,
        TursoMode::EmbeddedReplica => build_embedded_replica(config).await,
    }
}

fn required<'a, T>(value: &'a Option<T>, mode: &str, key: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        Error::Database(DatabaseError::new(
            crate::error::DatabaseOperation::Connect,
            crate::error::DatabaseErrorKind::Configuration,
            format!("Turso {} mode requires '{}' configuration", mode, key),
        ))
    })
}

async fn build_local_database(config: &TursoConfig) -> Result<libsql::Database> {
    let path = required(&config.path, "local", "path")?;

    tracing::debug!("Opening local Turso database at: {}", path.display());

    libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| {
            connect_error(
                format!("local database at '{}'", path.display()),
                &e,
            )
        })
}

async fn build_remote_database(config: &TursoConfig) -> Result<libsql::Database> {
    let url = required(&config.url, "remote", "url")?;
    let token = required(&config.auth_token, "remote", "auth_token")?;

    let url_safe = sanitize_url(url);
    tracing::debug!("Connecting to remote Turso database: {}", url_safe);

    libsql::Builder::new_remote(url.clone(), token.clone())
        .build()
        .await
        .map_err(|e| connect_error(format!("Turso at '{}'", url_safe), &e))
}

async fn build_embedded_replica(config: &TursoConfig) -> Result<libsql::Database> {
    let path = required(&config.path, "embedded_replica", "path")?;
    let url = required(&config.url, "embedded_replica", "url")?;
    let token = required(&config.auth_token, "embedded_replica", "auth_token")?;

    let url_safe = sanitize_url(url);
    tracing::debug!(
        "Opening embedded replica at '{}' syncing with '{}'",
        path.display(),
        url_safe
    );

    let mut builder = libsql::Builder::new_remote_replica(path.clone(), url.clone(), token.clone())
        .read_your_writes(config.read_your_writes);

    if let Some(secs) = config.sync_interval_secs {
        builder = builder.sync_interval(Duration::from_secs(secs));
    }

    builder.build().await.map_err(|e| {
        connect_error(
            format!(
                "embedded replica at '{}' syncing with '{}'",
                path.display(),
                url_safe
            ),
            &e,
        )
    })
}

fn connect_error(target: String, err: &libsql::Error) -> Error {
    Error::Database(DatabaseError::connection_failed(format!(
        "Failed to open {}: {} ({})",
        target,
        categorize_turso_error(err),
        err
    )))
}

/// Short hint for a connection failure
fn categorize_turso_error(err: &libsql::Error) -> &'static str {
    let err_str = err.to_string().to_lowercase();

    if err_str.contains("auth") || err_str.contains("token") || err_str.contains("unauthorized") {
        "authentication error, check the auth token"
    } else if err_str.contains("connect") || err_str.contains("network") || err_str.contains("dns")
    {
        "network error, check connectivity"
    } else if err_str.contains("permission") || err_str.contains("denied") {
        "permission error, check file permissions"
    } else if err_str.contains("timeout") {
        "connection timeout"
    } else if err_str.contains("corrupt") || err_str.contains("malformed") {
        "database file is corrupt"
    } else {
        "connection error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseErrorKind;

    #[tokio::test]
    async fn test_local_database_creation() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("local.db");

        let db = create_database(&TursoConfig::local(&db_path)).await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute("CREATE TABLE IF NOT EXISTS _check (id INTEGER)", ())
            .await
            .unwrap();

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_missing_path_is_a_configuration_error() {
        let mut config = TursoConfig::local("unused.db");
        config.path = None;
        config.max_retries = 0;

        let err = create_database(&config).await.err().unwrap();
        match err {
            Error::Database(db) => assert_eq!(db.kind, DatabaseErrorKind::Configuration),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_remote_requires_auth_token() {
        let config = TursoConfig {
            mode: TursoMode::Remote,
            url: Some("libsql://app.turso.io".into()),
            max_retries: 0,
            ..TursoConfig::local("unused.db")
        };

        let err = create_database(&config).await.err().unwrap();
        assert!(err.to_string().contains("auth_token"));
    }
}
