//! PostgreSQL connection pool bootstrap

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::{
    config::DatabaseConfig,
    error::{sanitize_url, DatabaseError, Error, Result},
};

/// Create a PostgreSQL connection pool, retrying with exponential backoff
pub(crate) async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| {
            let mut err = DatabaseError::from(e);
            err.message = format!(
                "Failed to connect to database at '{}': {} ({})",
                sanitize_url(&config.url),
                err.message,
                categorize_db_error(err.kind)
            );
            Error::Database(err)
        })
}

/// Short hint for a connection failure
fn categorize_db_error(kind: crate::error::DatabaseErrorKind) -> &'static str {
    use crate::error::DatabaseErrorKind as K;
    match kind {
        K::Configuration => "check the connection URL format",
        K::ConnectionFailed => "check that the server is reachable",
        K::PoolExhausted => "pool timed out, the server may be overloaded",
        _ => "connection error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseErrorKind;

    #[test]
    fn test_categorize_db_error() {
        assert_eq!(
            categorize_db_error(DatabaseErrorKind::Configuration),
            "check the connection URL format"
        );
        assert_eq!(categorize_db_error(DatabaseErrorKind::Other), "connection error");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_retries() {
        let config = DatabaseConfig {
            url: "not-a-url".to_string(),
            max_connections: 1,
            min_connections: 0,
            connection_timeout_secs: 1,
            max_retries: 0,
            retry_delay_secs: 0,
        };

        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
