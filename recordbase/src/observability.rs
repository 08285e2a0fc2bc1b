//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install a global fmt subscriber configured by the `[logging]` section
///
/// An invalid `level` directive falls back to `info`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))?;

    tracing::info!(
        level = %config.logging.level,
        json = config.logging.json,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_installs_once() {
        let config = Config::default();
        // The first call may lose to another test; the second always fails
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
