//! Engine creation: an async connection pool bound to one database URL.

use std::time::Duration;

use sqlx::pool::PoolOptions;
use sqlx::{Database, Pool};
use thiserror::Error;

/// Runtime tunables for the connection pool backing an engine.
///
/// These are passed through to the driver unchanged; the engine imposes no
/// policy of its own on top of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum number of pooled connections.
    pub max_connections: u32,

    /// Connections kept open even when idle.
    pub min_connections: u32,

    /// How long an acquire may wait before failing, in milliseconds.
    pub acquire_timeout_ms: u64,

    /// Close connections idle for longer than this, in milliseconds.
    pub idle_timeout_ms: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: None,
        }
    }
}

/// Errors that can occur when creating an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The driver rejected the URL or the database was unreachable.
    #[error("failed to connect database engine: {0}")]
    Connect(#[source] sqlx::Error),
}

/// Creates an engine for the given URL.
///
/// Connects eagerly: a malformed URL or unreachable host surfaces here, as
/// the driver's error, rather than on first use.
///
/// # Errors
///
/// Returns [`EngineError::Connect`] with the underlying driver error.
pub async fn create_engine<DB: Database>(
    url: &str,
    settings: &EngineSettings,
) -> Result<Pool<DB>, EngineError> {
    let mut options = PoolOptions::<DB>::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));

    if let Some(idle_ms) = settings.idle_timeout_ms {
        options = options.idle_timeout(Duration::from_millis(idle_ms));
    }

    let pool = options.connect(url).await.map_err(EngineError::Connect)?;

    tracing::debug!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "database engine connected"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Sqlite;

    #[tokio::test]
    async fn create_in_memory_engine() {
        let settings = EngineSettings {
            max_connections: 3,
            min_connections: 1,
            acquire_timeout_ms: 2_500,
            idle_timeout_ms: None,
        };

        let pool = create_engine::<Sqlite>("sqlite::memory:", &settings)
            .await
            .expect("engine creation should succeed");

        // The eager connect leaves one live connection behind.
        assert_eq!(pool.size(), 1);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn engine_enforces_connection_cap() {
        let settings = EngineSettings {
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_ms: 200,
            idle_timeout_ms: None,
        };

        let pool = create_engine::<Sqlite>("sqlite::memory:", &settings)
            .await
            .expect("engine creation should succeed");

        let held = pool.acquire().await.expect("first acquire should succeed");
        let second = pool.acquire().await;
        assert!(second.is_err(), "second acquire should time out at the cap");
        drop(held);
    }

    #[tokio::test]
    async fn unreachable_database_surfaces_driver_error() {
        // No mode=rwc and no such file: the driver refuses to open it.
        let err = create_engine::<Sqlite>(
            "sqlite:///no/such/directory/sethub.db",
            &EngineSettings::default(),
        )
        .await
        .expect_err("missing database file should fail");

        assert!(matches!(err, EngineError::Connect(_)));
    }
}
