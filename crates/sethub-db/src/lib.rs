//! Database bootstrap layer for the Sethub backend.
//!
//! Builds a connection URL from typed parameters, creates an async engine
//! (a sqlx connection pool) bound to that URL, and produces session handles
//! with explicit commit/rollback lifecycle.
//!
//! # Design decisions
//!
//! - **Everything delegates to sqlx**: transaction semantics, pooling,
//!   ordering, and backpressure belong to the driver. This crate adds no
//!   retry, timeout, or recovery logic of its own; any driver error means
//!   the caller abandons the session.
//! - **Generic over the driver**: entry points take a `sqlx::Database` type
//!   parameter, so production code runs on Postgres while tests run against
//!   in-memory SQLite.
//! - **Ownership enforces the session lifetime**: exactly one of
//!   commit/rollback consumes a [`Session`], and a session dropped without
//!   either rolls back. A handle cannot outlive its unit of work.

mod engine;
mod session;
mod url;

pub use engine::{create_engine, EngineError, EngineSettings};
pub use session::{Session, SessionError, SessionFactory, SessionScope, SessionSettings};
pub use url::{connection_url, ConnectionParams, Driver, UrlError};

use sqlx::Database;
use thiserror::Error;

/// Errors from the composed [`connect`] path.
#[derive(Debug, Error)]
pub enum DbError {
    /// The connection parameters were incomplete or invalid.
    #[error(transparent)]
    Url(#[from] UrlError),

    /// The engine could not be created.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Builds the URL, creates the engine, and binds a session factory to it.
///
/// This is the whole bootstrap in one call; the individual steps are public
/// for callers that need to intervene between them.
///
/// # Errors
///
/// Returns [`DbError::Url`] for incomplete parameters (before any network
/// activity) and [`DbError::Engine`] when the driver rejects the URL or the
/// database is unreachable.
pub async fn connect<DB: Database>(
    params: &ConnectionParams,
    engine: &EngineSettings,
    session: &SessionSettings,
) -> Result<SessionFactory<DB>, DbError> {
    let url = connection_url(params)?;
    let pool = create_engine::<DB>(&url, engine).await?;
    Ok(SessionFactory::new(pool, *session))
}
