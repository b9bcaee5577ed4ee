//! Sessions: one unit of work per handle, explicit commit/rollback lifecycle.

use sqlx::{Database, Pool, Transaction};
use thiserror::Error;

/// Behavior settings for sessions produced by a factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Commit work left in a [`SessionScope`] at exit instead of rolling it
    /// back. Off by default: commit is caller-driven, and scope exit
    /// discards uncommitted work.
    pub commit_on_exit: bool,
}

/// Errors that can occur over a session's lifetime.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A connection could not be acquired or the transaction not begun.
    #[error("failed to begin session: {0}")]
    Begin(#[source] sqlx::Error),

    /// The commit failed; the unit of work is gone either way.
    #[error("failed to commit session: {0}")]
    Commit(#[source] sqlx::Error),

    /// The rollback failed; the unit of work is gone either way.
    #[error("failed to roll back session: {0}")]
    Rollback(#[source] sqlx::Error),

    /// The scope has no live session (never entered, or already closed).
    #[error("no active session in this scope")]
    NotActive,
}

/// Produces new [`Session`]s bound to one engine.
///
/// Cloning is cheap (the pool is shared); each clone produces sessions
/// against the same engine.
pub struct SessionFactory<DB: Database> {
    pool: Pool<DB>,
    settings: SessionSettings,
}

impl<DB: Database> std::fmt::Debug for SessionFactory<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<DB: Database> Clone for SessionFactory<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            settings: self.settings,
        }
    }
}

impl<DB: Database> SessionFactory<DB> {
    /// Binds a factory to an engine with the given session settings.
    pub fn new(pool: Pool<DB>, settings: SessionSettings) -> Self {
        Self { pool, settings }
    }

    /// The engine this factory is bound to.
    pub fn engine(&self) -> &Pool<DB> {
        &self.pool
    }

    /// The settings applied to sessions from this factory.
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Begins a new unit of work.
    ///
    /// Each caller gets its own session; a session is never shared between
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Begin`] if no connection can be acquired or
    /// the transaction cannot start.
    pub async fn session(&self) -> Result<Session<DB>, SessionError> {
        let tx = self.pool.begin().await.map_err(SessionError::Begin)?;
        tracing::trace!("session started");
        Ok(Session { tx })
    }

    /// Creates a [`SessionScope`] that acquires sessions from this factory.
    pub fn scope(&self) -> SessionScope<DB> {
        SessionScope {
            factory: self.clone(),
            session: None,
        }
    }
}

/// One unit of work against the database.
///
/// Exactly one of [`Session::commit`] or [`Session::rollback`] consumes the
/// handle. A session dropped without either rolls back: work never leaks
/// past the handle's lifetime.
pub struct Session<DB: Database> {
    tx: Transaction<'static, DB>,
}

impl<DB: Database> Session<DB> {
    /// The executor for issuing queries inside this unit of work.
    pub fn connection(&mut self) -> &mut DB::Connection {
        &mut self.tx
    }

    /// Commits the unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Commit`] with the driver error (e.g. a
    /// constraint violation surfaced at commit).
    pub async fn commit(self) -> Result<(), SessionError> {
        self.tx.commit().await.map_err(SessionError::Commit)?;
        tracing::trace!("session committed");
        Ok(())
    }

    /// Discards the unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rollback`] with the driver error.
    pub async fn rollback(self) -> Result<(), SessionError> {
        self.tx.rollback().await.map_err(SessionError::Rollback)?;
        tracing::trace!("session rolled back");
        Ok(())
    }
}

/// Scoped session wrapper with guaranteed release.
///
/// [`SessionScope::enter`] acquires a session from the factory; the session
/// is released on every exit path: [`SessionScope::commit`],
/// [`SessionScope::rollback`], and [`SessionScope::exit`] all close it and
/// clear the stored handle, and a scope dropped with a live session rolls
/// it back.
///
/// One session per enter/exit cycle: after `commit` or `rollback`, calling
/// either again without re-entering returns [`SessionError::NotActive`].
pub struct SessionScope<DB: Database> {
    factory: SessionFactory<DB>,
    session: Option<Session<DB>>,
}

impl<DB: Database> SessionScope<DB> {
    /// Acquires a fresh session, starting a new cycle.
    ///
    /// A session left over from a previous cycle is rolled back first so the
    /// scope never holds two connections.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Begin`] if acquisition fails.
    pub async fn enter(&mut self) -> Result<(), SessionError> {
        self.session = None;
        self.session = Some(self.factory.session().await?);
        Ok(())
    }

    /// The live session, for issuing queries.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotActive`] outside an enter/exit cycle.
    pub fn session(&mut self) -> Result<&mut Session<DB>, SessionError> {
        self.session.as_mut().ok_or(SessionError::NotActive)
    }

    /// Commits the live session and clears it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotActive`] if no session is attached, or
    /// [`SessionError::Commit`] from the driver.
    pub async fn commit(&mut self) -> Result<(), SessionError> {
        let session = self.session.take().ok_or(SessionError::NotActive)?;
        session.commit().await
    }

    /// Rolls back the live session and clears it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotActive`] if no session is attached, or
    /// [`SessionError::Rollback`] from the driver.
    pub async fn rollback(&mut self) -> Result<(), SessionError> {
        let session = self.session.take().ok_or(SessionError::NotActive)?;
        session.rollback().await
    }

    /// Ends the cycle, closing any live session.
    ///
    /// Commits when the factory's `commit_on_exit` setting is on, rolls back
    /// otherwise. Exiting with no live session is a no-op, so calling this
    /// after an explicit commit or rollback is always safe.
    ///
    /// # Errors
    ///
    /// Returns the driver error from the commit or rollback.
    pub async fn exit(&mut self) -> Result<(), SessionError> {
        match self.session.take() {
            Some(session) if self.factory.settings.commit_on_exit => session.commit().await,
            Some(session) => session.rollback().await,
            None => Ok(()),
        }
    }
}
