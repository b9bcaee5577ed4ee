//! Sethub server binary — the entry point for the Sethub backend.
//!
//! Wires configuration, structured logging, the project directory layout,
//! and the database session factory together, then serves a health endpoint
//! and the static content folders with graceful shutdown on SIGTERM/SIGINT.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use sethub_config::{load_config, Config, ProjectPaths};
use sethub_db::{
    connect, ConnectionParams, DbError, Driver, EngineSettings, SessionFactory, SessionSettings,
    UrlError,
};
use sqlx::{Postgres, Sqlite};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

/// Application state shared across all request handlers.
#[derive(Clone)]
struct AppState {
    /// Session factory for whichever driver the configuration selected.
    sessions: DbHandle,
}

/// A connected session factory, dispatched by driver.
#[derive(Clone)]
enum DbHandle {
    Postgres(SessionFactory<Postgres>),
    Sqlite(SessionFactory<Sqlite>),
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbHandle::Postgres(_) => f.write_str("DbHandle::Postgres"),
            DbHandle::Sqlite(_) => f.write_str("DbHandle::Sqlite"),
        }
    }
}

impl DbHandle {
    /// Verifies that a connection can be checked out of the engine.
    async fn ping(&self) -> bool {
        match self {
            DbHandle::Postgres(factory) => factory.engine().acquire().await.is_ok(),
            DbHandle::Sqlite(factory) => factory.engine().acquire().await.is_ok(),
        }
    }
}

/// Health check handler.
///
/// Returns `200 OK` with server status, version, and engine liveness. Used
/// by load balancers, monitoring, and CI to verify the server is running.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = if state.sessions.ping().await {
        "up"
    } else {
        "down"
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database
    }))
}

/// Builds the application router: health plus the static content folders.
fn app(state: Arc<AppState>, paths: &ProjectPaths) -> Router {
    let mut router = Router::new().route("/health", get(health));

    // Serve the content folders only when they exist; a backend deployed
    // without a frontend checkout still starts.
    if paths.static_dir.is_dir() {
        tracing::info!(path = %paths.static_dir.display(), "serving static assets at /static");
        router = router.nest_service("/static", ServeDir::new(&paths.static_dir));
    } else {
        tracing::info!(path = %paths.static_dir.display(), "static folder not found, skipping");
    }

    if paths.media_dir.is_dir() {
        tracing::info!(path = %paths.media_dir.display(), "serving media at /media");
        router = router.nest_service("/media", ServeDir::new(&paths.media_dir));
    } else {
        tracing::info!(path = %paths.media_dir.display(), "media folder not found, skipping");
    }

    router.with_state(state)
}

/// Maps the `[database]` section onto typed connection parameters.
fn connection_params(config: &Config) -> Result<ConnectionParams, UrlError> {
    Ok(ConnectionParams {
        driver: Driver::parse(&config.database.driver)?,
        host: config.database.host.clone(),
        port: config.database.port,
        username: config.database.username.clone(),
        password: config.database.password.clone(),
        database: config.database.database.clone(),
    })
}

/// Connects the engine for the configured driver and binds a session factory.
async fn connect_database(config: &Config) -> Result<DbHandle, DbError> {
    let params = connection_params(config)?;
    let engine = EngineSettings {
        max_connections: config.engine.max_connections,
        min_connections: config.engine.min_connections,
        acquire_timeout_ms: config.engine.acquire_timeout_ms,
        idle_timeout_ms: config.engine.idle_timeout_ms,
    };
    let session = SessionSettings {
        commit_on_exit: config.session.commit_on_exit,
    };

    match params.driver {
        Driver::Postgres => Ok(DbHandle::Postgres(
            connect::<Postgres>(&params, &engine, &session).await?,
        )),
        Driver::Sqlite => Ok(DbHandle::Sqlite(
            connect::<Sqlite>(&params, &engine, &session).await?,
        )),
    }
}

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("SETHUB_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Resolve the project directory layout
    let paths = ProjectPaths::resolve(Path::new(&config.app.root))
        .expect("failed to resolve project paths — check app.root in config");

    // Connect the database engine and bind the session factory
    let sessions = connect_database(&config)
        .await
        .expect("failed to connect database engine — check the [database] section in config");

    let state = Arc::new(AppState { sessions });

    // Build application
    let app = app(state, &paths);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, name = %config.app.name, "starting sethub server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("sethub server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn memory_state() -> Arc<AppState> {
        let mut params = ConnectionParams::new(Driver::Sqlite);
        params.database = Some(":memory:".to_string());

        let engine = EngineSettings {
            max_connections: 1,
            min_connections: 1,
            ..EngineSettings::default()
        };

        let factory = connect::<Sqlite>(&params, &engine, &SessionSettings::default())
            .await
            .expect("in-memory engine should connect");

        Arc::new(AppState {
            sessions: DbHandle::Sqlite(factory),
        })
    }

    #[tokio::test]
    async fn health_check_reports_engine_liveness() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::resolve(dir.path()).expect("paths should resolve");
        let app = app(memory_state().await, &paths);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "up");
    }

    #[tokio::test]
    async fn static_assets_are_served_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let static_dir = dir.path().join("frontend/static");
        std::fs::create_dir_all(&static_dir).expect("static dir");
        std::fs::write(static_dir.join("app.css"), "body {}").expect("asset file");

        let paths = ProjectPaths::resolve(dir.path()).expect("paths should resolve");
        let app = app(memory_state().await, &paths);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/app.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn config_driver_dispatch_rejects_unknown_driver() {
        let mut config = Config::default();
        config.database.driver = "oracle".to_string();

        let err = connect_database(&config)
            .await
            .expect_err("unknown driver should fail");
        assert!(matches!(err, DbError::Url(UrlError::UnknownDriver(_))));
    }
}
