//! Dicebound Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dicebound_engine::api;
use dicebound_engine::app::{App, AppParts};
use dicebound_engine::infrastructure::{
    config_watcher::ConfigWatcher,
    directory::{MemorySessionDirectory, SqliteSessionDirectory},
    gateway_config::GatewayConfigHandle,
    match_service::HttpMatchServiceClient,
    ports::SessionDirectory,
    settings::{DirectoryBackend, EngineSettings},
};
use dicebound_shared::{DISPLAY_NAME_HEADER, PLAYER_ID_HEADER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dicebound_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dicebound Engine");

    let settings = EngineSettings::from_env();

    let directory: Arc<dyn SessionDirectory> = match &settings.directory {
        DirectoryBackend::Sqlite(path) => {
            tracing::info!(path = %path, "Opening SQLite session directory");
            Arc::new(SqliteSessionDirectory::new(path).await?)
        }
        DirectoryBackend::Memory => {
            tracing::warn!("Using in-memory session directory; sessions are lost on restart");
            Arc::new(MemorySessionDirectory::new())
        }
    };

    if let Some(endpoint) = settings.gateway.endpoint_base.as_deref() {
        tracing::info!(
            endpoint = %endpoint,
            retry_delay_secs = settings.gateway.retry_delay.as_secs(),
            "Remote match service configured"
        );
    } else {
        tracing::info!("No remote match service configured; using the session directory directly");
    }

    let gateway_config = GatewayConfigHandle::new(settings.gateway.clone());
    let remote = Arc::new(HttpMatchServiceClient::new());
    let turn_decider_grace = chrono::Duration::from_std(settings.turn_decider_grace)?;

    let app = Arc::new(App::new(AppParts::system(
        directory,
        remote,
        gateway_config.clone(),
        settings.reaper,
        turn_decider_grace,
    )));

    let cancel = CancellationToken::new();

    // Spawn lifecycle reaper
    let reaper = app.use_cases.reaper.clone();
    let reaper_task = tokio::spawn(reaper.run(cancel.child_token()));

    // Spawn gateway config watcher
    let watcher_task = settings.config_reload_file.clone().map(|path| {
        let watcher = ConfigWatcher::new(path, settings.config_reload_interval, gateway_config);
        tokio::spawn(watcher.run(cancel.child_token()))
    });

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    let background = async {
        let _ = reaper_task.await;
        if let Some(task) = watcher_task {
            let _ = task.await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(5), background).await.is_err() {
        tracing::warn!("Background tasks did not stop within 5s");
    }

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
    let _ = dotenvy::dotenv();
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Player identity headers and JSON bodies trigger preflights.
        .allow_headers([
            HeaderName::from_static(PLAYER_ID_HEADER),
            HeaderName::from_static(DISPLAY_NAME_HEADER),
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
