use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{http::HeaderValue, middleware, Router};
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use storefront_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init DB
    let pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
    }
    let db = Arc::new(pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()));

    // Compose shared app state
    let state = Arc::new(api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
    });

    let cors = build_cors_layer(&cfg)?;

    let app = Router::new()
        .nest("/api/v1", api::api_v1_routes())
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
        .layer(middleware::from_fn(api::request_id::propagate_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.request_timeout_secs,
        )))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = cfg
        .server_addr()
        .parse()
        .context("invalid host/port configuration")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("storefront-api listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn build_cors_layer(cfg: &api::config::AppConfig) -> anyhow::Result<CorsLayer> {
    let origins = cfg.cors_origins();
    if origins.is_empty() {
        if cfg.is_production() {
            anyhow::bail!("cors_allowed_origins must be set in production");
        }
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
