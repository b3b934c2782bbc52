//! changewatch API Gateway
//!
//! HTTP front for the change-monitoring store.
//! Handles:
//! - Source registration and check recording
//! - Change browsing
//! - Enquiry storage, keyword search and reuse accounting
//! - Rate limiting and observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    http::Uri,
    routing::{get, post, put},
    Router,
};
use changewatch_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    errors::AppError,
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config);

    info!("Starting changewatch API Gateway v{}", changewatch_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::connect_with_retry(&config.database).await?;

    if config.database.auto_migrate {
        let applied = db.migrate().await?;
        info!(applied, "Schema up to date");
    }

    let seeded = Repository::new(db.clone())
        .ensure_sources(&config.monitor.sources)
        .await?;
    if seeded > 0 {
        info!(seeded, "Registered configured sources");
    }

    let config = Arc::new(config);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        resource_type: "route".to_string(),
        id: uri.path().to_string(),
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    use handlers::{changes, enquiries, health, sources};

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/status", get(health::status))

        // Source endpoints
        .route("/sources", get(sources::list_sources).post(sources::create_source))
        .route(
            "/sources/{id}",
            get(sources::get_source)
                .patch(sources::update_source)
                .delete(sources::delete_source),
        )
        .route("/sources/{id}/checks", post(sources::record_check))
        .route("/sources/{id}/changes", get(sources::list_source_changes))

        // Change endpoints
        .route("/changes", get(changes::recent_changes))
        .route("/changes/{id}", get(changes::get_change))

        // Enquiry endpoints
        .route("/enquiries", post(enquiries::create_enquiry))
        .route("/enquiries/search", post(enquiries::search_enquiries))
        .route(
            "/enquiries/{id}",
            get(enquiries::get_enquiry).put(enquiries::update_enquiry),
        )
        .route("/enquiries/{id}/reuse", post(enquiries::reuse_enquiry))
        .route("/enquiries/{id}/verification", put(enquiries::set_verification));

    let mut app = Router::new()
        .nest("/v1", api_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::metrics::track_request));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter = create_rate_limiter(rate_limit.requests_per_second, rate_limit.burst);
        let limit = rate_limit.requests_per_second;
        app = app.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                rate_limit_middleware(request, next, limiter.clone(), limit)
            },
        ));
    }

    // Compose the app
    app.layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
