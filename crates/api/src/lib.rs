//! Transit Classifier API Server
//!
//! HTTP front end that turns light curves into planet probabilities.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use inference_engine::Predictor;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

pub use config::{AppConfig, CorsConfig, InputConfig, LogConfig, ServerConfig};
pub use error::ApiError;
pub use rate_limit::RateLimitConfig;

use rate_limit::create_governor_config;

/// Application state shared across handlers
pub struct AppState {
    /// Feature extraction plus the process-wide model
    pub predictor: Predictor,
    /// Cadence for requests that omit one (minutes)
    pub default_cadence_min: f64,
    /// Prometheus handle when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(predictor: Predictor, input: &InputConfig) -> Self {
        Self {
            predictor,
            default_cadence_min: input.default_cadence_min,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Build the predictor described by `config`. The model is not loaded yet.
    pub fn from_config(config: &AppConfig) -> Self {
        let predictor = Predictor::from_config(&config.features, config.model.clone(), config.input.validator());
        Self::new(predictor, &config.input)
    }

    /// Expose metrics from this recorder on `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Requested cadence, or the configured default
    pub fn cadence(&self, requested: Option<f64>) -> f64 {
        requested.unwrap_or(self.default_cadence_min)
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let mut predict = Router::new()
        .route("/predict", post(routes::predict::from_json))
        .route("/predict-text", post(routes::predict::from_text))
        .route("/predict-file", post(routes::predict::from_file));

    if let Some(governor) = create_governor_config(&config.rate_limit) {
        info!(
            per_second = config.rate_limit.per_second,
            burst_size = config.rate_limit.burst_size,
            "Rate limiting prediction routes"
        );
        predict = predict.layer(GovernorLayer { config: governor });
    }

    Router::new()
        .route("/", get(routes::health::root))
        .route("/healthz", get(routes::health::healthz))
        .route("/metrics", get(routes::health::metrics))
        .merge(predict)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; any method, any header, no credentials
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allows_any() {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Initialize logging. `RUST_LOG` takes precedence over `log.level`.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

/// Run the server until Ctrl+C or SIGTERM
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let state = AppState::from_config(&config).with_metrics(handle);
    let bundle = state
        .predictor
        .warm()
        .with_context(|| format!("failed to load model from {}", config.model.dir.display()))?;
    info!(
        classifier = bundle.classifier_name(),
        features = bundle.feature_order().len(),
        "Model loaded"
    );

    let app = create_router(Arc::new(state), &config);

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Starting API server on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
