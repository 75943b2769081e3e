pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{
    image::{ImageLoader, ImagePreprocessor},
    inference::InferenceService,
    models::{ModelKind, ModelRegistry},
    utils::error::RiceError,
    Config, Result,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: InferenceService,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<ModelRegistry>) -> Self {
        let service = InferenceService::new(
            registry,
            ImageLoader::new(config.server_config.max_request_size),
            ImagePreprocessor::new(config.normalization),
        );
        Self { config, service }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    let registry = Arc::new(ModelRegistry::from_config(&config));

    // 启动时加载模型，失败则无法提供服务
    let preload = Arc::clone(&registry);
    tokio::task::spawn_blocking(move || preload.preload())
        .await
        .map_err(|e| RiceError::Internal(format!("Model loading task failed: {}", e)))??;

    let app = create_app(AppState::new(config.clone(), registry));

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        RiceError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /classify        - JSON base64 upload");
    tracing::info!("  POST /classify/upload - Multipart file upload");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/info        - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        RiceError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RiceError::Internal(format!("Server failed: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = &state.config.server_config;
    let body_limit = server_config.max_request_size;
    let timeout = Duration::from_secs(server_config.request_timeout);

    Router::new()
        .route("/classify", post(handlers::classify_json_handler))
        .route("/classify/upload", post(handlers::classify_upload_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let registry = state.service.registry();
    let models: serde_json::Map<String, serde_json::Value> = ModelKind::ALL
        .iter()
        .map(|kind| (kind.to_string(), json!(registry.is_loaded(*kind))))
        .collect();
    let ready = ModelKind::ALL.iter().all(|kind| registry.is_loaded(*kind));

    let (status, status_text) = if ready {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(json!({
            "status": status_text,
            "models": models,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "Rice Grain Classifier",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "normalization": state.service.preprocessor().normalization().as_str(),
        "input_size": [crate::image::INPUT_SIZE, crate::image::INPUT_SIZE],
        "models": state.service.registry().stats(),
    }))
}
