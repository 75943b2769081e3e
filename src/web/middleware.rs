use crate::{
    utils::error::ErrorDetails,
    web::{extractors::RequestId, handlers::ApiResponse},
};
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// 请求ID中间件
///
/// 沿用客户端的`X-Request-ID`，否则生成新的UUID。错误响应的信封在这里
/// 补上同一个ID，并通过响应头回传。
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_headers(req.headers());
    req.extensions_mut().insert(id.clone());

    let mut response = next.run(req).await;

    if let Some(details) = response.extensions_mut().remove::<ErrorDetails>() {
        let (parts, _) = response.into_parts();
        let body =
            ApiResponse::<()>::error(details.code.to_string(), details.message, id.0.clone());
        response = (parts, Json(body)).into_response();
    }

    if let Ok(value) = HeaderValue::from_str(&id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// 请求日志中间件
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let start_time = Instant::now();

    tracing::debug!(
        "Request started: {} {} - User-Agent: {}",
        method,
        uri,
        user_agent
    );

    let response = next.run(req).await;

    tracing::info!(
        "Request completed: {} {} - {} - {}ms",
        method,
        uri,
        response.status(),
        start_time.elapsed().as_millis()
    );

    response
}

/// 安全头中间件
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    response
}
