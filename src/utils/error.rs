use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiceError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for RiceError {
    fn from(err: image::ImageError) -> Self {
        // 解码失败统一视为不支持的图像
        RiceError::UnsupportedImage(err.to_string())
    }
}

impl RiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RiceError::UnsupportedImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RiceError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RiceError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RiceError::Base64(_) => StatusCode::BAD_REQUEST,
            RiceError::Json(_) => StatusCode::BAD_REQUEST,
            RiceError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RiceError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            RiceError::UnsupportedImage(_) => "UNSUPPORTED_IMAGE",
            RiceError::Inference(_) => "INFERENCE_ERROR",
            RiceError::InvalidInput(_) => "INVALID_INPUT",
            RiceError::FileTooLarge(_) => "FILE_TOO_LARGE",
            RiceError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            RiceError::Config(_) => "CONFIG_ERROR",
            RiceError::Io(_) => "IO_ERROR",
            RiceError::Json(_) => "JSON_ERROR",
            RiceError::Base64(_) => "BASE64_DECODE_ERROR",
            RiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// 附在错误响应上的错误信息
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for RiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        let details = ErrorDetails {
            code: self.error_code(),
            message: self.to_string(),
        };
        let body = crate::web::handlers::ApiResponse::<()>::error(
            details.code.to_string(),
            details.message.clone(),
            uuid::Uuid::new_v4().to_string(),
        );

        // 请求ID由中间件回填
        let mut response = (status, axum::Json(body)).into_response();
        response.extensions_mut().insert(details);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_errors_map_to_unsupported_image() {
        let err: RiceError = image::load_from_memory(b"not an image").unwrap_err().into();
        assert!(matches!(err, RiceError::UnsupportedImage(_)));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "UNSUPPORTED_IMAGE");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            RiceError::ModelLoad("missing".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RiceError::Inference("mismatch".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RiceError::FileTooLarge("10 bytes".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn error_responses_carry_details_for_middleware() {
        let response = RiceError::UnsupportedImage("bad bytes".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let details = response.extensions().get::<ErrorDetails>().unwrap();
        assert_eq!(details.code, "UNSUPPORTED_IMAGE");
        assert_eq!(details.message, "Unsupported image: bad bytes");
    }

    #[test]
    fn display_includes_details() {
        let err = RiceError::FileTooLarge("2048 bytes, max allowed: 1024 bytes".into());
        assert_eq!(
            err.to_string(),
            "File too large: 2048 bytes, max allowed: 1024 bytes"
        );
    }
}
