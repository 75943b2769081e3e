use crate::{
    inference::ClassificationReport,
    models::ModelKind,
    utils::error::RiceError,
    web::{
        extractors::{RequestId, ValidatedJson},
        AppState,
    },
    Result,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct ClassifyJsonRequest {
    /// Base64编码的图像数据
    pub image: String,

    /// 分类模式，默认为品种分类
    #[serde(default = "default_mode")]
    pub mode: ModelKind,
}

fn default_mode() -> ModelKind {
    ModelKind::Type
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }

    pub fn error(code: String, message: String, request_id: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError { code, message }),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// JSON base64上传处理器
pub async fn classify_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<ClassifyJsonRequest>,
) -> Result<Json<ApiResponse<ClassificationReport>>> {
    tracing::info!(
        "Processing JSON classification request: request_id={}, mode={}",
        request_id,
        request.mode
    );

    let service = state.service.clone();
    let mode = request.mode;
    let report = tokio::task::spawn_blocking(move || service.classify_base64(mode, &request.image))
        .await
        .map_err(|e| RiceError::Internal(format!("Inference task failed: {}", e)))??;

    tracing::info!(
        "JSON classification completed: request_id={}, result={}",
        request_id,
        report.prediction
    );

    Ok(Json(ApiResponse::success(report, request_id)))
}

/// Multipart文件上传处理器
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ClassificationReport>>> {
    tracing::info!(
        "Processing multipart classification request: request_id={}",
        request_id
    );

    let mut image_data: Option<axum::body::Bytes> = None;
    let mut mode = default_mode();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                // 验证内容类型
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(RiceError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file data", e))?;

                if data.is_empty() {
                    return Err(RiceError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            "mode" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read mode field", e))?;
                mode = value.parse()?;
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data = image_data
        .ok_or_else(|| RiceError::InvalidInput("No image file provided".to_string()))?;

    let service = state.service.clone();
    let report = tokio::task::spawn_blocking(move || service.classify_bytes(mode, &image_data))
        .await
        .map_err(|e| RiceError::Internal(format!("Inference task failed: {}", e)))??;

    tracing::info!(
        "Upload classification completed: request_id={}, result={}",
        request_id,
        report.prediction
    );

    Ok(Json(ApiResponse::success(report, request_id)))
}

/// 超出请求体上限的错误映射为413，其余视为非法输入
fn multipart_error(context: &str, err: MultipartError) -> RiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RiceError::FileTooLarge(err.body_text())
    } else {
        RiceError::InvalidInput(format!("{}: {}", context, err))
    }
}
