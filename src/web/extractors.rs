use crate::utils::error::RiceError;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;

/// 验证的JSON提取器
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = RiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| {
                if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    RiceError::FileTooLarge(err.body_text())
                } else {
                    RiceError::InvalidInput(err.body_text())
                }
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// 验证trait
pub trait Validate {
    fn validate(&self) -> Result<(), RiceError>;
}

impl Validate for crate::web::handlers::ClassifyJsonRequest {
    fn validate(&self) -> Result<(), RiceError> {
        if self.image.trim().is_empty() {
            return Err(RiceError::InvalidInput(
                "Image data cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// 请求ID提取器
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(crate::web::middleware::REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        RequestId(request_id)
    }
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // 中间件已分配的ID优先
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return Ok(id.clone());
        }

        Ok(RequestId::from_headers(&parts.headers))
    }
}
