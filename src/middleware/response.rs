use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{AppError, ErrorCode};

/// Member of the success envelope the payload is placed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKey {
    Data,
    User,
}

impl PayloadKey {
    fn as_str(&self) -> &'static str {
        match self {
            PayloadKey::Data => "data",
            PayloadKey::User => "user",
        }
    }
}

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    payload: Option<(PayloadKey, T)>,
    token: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// `{status: "success", data}`
    pub fn success(data: T) -> Self {
        Self {
            payload: Some((PayloadKey::Data, data)),
            token: None,
        }
    }

    /// `{status: "success", user}`, the shape login answers with
    pub fn user(user: T) -> Self {
        Self {
            payload: Some((PayloadKey::User, user)),
            token: None,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl ApiResponse<()> {
    /// Bare `{status: "success"}`
    pub fn empty() -> Self {
        Self {
            payload: None,
            token: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut envelope = Map::new();
        envelope.insert("status".to_string(), json!("success"));

        if let Some((key, payload)) = self.payload {
            match serde_json::to_value(&payload) {
                Ok(value) => {
                    envelope.insert(key.as_str().to_string(), value);
                }
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return AppError::internal(ErrorCode::InternalServerError, "Internal server error")
                        .into_response();
                }
            }
        }

        if let Some(token) = self.token {
            envelope.insert("token".to_string(), Value::String(token));
        }

        (StatusCode::OK, Json(Value::Object(envelope))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn envelopes() {
        let r = ApiResponse::success(json!({"a": 1})).with_token("t".into()).into_response();
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(body(r).await, json!({"status": "success", "data": {"a": 1}, "token": "t"}));

        let r = ApiResponse::user(json!({"name": "Ann"})).into_response();
        assert_eq!(body(r).await, json!({"status": "success", "user": {"name": "Ann"}}));

        let r = ApiResponse::empty().into_response();
        assert_eq!(body(r).await, json!({"status": "success"}));
    }
}
