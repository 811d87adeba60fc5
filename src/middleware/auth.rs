use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::app::AppState;
use crate::auth::{changed_password_after, validate_jwt};
use crate::database::models::User;
use crate::error::{ApiError, AppError};

/// Authenticated identity, resolved from the store on every request
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_changed_at: user.password_changed_at,
        }
    }
}

/// Authorization gate for protected routes. On success the `Principal` is
/// available to handlers through `Extension<Principal>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authorize(&state, request.headers()).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Runs the four gate checks in order; the first failure is the answer.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        tracing::debug!("Rejected request without bearer token");
        AppError::invalid_token(None)
    })?;

    let claims = validate_jwt(token, &state.config.security.jwt_secret).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::invalid_token(None)
    })?;

    let user = state.users.find_by_id(&claims.id).await?.ok_or_else(|| {
        tracing::warn!("Rejected bearer token for unknown user {}", claims.id);
        AppError::invalid_token(Some(token))
    })?;

    if changed_password_after(user.password_changed_at, claims.iat) {
        tracing::warn!("Rejected bearer token issued before password change for user {}", user.id);
        return Err(AppError::invalid_token(Some(token)).into());
    }

    Ok(Principal::from(user))
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use chrono::Duration;
    use tower::ServiceExt;

    use crate::auth::{generate_jwt, password_changed_timestamp, Claims};
    use crate::config::AppConfig;
    use crate::database::models::{NewUser, UserChanges};
    use crate::database::UserStore;
    use crate::mail::LogMailer;

    fn state() -> AppState {
        AppState::in_memory(AppConfig::development(), Arc::new(LogMailer))
    }

    async fn seed_user(state: &AppState) -> User {
        state
            .users
            .insert(NewUser {
                name: "Ann".into(),
                email: "ann@x.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
    }

    fn token_for(state: &AppState, user: &User, issued: DateTime<Utc>) -> String {
        let claims = Claims::issued_at(&user.id, &user.name, &user.email, issued, 1);
        generate_jwt(&claims, &state.config.security.jwt_secret).unwrap()
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/me", get(|Extension(p): Extension<Principal>| async move { p.id }))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(app: Router, header: Option<String>) -> (StatusCode, serde_json::Value, String) {
        let mut builder = HttpRequest::builder().uri("/me");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        (status, json, text)
    }

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn valid_token_attaches_principal() {
        let state = state();
        let user = seed_user(&state).await;
        let token = token_for(&state, &user, Utc::now());

        let (status, _, body) = call(app(state), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.id);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (status, json, _) = call(app(state()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["errorCode"], "INVALID_OR_EXPIRED_TOKEN");
        assert_eq!(json["errors"]["token"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn garbage_and_expired_tokens_are_rejected() {
        let state = state();
        let user = seed_user(&state).await;
        let expired = token_for(&state, &user, Utc::now() - Duration::hours(2));

        for header in ["Bearer not.a.token".to_string(), format!("Bearer {}", expired)] {
            let (status, json, _) = call(app(state.clone()), Some(header)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json["errorCode"], "INVALID_OR_EXPIRED_TOKEN");
        }
    }

    #[tokio::test]
    async fn deleted_user_is_rejected() {
        let state = state();
        let user = seed_user(&state).await;
        let token = token_for(&state, &user, Utc::now());
        state.users.delete(&user.id).await.unwrap();

        let (status, json, _) = call(app(state), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["errorCode"], "INVALID_OR_EXPIRED_TOKEN");
        assert_eq!(json["errors"]["token"], token);
    }

    #[tokio::test]
    async fn token_older_than_password_change_is_rejected() {
        let state = state();
        let user = seed_user(&state).await;
        let stale = token_for(&state, &user, Utc::now() - Duration::minutes(5));

        state
            .users
            .update_profile(
                &user.id,
                UserChanges {
                    name: user.name.clone(),
                    email: user.email.clone(),
                    password_hash: Some("new-hash".into()),
                    password_changed_at: Some(password_changed_timestamp(Utc::now())),
                },
            )
            .await
            .unwrap();

        let (status, json, _) = call(app(state.clone()), Some(format!("Bearer {}", stale))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["errorCode"], "INVALID_OR_EXPIRED_TOKEN");

        let fresh = token_for(&state, &user, Utc::now());
        let (status, _, _) = call(app(state), Some(format!("Bearer {}", fresh))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
