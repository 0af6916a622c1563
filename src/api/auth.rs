use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{AccountDto, ApiError, ApiResponse, AppState, CredentialsRequest, LoginResponse};
use crate::services::{Access, AccountError};

// ============================================================================
// Middleware
// ============================================================================

/// Gate for protected routes. Reads the token from `Authorization`, either
/// raw or as `Bearer <token>`, and re-validates it against the store on every
/// request. On success the resolved `Account` is placed in request extensions.
pub async fn require_access_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(request.headers());

    match state.guard.check(token.as_deref()).await? {
        Access::Allowed(account) => {
            tracing::Span::current().record("user_id", account.id);
            request.extensions_mut().insert(account);
            Ok(next.run(request).await)
        }
        Access::Denied(reason) => {
            tracing::debug!(reason = reason.as_str(), "Access denied");
            Err(AccountError::Authorization.into())
        }
    }
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    Some(token.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AccountDto>>), ApiError> {
    let Json(payload) = payload?;

    let account = state
        .accounts
        .register(&payload.username, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccountDto::from(account))),
    ))
}

/// POST /login
/// Returns the access token issued at registration
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;

    let account = state
        .accounts
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        account: AccountDto::from(account),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{Account, AccountFilter, NewAccount, Store, StoreError, UserStore};
    use crate::services::{AccessGuard, CredentialHasher, StoreAccountService};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;
    use sea_orm::DbErr;
    use tower::ServiceExt;

    struct UnavailableStore;

    #[async_trait]
    impl UserStore for UnavailableStore {
        async fn insert_unique(&self, _account: NewAccount) -> Result<Account, StoreError> {
            Err(StoreError::Database(DbErr::Custom("connection refused".to_string())))
        }

        async fn find_one(
            &self,
            _filter: AccountFilter<'_>,
        ) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Database(DbErr::Custom("connection refused".to_string())))
        }
    }

    async fn app_with_unavailable_store() -> axum::Router {
        let mut config = Config::default();
        config.security.argon2_memory_cost_kib = 64;
        config.security.argon2_time_cost = 1;

        let down: Arc<dyn UserStore> = Arc::new(UnavailableStore);
        let hasher = CredentialHasher::new(&config.security).unwrap();

        let state = Arc::new(AppState {
            store: Store::new("sqlite::memory:").await.unwrap(),
            accounts: Arc::new(StoreAccountService::new(down.clone(), hasher, 8)),
            guard: AccessGuard::new(down),
            config: Arc::new(config),
            prometheus_handle: None,
        });

        crate::api::router(state)
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_raw_token() {
        assert_eq!(
            extract_access_token(&headers("abc123")).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_access_token(&headers("Bearer abc123")).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_extract_missing_header() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_store_failure_during_token_check_is_sanitized() {
        let app = app_with_unavailable_store().await;

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/content")
                    .header(AUTHORIZATION, "some-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["response"], "An internal error occurred");
        assert_eq!(json["success"], false);
        assert!(!body.windows(7).any(|w| w == b"refused"));
    }
}
