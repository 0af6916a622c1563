use axum::{Extension, Json};
use serde_json::{Value, json};

use crate::db::Account;

const SECRET_CONTENT: &str = "secret content";

/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "About": "Authentication backend: register, log in, and view protected content",
        "Routes": [
            {
                "/register": "to register new user",
                "/login": "to login existing user",
                "/content": "content only accessible for logged in users",
            }
        ],
    }))
}

/// GET /content (behind `require_access_token`)
pub async fn content(Extension(account): Extension<Account>) -> &'static str {
    tracing::debug!(user_id = account.id, "Serving protected content");
    SECRET_CONTENT
}
