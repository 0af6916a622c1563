use serde::{Deserialize, Serialize};

use crate::services::AccountInfo;

/// Envelope shared by every JSON response: `{response, success}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub response: T,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub const fn success(response: T) -> Self {
        Self {
            response,
            success: true,
        }
    }
}

impl ApiResponse<String> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: message.into(),
            success: false,
        }
    }
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub username: String,
    pub access_token: String,
    pub user_id: i32,
}

impl From<AccountInfo> for AccountDto {
    fn from(info: AccountInfo) -> Self {
        Self {
            username: info.username,
            access_token: info.access_token,
            user_id: info.id,
        }
    }
}

/// Login answers with a flat body rather than the nested envelope.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(flatten)]
    pub account: AccountDto,
}
