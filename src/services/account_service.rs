//! Domain service for account registration and login.

use thiserror::Error;

use crate::db::{Account, StoreError};

/// Closed set of failures the account core can produce.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("username already exists")]
    Conflict,

    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("username or password does not exist")]
    Authentication,

    #[error("You must be logged in to view this")]
    Authorization,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::Conflict,
            StoreError::Database(e) => Self::Store(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public view of an account. Carries no password material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: i32,
    pub username: String,
    pub access_token: String,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            access_token: account.access_token.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an account and issues its permanent access token.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for a blank username or short password,
    /// [`AccountError::Conflict`] if the username is taken.
    async fn register(&self, username: &str, password: &str) -> Result<AccountInfo, AccountError>;

    /// Verifies credentials and returns the token issued at registration.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Authentication`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<AccountInfo, AccountError>;
}
