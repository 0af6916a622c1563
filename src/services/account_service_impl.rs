//! `UserStore`-backed implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

use crate::db::{AccountFilter, NewAccount, UserStore};
use crate::services::account_service::{AccountError, AccountInfo, AccountService};
use crate::services::credentials::CredentialHasher;
use crate::services::tokens::generate_access_token;

pub struct StoreAccountService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    min_password_length: usize,
}

impl StoreAccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        min_password_length: usize,
    ) -> Self {
        Self {
            store,
            hasher,
            min_password_length,
        }
    }

    fn validate(&self, username: &str, password: &str) -> Result<(), AccountError> {
        if username.trim().is_empty() {
            return Err(AccountError::Validation("username is required".to_string()));
        }

        if password.chars().count() < self.min_password_length {
            return Err(AccountError::Validation(format!(
                "password must be minimum {} characters long",
                self.min_password_length
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl AccountService for StoreAccountService {
    async fn register(&self, username: &str, password: &str) -> Result<AccountInfo, AccountError> {
        self.validate(username, password)?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Internal(format!("Password hashing task panicked: {e}")))??;

        let account = self
            .store
            .insert_unique(NewAccount {
                username: username.to_string(),
                password_hash,
                access_token: generate_access_token(),
            })
            .await
            .inspect_err(|e| debug!(username, error = %e, "Registration rejected by store"))?;

        metrics::counter!("accounts_registered_total").increment(1);
        info!(user_id = account.id, username = %account.username, "Account registered");

        Ok(AccountInfo::from(&account))
    }

    async fn login(&self, username: &str, password: &str) -> Result<AccountInfo, AccountError> {
        let account = self.store.find_one(AccountFilter::Username(username)).await?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());

        // Run CPU-intensive password verification in a blocking task
        let is_valid = task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_unknown(&password),
        })
        .await
        .map_err(|e| AccountError::Internal(format!("Password verification task panicked: {e}")))?;

        match account {
            Some(account) if is_valid => {
                metrics::counter!("login_attempts_total", "outcome" => "success").increment(1);
                info!(user_id = account.id, "Login succeeded");
                Ok(AccountInfo::from(&account))
            }
            _ => {
                metrics::counter!("login_attempts_total", "outcome" => "failure").increment(1);
                debug!(username, "Login failed");
                Err(AccountError::Authentication)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::{Account, Store, StoreError};
    use sea_orm::DbErr;

    fn cheap_hasher() -> CredentialHasher {
        CredentialHasher::new(&SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        })
        .unwrap()
    }

    async fn service() -> (StoreAccountService, Store) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = StoreAccountService::new(Arc::new(store.clone()), cheap_hasher(), 8);
        (service, store)
    }

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

    #[tokio::test]
    async fn test_register_returns_token_and_stores_hash() {
        let (service, store) = service().await;

        let info = service.register("alice", "password123").await.unwrap();
        assert_eq!(info.username, "alice");
        assert_eq!(info.access_token.len(), 256);

        let stored = store
            .find_one(AccountFilter::Username("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, info.id);
        assert_eq!(stored.access_token, info.access_token);
        assert_ne!(stored.password_hash, "password123");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_password_length_boundary() {
        let (service, _) = service().await;

        let err = service.register("short", "1234567").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Validation(ref msg) if msg == "password must be minimum 8 characters long"
        ));

        assert!(service.register("exact", "12345678").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_counts_characters_not_bytes() {
        let (service, _) = service().await;

        // 7 characters, 14 bytes
        let err = service.register("unicode", "ééééééé").await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_requires_username() {
        let (service, _) = service().await;

        let err = service.register("   ", "password123").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::Validation(ref msg) if msg == "username is required"
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let (service, store) = service().await;

        service.register("alice", "password123").await.unwrap();
        let err = service.register("alice", "different-pass").await.unwrap_err();

        assert!(matches!(err, AccountError::Conflict));
        assert_eq!(
            store
                .count_accounts(AccountFilter::Username("alice"))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_login_returns_registration_token() {
        let (service, _) = service().await;

        let registered = service.register("alice", "password123").await.unwrap();
        let first = service.login("alice", "password123").await.unwrap();
        let second = service.login("alice", "password123").await.unwrap();

        assert_eq!(first, registered);
        assert_eq!(second.access_token, registered.access_token);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service().await;
        service.register("alice", "password123").await.unwrap();

        let wrong_password = service.login("alice", "password124").await.unwrap_err();
        let unknown_user = service.login("mallory", "password123").await.unwrap_err();

        assert!(matches!(wrong_password, AccountError::Authentication));
        assert!(matches!(unknown_user, AccountError::Authentication));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_store_failures_surface_as_store_errors() {
        let service = StoreAccountService::new(Arc::new(UnavailableStore), cheap_hasher(), 8);

        let err = service.register("alice", "password123").await.unwrap_err();
        assert!(matches!(err, AccountError::Store(_)));

        let err = service.login("alice", "password123").await.unwrap_err();
        assert!(matches!(err, AccountError::Store(_)));
    }
}
