//! Bearer-token gate for protected resources.

use std::sync::Arc;

use crate::db::{Account, AccountFilter, UserStore};
use crate::services::account_service::AccountError;

/// Outcome of a token check. Callers branch on it; the guard itself never
/// short-circuits a request.
#[derive(Debug)]
pub enum Access {
    Allowed(Account),
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    UnknownToken,
}

impl DenyReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::UnknownToken => "unknown_token",
        }
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn UserStore>,
}

impl AccessGuard {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Resolves the token against the store on every call; nothing is cached.
    pub async fn check(&self, token: Option<&str>) -> Result<Access, AccountError> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            metrics::counter!("access_checks_total", "outcome" => "missing_token").increment(1);
            return Ok(Access::Denied(DenyReason::MissingToken));
        };

        let access = match self.store.find_one(AccountFilter::AccessToken(token)).await? {
            Some(account) => Access::Allowed(account),
            None => Access::Denied(DenyReason::UnknownToken),
        };

        let outcome = match &access {
            Access::Allowed(_) => "allowed",
            Access::Denied(reason) => reason.as_str(),
        };
        metrics::counter!("access_checks_total", "outcome" => outcome).increment(1);

        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewAccount, Store, StoreError};
    use async_trait::async_trait;
    use sea_orm::DbErr;

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

    async fn store_with_account() -> (Store, Account) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let account = store
            .insert_unique(NewAccount {
                username: "alice".to_string(),
                password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
                access_token: "a".repeat(256),
            })
            .await
            .unwrap();
        (store, account)
    }

    #[tokio::test]
    async fn test_known_token_is_allowed() {
        let (store, account) = store_with_account().await;
        let guard = AccessGuard::new(Arc::new(store));

        match guard.check(Some(&account.access_token)).await.unwrap() {
            Access::Allowed(resolved) => assert_eq!(resolved.id, account.id),
            Access::Denied(reason) => panic!("expected access, got {reason:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_or_blank_token_is_denied() {
        let (store, _) = store_with_account().await;
        let guard = AccessGuard::new(Arc::new(store));

        for token in [None, Some(""), Some("   ")] {
            let access = guard.check(token).await.unwrap();
            assert!(matches!(access, Access::Denied(DenyReason::MissingToken)));
        }
    }

    #[tokio::test]
    async fn test_unknown_token_is_denied() {
        let (store, _) = store_with_account().await;
        let guard = AccessGuard::new(Arc::new(store));

        let access = guard.check(Some("not-a-real-token")).await.unwrap();
        assert!(matches!(access, Access::Denied(DenyReason::UnknownToken)));
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_a_denial() {
        let guard = AccessGuard::new(Arc::new(UnavailableStore));

        let err = guard.check(Some("some-token")).await.unwrap_err();
        assert!(matches!(err, AccountError::Store(_)));
    }

    #[tokio::test]
    async fn test_missing_token_skips_the_store() {
        let guard = AccessGuard::new(Arc::new(UnavailableStore));

        let access = guard.check(None).await.unwrap();
        assert!(matches!(access, Access::Denied(DenyReason::MissingToken)));
    }
}
