use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Select, Set, SqlErr,
};
use std::fmt;

use crate::db::StoreError;
use crate::entities::accounts;

/// Account record as stored. Never serialized: responses use `AccountInfo`.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub access_token: String,
    pub created_at: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            access_token: model.access_token,
            created_at: model.created_at,
        }
    }
}

/// Fields supplied by the caller when creating an account
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountFilter<'a> {
    Username(&'a str),
    AccessToken(&'a str),
}

impl AccountFilter<'_> {
    fn select(self) -> Select<accounts::Entity> {
        match self {
            Self::Username(username) => {
                accounts::Entity::find().filter(accounts::Column::Username.eq(username))
            }
            Self::AccessToken(token) => {
                accounts::Entity::find().filter(accounts::Column::AccessToken.eq(token))
            }
        }
    }
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert relying on the unique index on `username` to settle races.
    pub async fn insert_unique(&self, account: NewAccount) -> Result<Account, StoreError> {
        let active = accounts::ActiveModel {
            username: Set(account.username),
            password_hash: Set(account.password_hash),
            access_token: Set(account.access_token),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Account::from(model)),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    Err(StoreError::Duplicate(detail))
                }
                _ => Err(StoreError::Database(err)),
            },
        }
    }

    pub async fn find_one(&self, filter: AccountFilter<'_>) -> Result<Option<Account>, StoreError> {
        let account = filter.select().one(&self.conn).await?;
        Ok(account.map(Account::from))
    }

    pub async fn count(&self, filter: AccountFilter<'_>) -> Result<u64, StoreError> {
        Ok(filter.select().count(&self.conn).await?)
    }
}
