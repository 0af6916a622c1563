pub mod account_service;
pub use account_service::{AccountError, AccountInfo, AccountService};

pub mod account_service_impl;
pub use account_service_impl::StoreAccountService;

pub mod credentials;
pub use credentials::CredentialHasher;

pub mod guard;
pub use guard::{Access, AccessGuard, DenyReason};

pub mod tokens;
pub use tokens::generate_access_token;
