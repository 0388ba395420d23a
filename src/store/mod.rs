//! Persistence collaborators
//!
//! Executed orders, per-user exchange keys and bearer-token sessions.

mod memory;

pub use memory::MemoryStore;

use crate::exchange::{Credentials, Order};
use async_trait::async_trait;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("get user api keys: no keys for user {0}")]
    KeysNotFound(i64),
    #[error("create order: order belongs to user {actual}, not {expected}")]
    UserMismatch { expected: i64, actual: i64 },
}

/// Executed order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, user_id: i64, order: &Order) -> Result<(), StoreError>;
    async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, StoreError>;
}

/// Exchange API keys per user
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn user_api_keys(&self, user_id: i64) -> Result<Credentials, StoreError>;
}

/// Bearer token to user resolution
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn user_for_token(&self, token: &str) -> Result<Option<i64>, StoreError>;
}
