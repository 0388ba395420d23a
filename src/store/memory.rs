//! In-memory store for orders, API keys and session tokens

use super::{KeyStore, OrderStore, SessionStore, StoreError};
use crate::exchange::{Credentials, Order};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local implementation of every store trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<i64, Vec<Order>>>,
    keys: RwLock<HashMap<i64, Credentials>>,
    sessions: RwLock<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's bearer token and exchange API keys
    pub async fn register_user(&self, user_id: i64, token: impl Into<String>, credentials: Credentials) {
        self.sessions.write().await.insert(token.into(), user_id);
        self.keys.write().await.insert(user_id, credentials);
        tracing::debug!(user_id, "User registered");
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, user_id: i64, order: &Order) -> Result<(), StoreError> {
        if order.user_id != user_id {
            return Err(StoreError::UserMismatch {
                expected: user_id,
                actual: order.user_id,
            });
        }

        self.orders
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(order.clone());
        Ok(())
    }

    async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn user_api_keys(&self, user_id: i64) -> Result<Credentials, StoreError> {
        self.keys
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::KeysNotFound(user_id))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn user_for_token(&self, token: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.sessions.read().await.get(token).copied())
    }
}
