//! # Database Module
//!
//! User and travel-log persistence. Handlers talk to the [`UserStore`] and
//! [`TravelStore`] traits; PostgreSQL ([`DatabaseConnection`]) and an
//! in-memory map ([`MemoryStore`]) implement both.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;

use async_trait::async_trait;
use uuid::Uuid;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use memory::MemoryStore;
pub use models::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with the same unique key already exists
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// User records keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn insert(&self, record: UserRecord) -> Result<Uuid, StoreError>;

    /// Returns the number of records actually modified; `0` when the user is
    /// missing or every supplied field already holds the given value.
    async fn update(&self, email: &str, update: &UserUpdate) -> Result<u64, StoreError>;

    async fn delete(&self, email: &str) -> Result<u64, StoreError>;

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError>;
}

/// Travel logs, always returned newest first.
#[async_trait]
pub trait TravelStore: Send + Sync {
    async fn insert_travel(&self, log: TravelLog) -> Result<Uuid, StoreError>;

    async fn travels_by_user(&self, email: &str, limit: usize) -> Result<Vec<TravelLog>, StoreError>;

    async fn all_travels(&self, limit: usize) -> Result<Vec<TravelLog>, StoreError>;
}
