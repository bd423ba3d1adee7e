//! Persistence seam. Handlers only see `dyn Store`, so the Postgres backend can
//! be swapped for the in-memory one in tests.

use async_trait::async_trait;

use crate::models::product::{CreateProduct, Product, UpdateProduct};
use crate::models::user::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn find_product(&self, id: i64) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, product: CreateProduct) -> Result<Product, StoreError>;
    /// `None` if no live product has this id.
    async fn update_product(
        &self,
        id: i64,
        changes: UpdateProduct,
    ) -> Result<Option<Product>, StoreError>;
    /// Soft delete. `false` if no live product has this id.
    async fn delete_product(&self, id: i64) -> Result<bool, StoreError>;
}
