//! In-memory `Store` used by the handler and router tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{Store, StoreError};
use crate::models::product::{CreateProduct, Product, UpdateProduct};
use crate::models::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    products: BTreeMap<i64, Product>,
    // Soft-deleted ids; their rows stay in `products` but are never visible.
    deleted: BTreeSet<i64>,
    next_product_id: i64,
}

impl Tables {
    fn live_product(&mut self, id: i64) -> Option<&mut Product> {
        if self.deleted.contains(&id) {
            return None;
        }
        self.products.get_mut(&id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let now = Utc::now();
        let user = User {
            id: tables.users.len() as i64 + 1,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .products
            .values()
            .filter(|p| !tables.deleted.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.live_product(id).map(|p| p.clone()))
    }

    async fn insert_product(&self, product: CreateProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: tables.next_product_id,
            name: product.name,
            code: product.code,
            stock: product.stock,
            description: product.description,
            status: product.status,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        changes: UpdateProduct,
    ) -> Result<Option<Product>, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(product) = tables.live_product(id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(code) = changes.code {
            product.code = code;
        }
        if let Some(stock) = changes.stock {
            product.stock = stock;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(status) = changes.status {
            product.status = status;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.live_product(id).is_none() {
            return Ok(false);
        }
        Ok(tables.deleted.insert(id))
    }
}
