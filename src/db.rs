use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

pub mod mysql;
pub mod update;

pub use mysql::MySqlStore;
pub use update::{FieldMap, FieldValue, ParameterizedUpdate, Resource, UpdateBuilder};

pub const CATEGORY: Resource = Resource {
    table: "category",
    key: "category_id",
    writable: &["active", "name"],
};

pub const PRODUCT: Resource = Resource {
    table: "product",
    key: "product_id",
    writable: &[
        "sku",
        "active",
        "id_category",
        "name",
        "image",
        "description",
        "price",
        "stock",
    ],
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            sqlx::Error::Database(db) => StoreError::Query(db.message().to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String, // Argon2 PHC hash
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub category_id: i64,
    pub active: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: i64,
    pub sku: String,
    pub active: bool,
    pub id_category: Option<i64>,
    pub name: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub active: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub active: i64,
    pub id_category: Option<i64>,
    pub name: String,
    pub image: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

/// Hands out one connection per request.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Connection>, StoreError>;
}

/// A checked-out connection. Dropping it returns it to the pool.
#[async_trait]
pub trait Connection: Send {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError>;

    async fn exists(&mut self, resource: &Resource, id: i64) -> Result<bool, StoreError>;

    /// Returns the number of affected rows.
    async fn apply_update(&mut self, update: &ParameterizedUpdate) -> Result<u64, StoreError>;

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError>;
    async fn find_category(&mut self, id: i64) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&mut self, new: &NewCategory) -> Result<i64, StoreError>;
    async fn count_products_in_category(&mut self, id: i64) -> Result<i64, StoreError>;
    async fn delete_category(&mut self, id: i64) -> Result<u64, StoreError>;

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError>;
    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, StoreError>;
    /// True when another product (other than `excluding`) already uses `sku`.
    async fn sku_taken(&mut self, sku: &str, excluding: Option<i64>) -> Result<bool, StoreError>;
    async fn insert_product(&mut self, new: &NewProduct) -> Result<i64, StoreError>;
    async fn delete_product(&mut self, id: i64) -> Result<u64, StoreError>;
}
