//! In-memory datastore and fixtures for handler and end-to-end tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::http::HeaderValue;
use lazy_static::lazy_static;

use crate::{
    auth::{password::hash_password, JwtKeys, TokenService},
    config::{AppConfig, JwtConfig},
    db::{
        Category, Connection, Datastore, FieldValue, NewCategory, NewProduct,
        ParameterizedUpdate, Product, Resource, StoreError, User,
    },
    state::AppState,
};

pub const TEST_SECRET: &str = "test-secret";
pub const ALICE_PASSWORD: &str = "wonderland";

lazy_static! {
    static ref ALICE_HASH: String = hash_password(ALICE_PASSWORD).unwrap();
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "mysql://test@localhost/shop".into(),
        max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: TEST_SECRET.into(),
            issuer: "online-shop-api".into(),
            ttl_seconds: 3600,
        },
    }
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::new(&test_config().jwt)
}

pub fn bearer(keys: &JwtKeys, user_id: i64, username: &str) -> HeaderValue {
    let token = keys.issue(&keys.claims_for(user_id, username)).unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// State wired to a freshly seeded [`MemoryStore`].
pub fn memory_state() -> (AppState, MemoryStore) {
    let store = MemoryStore::seeded();
    let state = AppState::from_parts(
        Arc::new(store.clone()),
        Arc::new(test_keys()),
        Arc::new(test_config()),
    )
    .unwrap();
    (state, store)
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    next_id: i64,
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    updates: Mutex<Vec<ParameterizedUpdate>>,
    deletes: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    unavailable: AtomicBool,
    write_failure: Mutex<Option<String>>,
}

/// Datastore double. Counts checked-out connections and records every update
/// and delete it executes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// alice (id 1); categories 1 Books, 2 Games, 3 Tools; product 7 in Tools
    /// and product 8 without a category.
    pub fn seeded() -> Self {
        let store = Self::default();
        {
            let mut t = store.shared.tables.lock().unwrap();
            t.users.push(User {
                id: 1,
                username: "alice".into(),
                password: ALICE_HASH.clone(),
            });
            for (id, name) in [(1, "Books"), (2, "Games"), (3, "Tools")] {
                t.categories.insert(
                    id,
                    Category {
                        category_id: id,
                        active: true,
                        name: name.into(),
                    },
                );
            }
            t.products.insert(7, product(7, "SKU-7", Some(3), 12.5, 4));
            t.products.insert(8, product(8, "SKU-8", None, 3.0, 0));
            t.next_id = 100;
        }
        store
    }

    pub fn acquired(&self) -> usize {
        self.shared.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<ParameterizedUpdate> {
        self.shared.updates.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> usize {
        self.shared.deletes.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, down: bool) {
        self.shared.unavailable.store(down, Ordering::SeqCst);
    }

    /// Makes every following write fail with `message`.
    pub fn fail_writes(&self, message: &str) {
        *self.shared.write_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn category(&self, id: i64) -> Option<Category> {
        self.shared.tables.lock().unwrap().categories.get(&id).cloned()
    }

    pub fn product(&self, id: i64) -> Option<Product> {
        self.shared.tables.lock().unwrap().products.get(&id).cloned()
    }
}

fn product(id: i64, sku: &str, category: Option<i64>, price: f64, stock: i64) -> Product {
    Product {
        product_id: id,
        sku: sku.into(),
        active: true,
        id_category: category,
        name: format!("Product {id}"),
        image: Some(String::new()),
        description: Some(String::new()),
        price,
        stock,
        category_name: None,
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn acquire(&self) -> Result<Box<dyn Connection>, StoreError> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Connection refused".into()));
        }
        self.shared.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            shared: self.shared.clone(),
        }))
    }
}

struct MemorySession {
    shared: Arc<Shared>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl MemorySession {
    fn check_write(&self) -> Result<(), StoreError> {
        match self.shared.write_failure.lock().unwrap().clone() {
            Some(msg) => Err(StoreError::Query(msg)),
            None => Ok(()),
        }
    }

    fn joined(t: &Tables, p: &Product) -> Product {
        let mut p = p.clone();
        p.category_name = p
            .id_category
            .and_then(|id| t.categories.get(&id))
            .map(|c| c.name.clone());
        p
    }
}

fn incorrect(column: &str, value: &FieldValue) -> StoreError {
    StoreError::Query(format!("Incorrect value '{value}' for column '{column}'"))
}

fn as_int(column: &str, value: &FieldValue) -> Result<i64, StoreError> {
    value.as_i64().ok_or_else(|| incorrect(column, value))
}

fn as_float(column: &str, value: &FieldValue) -> Result<f64, StoreError> {
    value.as_f64().ok_or_else(|| incorrect(column, value))
}

#[async_trait]
impl Connection for MemorySession {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn exists(&mut self, resource: &Resource, id: i64) -> Result<bool, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(match resource.table {
            "category" => t.categories.contains_key(&id),
            "product" => t.products.contains_key(&id),
            other => return Err(StoreError::Query(format!("Table '{other}' doesn't exist"))),
        })
    }

    async fn apply_update(&mut self, update: &ParameterizedUpdate) -> Result<u64, StoreError> {
        self.check_write()?;
        self.shared.updates.lock().unwrap().push(update.clone());
        let id = update
            .target_id()
            .ok_or_else(|| StoreError::Query("missing target id".into()))?;

        let mut t = self.shared.tables.lock().unwrap();
        match update.table {
            "category" => {
                let Some(row) = t.categories.get_mut(&id) else {
                    return Ok(0);
                };
                for (&column, value) in update.columns.iter().zip(&update.params) {
                    match column {
                        "active" => row.active = as_int(column, value)? != 0,
                        "name" => row.name = value.to_string(),
                        _ => return Err(StoreError::Query(format!("Unknown column '{column}'"))),
                    }
                }
            }
            "product" => {
                let Some(row) = t.products.get_mut(&id) else {
                    return Ok(0);
                };
                for (&column, value) in update.columns.iter().zip(&update.params) {
                    match column {
                        "sku" => row.sku = value.to_string(),
                        "active" => row.active = as_int(column, value)? != 0,
                        "id_category" => row.id_category = Some(as_int(column, value)?),
                        "name" => row.name = value.to_string(),
                        "image" => row.image = Some(value.to_string()),
                        "description" => row.description = Some(value.to_string()),
                        "price" => row.price = as_float(column, value)?,
                        "stock" => row.stock = as_int(column, value)?,
                        _ => return Err(StoreError::Query(format!("Unknown column '{column}'"))),
                    }
                }
            }
            other => return Err(StoreError::Query(format!("Table '{other}' doesn't exist"))),
        }
        Ok(1)
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.categories.values().rev().cloned().collect())
    }

    async fn find_category(&mut self, id: i64) -> Result<Option<Category>, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.categories.get(&id).cloned())
    }

    async fn insert_category(&mut self, new: &NewCategory) -> Result<i64, StoreError> {
        self.check_write()?;
        let mut t = self.shared.tables.lock().unwrap();
        t.next_id += 1;
        let id = t.next_id;
        t.categories.insert(
            id,
            Category {
                category_id: id,
                active: new.active != 0,
                name: new.name.clone(),
            },
        );
        Ok(id)
    }

    async fn count_products_in_category(&mut self, id: i64) -> Result<i64, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.products.values().filter(|p| p.id_category == Some(id)).count() as i64)
    }

    async fn delete_category(&mut self, id: i64) -> Result<u64, StoreError> {
        self.check_write()?;
        self.shared.deletes.fetch_add(1, Ordering::SeqCst);
        let mut t = self.shared.tables.lock().unwrap();
        Ok(t.categories.remove(&id).map_or(0, |_| 1))
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.products.values().rev().map(|p| Self::joined(&t, p)).collect())
    }

    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t.products.get(&id).map(|p| Self::joined(&t, p)))
    }

    async fn sku_taken(&mut self, sku: &str, excluding: Option<i64>) -> Result<bool, StoreError> {
        let t = self.shared.tables.lock().unwrap();
        Ok(t
            .products
            .values()
            .any(|p| p.sku == sku && Some(p.product_id) != excluding))
    }

    async fn insert_product(&mut self, new: &NewProduct) -> Result<i64, StoreError> {
        self.check_write()?;
        let mut t = self.shared.tables.lock().unwrap();
        t.next_id += 1;
        let id = t.next_id;
        t.products.insert(
            id,
            Product {
                product_id: id,
                sku: new.sku.clone(),
                active: new.active != 0,
                id_category: new.id_category,
                name: new.name.clone(),
                image: Some(new.image.clone()),
                description: Some(new.description.clone()),
                price: new.price,
                stock: new.stock,
                category_name: None,
            },
        );
        Ok(id)
    }

    async fn delete_product(&mut self, id: i64) -> Result<u64, StoreError> {
        self.check_write()?;
        self.shared.deletes.fetch_add(1, Ordering::SeqCst);
        let mut t = self.shared.tables.lock().unwrap();
        Ok(t.products.remove(&id).map_or(0, |_| 1))
    }
}
