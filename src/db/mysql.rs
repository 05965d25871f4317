use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    pool::PoolConnection,
    MySql, MySqlPool,
};
use std::{str::FromStr, time::Duration};
use tracing::{debug, error};

use super::{
    Category, Connection, Datastore, FieldValue, NewCategory, NewProduct, ParameterizedUpdate,
    Product, Resource, StoreError, User,
};
use crate::config::AppConfig;

const PRODUCT_COLUMNS: &str = r#"
    p.product_id, p.sku, p.active, p.id_category, p.name, p.image, p.description,
    CAST(p.price AS DOUBLE) AS price, p.stock, c.name AS category_name
"#;

/// MySQL-backed datastore. The pool connects lazily so the server can start
/// while the database is still down; requests then get a 503.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::from_str(&config.database_url)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }
}

#[async_trait]
impl Datastore for MySqlStore {
    async fn acquire(&self) -> Result<Box<dyn Connection>, StoreError> {
        let conn = self.pool.acquire().await.map_err(|e| {
            error!(error = %e, "database connection failed");
            StoreError::Unavailable(e.to_string())
        })?;
        debug!("connection acquired");
        Ok(Box::new(MySqlSession { conn }))
    }
}

struct MySqlSession {
    conn: PoolConnection<MySql>,
}

#[async_trait]
impl Connection for MySqlSession {
    async fn find_user(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(user)
    }

    async fn exists(&mut self, resource: &Resource, id: i64) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT {key} FROM {table} WHERE {key} = ?",
            key = resource.key,
            table = resource.table
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.is_some())
    }

    async fn apply_update(&mut self, update: &ParameterizedUpdate) -> Result<u64, StoreError> {
        let sql = update.sql();
        debug!(
            table = update.table,
            id = update.target_id(),
            kinds = ?update.params.iter().map(FieldValue::kind).collect::<Vec<_>>(),
            "binding update"
        );
        let mut query = sqlx::query(&sql);
        for param in &update.params {
            query = match param {
                FieldValue::Integer(v) => query.bind(*v),
                FieldValue::Float(v) => query.bind(*v),
                FieldValue::Text(v) => query.bind(v.as_str()),
            };
        }
        let result = query.execute(&mut *self.conn).await?;
        debug!(table = update.table, rows = result.rows_affected(), "update executed");
        Ok(result.rows_affected())
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT category_id, active, name
            FROM category
            ORDER BY category_id DESC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows)
    }

    async fn find_category(&mut self, id: i64) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT category_id, active, name
            FROM category
            WHERE category_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row)
    }

    async fn insert_category(&mut self, new: &NewCategory) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO category (active, name) VALUES (?, ?)")
            .bind(new.active)
            .bind(&new.name)
            .execute(&mut *self.conn)
            .await?;
        last_insert_id(result.last_insert_id())
    }

    async fn count_products_in_category(&mut self, id: i64) -> Result<i64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM product WHERE id_category = ?")
                .bind(id)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(count)
    }

    async fn delete_category(&mut self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM category WHERE category_id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM product p
            LEFT JOIN category c ON p.id_category = c.category_id
            ORDER BY p.product_id DESC
            "#
        );
        let rows = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows)
    }

    async fn find_product(&mut self, id: i64) -> Result<Option<Product>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM product p
            LEFT JOIN category c ON p.id_category = c.category_id
            WHERE p.product_id = ?
            "#
        );
        let row = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row)
    }

    async fn sku_taken(&mut self, sku: &str, excluding: Option<i64>) -> Result<bool, StoreError> {
        let (count,): (i64,) = match excluding {
            Some(id) => {
                sqlx::query_as("SELECT COUNT(*) FROM product WHERE sku = ? AND product_id <> ?")
                    .bind(sku)
                    .bind(id)
                    .fetch_one(&mut *self.conn)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM product WHERE sku = ?")
                    .bind(sku)
                    .fetch_one(&mut *self.conn)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn insert_product(&mut self, new: &NewProduct) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO product (sku, active, id_category, name, image, description, price, stock)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.sku)
        .bind(new.active)
        .bind(new.id_category)
        .bind(&new.name)
        .bind(&new.image)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .execute(&mut *self.conn)
        .await?;
        last_insert_id(result.last_insert_id())
    }

    async fn delete_product(&mut self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM product WHERE product_id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

fn last_insert_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::Query(format!("insert id {id} out of range")))
}
