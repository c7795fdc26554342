//! Data-access handle.
//!
//! Handlers only see the [`UserStore`] and [`ExampleStore`] traits through
//! `AppState`; [`PgStore`] is the PostgreSQL implementation built in `main`.

use async_trait::async_trait;
use shared::{
    ExampleItem, ExampleItemChanges, NewExampleItem, NewUser, PageRequest, User, UserChanges,
};
use sqlx::PgPool;
use thiserror::Error;

use crate::error::{error_code, ErrorObject};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for ErrorObject {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => ErrorObject::new(error_code::DEFAULT, "Resource already exists"),
            StoreError::Database(err) => {
                tracing::error!(error = ?err, "database operation failed");
                ErrorObject::new(error_code::DEFAULT, "An unexpected database error occurred")
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Round trip to the backing store.
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// One page of users, newest first, plus the total row count.
    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)>;

    /// `None` when no user has this id.
    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>>;

    /// `false` when no user has this id.
    async fn delete_user(&self, id: i32) -> StoreResult<bool>;
}

#[async_trait]
pub trait ExampleStore: Send + Sync {
    async fn create_item(&self, item: NewExampleItem) -> StoreResult<ExampleItem>;

    async fn find_item(&self, id: i64) -> StoreResult<Option<ExampleItem>>;

    async fn list_items(&self, page: PageRequest) -> StoreResult<(Vec<ExampleItem>, i64)>;

    async fn update_item(
        &self,
        id: i64,
        changes: ExampleItemChanges,
    ) -> StoreResult<Option<ExampleItem>>;

    async fn delete_item(&self, id: i64) -> StoreResult<bool>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const USER_COLUMNS: &str = "id, email, password, name, is_active, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password, name) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_write)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        if changes.is_empty() {
            return self.find_user(id).await;
        }

        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                password = COALESCE($4, password),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_write)
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ExampleStore for PgStore {
    async fn create_item(&self, item: NewExampleItem) -> StoreResult<ExampleItem> {
        sqlx::query_as::<_, ExampleItem>(&format!(
            "INSERT INTO example_items (name, description) VALUES ($1, $2) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(&item.description)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_write)
    }

    async fn find_item(&self, id: i64) -> StoreResult<Option<ExampleItem>> {
        let item = sqlx::query_as::<_, ExampleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM example_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items(&self, page: PageRequest) -> StoreResult<(Vec<ExampleItem>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM example_items")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, ExampleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM example_items ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn update_item(
        &self,
        id: i64,
        changes: ExampleItemChanges,
    ) -> StoreResult<Option<ExampleItem>> {
        sqlx::query_as::<_, ExampleItem>(&format!(
            "UPDATE example_items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_write)
    }

    async fn delete_item(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM example_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
