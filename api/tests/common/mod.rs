#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use api::config::AppConfig;
use api::db::{ExampleStore, StoreError, StoreResult, UserStore};
use api::observability::build_registry;
use api::server::build_app;
use api::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use shared::{
    ExampleItem, ExampleItemChanges, NewExampleItem, NewUser, PageRequest, User, UserChanges,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-secret";

/// In-memory store standing in for PostgreSQL
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    items: Mutex<Vec<ExampleItem>>,
    next_user_id: Mutex<i32>,
    next_item_id: Mutex<i64>,
    pub offline: bool,
}

impl MemoryStore {
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        if self.offline {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_idx".into()));
        }
        let mut next = self.next_user_id.lock().unwrap();
        *next += 1;
        let now = Utc::now();
        let created = User {
            id: *next,
            email: user.email,
            password: user.password_hash,
            name: user.name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<(Vec<User>, i64)> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as i64;
        let rows = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((rows, total))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict("users_email_idx".into()));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password = hash;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[async_trait]
impl ExampleStore for MemoryStore {
    async fn create_item(&self, item: NewExampleItem) -> StoreResult<ExampleItem> {
        let mut next = self.next_item_id.lock().unwrap();
        *next += 1;
        let now = Utc::now();
        let created = ExampleItem {
            id: *next,
            name: item.name,
            description: item.description,
            created_at: now,
            updated_at: now,
        };
        self.items.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn find_item(&self, id: i64) -> StoreResult<Option<ExampleItem>> {
        Ok(self.items.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(&self, page: PageRequest) -> StoreResult<(Vec<ExampleItem>, i64)> {
        let items = self.items.lock().unwrap();
        let total = items.len() as i64;
        let rows = items
            .iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((rows, total))
    }

    async fn update_item(
        &self,
        id: i64,
        changes: ExampleItemChanges,
    ) -> StoreResult<Option<ExampleItem>> {
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = Some(description);
        }
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: i64) -> StoreResult<bool> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() != before)
    }
}

pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET_KEY".to_string(), TEST_SECRET.to_string()),
    ]);
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

pub fn app_with(store: MemoryStore, overrides: &[(&str, &str)]) -> Router {
    let store = Arc::new(store);
    let state = AppState::new(
        store.clone(),
        store,
        test_config(overrides),
        build_registry().expect("registry"),
    );
    build_app(state)
}

pub fn test_app() -> Router {
    app_with(MemoryStore::default(), &[])
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Registers a user and returns `(id, token)`.
pub async fn register_user(app: &Router, email: &str) -> (i64, String) {
    let resp = send(
        app,
        Method::POST,
        "/api/v1/users/register",
        Some(serde_json::json!({
            "email": email,
            "password": "password123",
            "name": "Test User",
        })),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "register failed: {}", resp.body);
    let id = resp.body["data"]["user"]["id"].as_i64().unwrap();
    let token = resp.body["data"]["token"].as_str().unwrap().to_string();
    (id, token)
}
