#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    middleware, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db,
    entities::product,
    events::{self, EventSender},
    handlers::AppServices,
    request_id, AppState,
};

/// Test harness: application state and router backed by an in-memory SQLite
/// database. The pool is pinned to a single connection so the database lives
/// as long as the harness.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        let state = Arc::new(AppState {
            db,
            config: cfg,
            event_sender,
            services,
        });

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .layer(middleware::from_fn(request_id::propagate_request_id))
            .with_state(state.clone());

        Self {
            state,
            router,
            _event_task: event_task,
        }
    }

    /// Inserts a catalog product directly and returns its id.
    pub async fn seed_product(&self, name: &str, price: Decimal, images: Value) -> Uuid {
        let id = Uuid::new_v4();
        let row = product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            price: Set(price),
            images: Set(images),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.state.db)
            .await
            .expect("failed to seed product");
        id
    }

    /// Fires one request at the router and returns status plus parsed body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is not JSON")
        };
        (status, body)
    }
}

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
