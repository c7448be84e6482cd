//! In-process fake of the Directus REST API
//!
//! Serves just enough of the API for the MCP server: `/server/ping`,
//! `/users/me`, `/fields`, `/items/{collection}` and `/files`. Each token
//! sees its own schema so tests can check per-caller isolation.

use super::constants::*;
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

/// A running fake backend. Stops when dropped.
pub struct FakeBackend {
    pub base_url: String,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener
            .local_addr()
            .expect("Failed to get fake backend address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router())
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake backend failed");
        });

        Self {
            base_url: format!("http://{}", addr),
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Caller {
    Anonymous,
    Editor,
    Shop,
}

fn caller(headers: &HeaderMap) -> Result<Caller, Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        None => Ok(Caller::Anonymous),
        Some(EDITOR_TOKEN) => Ok(Caller::Editor),
        Some(SHOP_TOKEN) => Ok(Caller::Shop),
        Some(_) => Err(errors(StatusCode::UNAUTHORIZED, "Invalid user credentials.")),
    }
}

fn errors(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"errors": [{"message": message}]}))).into_response()
}

fn data(value: Value) -> Response {
    Json(json!({ "data": value })).into_response()
}

fn router() -> Router {
    Router::new()
        .route("/server/ping", get(|| async { "pong" }))
        .route("/users/me", get(users_me))
        .route("/fields", get(fields))
        .route(
            "/items/{collection}",
            get(read_items)
                .post(create_items)
                .patch(update_items)
                .delete(delete_items),
        )
        .route("/files", get(files))
}

async fn users_me(headers: HeaderMap) -> Response {
    match caller(&headers) {
        Ok(Caller::Editor) => data(json!({"id": EDITOR_ID, "email": "editor@example.com"})),
        Ok(Caller::Shop) => data(json!({"id": SHOP_ID, "email": "shop@example.com"})),
        Ok(Caller::Anonymous) => errors(StatusCode::FORBIDDEN, "You don't have permission to access this."),
        Err(response) => response,
    }
}

fn field(collection: &str, name: &str, field_type: &str) -> Value {
    json!({"collection": collection, "field": name, "type": field_type, "meta": {"interface": "input"}})
}

async fn fields(headers: HeaderMap) -> Response {
    let fields = match caller(&headers) {
        Ok(Caller::Editor) => vec![
            field(ARTICLES, "id", "integer"),
            field(ARTICLES, "title", "string"),
            field(ARTICLES, "status", "string"),
            field(PROMPTS_COLLECTION, "name", "string"),
            field(PROMPTS_COLLECTION, "messages", "json"),
            field("directus_users", "email", "string"),
        ],
        Ok(Caller::Shop) => vec![
            field(PRODUCTS, "id", "integer"),
            field(PRODUCTS, "sku", "string"),
        ],
        Ok(Caller::Anonymous) => vec![],
        Err(response) => return response,
    };
    data(Value::Array(fields))
}

fn prompt_records() -> Value {
    json!([
        {
            "name": PROMPT_WRITE_ARTICLE,
            "description": "Draft an article",
            "system_prompt": "You are a {{ tone }} writer.",
            "messages": [
                {"role": "user", "text": "Write about {{topic}}."}
            ]
        },
        {
            "name": PROMPT_GREETING,
            "description": null,
            "system_prompt": null,
            "messages": [{"role": "user", "text": "Say hello."}]
        },
        {
            "name": "broken",
            "messages": "not a list"
        }
    ])
}

async fn read_items(
    headers: HeaderMap,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match (caller, collection.as_str()) {
        (Caller::Editor, ARTICLES) => {
            let mut items = vec![
                json!({"id": 1, "title": "Hello", "status": "published"}),
                json!({"id": 2, "title": "Draft", "status": "draft"}),
            ];
            if let Some(limit) = query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
                items.truncate(limit);
            }
            data(Value::Array(items))
        }
        (Caller::Editor, PROMPTS_COLLECTION) => data(prompt_records()),
        (Caller::Shop, PRODUCTS) => data(json!([{"id": 10, "sku": "SKU-10"}])),
        _ => errors(StatusCode::FORBIDDEN, "You don't have permission to access this."),
    }
}

async fn create_items(Path(collection): Path<String>, Json(body): Json<Value>) -> Response {
    let created = match body {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, mut item)| {
                    item["id"] = json!(100 + i);
                    item
                })
                .collect(),
        ),
        mut item => {
            item["id"] = json!(100);
            item
        }
    };
    tracing::debug!("created in {}", collection);
    data(created)
}

async fn update_items(Json(body): Json<Value>) -> Response {
    let keys = body["keys"].as_array().cloned().unwrap_or_default();
    let updated: Vec<Value> = keys
        .into_iter()
        .map(|key| {
            let mut item = body["data"].clone();
            item["id"] = key;
            item
        })
        .collect();
    data(Value::Array(updated))
}

async fn delete_items() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn files(headers: HeaderMap) -> Response {
    match caller(&headers) {
        Ok(Caller::Editor) => data(json!([
            {"id": FILE_1_ID, "title": "Cover", "type": "image/png"}
        ])),
        Ok(_) => data(json!([])),
        Err(response) => response,
    }
}
