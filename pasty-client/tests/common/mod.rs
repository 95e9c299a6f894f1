//! In-process Pasty server used by the integration tests.
//!
//! Knows one user (`alice` / `secret`, uid `u1`) and hands out the token
//! `tok-alice`. Item `42` comes back the way older servers store it: numeric
//! `_id` and structured content. A few extra routes (`/debug/...`) let tests inspect request
//! headers and force arbitrary statuses and bodies.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pasty_client::{ClientConfig, PastyClient};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const UID: &str = "u1";
pub const TOKEN: &str = "tok-alice";
pub const API_KEY: &str = "test-api-key";
pub const TOKEN_EXPIRES: i64 = 1_893_456_000;

#[derive(Default)]
struct Store {
    items: BTreeMap<String, Value>,
    next_id: u64,
    password: String,
    users: Vec<String>,
}

type Db = Arc<Mutex<Store>>;

type Reply = (StatusCode, Json<Value>);

fn ok(status: StatusCode, payload: Value) -> Reply {
    (
        status,
        Json(json!({ "code": status.as_u16(), "payload": payload })),
    )
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (
        status,
        Json(json!({
            "code": status.as_u16(),
            "error": { "code": status.as_u16(), "message": message },
        })),
    )
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn basic_ok(headers: &HeaderMap, db: &Db) -> bool {
    let password = db.lock().unwrap().password.clone();
    let expected = format!("Basic {}", STANDARD.encode(format!("{}:{}", USER, password)));
    header(headers, "authorization") == Some(expected.as_str())
}

fn token_ok(headers: &HeaderMap) -> bool {
    header(headers, "x-pasty-token") == Some(TOKEN)
}

fn authenticated(headers: &HeaderMap, db: &Db) -> bool {
    token_ok(headers) || basic_ok(headers, db)
}

async fn server_version() -> Reply {
    ok(StatusCode::OK, json!({ "version": "0.3.0", "api": "2.1.0" }))
}

async fn username_available(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let Some(username) = params.get("username") else {
        return fail(StatusCode::BAD_REQUEST, "Missing username");
    };
    let taken = username == USER || db.lock().unwrap().users.contains(username);
    ok(StatusCode::OK, json!(!taken))
}

async fn list_items(State(db): State<Db>, headers: HeaderMap) -> Reply {
    if !authenticated(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    let items: Vec<Value> = db.lock().unwrap().items.values().cloned().collect();
    ok(StatusCode::OK, json!({ "items": items }))
}

async fn get_item(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !authenticated(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    if id == "slow" {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    let item = db.lock().unwrap().items.get(&id).cloned();
    match item {
        Some(mut item) => {
            item["path"] = json!(format!("/clipboard/item/{}", id));
            ok(StatusCode::OK, item)
        }
        None => fail(StatusCode::NOT_FOUND, "Item not found"),
    }
}

async fn add_item(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !authenticated(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    let Some(item) = body.get("item").and_then(Value::as_str) else {
        return fail(StatusCode::BAD_REQUEST, "Missing item");
    };
    let mut store = db.lock().unwrap();
    store.next_id += 1;
    let id = format!("item-{}", store.next_id);
    let stored = json!({ "_id": id, "item": item });
    store.items.insert(id, stored.clone());
    ok(StatusCode::CREATED, stored)
}

async fn delete_item(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !authenticated(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    if id == "accepted" {
        return ok(StatusCode::ACCEPTED, json!({}));
    }
    match db.lock().unwrap().items.remove(&id) {
        Some(_) => ok(StatusCode::OK, json!({})),
        None => fail(StatusCode::NOT_FOUND, "Item not found"),
    }
}

async fn request_token(State(db): State<Db>, headers: HeaderMap) -> Reply {
    if !basic_ok(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    ok(
        StatusCode::OK,
        json!({ "token": TOKEN, "expires": TOKEN_EXPIRES, "user": UID }),
    )
}

async fn token_validity(headers: HeaderMap) -> Reply {
    if !token_ok(&headers) {
        return fail(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    ok(StatusCode::OK, json!({ "expires": TOKEN_EXPIRES }))
}

async fn create_user(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    if body.get("api_key").and_then(Value::as_str) != Some(API_KEY) {
        // older servers answer with a flat error body
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": 403, "message": "Invalid API key" })),
        );
    }
    let Some(user) = body.get("user").and_then(Value::as_str) else {
        return fail(StatusCode::BAD_REQUEST, "Missing user");
    };
    if user == USER {
        return fail(StatusCode::CONFLICT, "User already exists");
    }
    db.lock().unwrap().users.push(user.to_string());
    ok(StatusCode::CREATED, json!({ "_id": format!("uid-{}", user) }))
}

async fn user_info(State(db): State<Db>, headers: HeaderMap) -> Reply {
    if !authenticated(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    ok(StatusCode::OK, json!({ "_id": UID, "username": USER }))
}

async fn update_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if !basic_ok(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    if uid != UID {
        return fail(StatusCode::FORBIDDEN, "Not your account");
    }
    let Some(new_password) = body.get("newPassword").and_then(Value::as_str) else {
        return fail(StatusCode::BAD_REQUEST, "Missing newPassword");
    };
    db.lock().unwrap().password = new_password.to_string();
    ok(StatusCode::OK, json!({}))
}

async fn delete_user(State(db): State<Db>, headers: HeaderMap, Path(uid): Path<String>) -> Reply {
    if !basic_ok(&headers, &db) {
        return fail(StatusCode::UNAUTHORIZED, "Authentication failed");
    }
    if uid != UID {
        return fail(StatusCode::FORBIDDEN, "Not your account");
    }
    ok(StatusCode::OK, json!({}))
}

/// Echo the request headers back as the payload
async fn debug_headers(headers: HeaderMap) -> Reply {
    let echoed: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    ok(StatusCode::OK, json!(echoed))
}

/// Answer with the requested status and the raw body given in `?body=`
async fn debug_status(
    Path(code): Path<u16>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = params.get("body").cloned().unwrap_or_else(|| "{}".to_string());
    (status, body)
}

async fn debug_sleep() -> Reply {
    tokio::time::sleep(Duration::from_secs(3)).await;
    ok(StatusCode::OK, json!({}))
}

pub fn app() -> Router {
    let mut store = Store {
        password: PASSWORD.to_string(),
        ..Default::default()
    };
    for (id, item) in [("1", "first item"), ("slow", "slow item"), ("fast", "fast item")] {
        store
            .items
            .insert(id.to_string(), json!({ "_id": id, "item": item }));
    }
    store.items.insert(
        "42".to_string(),
        json!({ "_id": 42, "item": { "mime": "image/png", "data": "aGk=" } }),
    );
    let db: Db = Arc::new(Mutex::new(store));

    Router::new()
        .route("/server/version", get(server_version))
        .route("/server/user/available", get(username_available))
        .route("/clipboard/list.json", get(list_items))
        .route("/clipboard/item", axum::routing::post(add_item))
        .route("/clipboard/item/{id}", get(get_item).delete(delete_item))
        .route("/user/token", get(request_token))
        .route("/user/token/validity", get(token_validity))
        .route("/user/", axum::routing::post(create_user))
        .route("/user", get(user_info))
        .route("/user/{uid}", axum::routing::put(update_password).delete(delete_user))
        .route("/debug/headers", get(debug_headers).post(debug_headers))
        .route("/debug/status/{code}", get(debug_status))
        .route("/debug/sleep", get(debug_sleep))
        .with_state(db)
}

/// Start the mock server on a random local port
pub async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app()).await.expect("Mock server failed");
    });
    addr
}

/// A TCP server that reads the request and hangs up without answering
pub async fn spawn_hangup_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind hang-up server");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            drop(stream);
        }
    });
    addr
}

/// A TCP server that answers anything, including a TLS handshake, with plain HTTP
pub async fn spawn_plaintext_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind plain-text server");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n")
                .await;
        }
    });
    addr
}

/// A local port nothing is listening on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let port = listener.local_addr().expect("No local address").port();
    drop(listener);
    port
}

pub fn client_for(addr: SocketAddr) -> PastyClient {
    PastyClient::new(ClientConfig::new(addr.ip().to_string(), addr.port()).with_api_key(API_KEY))
        .expect("Failed to build client")
}
