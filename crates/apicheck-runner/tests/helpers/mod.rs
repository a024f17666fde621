//! In-process stub of the user-directory API.
//!
//! Serves the same routes and envelopes as the real service on an ephemeral
//! port. Knobs on [`StubOptions`] break individual parts of the contract.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

#[derive(Debug, Clone)]
pub struct StubUser {
    pub id: i64,
    pub name: &'static str,
    pub gender: &'static str,
    pub age: u32,
    pub city: &'static str,
}

impl StubUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "gender": self.gender,
            "age": self.age,
            "city": self.city,
            "registrationDate": "2021-03-14T10:00:00",
        })
    }
}

/// Contract breakages the stub can simulate.
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    /// Put the first male id into the unfiltered female list
    pub overlap_genders: bool,
    /// Answer every filtered query (city, name, age) with an empty list
    pub empty_filters: bool,
    /// Sleep before every response
    pub delay: Duration,
    /// Answer every user lookup with a 500
    pub server_error: bool,
}

struct StubState {
    users: Vec<StubUser>,
    options: StubOptions,
    hits: AtomicUsize,
}

fn directory() -> Vec<StubUser> {
    vec![
        StubUser { id: 10, name: "Ivan", gender: "male", age: 30, city: "Moscow" },
        StubUser { id: 11, name: "Gogol", gender: "male", age: 42, city: "Poltava" },
        StubUser { id: 12, name: "Anna", gender: "female", age: 25, city: "Novosibirsk" },
        StubUser { id: 13, name: "Olga", gender: "female", age: 18, city: "Novosibirsk" },
        StubUser { id: 14, name: "Petr", gender: "male", age: 18, city: "Kazan" },
    ]
}

/// Running stub; the server task is aborted on drop.
pub struct DirectoryStub {
    base_url: String,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl DirectoryStub {
    pub async fn spawn(options: StubOptions) -> Self {
        let state = Arc::new(StubState {
            users: directory(),
            options,
            hits: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/api/test/user/{id}", get(user).post(not_allowed))
            .route("/api/test/users", get(users).post(not_allowed))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests that reached a handler so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

impl Drop for DirectoryStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Address nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Listener that accepts and immediately drops every connection.
pub struct ClosingListener {
    base_url: String,
    accepted: Arc<AtomicUsize>,
    server: JoinHandle<()>,
}

impl ClosingListener {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let server = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            accepted,
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for ClosingListener {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn respond(status: StatusCode, body: &Value) -> Response {
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body.to_string()).into_response()
}

fn parse_id(token: &str) -> Option<i64> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<i32>().ok().filter(|n| *n > 0).map(i64::from)
}

async fn user(State(stub): State<Arc<StubState>>, Path(token): Path<String>) -> Response {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(stub.options.delay).await;

    if stub.options.server_error {
        return respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({
                "status": 500,
                "error": "Internal Server Error",
                "path": format!("/api/test/user/{token}"),
            }),
        );
    }

    if token.trim().is_empty() {
        return respond(
            StatusCode::NOT_FOUND,
            &json!({"isSuccess": false, "errorCode": 404, "errorMessage": "Not Found", "user": null}),
        );
    }
    let Some(id) = parse_id(&token) else {
        return respond(
            StatusCode::BAD_REQUEST,
            &json!({
                "isSuccess": false,
                "errorCode": 400,
                "errorMessage": format!("NumberFormatException: For input string: \"{token}\""),
                "user": null,
            }),
        );
    };
    let user = stub
        .users
        .iter()
        .find(|u| u.id == id)
        .map_or(Value::Null, StubUser::to_json);
    respond(
        StatusCode::OK,
        &json!({"isSuccess": true, "errorCode": 0, "errorMessage": null, "user": user}),
    )
}

async fn users(
    State(stub): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(stub.options.delay).await;

    let Some(gender) = params.get("gender") else {
        return respond(
            StatusCode::BAD_REQUEST,
            &json!({
                "status": 400,
                "error": "Bad Request",
                "message": "Required String parameter 'gender' is not present",
                "path": "/api/test/users",
            }),
        );
    };
    if gender.is_empty() {
        return respond(
            StatusCode::BAD_REQUEST,
            &json!({"isSuccess": false, "errorCode": 400, "errorMessage": "gender is empty", "idList": null}),
        );
    }
    if !gender.chars().all(char::is_alphanumeric) {
        return respond(
            StatusCode::BAD_REQUEST,
            &json!({
                "isSuccess": false,
                "errorCode": 400,
                "errorMessage": "invalid gender",
                "error": "Bad Request",
                "idList": null,
            }),
        );
    }

    let filtered = ["city", "name", "age"].iter().any(|k| params.contains_key(*k));
    let mut ids: Vec<i64> = if filtered && stub.options.empty_filters {
        Vec::new()
    } else {
        stub.users
            .iter()
            .filter(|u| gender == "any" || u.gender == gender)
            .filter(|u| params.get("city").is_none_or(|c| c == u.city))
            .filter(|u| params.get("name").is_none_or(|n| n == u.name))
            .filter(|u| params.get("age").is_none_or(|a| *a == u.age.to_string()))
            .map(|u| u.id)
            .collect()
    };
    if gender == "female" && !filtered && stub.options.overlap_genders {
        if let Some(male) = stub.users.iter().find(|u| u.gender == "male") {
            ids.push(male.id);
        }
    }

    respond(
        StatusCode::OK,
        &json!({"isSuccess": true, "errorCode": 0, "errorMessage": null, "idList": ids}),
    )
}

async fn not_allowed() -> Response {
    respond(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({
            "status": 405,
            "error": "Method Not Allowed",
            "message": "Request method 'POST' not supported",
        }),
    )
}
