#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use url::Url;

use visitor_signin::config::Config;
use visitor_signin::models::Visitor;
use visitor_signin::store::{
    DeleteOutcome, InsertReceipt, StoreError, StoreKind, StubStore, TableStore, UpdateMethod,
    VisitorStore,
};
use visitor_signin::{build_app, AppState};

pub const ADMIN_PASSWORD: &str = "let-me-in";

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    pub fn with_store(store: Arc<dyn VisitorStore>) -> Self {
        let config = Config {
            admin_password: Some(SecretString::from(ADMIN_PASSWORD)),
            session_secret: Some(SecretString::from("integration-test-key")),
            ..Config::default()
        };
        Self::with_config(&config, store)
    }

    pub fn with_config(config: &Config, store: Arc<dyn VisitorStore>) -> Self {
        let router = build_app(AppState::new(config, store));
        Self { router }
    }

    pub fn stub() -> Self {
        Self::with_store(Arc::new(StubStore))
    }

    /// App backed by an in-memory SQLite table.
    pub async fn table() -> (Self, SqlitePool) {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        visitor_signin::db::migrate(&pool)
            .await
            .expect("Failed to run migrations");

        let app = Self::with_store(Arc::new(TableStore::new(pool.clone())));
        (app, pool)
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    async fn send(&self, method: Method, uri: &str, body: Option<&Value>, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.request(builder.body(body).unwrap()).await
    }

    /// Log in with the given password and return the cookie pair.
    pub async fn login_with(&self, password: &str) -> Response {
        let body = serde_json::json!({ "password": password });
        self.send(Method::POST, "/login", Some(&body), None).await
    }

    /// Log in as admin and return the `name=value` cookie string.
    pub async fn login(&self) -> String {
        let resp = self.login_with(ADMIN_PASSWORD).await;
        assert_eq!(resp.status(), StatusCode::OK);
        session_cookie(&resp).expect("Login should set a session cookie")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::GET, uri, None, cookie).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value, cookie: Option<&str>) -> Response {
        self.send(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value, cookie: Option<&str>) -> Response {
        self.send(Method::PUT, uri, Some(body), cookie).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::DELETE, uri, None, cookie).await
    }

    /// Send a POST form request with an optional session cookie.
    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST with a raw, possibly malformed, JSON body.
    pub async fn post_raw(&self, uri: &str, body: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(req).await
    }
}

/// `name=value` of the session cookie a response sets, if any.
pub fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("auth_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn set_cookie_header(resp: &Response) -> Option<String> {
    resp.headers()
        .get("set-cookie")
        .map(|v| v.to_str().unwrap().to_string())
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert!(
        resp.status().is_redirection(),
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}

pub fn visitor(id: &str, name: &str, email: &str, created_at: &str) -> Visitor {
    Visitor {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        created_at: created_at.into(),
        ..Visitor::default()
    }
}

/// Store that remembers every call and serves a fixed list.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<&'static str>>,
    pub visitors: Vec<Visitor>,
    pub fail: bool,
}

impl RecordingStore {
    pub fn serving(visitors: Vec<Visitor>) -> Self {
        Self {
            visitors,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(StoreError::Parse("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl VisitorStore for RecordingStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Table
    }

    async fn list(&self, _search: Option<&str>) -> Result<Vec<Visitor>, StoreError> {
        self.record("list")?;
        Ok(self.visitors.clone())
    }

    async fn insert(&self, visitor: Visitor) -> Result<InsertReceipt, StoreError> {
        self.record("insert")?;
        Ok(InsertReceipt {
            id: visitor.id,
            persisted: true,
        })
    }

    async fn update(&self, _visitor: Visitor) -> Result<UpdateMethod, StoreError> {
        self.record("update")?;
        Ok(UpdateMethod::Sql)
    }

    async fn delete(&self, _id: &str) -> Result<DeleteOutcome, StoreError> {
        self.record("delete")?;
        Ok(DeleteOutcome::HardDelete)
    }
}

/// One request the fake spreadsheet service received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

type Rule = Box<dyn Fn(&Recorded) -> bool + Send + Sync>;

struct FakeSheetState {
    rows: Value,
    rejects: Rule,
    requests: Mutex<Vec<Recorded>>,
}

/// Spreadsheet service double listening on an ephemeral local port.
pub struct FakeSheet {
    pub url: Url,
    state: Arc<FakeSheetState>,
}

pub const SHEET_PATH: &str = "/api/v1/test-sheet";

impl FakeSheet {
    /// Serves `rows` on GET and answers 405 to any request `rejects` matches.
    pub async fn start<F>(rows: Value, rejects: F) -> Self
    where
        F: Fn(&Recorded) -> bool + Send + Sync + 'static,
    {
        let state = Arc::new(FakeSheetState {
            rows,
            rejects: Box::new(rejects),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(fake_sheet_handler)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}{SHEET_PATH}")).unwrap();
        Self { url, state }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests other than reads, in arrival order.
    pub fn writes(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != Method::GET)
            .collect()
    }

    pub fn store(&self) -> visitor_signin::store::SheetStore {
        visitor_signin::store::SheetStore::new(self.url.clone()).unwrap()
    }

    pub fn app(&self) -> TestApp {
        TestApp::with_store(Arc::new(self.store()))
    }
}

async fn fake_sheet_handler(
    State(state): State<Arc<FakeSheetState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let recorded = Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    };
    let rejected = (state.rejects)(&recorded);
    state.requests.lock().unwrap().push(recorded);

    if rejected {
        return (StatusCode::METHOD_NOT_ALLOWED, "not supported").into_response();
    }
    if method == Method::GET {
        return Json(state.rows.clone()).into_response();
    }
    Json(serde_json::json!({ "updated": 1 })).into_response()
}
