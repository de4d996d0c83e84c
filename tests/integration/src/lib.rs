//! Integration tests for the ClientDesk client.
//!
//! These tests run the real session and HTTP layers against an in-process
//! mock of the REST API, with sessions persisted to SQLite.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

// ============================================================================
// Mock API
// ============================================================================

const SIGNING_KEY: &[u8] = b"integration-signing-key-32-bytes!";

/// Accounts the mock accepts: (id, username, password, role).
const ACCOUNTS: [(i64, &str, &str, &str); 2] = [
    (1, "admin", "admin123", "admin"),
    (2, "alice", "secret1", "customer"),
];

/// Shared state of the mock API.
pub struct MockState {
    /// Calls to the login endpoint.
    pub login_calls: AtomicUsize,
    /// Calls to any other endpoint.
    pub api_calls: AtomicUsize,
    /// When set, every request is answered with `401`.
    pub force_unauthorized: AtomicBool,
    /// Lifetime of the `exp` claim on issued tokens, in seconds.
    pub token_ttl: AtomicI64,
    /// `expires` sent with the login response; `None` sends one matching `exp`.
    pub expires_override: Mutex<Option<Option<String>>>,
    /// Body of the last `PUT`.
    pub last_update: Mutex<Option<Value>>,
    /// When set, creates and updates succeed without a response body.
    pub bodiless_writes: AtomicBool,
    issued: Mutex<HashSet<String>>,
    users: Mutex<Vec<Value>>,
    customers: Mutex<Vec<Value>>,
    next_id: AtomicI64,
}

impl MockState {
    fn new() -> Self {
        let users = ACCOUNTS
            .iter()
            .map(|(id, username, _, role)| json!({ "id": id, "username": username, "roleName": role }))
            .collect();

        Self {
            login_calls: AtomicUsize::new(0),
            api_calls: AtomicUsize::new(0),
            force_unauthorized: AtomicBool::new(false),
            token_ttl: AtomicI64::new(3600),
            expires_override: Mutex::new(None),
            last_update: Mutex::new(None),
            bodiless_writes: AtomicBool::new(false),
            issued: Mutex::new(HashSet::new()),
            users: Mutex::new(users),
            customers: Mutex::new(vec![json!({
                "id": 100, "name": "Acme Ltd", "email": "ops@acme.test", "phone": "555-0100"
            })]),
            next_id: AtomicI64::new(1000),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.api_calls.fetch_add(1, Ordering::SeqCst);

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let known = token.is_some_and(|t| self.issued.lock().unwrap().contains(t));
        if known && !self.force_unauthorized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unauthorized("Unauthorized"))
        }
    }

    fn mint(&self, id: i64, username: &str, role: &str) -> (String, Option<String>) {
        let exp = Utc::now() + Duration::seconds(self.token_ttl.load(Ordering::SeqCst));
        let claims = json!({
            "nameid": id.to_string(),
            "unique_name": username,
            "role": role,
            "exp": exp.timestamp(),
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SIGNING_KEY),
        )
        .unwrap();
        self.issued.lock().unwrap().insert(token.clone());

        let expires = self
            .expires_override
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Some(exp.to_rfc3339()));

        (token, expires)
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if state.force_unauthorized.load(Ordering::SeqCst) {
        return unauthorized("Unauthorized");
    }

    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let Some((id, name, _, role)) = ACCOUNTS
        .iter()
        .find(|(_, u, p, _)| *u == username && *p == password)
    else {
        return unauthorized("Invalid username or password");
    };

    let (token, expires) = state.mint(*id, name, role);
    Json(json!({
        "token": token,
        "expires": expires,
        "user": { "id": id, "username": name, "roleName": role },
    }))
    .into_response()
}

fn list(items: &Mutex<Vec<Value>>) -> Response {
    Json(Value::Array(items.lock().unwrap().clone())).into_response()
}

fn update(state: &MockState, items: &Mutex<Vec<Value>>, id: i64, body: Value) -> Response {
    *state.last_update.lock().unwrap() = Some(body.clone());

    let mut items = items.lock().unwrap();
    let Some(item) = items.iter_mut().find(|i| i["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response();
    };

    if let (Some(target), Value::Object(changes)) = (item.as_object_mut(), body) {
        for (key, value) in changes {
            if key != "password" {
                target.insert(key, value);
            }
        }
    }
    if state.bodiless_writes.load(Ordering::SeqCst) {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(item.clone()).into_response()
}

fn created(state: &MockState, item: Value) -> Response {
    if state.bodiless_writes.load(Ordering::SeqCst) {
        StatusCode::CREATED.into_response()
    } else {
        (StatusCode::CREATED, Json(item)).into_response()
    }
}

fn remove(items: &Mutex<Vec<Value>>, id: i64) -> Response {
    let mut items = items.lock().unwrap();
    let before = items.len();
    items.retain(|i| i["id"] != id);
    if items.len() == before {
        StatusCode::NOT_FOUND.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn list_users(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    list(&state.users)
}

async fn create_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    let user = json!({
        "id": state.next_id(),
        "username": body["username"],
        "roleName": body["roleName"],
    });
    state.users.lock().unwrap().push(user.clone());
    created(&state, user)
}

async fn update_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    update(&state, &state.users, id, body)
}

async fn delete_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    remove(&state.users, id)
}

async fn list_customers(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    list(&state.customers)
}

async fn create_customer(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }

    let mut customers = state.customers.lock().unwrap();
    if customers.iter().any(|c| c["email"] == body["email"]) {
        return (StatusCode::CONFLICT, "Email already exists").into_response();
    }

    let customer = json!({
        "id": state.next_id(),
        "name": body["name"],
        "email": body["email"],
        "phone": body["phone"],
    });
    customers.push(customer.clone());
    created(&state, customer)
}

async fn update_customer(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    update(&state, &state.customers, id, body)
}

async fn delete_customer(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(r) = state.authorize(&headers) {
        return r;
    }
    remove(&state.customers, id)
}

/// A running mock API bound to an ephemeral local port.
pub struct MockApi {
    /// Base URL of the mock, e.g. `http://127.0.0.1:41234`.
    pub base_url: String,
    /// Shared state for inspection and fault injection.
    pub state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockApi {
    /// Starts the mock.
    pub async fn start() -> Result<Self> {
        let state = Arc::new(MockState::new());

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/users", get(list_users).post(create_user))
            .route("/api/users/{id}", put(update_user).delete(delete_user))
            .route("/api/customers", get(list_customers).post(create_customer))
            .route(
                "/api/customers/{id}",
                put(update_customer).delete(delete_customer),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .context("Failed to bind mock API")?;
        let addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            task,
        })
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clientdesk_api::{
        ApiClient, ApiConfig, ApiError, AuthApi, CustomerForm, CustomersApi, NewUser, ResourceId,
        UserUpdate, UsersApi,
    };
    use clientdesk_auth::{
        ExpiryPolicy, LoginOutcome, MemoryNavigator, Navigator, Role, Route, SessionConfig,
        SessionContext, SystemClock, TokenStore,
    };
    use clientdesk_storage_sqlite::SqliteBackend;
    use tempfile::TempDir;

    /// A client wired to a fresh mock API and an empty on-disk store.
    struct Harness {
        api: MockApi,
        dir: TempDir,
        session: Arc<SessionContext>,
        navigator: Arc<MemoryNavigator>,
        client: ApiClient,
    }

    impl Harness {
        async fn start() -> Self {
            Self::with_policy(ExpiryPolicy::Strictest).await
        }

        async fn with_policy(policy: ExpiryPolicy) -> Self {
            let api = MockApi::start().await.unwrap();
            let dir = TempDir::new().unwrap();
            let navigator = Arc::new(MemoryNavigator::new("/login"));
            let session = open_session(&api, &dir, navigator.clone(), policy).await;
            let client = ApiClient::new(&ApiConfig::new(&api.base_url), session.clone()).unwrap();

            Self {
                api,
                dir,
                session,
                navigator,
                client,
            }
        }

        async fn login(&self, username: &str, password: &str) -> LoginOutcome {
            let gateway = AuthApi::new(self.client.clone());
            self.session.login(&gateway, username, password).await
        }

        fn login_calls(&self) -> usize {
            self.api.state.login_calls.load(Ordering::SeqCst)
        }

        fn api_calls(&self) -> usize {
            self.api.state.api_calls.load(Ordering::SeqCst)
        }
    }

    async fn open_session(
        api: &MockApi,
        dir: &TempDir,
        navigator: Arc<MemoryNavigator>,
        policy: ExpiryPolicy,
    ) -> Arc<SessionContext> {
        let origin = SqliteBackend::origin_from_url(&api.base_url);
        let backend = SqliteBackend::open(dir.path(), &origin).await.unwrap();

        Arc::new(SessionContext::new(
            TokenStore::new(Arc::new(backend)),
            navigator,
            Arc::new(SystemClock),
            SessionConfig { policy },
        ))
    }

    #[tokio::test]
    async fn test_admin_login_lands_on_admin_panel() {
        let h = Harness::start().await;

        let outcome = h.login("admin", "admin123").await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(h.login_calls(), 1);
        assert!(h.session.is_authenticated().await);
        assert!(h.session.store().expires().await.is_some());

        assert_eq!(h.session.landing_route(&outcome).await, Route::Admin);
        assert_eq!(h.session.navigate("/").await.unwrap(), Route::Admin);
        assert_eq!(h.navigator.location(), "/admin");

        let user = h.session.current_user().await.unwrap();
        assert_eq!(user.id.as_deref(), Some("1"));
        assert_eq!(user.username.as_deref(), Some("admin"));
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_short_username_never_reaches_server() {
        let h = Harness::start().await;

        let outcome = h.login("ab", "validpass").await;

        assert_eq!(
            outcome.message(),
            Some("Username must be between 3 and 50 characters")
        );
        assert_eq!(h.login_calls(), 0);
        assert!(!h.session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_rejected_login_shows_server_message() {
        let h = Harness::start().await;

        let outcome = h.login("admin", "wrongpass").await;

        assert_eq!(outcome.message(), Some("Invalid username or password"));
        assert_eq!(h.login_calls(), 1);
        assert!(h.session.store().get().await.is_none());
        assert_eq!(h.navigator.location(), "/login");
    }

    #[tokio::test]
    async fn test_customer_is_kept_out_of_admin() {
        let h = Harness::start().await;

        let outcome = h.login("alice", "secret1").await;
        assert_eq!(h.session.landing_route(&outcome).await, Route::Customer);

        assert_eq!(h.session.navigate("/admin").await.unwrap(), Route::Customer);
        assert_eq!(h.navigator.location(), "/customer");
        assert!(h.session.has_role(&Role::Customer).await);
        assert!(!h.session.has_role(&Role::Admin).await);
    }

    #[tokio::test]
    async fn test_unauthenticated_admin_goes_to_login() {
        let h = Harness::start().await;

        assert_eq!(h.session.navigate("/admin").await.unwrap(), Route::Login);
        assert_eq!(h.session.navigate("/customer").await.unwrap(), Route::Login);
    }

    #[tokio::test]
    async fn test_unauthorized_response_ends_session() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;
        assert_eq!(h.session.navigate("/admin").await.unwrap(), Route::Admin);
        let epoch = h.session.epoch();

        h.api.state.force_unauthorized.store(true, Ordering::SeqCst);
        let err = UsersApi::new(h.client.clone()).list().await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized { .. }), "{err:?}");
        assert_eq!(err.message(), "Unauthorized");
        assert!(h.session.store().get().await.is_none());
        assert!(h.session.store().expires().await.is_none());
        assert_eq!(h.navigator.location(), "/login");
        assert_eq!(h.navigator.hard_redirects(), 1);
        assert_ne!(h.session.epoch(), epoch);
    }

    #[tokio::test]
    async fn test_requests_carry_bearer_token() {
        let h = Harness::start().await;
        let users = UsersApi::new(h.client.clone());

        // No session: the request goes out bare and is refused.
        assert!(matches!(
            users.list().await,
            Err(ApiError::Unauthorized { .. })
        ));

        h.login("admin", "admin123").await;
        let list = users.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].username, "admin");
        assert_eq!(list[1].role_name.as_deref(), Some("customer"));
    }

    #[tokio::test]
    async fn test_user_management() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;
        let users = UsersApi::new(h.client.clone());

        let created = users
            .create(&NewUser::new("carol", "pass123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.username, "carol");
        assert_eq!(created.role_name.as_deref(), Some("customer"));

        let update = UserUpdate {
            role_name: Some("admin".into()),
            password: Some(String::new()),
            ..UserUpdate::default()
        };
        let updated = users.update(&created.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.username, "carol");
        assert_eq!(updated.role_name.as_deref(), Some("admin"));
        assert_eq!(
            h.api.state.last_update.lock().unwrap().clone(),
            Some(json!({ "roleName": "admin" }))
        );

        users.delete(&created.id).await.unwrap();
        let remaining = users.list().await.unwrap();
        assert!(remaining.iter().all(|u| u.id != created.id));

        let err = users.delete(&ResourceId::from(424_242_i64)).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(h.session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_customer_management() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;
        let customers = CustomersApi::new(h.client.clone());

        let form = CustomerForm {
            name: "Globex".into(),
            email: "hello@globex.test".into(),
            phone: "555-0199".into(),
        };
        let created = customers.create(&form).await.unwrap().unwrap();
        assert_eq!(created.name, "Globex");

        let duplicate = customers.create(&form).await.unwrap_err();
        assert_eq!(duplicate.status(), Some(409));
        assert_eq!(duplicate.message(), "Email already exists");

        let renamed = CustomerForm {
            name: "Globex Corp".into(),
            ..form.clone()
        };
        let updated = customers
            .update(&created.id, &renamed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Globex Corp");
        assert_eq!(updated.email, "hello@globex.test");

        customers.delete(&created.id).await.unwrap();
        assert_eq!(customers.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_writes_without_response_body_succeed() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;
        h.api.state.bodiless_writes.store(true, Ordering::SeqCst);

        let users = UsersApi::new(h.client.clone());
        let created = users.create(&NewUser::new("dave", "pass123")).await.unwrap();
        assert!(created.is_none());

        let listed = users.list().await.unwrap();
        let dave = listed.iter().find(|u| u.username == "dave").unwrap();

        let update = UserUpdate {
            role_name: Some("admin".into()),
            ..UserUpdate::default()
        };
        assert!(users.update(&dave.id, &update).await.unwrap().is_none());

        let listed = users.list().await.unwrap();
        let dave = listed.iter().find(|u| u.username == "dave").unwrap();
        assert_eq!(dave.role_name.as_deref(), Some("admin"));

        let customers = CustomersApi::new(h.client.clone());
        let form = CustomerForm {
            name: "Initech".into(),
            email: "it@initech.test".into(),
            phone: "555-0142".into(),
        };
        assert!(customers.create(&form).await.unwrap().is_none());
        assert!(customers
            .list()
            .await
            .unwrap()
            .iter()
            .any(|c| c.name == "Initech"));
    }

    #[tokio::test]
    async fn test_incomplete_customer_is_not_sent() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;
        let before = h.api_calls();

        let form = CustomerForm {
            name: "No Phone".into(),
            email: "np@example.test".into(),
            phone: String::new(),
        };
        let err = CustomersApi::new(h.client.clone())
            .create(&form)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Invalid(_)));
        assert_eq!(h.api_calls(), before);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let h = Harness::start().await;
        h.login("alice", "secret1").await;

        let navigator = Arc::new(MemoryNavigator::default());
        let reopened = open_session(&h.api, &h.dir, navigator, ExpiryPolicy::Strictest).await;

        assert!(reopened.is_authenticated().await);
        let user = reopened.current_user().await.unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_past_server_expiry_invalidates_fresh_token() {
        let h = Harness::start().await;
        let past = (Utc::now() - Duration::minutes(5)).to_rfc3339();
        *h.api.state.expires_override.lock().unwrap() = Some(Some(past));

        let outcome = h.login("admin", "admin123").await;
        assert!(outcome.is_success());

        assert!(!h.session.is_authenticated().await);
        assert!(h.session.current_user().await.is_none());
        assert!(h.session.store().get().await.is_none());
    }

    #[tokio::test]
    async fn test_future_server_expiry_with_expired_claim() {
        for (policy, authenticated) in [
            (ExpiryPolicy::Strictest, false),
            (ExpiryPolicy::ServerAuthoritative, true),
        ] {
            let h = Harness::with_policy(policy).await;
            h.api.state.token_ttl.store(-60, Ordering::SeqCst);
            let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
            *h.api.state.expires_override.lock().unwrap() = Some(Some(future));

            h.login("admin", "admin123").await;

            assert_eq!(
                h.session.is_authenticated().await,
                authenticated,
                "policy {policy}"
            );
        }
    }

    #[tokio::test]
    async fn test_expired_claim_without_server_expiry() {
        let h = Harness::start().await;
        h.api.state.token_ttl.store(-60, Ordering::SeqCst);
        *h.api.state.expires_override.lock().unwrap() = Some(None);

        let outcome = h.login("admin", "admin123").await;
        let LoginOutcome::Success { token, .. } = &outcome else {
            panic!("expected success, got {outcome:?}");
        };

        assert!(clientdesk_token::decode(token).is_some());
        assert!(h.session.store().expires().await.is_none());
        assert!(!h.session.is_authenticated().await);
        assert_eq!(h.session.navigate("/admin").await.unwrap(), Route::Login);
    }

    #[tokio::test]
    async fn test_logout_clears_store_and_reloads() {
        let h = Harness::start().await;
        h.login("admin", "admin123").await;

        h.session.logout().await;

        assert!(h.session.store().get().await.is_none());
        assert_eq!(h.navigator.location(), "/login");
        assert_eq!(h.session.epoch(), 1);
        assert!(h.session.current_user().await.is_none());
    }
}
