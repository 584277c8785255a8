//! Integration test support for the jewellery storefront cart.
//!
//! [`MockCartBackend`] serves the cart API on an ephemeral local port with
//! cookie-scoped sessions, so the real [`HttpCartClient`] can be exercised
//! end to end.
//!
//! | method | path                    | answer                 |
//! |--------|-------------------------|------------------------|
//! | GET    | `/api/cart`             | snapshot, 204 if empty |
//! | POST   | `/api/cart/add`         | snapshot               |
//! | PUT    | `/api/cart/item`        | snapshot               |
//! | DELETE | `/api/cart/item/{key}`  | 204                    |
//! | DELETE | `/api/cart/clear`       | snapshot               |
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use jewellery_storefront::config::{CartApiConfig, DisplayConfig};
use jewellery_storefront::controller::CartController;
use jewellery_storefront::service::{HttpCartClient, REQUEST_ID_HEADER};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

/// Cookie carrying the backend session.
pub const SESSION_COOKIE: &str = "cart_session";

/// Products the mock backend sells: id, name, unit price.
pub const CATALOG: &[(i64, &str, i64)] = &[(7, "Ring", 100), (8, "Chain", 50), (9, "Bangle", 250)];

/// Endpoints counted by [`MockCartBackend::hits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Get,
    Add,
    Update,
    Remove,
    Clear,
}

#[derive(Debug, Clone)]
struct Line {
    product_id: i64,
    variant_id: Option<i64>,
    name: String,
    price: Decimal,
    quantity: u32,
}

impl Line {
    fn key(&self) -> String {
        format!("{}:{}", self.product_id, self.variant_id.unwrap_or(0))
    }
}

#[derive(Default)]
struct BackendState {
    sessions: HashMap<String, Vec<Line>>,
    hits: HashMap<Endpoint, usize>,
    request_ids: Vec<Option<String>>,
    fail_next: Option<(StatusCode, Option<String>)>,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process cart API.
pub struct MockCartBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockCartBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = Router::new()
            .route("/api/cart", get(get_cart))
            .route("/api/cart/add", post(add_item))
            .route("/api/cart/item", put(update_item))
            .route("/api/cart/item/{key}", delete(remove_item))
            .route("/api/cart/clear", delete(clear))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Listener has no address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// API root, e.g. `http://127.0.0.1:41234/api/`.
    ///
    /// # Panics
    ///
    /// Panics if the address does not form a URL.
    #[must_use]
    pub fn api_root(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("Invalid mock backend URL")
    }

    #[must_use]
    pub fn api_config(&self) -> CartApiConfig {
        CartApiConfig::new(self.api_root())
    }

    /// A fresh client, i.e. a fresh browser session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self) -> HttpCartClient {
        HttpCartClient::new(&self.api_config()).expect("Failed to build cart client")
    }

    /// A controller over a fresh session with default display settings.
    #[must_use]
    pub fn controller(&self) -> CartController<HttpCartClient> {
        CartController::new(self.client(), DisplayConfig::default())
    }

    /// Answer the next request with `status` and, if given, a JSON
    /// `{"message": ...}` body.
    pub fn fail_next(&self, status: StatusCode, message: Option<&str>) {
        lock(&self.state).fail_next = Some((status, message.map(String::from)));
    }

    /// Number of requests received by an endpoint.
    #[must_use]
    pub fn hits(&self, endpoint: Endpoint) -> usize {
        lock(&self.state).hits.get(&endpoint).copied().unwrap_or(0)
    }

    /// The request id header of every request, in arrival order.
    #[must_use]
    pub fn request_ids(&self) -> Vec<Option<String>> {
        lock(&self.state).request_ids.clone()
    }

    /// Number of sessions the backend has handed out.
    #[must_use]
    pub fn session_count(&self) -> usize {
        lock(&self.state).sessions.len()
    }
}

impl Drop for MockCartBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Bookkeeping shared by every handler: count the hit, record the request
/// id, apply an injected failure and resolve the session.
struct Session {
    id: String,
    set_cookie: Option<String>,
}

fn begin(
    state: &Shared,
    headers: &HeaderMap,
    endpoint: Endpoint,
) -> Result<Session, Response> {
    let mut state = lock(state);
    *state.hits.entry(endpoint).or_default() += 1;
    state.request_ids.push(
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );

    if let Some((status, message)) = state.fail_next.take() {
        let response = match message {
            Some(message) => (status, Json(json!({ "message": message }))).into_response(),
            None => status.into_response(),
        };
        return Err(response);
    }

    let existing = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|id| state.sessions.contains_key(id));

    Ok(match existing {
        Some(id) => Session {
            id,
            set_cookie: None,
        },
        None => {
            let id = Uuid::new_v4().to_string();
            state.sessions.insert(id.clone(), Vec::new());
            Session {
                set_cookie: Some(format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly")),
                id,
            }
        }
    })
}

fn respond(session: &Session, status: StatusCode, body: Option<Value>) -> Response {
    let mut response = match body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    };
    if let Some(cookie) = session
        .set_cookie
        .as_deref()
        .and_then(|c| HeaderValue::from_str(c).ok())
    {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

fn snapshot(lines: &[Line]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|line| {
            json!({
                "itemKey": line.key(),
                "productId": line.product_id,
                "attributeValueId": line.variant_id,
                "productName": line.name,
                "unitPrice": line.price.to_string(),
                "quantity": line.quantity,
                "totalPrice": (line.price * Decimal::from(line.quantity)).to_string(),
            })
        })
        .collect();
    let total: Decimal = lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum();
    let quantity: u32 = lines.iter().map(|line| line.quantity).sum();
    json!({
        "items": items,
        "cartTotal": total.to_string(),
        "totalQuantity": quantity,
    })
}

fn not_found(session: &Session, message: &str) -> Response {
    respond(session, StatusCode::NOT_FOUND, Some(json!({ "message": message })))
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let session = match begin(&state, &headers, Endpoint::Get) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let lines = lock(&state).sessions.get(&session.id).cloned().unwrap_or_default();
    if lines.is_empty() {
        return respond(&session, StatusCode::NO_CONTENT, None);
    }
    respond(&session, StatusCode::OK, Some(snapshot(&lines)))
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let session = match begin(&state, &headers, Endpoint::Add) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let product_id = body.get("productId").and_then(Value::as_i64);
    let variant_id = body.get("attributeValueId").and_then(Value::as_i64);
    let quantity = body
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    let Some((id, name, price)) = product_id
        .and_then(|id| CATALOG.iter().find(|(candidate, _, _)| *candidate == id))
        .copied()
    else {
        return not_found(&session, "Product not found");
    };

    let mut guard = lock(&state);
    let lines = guard.sessions.entry(session.id.clone()).or_default();
    match lines
        .iter_mut()
        .find(|line| line.product_id == id && line.variant_id == variant_id)
    {
        Some(line) => line.quantity += quantity,
        None => lines.push(Line {
            product_id: id,
            variant_id,
            name: name.to_string(),
            price: Decimal::from(price),
            quantity,
        }),
    }
    let body = snapshot(lines);
    drop(guard);
    respond(&session, StatusCode::OK, Some(body))
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let session = match begin(&state, &headers, Endpoint::Update) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let key = body.get("itemKey").and_then(Value::as_str).unwrap_or_default();
    let quantity = body
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(0);

    let mut guard = lock(&state);
    let lines = guard.sessions.entry(session.id.clone()).or_default();
    let Some(line) = lines.iter_mut().find(|line| line.key() == key) else {
        drop(guard);
        return not_found(&session, "Item not in cart");
    };
    line.quantity = quantity;
    let body = snapshot(lines);
    drop(guard);
    respond(&session, StatusCode::OK, Some(body))
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Response {
    let session = match begin(&state, &headers, Endpoint::Remove) {
        Ok(session) => session,
        Err(response) => return response,
    };
    if let Some(lines) = lock(&state).sessions.get_mut(&session.id) {
        lines.retain(|line| line.key() != key);
    }
    respond(&session, StatusCode::NO_CONTENT, None)
}

async fn clear(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let session = match begin(&state, &headers, Endpoint::Clear) {
        Ok(session) => session,
        Err(response) => return response,
    };
    if let Some(lines) = lock(&state).sessions.get_mut(&session.id) {
        lines.clear();
    }
    respond(&session, StatusCode::OK, Some(snapshot(&[])))
}
