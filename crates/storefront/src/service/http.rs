//! HTTP implementation of [`CartService`] using `reqwest`.
//!
//! The client keeps a cookie store so the backend session (and with it the
//! cart) survives across requests, the way a browser sends credentials with
//! `credentials: "include"`.

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::CartService;
use crate::cart::{AddToCartRequest, Cart, ItemKey, UpdateCartItemRequest, normalize_cart};
use crate::config::CartApiConfig;
use crate::error::{CartError, Result, UNEXPECTED_RESPONSE_MESSAGE};

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cart client for the storefront backend.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<HttpCartClientInner>,
}

struct HttpCartClientInner {
    client: reqwest::Client,
    /// `{api_root}/cart`, without a trailing slash.
    cart_url: String,
}

impl HttpCartClient {
    /// Create a new cart client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CartApiConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCartClientInner {
                client,
                cart_url: config.cart_url(),
            }),
        })
    }

    /// The resolved `/cart` endpoint.
    #[must_use]
    pub fn cart_url(&self) -> &str {
        &self.inner.cart_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.cart_url)
    }

    /// Send a request and read the answer as an optional cart snapshot.
    ///
    /// `Ok(None)` means the server answered 204 or an empty body.
    async fn execute(&self, request: RequestBuilder) -> Result<Option<Cart>> {
        let request_id = Uuid::new_v4().to_string();
        let response = request
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::warn!(
                status = %status,
                request_id = %request_id,
                server_message = message.as_deref().unwrap_or(""),
                "Cart API returned non-success status"
            );
            return Err(CartError::server(status.as_u16(), message));
        }

        if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
            debug!(status = %status, "Cart API answered without a body");
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(
                error = %e,
                body = %String::from_utf8_lossy(&body).chars().take(500).collect::<String>(),
                "Failed to parse cart response"
            );
            CartError::Server {
                status: status.as_u16(),
                message: UNEXPECTED_RESPONSE_MESSAGE.to_string(),
            }
        })?;

        normalize_cart(&value)
            .map(Some)
            .map_err(|e| CartError::unexpected_body(status.as_u16(), &e))
    }

    /// Like [`Self::execute`] for endpoints that must answer with a snapshot.
    async fn execute_snapshot(&self, request: RequestBuilder) -> Result<Cart> {
        self.execute(request).await?.ok_or_else(|| CartError::Server {
            status: StatusCode::NO_CONTENT.as_u16(),
            message: UNEXPECTED_RESPONSE_MESSAGE.to_string(),
        })
    }
}

impl CartService for HttpCartClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Cart> {
        let builder = self.inner.client.get(self.url(""));
        // No cart in the session yet: some backends answer 204.
        Ok(self.execute(builder).await?.unwrap_or_default())
    }

    #[instrument(skip(self), fields(product_id = %request.product_id))]
    async fn add_item(&self, request: &AddToCartRequest) -> Result<Cart> {
        let builder = self.inner.client.post(self.url("/add")).json(request);
        self.execute_snapshot(builder).await
    }

    #[instrument(skip(self), fields(item_key = %request.item_key))]
    async fn update_item(&self, request: &UpdateCartItemRequest) -> Result<Cart> {
        let builder = self.inner.client.put(self.url("/item")).json(request);
        self.execute_snapshot(builder).await
    }

    #[instrument(skip(self), fields(item_key = %item_key))]
    async fn remove_item(&self, item_key: &ItemKey) -> Result<Option<Cart>> {
        let path = format!("/item/{}", urlencoding::encode(item_key.as_str()));
        let builder = self.inner.client.delete(self.url(&path));
        self.execute(builder).await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<Option<Cart>> {
        let builder = self.inner.client.delete(self.url("/clear"));
        self.execute(builder).await
    }
}

/// Extract the user-facing message from an error body.
///
/// Reads `message`, then `error`, from a JSON object. Anything else yields
/// `None` so the caller falls back to the generic message.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}
