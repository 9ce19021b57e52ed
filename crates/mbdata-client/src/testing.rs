//! Test utilities for mbdata-client
//!
//! [`MockProvider`] serves the token endpoint and the vehicle data API on a
//! local port. It rotates tokens like the real provider does: every
//! successful exchange invalidates the previous refresh token.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::ClientConfig;
use crate::endpoints::TOKEN_PATH;
use mbdata_core::{ApiError, ApiResult};

/// Endpoint groups counted by the mock provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Token,
    Resources,
    Resource,
    Container,
}

/// Mutable provider state, shared with the request handlers
#[derive(Debug, Default)]
pub struct ProviderState {
    /// VIN served by the data API; other VINs get 404
    pub vin: String,
    /// Refresh token the next exchange must present
    pub refresh_token: String,
    /// Currently valid access token
    pub access_token: String,
    /// Answer for the resource listing
    pub listing: Value,
    /// Answers per resource name
    pub resources: HashMap<String, Value>,
    /// Answers per container; missing containers answer 204
    pub containers: HashMap<String, Value>,
    /// Statuses returned by the next data API calls, before any auth check
    pub forced: VecDeque<u16>,
    issued: u32,
    calls: HashMap<Route, usize>,
}

impl ProviderState {
    fn count(&mut self, route: Route) {
        *self.calls.entry(route).or_default() += 1;
    }
}

type SharedState = Arc<Mutex<ProviderState>>;

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    #[serde(default)]
    refresh_token: String,
}

/// In-process mock of the provider that shuts down when dropped
pub struct MockProvider {
    pub addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockProvider {
    /// Start a provider for `vin` that accepts `refresh_token` once
    pub async fn start(vin: &str, refresh_token: &str) -> ApiResult<Self> {
        let state = Arc::new(Mutex::new(ProviderState {
            vin: vin.to_string(),
            refresh_token: refresh_token.to_string(),
            listing: json!([]),
            ..Default::default()
        }));

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to bind mock provider: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = router(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing both APIs at this provider
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            awake_timeout_secs: 2,
            ..ClientConfig::with_base_url(&self.base_url())
        }
    }

    /// Edit the provider state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut ProviderState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn set_listing(&self, listing: Value) {
        self.state.lock().listing = listing;
    }

    pub fn set_resource(&self, name: &str, value: Value) {
        self.state.lock().resources.insert(name.to_string(), value);
    }

    pub fn set_container(&self, name: &str, body: Value) {
        self.state.lock().containers.insert(name.to_string(), body);
    }

    /// Answer the next data API call with `status`
    pub fn force_status(&self, status: u16) {
        self.state.lock().forced.push_back(status);
    }

    /// Invalidate the current access token, as after its expiry
    pub fn expire_access_token(&self) {
        self.state.lock().access_token = "expired".to_string();
    }

    /// Refresh token the provider will accept next
    pub fn refresh_token(&self) -> String {
        self.state.lock().refresh_token.clone()
    }

    /// Number of calls served on a route
    pub fn calls(&self, route: Route) -> usize {
        self.state.lock().calls.get(&route).copied().unwrap_or(0)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route(TOKEN_PATH, post(token))
        .route("/vehicledata/v1/vehicles/{vin}/resources", get(resources))
        .route(
            "/vehicledata/v1/vehicles/{vin}/resources/{name}",
            get(resource),
        )
        .route(
            "/vehicledata/v1/vehicles/{vin}/containers/{container}",
            get(container),
        )
        .with_state(state)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn token(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let mut state = state.lock();
    state.count(Route::Token);

    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"}))).into_response();
    }

    if form.grant_type != "refresh_token" || form.refresh_token != state.refresh_token {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "refresh token is invalid or expired"
            })),
        )
            .into_response();
    }

    state.issued += 1;
    state.access_token = format!("access-{}", state.issued);
    state.refresh_token = format!("refresh-{}", state.issued);

    Json(json!({
        "access_token": state.access_token,
        "refresh_token": state.refresh_token,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

/// Forced status, bearer check and VIN check shared by all data routes
fn gate(state: &mut ProviderState, headers: &HeaderMap, vin: &str) -> Option<Response> {
    if let Some(code) = state.forced.pop_front() {
        return Some(status(code).into_response());
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if state.access_token.is_empty() || bearer != Some(state.access_token.as_str()) {
        return Some(StatusCode::UNAUTHORIZED.into_response());
    }

    if vin != state.vin {
        return Some(StatusCode::NOT_FOUND.into_response());
    }

    None
}

async fn resources(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(vin): Path<String>,
) -> Response {
    let mut state = state.lock();
    state.count(Route::Resources);
    if let Some(response) = gate(&mut state, &headers, &vin) {
        return response;
    }
    Json(state.listing.clone()).into_response()
}

async fn resource(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((vin, name)): Path<(String, String)>,
) -> Response {
    let mut state = state.lock();
    state.count(Route::Resource);
    if let Some(response) = gate(&mut state, &headers, &vin) {
        return response;
    }
    match state.resources.get(&name) {
        Some(value) => Json(value.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn container(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((vin, name)): Path<(String, String)>,
) -> Response {
    let mut state = state.lock();
    state.count(Route::Container);
    if let Some(response) = gate(&mut state, &headers, &vin) {
        return response;
    }
    match state.containers.get(&name) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
