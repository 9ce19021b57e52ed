//! Session and request types

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mbdata_core::DispatchOutcome;
use serde_json::Value;
use url::Url;

use crate::transport::Method;

/// Number of token characters shown in logs and debug output
const TOKEN_PREVIEW_LEN: usize = 6;

/// Shorten a secret for logging
pub(crate) fn preview(token: &str) -> String {
    if token.chars().count() <= TOKEN_PREVIEW_LEN {
        "***".to_string()
    } else {
        let head: String = token.chars().take(TOKEN_PREVIEW_LEN).collect();
        format!("{}***", head)
    }
}

/// Identity of a session: who authenticates and for which vehicle.
///
/// Immutable after construction. The evolving refresh token lives in
/// [`TokenState`], not here.
#[derive(Clone)]
pub struct Credentials {
    account: String,
    basic_auth: String,
    vin: String,
}

impl Credentials {
    /// `account` is the developer account identifier sent as HTTP basic
    /// credentials to the token endpoint.
    pub fn new(account: impl Into<String>, vin: impl Into<String>) -> Self {
        let account = account.into();
        let basic_auth = BASE64.encode(account.as_bytes());
        Self {
            account,
            basic_auth,
            vin: vin.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// Value for `Authorization: Basic ...`
    pub fn basic_auth(&self) -> &str {
        &self.basic_auth
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("basic_auth", &"***")
            .field("vin", &self.vin)
            .finish()
    }
}

/// Access/refresh token pair plus the reauthentication guard.
///
/// Both tokens are cleared together whenever authentication fails, so an
/// access token never outlives a failed refresh.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) authenticating: bool,
}

impl TokenState {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            authenticating: false,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn is_authenticating(&self) -> bool {
        self.authenticating
    }

    pub(crate) fn clear(&mut self) {
        self.access_token.clear();
        self.refresh_token.clear();
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &preview(&self.access_token))
            .field("refresh_token", &preview(&self.refresh_token))
            .field("authenticating", &self.authenticating)
            .finish()
    }
}

/// A provider call before headers and timeouts are resolved
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
    /// Caller supplied headers, sent before the generated ones
    pub headers: Vec<(String, String)>,
    /// Attach `Authorization: Bearer <access token>`
    pub requires_auth: bool,
    /// Overrides the dispatcher's default timeout
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Authorized GET
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
            headers: Vec::new(),
            requires_auth: true,
            timeout: None,
        }
    }

    /// Authorized POST
    pub fn post(url: Url, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body.into()),
            headers: Vec::new(),
            requires_auth: true,
            timeout: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Do not send the bearer token (token exchange)
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Successful result of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// HTTP 200 with a decoded JSON body
    Body(Value),
    /// HTTP 204, nothing to decode
    NoContent,
}

impl Dispatched {
    pub fn outcome(&self) -> DispatchOutcome {
        match self {
            Dispatched::Body(_) => DispatchOutcome::Success,
            Dispatched::NoContent => DispatchOutcome::NoContent,
        }
    }

    /// The decoded body, `Value::Null` for no content
    pub fn into_value(self) -> Value {
        match self {
            Dispatched::Body(value) => value,
            Dispatched::NoContent => Value::Null,
        }
    }
}
