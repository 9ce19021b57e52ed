//! OAuth2 token lifecycle
//!
//! [`AuthSession`] holds the token pair and knows how to build the refresh
//! exchange and how to apply its answer. It performs no I/O itself: the
//! [`RequestDispatcher`](crate::RequestDispatcher) sends the request it
//! prepares, which keeps the "unauthorized while authenticating" guard in
//! a single place.
//!
//! Only the refresh-token grant is supported. The refresh token rotates on
//! every successful exchange, so callers must persist
//! [`AuthSession::refresh_token`] after each refresh.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::json;
use crate::types::{preview, ApiRequest, Credentials, Dispatched, TokenState};
use mbdata_core::{ApiError, ApiResult};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Token endpoint answer. All members are optional; validation happens
/// in [`AuthSession::complete_refresh`].
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Owner of the access/refresh token pair for one vehicle session
#[derive(Debug, Clone)]
pub struct AuthSession {
    credentials: Credentials,
    pub(crate) tokens: TokenState,
    token_url: Url,
}

impl AuthSession {
    /// Create a session that will authenticate with `refresh_token`.
    ///
    /// No access token is held until the first successful refresh.
    pub fn new(credentials: Credentials, refresh_token: impl Into<String>, token_url: Url) -> Self {
        Self {
            credentials,
            tokens: TokenState::new(refresh_token),
            token_url,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn tokens(&self) -> &TokenState {
        &self.tokens
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.access_token()
    }

    /// Current refresh token; changes after every successful refresh
    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.refresh_token()
    }

    /// True while a token exchange is in flight
    pub fn is_authenticating(&self) -> bool {
        self.tokens.authenticating
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    /// Prepare the refresh-token exchange and mark the session as
    /// authenticating.
    ///
    /// Fails with [`ApiError::NoCredentials`] (and clears both tokens)
    /// when there is no refresh token; no request is produced then.
    pub fn begin_refresh(&mut self) -> ApiResult<ApiRequest> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            error!("No refresh token to perform refresh");
            self.tokens.clear();
            return Err(ApiError::NoCredentials);
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let body = serde_urlencoded::to_string(&params)
            .map_err(|e| ApiError::MalformedResponse(format!("Failed to encode form: {}", e)))?;

        self.tokens.authenticating = true;

        Ok(ApiRequest::post(self.token_url.clone(), body)
            .without_auth()
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_header(
                "Authorization",
                format!("Basic {}", self.credentials.basic_auth()),
            ))
    }

    /// Apply the outcome of the exchange started by [`begin_refresh`].
    ///
    /// On success both tokens are replaced. Any failure (transport error,
    /// `error` member, missing or empty token) clears both tokens.
    ///
    /// [`begin_refresh`]: AuthSession::begin_refresh
    pub fn complete_refresh(&mut self, result: ApiResult<Dispatched>) -> ApiResult<()> {
        self.tokens.authenticating = false;

        match result.and_then(Self::parse_tokens) {
            Ok((access_token, refresh_token)) => {
                info!(
                    refresh_token = %preview(&refresh_token),
                    "Received new refresh token"
                );
                debug!("Received access token from API");
                self.tokens.access_token = access_token;
                self.tokens.refresh_token = refresh_token;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to get token");
                self.tokens.clear();
                Err(e)
            }
        }
    }

    fn parse_tokens(reply: Dispatched) -> ApiResult<(String, String)> {
        let body = match reply {
            Dispatched::Body(body) => body,
            Dispatched::NoContent => {
                return Err(ApiError::MalformedResponse(
                    "Token endpoint returned no content".to_string(),
                ))
            }
        };

        let response: TokenResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::MalformedResponse(format!("Invalid token response: {}", e)))?;

        if let Some(error) = response.error.filter(|e| !e.is_null()) {
            let mut message = json::as_text(&error);
            if let Some(description) = response.error_description {
                message = format!("{}: {}", message, description);
            }
            return Err(ApiError::Provider(message));
        }

        let access_token = response.access_token.unwrap_or_default();
        if access_token.is_empty() {
            return Err(ApiError::MalformedResponse(
                "Received token is zero length".to_string(),
            ));
        }

        let refresh_token = response.refresh_token.unwrap_or_default();
        if refresh_token.is_empty() {
            return Err(ApiError::MalformedResponse(
                "Received refresh token is zero length".to_string(),
            ));
        }

        Ok((access_token, refresh_token))
    }
}
