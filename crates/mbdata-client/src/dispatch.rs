//! Request dispatch and status policy
//!
//! Every provider call goes through [`RequestDispatcher::dispatch`]. It
//! resolves headers and timeout, executes the request on the transport and
//! maps the HTTP status to an outcome:
//!
//! | status    | result                                                  |
//! |-----------|---------------------------------------------------------|
//! | 200       | body decoded as JSON                                    |
//! | 204       | [`Dispatched::NoContent`], body ignored                 |
//! | 400 / 401 | token refresh (unless already authenticating), then error |
//! | 429       | [`ApiError::RateLimited`]                               |
//! | 500 / 503 | [`ApiError::ServiceUnavailable`]                        |
//! | other     | [`ApiError::UnexpectedStatus`]                          |
//!
//! The original request is never retried here. After a 401 the caller sees
//! `AuthRejected { reauthenticated: true }` and decides whether to repeat it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::AuthSession;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::{ApiRequest, Dispatched};
use mbdata_core::{ApiError, ApiResult, DispatchOutcome};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Sends provider requests on behalf of an [`AuthSession`]
pub struct RequestDispatcher {
    transport: Arc<dyn HttpTransport>,
    auth: AuthSession,
    default_timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, auth: AuthSession, default_timeout: Duration) -> Self {
        Self {
            transport,
            auth,
            default_timeout,
        }
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Send a request and apply the provider's status policy
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn dispatch(&mut self, request: ApiRequest) -> ApiResult<Dispatched> {
        let http = self.prepare(request)?;

        debug!("Performing request to API");
        let response = match self.transport.execute(http).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Error sending request to API");
                return Err(e.into());
            }
        };

        let status = response.status;
        debug!(status, bytes = response.body.len(), "Performed request to API");

        match DispatchOutcome::from_status(status) {
            DispatchOutcome::Success => Self::decode(response),
            DispatchOutcome::NoContent => {
                info!("Received (204) No Content, likely no activity/updates in the last 12 hours");
                Ok(Dispatched::NoContent)
            }
            DispatchOutcome::ReauthRequired => {
                if self.auth.is_authenticating() {
                    info!(status, "Received {} during authorization, aborting", status);
                    return Err(ApiError::AuthRejected {
                        status,
                        reauthenticated: false,
                    });
                }

                info!(status, "Received {}, trying to reauthorize", status);
                let reauthenticated = self.refresh().await.is_ok();
                Err(ApiError::AuthRejected {
                    status,
                    reauthenticated,
                })
            }
            DispatchOutcome::RateLimited => {
                warn!("Received 429, too many requests, backing off is up to the caller");
                Err(ApiError::RateLimited)
            }
            DispatchOutcome::ServiceUnavailable => {
                warn!(status, "Received {}, service is not available", status);
                Err(ApiError::ServiceUnavailable(status))
            }
            DispatchOutcome::Fatal => {
                warn!(status, "Received unhandled HTTP status {}", status);
                Err(ApiError::UnexpectedStatus(status))
            }
        }
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// The token request itself goes through [`dispatch`](Self::dispatch);
    /// a 400/401 answer to it does not trigger a nested refresh because the
    /// session is marked as authenticating for the duration of the call.
    pub fn refresh(&mut self) -> BoxFuture<'_, ApiResult<()>> {
        Box::pin(async move {
            info!("Refreshing login credentials");
            let request = self.auth.begin_refresh()?;
            let reply = self.dispatch(request).await;

            let result = self.auth.complete_refresh(reply);
            match &result {
                Ok(()) => info!("Refresh successful"),
                Err(e) => error!(error = %e, "Failed to refresh login credentials"),
            }
            result
        })
    }

    fn prepare(&self, request: ApiRequest) -> ApiResult<HttpRequest> {
        let access_token = self.auth.access_token();
        if request.requires_auth && access_token.is_none() {
            error!("No access token available");
            return Err(ApiError::NoCredentials);
        }

        let mut headers = request.headers;

        if let Some(body) = request.body.as_deref() {
            if !body.is_empty() && serde_json::from_str::<serde_json::Value>(body).is_ok() {
                headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
            }
        }

        if request.requires_auth {
            if let Some(token) = access_token {
                headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
            }
        }

        Ok(HttpRequest {
            method: request.method,
            url: request.url,
            headers,
            body: request.body,
            timeout: request.timeout.unwrap_or(self.default_timeout),
        })
    }

    fn decode(response: HttpResponse) -> ApiResult<Dispatched> {
        if response.body.is_empty() {
            error!(status = response.status, "Received an empty response from API");
            return Err(ApiError::MalformedResponse(format!(
                "Empty response body (HTTP {})",
                response.status
            )));
        }

        serde_json::from_str(&response.body)
            .map(Dispatched::Body)
            .map_err(|e| {
                error!(status = response.status, error = %e, "Failed to decode JSON response from API");
                ApiError::MalformedResponse(format!(
                    "Invalid JSON (HTTP {}): {}",
                    response.status, e
                ))
            })
    }
}

#[cfg(test)]
impl RequestDispatcher {
    pub(crate) fn auth_mut(&mut self) -> &mut AuthSession {
        &mut self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport, TransportError};
    use crate::types::Credentials;
    use serde_json::json;
    use url::Url;

    const TOKEN_URL: &str = "https://auth.example.com/oidc10/auth/oauth/v2/token";
    const DATA_URL: &str = "https://api.example.com/vehicledata/v1/vehicles/VIN123/resources";
    const TOKEN_OK: &str = r#"{"access_token":"t1","refresh_token":"r1"}"#;

    fn dispatcher(mock: &Arc<MockTransport>, refresh_token: &str) -> RequestDispatcher {
        let auth = AuthSession::new(
            Credentials::new("client:secret", "VIN123"),
            refresh_token,
            Url::parse(TOKEN_URL).unwrap(),
        );
        RequestDispatcher::new(mock.clone(), auth, Duration::from_secs(30))
    }

    /// Dispatcher holding access token "t0" / refresh token "r0"
    async fn logged_in(mock: &Arc<MockTransport>) -> RequestDispatcher {
        mock.respond(
            Method::Post,
            TOKEN_URL,
            200,
            r#"{"access_token":"t0","refresh_token":"r0"}"#,
        );
        let mut d = dispatcher(mock, "abc");
        d.refresh().await.unwrap();
        d
    }

    fn get() -> ApiRequest {
        ApiRequest::get(Url::parse(DATA_URL).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_scenario() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Post, TOKEN_URL, 200, TOKEN_OK);
        let mut d = dispatcher(&mock, "abc");

        assert!(d.refresh().await.is_ok());
        assert_eq!(d.auth().access_token(), Some("t1"));
        assert_eq!(d.auth().refresh_token(), Some("r1"));

        let requests = mock.requests();
        let request = &requests[0];
        assert_eq!(
            request.body.as_deref(),
            Some("grant_type=refresh_token&refresh_token=abc")
        );
        assert_eq!(request.header("Authorization"), Some("Basic Y2xpZW50OnNlY3JldA=="));
        assert_eq!(
            request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        // a form body is not JSON, so no second content type is added
        assert_eq!(
            request
                .headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_refresh_without_token_makes_no_call() {
        let mock = Arc::new(MockTransport::new());
        let mut d = dispatcher(&mock, "");

        assert_eq!(d.refresh().await, Err(ApiError::NoCredentials));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_requires_auth_without_token_fails_fast() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, DATA_URL, 200, "[]");
        let mut d = dispatcher(&mock, "abc");

        assert_eq!(d.dispatch(get()).await, Err(ApiError::NoCredentials));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_200_decodes_body_and_sends_bearer() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Get, DATA_URL, 200, r#"[{"name":"odo"}]"#);

        let reply = d.dispatch(get()).await.unwrap();
        assert_eq!(reply, Dispatched::Body(json!([{"name": "odo"}])));

        let request = mock.requests().pop().unwrap();
        assert_eq!(request.header("Authorization"), Some("Bearer t0"));
        assert_eq!(request.timeout, Duration::from_secs(30));
        assert_eq!(request.header("Content-Type"), None);
    }

    #[tokio::test]
    async fn test_timeout_override() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Get, DATA_URL, 200, "{}");

        d.dispatch(get().with_timeout(Duration::from_secs(15)))
            .await
            .unwrap();
        assert_eq!(
            mock.requests().pop().unwrap().timeout,
            Duration::from_secs(15)
        );
    }

    #[tokio::test]
    async fn test_json_body_gets_content_type() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Post, DATA_URL, 200, "{}");

        let request = ApiRequest::post(Url::parse(DATA_URL).unwrap(), r#"{"on":true}"#);
        d.dispatch(request).await.unwrap();
        assert_eq!(
            mock.requests().pop().unwrap().header("Content-Type"),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_200_with_invalid_or_empty_body_is_malformed() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;

        mock.respond(Method::Get, DATA_URL, 200, "not json");
        assert!(matches!(
            d.dispatch(get()).await,
            Err(ApiError::MalformedResponse(_))
        ));

        mock.respond(Method::Get, DATA_URL, 200, "");
        assert!(matches!(
            d.dispatch(get()).await,
            Err(ApiError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_204_skips_decoding() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Get, DATA_URL, 204, "not json at all");

        assert_eq!(d.dispatch(get()).await, Ok(Dispatched::NoContent));
    }

    #[tokio::test]
    async fn test_401_triggers_exactly_one_refresh() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Post, TOKEN_URL, 200, TOKEN_OK);
        mock.respond(Method::Get, DATA_URL, 401, "");

        let result = d.dispatch(get()).await;
        assert_eq!(
            result,
            Err(ApiError::AuthRejected {
                status: 401,
                reauthenticated: true
            })
        );
        // one login + one reauthorization
        assert_eq!(mock.count(Method::Post, TOKEN_URL), 2);
        // original request is not retried
        assert_eq!(mock.count(Method::Get, DATA_URL), 1);
        assert_eq!(d.auth().access_token(), Some("t1"));
    }

    #[tokio::test]
    async fn test_400_also_triggers_refresh() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Get, DATA_URL, 400, "");

        let result = d.dispatch(get()).await;
        assert!(matches!(
            result,
            Err(ApiError::AuthRejected { status: 400, .. })
        ));
        assert_eq!(mock.count(Method::Post, TOKEN_URL), 2);
    }

    #[tokio::test]
    async fn test_401_while_authenticating_does_not_refresh() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Get, DATA_URL, 401, "");

        d.auth_mut().tokens.authenticating = true;
        let result = d.dispatch(get()).await;

        assert_eq!(
            result,
            Err(ApiError::AuthRejected {
                status: 401,
                reauthenticated: false
            })
        );
        assert_eq!(mock.count(Method::Post, TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_token_endpoint_401_does_not_recurse() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.respond(Method::Post, TOKEN_URL, 401, "");
        mock.respond(Method::Get, DATA_URL, 401, "");

        let result = d.dispatch(get()).await;
        assert_eq!(
            result,
            Err(ApiError::AuthRejected {
                status: 401,
                reauthenticated: false
            })
        );
        // login + the single refresh attempt, no nested refresh
        assert_eq!(mock.count(Method::Post, TOKEN_URL), 2);
        assert_eq!(d.auth().access_token(), None);
        assert_eq!(d.auth().refresh_token(), None);
        assert!(!d.auth().is_authenticating());
    }

    #[tokio::test]
    async fn test_rate_limited_and_unavailable() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;

        mock.respond(Method::Get, DATA_URL, 429, "");
        assert_eq!(d.dispatch(get()).await, Err(ApiError::RateLimited));

        mock.respond(Method::Get, DATA_URL, 500, "");
        assert_eq!(
            d.dispatch(get()).await,
            Err(ApiError::ServiceUnavailable(500))
        );

        mock.respond(Method::Get, DATA_URL, 503, "");
        assert_eq!(
            d.dispatch(get()).await,
            Err(ApiError::ServiceUnavailable(503))
        );

        // no reauthorization for any of them
        assert_eq!(mock.count(Method::Post, TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_unhandled_status_is_fatal() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;

        for status in [201u16, 403, 404, 502] {
            mock.respond(Method::Get, DATA_URL, status, "{}");
            let result = d.dispatch(get()).await;
            assert_eq!(result, Err(ApiError::UnexpectedStatus(status)));
            assert_eq!(result.unwrap_err().outcome(), DispatchOutcome::Fatal);
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_converted() {
        let mock = Arc::new(MockTransport::new());
        let mut d = logged_in(&mock).await;
        mock.fail(
            Method::Get,
            DATA_URL,
            TransportError::Timeout("operation timed out".to_string()),
        );

        let result = d.dispatch(get()).await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
        // tokens survive a transport failure on a data call
        assert_eq!(d.auth().access_token(), Some("t0"));
    }
}
