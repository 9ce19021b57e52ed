//! Mock transport for testing

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

#[derive(Debug, Clone)]
enum MockReply {
    Response(HttpResponse),
    Error(TransportError),
}

#[derive(Debug)]
struct QueuedReply {
    reply: MockReply,
    served: bool,
}

/// Scripted in-memory transport.
///
/// Replies are queued per method and URL. When only one reply is left for
/// a route it is repeated for every further call, so a single `respond`
/// configures a route permanently. Queuing a new reply drops a repeating
/// one that has already been served. Every executed request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<QueuedReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method url`
    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<String>) {
        self.push(method, url, MockReply::Response(HttpResponse::new(status, body)));
    }

    /// Queue a transport failure for `method url`
    pub fn fail(&self, method: Method, url: &str, error: TransportError) {
        self.push(method, url, MockReply::Error(error));
    }

    /// All requests executed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests executed against `method url`
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.as_str() == url)
            .count()
    }

    fn push(&self, method: Method, url: &str, reply: MockReply) {
        let mut routes = self.routes.lock();
        let queue = routes.entry((method, url.to_string())).or_default();
        if queue.back().is_some_and(|q| q.served) {
            queue.pop_back();
        }
        queue.push_back(QueuedReply {
            reply,
            served: false,
        });
    }

    fn next_reply(&self, method: Method, url: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&(method, url.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front().map(|q| q.reply)
        } else {
            let last = queue.front_mut()?;
            last.served = true;
            Some(last.reply.clone())
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method;
        let url = request.url.to_string();
        self.requests.lock().push(request);

        tracing::debug!(%method, %url, "Mock transport: request");

        match self.next_reply(method, &url) {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(error)) => Err(error),
            None => Err(TransportError::NoResponse(format!(
                "No mock response configured for {} {}",
                method, url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    const URL: &str = "https://api.example.com/resources";

    fn get() -> HttpRequest {
        HttpRequest::get(Url::parse(URL).unwrap(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_queue_then_sticky_last() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, URL, 401, "");
        mock.respond(Method::Get, URL, 200, "[]");

        assert_eq!(mock.execute(get()).await.unwrap().status, 401);
        assert_eq!(mock.execute(get()).await.unwrap().status, 200);
        assert_eq!(mock.execute(get()).await.unwrap().status, 200);
        assert_eq!(mock.count(Method::Get, URL), 3);
    }

    #[tokio::test]
    async fn test_new_reply_replaces_served_one() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, URL, 429, "");
        assert_eq!(mock.execute(get()).await.unwrap().status, 429);

        mock.respond(Method::Get, URL, 503, "");
        assert_eq!(mock.execute(get()).await.unwrap().status, 503);
        assert_eq!(mock.execute(get()).await.unwrap().status, 503);
    }

    #[tokio::test]
    async fn test_unconfigured_route() {
        let mock = MockTransport::new();
        let result = mock.execute(get()).await;
        assert!(matches!(result, Err(TransportError::NoResponse(_))));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, URL, TransportError::Timeout("15s".into()));
        let result = mock.execute(get()).await;
        assert_eq!(result, Err(TransportError::Timeout("15s".into())));
    }
}
