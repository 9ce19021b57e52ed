//! HTTP transport layer
//!
//! The session logic never talks to an HTTP library directly. It builds
//! [`HttpRequest`] values and hands them to an [`HttpTransport`]:
//! - [`ReqwestTransport`] for real provider traffic
//! - [`MockTransport`] for tests
//!
//! # Example
//!
//! ```ignore
//! use mbdata_client::transport::{HttpRequest, HttpTransport, ReqwestTransport};
//!
//! let transport = ReqwestTransport::new(Duration::from_secs(30))?;
//! let response = transport.execute(HttpRequest::get(url, Duration::from_secs(15))).await?;
//! assert_eq!(response.status, 200);
//! ```

mod adapter;
pub mod error;
mod http;
pub mod mock;

pub use adapter::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use error::TransportError;
pub use http::ReqwestTransport;
pub use mock::MockTransport;
