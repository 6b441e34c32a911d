//! A synchronous HTTP client execution core
//!
//! This crate drives HTTP transactions on top of a pluggable transport engine.
//! The engine moves the bytes (TLS, HTTP/1.x and HTTP/2 framing, sockets); this
//! crate owns everything around it: translating a declarative [`Request`]
//! into engine configuration, accumulating the streamed response into a
//! [`Response`], mapping engine outcomes onto a small status taxonomy and
//! recycling engine handles between transactions.
//!
//! # Example
//!
//! ```
//! use micro_client::executor::Executor;
//! use micro_client::request::Request;
//! use micro_client::response::TransferStatus;
//! use micro_client::transport::replay::{Exchange, ReplayTransport};
//!
//! let exchange = Exchange::from_raw(
//!     b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello",
//! )
//! .unwrap();
//! let request = Request::get("http://localhost/hello").header("Accept", "text/plain").build().unwrap();
//!
//! let response = Executor::bound(&request, ReplayTransport::new(exchange)).perform();
//!
//! assert_eq!(response.status(), TransferStatus::Success);
//! assert_eq!(response.status_code(), Some(http::StatusCode::OK));
//! assert_eq!(response.header("content-type").and_then(|h| h.value_str()), Some("text/plain"));
//! assert_eq!(response.body(), b"hello");
//! ```
//!
//! # Architecture
//!
//! - [`request`]: the request description and its builder
//! - [`response`]: the response, its header views and [`TransferStatus`]
//! - [`transport`]: the engine boundary, the libcurl engine
//!   ([`transport::CurlTransport`]) and an in-process replay engine
//! - [`executor`]: one transaction on one handle, bound or pooled
//! - [`pool`]: the free-list of reusable handles
//! - [`reactor`]: a single-threaded driver running many pooled transactions
//!
//! # Error Handling
//!
//! A transaction never fails with an `Err`. Whatever goes wrong during a
//! transfer ends up in [`Response::status`], and the response still carries
//! whatever transfer information the engine reported. Errors are only used
//! where something is built or configured:
//!
//! - [`request::RequestError`]: an invalid request description
//! - [`transport::OptionError`]: the engine rejected a configuration value
//! - [`reactor::ReactorBuildError`]: an incomplete reactor configuration
//!
//! # Logging
//!
//! Diagnostics go through `tracing`. Streaming callbacks only emit `trace`
//! events; prepare and transfer summaries are `debug`; a transaction that could
//! not start or missed its deadline is a `warn`.

pub mod executor;
pub mod pool;
pub mod reactor;
pub mod request;
pub mod response;
pub mod transport;

pub use executor::Executor;
pub use request::Request;
pub use response::{Response, TransferStatus};

mod utils;
pub(crate) use utils::ensure;
