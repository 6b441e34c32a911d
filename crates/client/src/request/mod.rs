//! Request description consumed by the executor.
//!
//! A [`Request`] is a plain value: it says *what* to fetch and never touches
//! the transport itself. It is assembled through [`RequestBuilder`], which
//! validates header lines and enforces that a raw body and multipart fields
//! are never both present.
//!
//! Header lines are stored as `Name: value` [`Bytes`], so handing them to a
//! transport during `prepare` shares the storage instead of copying it.

mod error;
mod mime;
mod resolve;

pub use error::RequestError;
pub use mime::{MimeField, MimeValue};
pub use resolve::ResolveHost;

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderName, HeaderValue};

use crate::ensure;
use crate::transport::TransferProgress;

/// User hook polled while a transfer is running.
///
/// Returning [`ControlFlow::Break`] aborts the transfer.
pub type ProgressHandler = Arc<dyn Fn(&Request, TransferProgress) -> ControlFlow<()> + Send + Sync>;

/// The request methods the executor knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = RequestError;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        match *method {
            http::Method::GET => Ok(Method::Get),
            http::Method::HEAD => Ok(Method::Head),
            http::Method::POST => Ok(Method::Post),
            http::Method::PUT => Ok(Method::Put),
            http::Method::DELETE => Ok(Method::Delete),
            http::Method::CONNECT => Ok(Method::Connect),
            http::Method::OPTIONS => Ok(Method::Options),
            http::Method::PATCH => Ok(Method::Patch),
            ref other => Err(RequestError::unsupported_method(other)),
        }
    }
}

/// Protocol version preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// Let the transport negotiate the best version it supports.
    #[default]
    UseBest,
    Http10,
    Http11,
    Http2,
    /// HTTP/2 for `https` URLs only, HTTP/1.1 otherwise.
    Http2Tls,
    /// HTTP/2 without an upgrade round (prior knowledge).
    Http2PriorKnowledge,
}

impl From<http::Version> for Version {
    fn from(version: http::Version) -> Self {
        match version {
            http::Version::HTTP_10 => Version::Http10,
            http::Version::HTTP_11 => Version::Http11,
            http::Version::HTTP_2 => Version::Http2,
            // 0.9 and 3 have no dedicated preference
            _ => Version::UseBest,
        }
    }
}

/// What goes out as the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    Empty,
    /// Raw bytes; may contain NUL bytes, the length is always explicit.
    Data(Bytes),
    /// Multipart form fields.
    Mime(Vec<MimeField>),
}

/// A fully specified HTTP transaction.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: String,
    version: Version,
    timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: Option<u32>,
    verify_ssl_peer: bool,
    verify_ssl_host: bool,
    accept_encodings: Option<Vec<String>>,
    headers: Vec<Bytes>,
    resolve_hosts: Vec<ResolveHost>,
    payload: Payload,
    on_transfer_progress: Option<ProgressHandler>,
}

impl Request {
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url.into())
    }

    pub fn get(url: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::Post, url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Hard deadline for the whole transaction, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// `None` means no limit.
    pub fn max_redirects(&self) -> Option<u32> {
        self.max_redirects
    }

    pub fn verify_ssl_peer(&self) -> bool {
        self.verify_ssl_peer
    }

    pub fn verify_ssl_host(&self) -> bool {
        self.verify_ssl_host
    }

    /// `None` advertises nothing, an empty slice advertises every encoding
    /// the transport supports.
    pub fn accept_encodings(&self) -> Option<&[String]> {
        self.accept_encodings.as_deref()
    }

    /// Header lines in insertion order, each formatted as `Name: value`.
    pub fn headers(&self) -> &[Bytes] {
        &self.headers
    }

    pub fn resolve_hosts(&self) -> &[ResolveHost] {
        &self.resolve_hosts
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn data(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn mime_fields(&self) -> Option<&[MimeField]> {
        match &self.payload {
            Payload::Mime(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn progress_handler(&self) -> Option<&ProgressHandler> {
        self.on_transfer_progress.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("max_redirects", &self.max_redirects)
            .field("verify_ssl_peer", &self.verify_ssl_peer)
            .field("verify_ssl_host", &self.verify_ssl_host)
            .field("accept_encodings", &self.accept_encodings)
            .field("headers", &self.headers.len())
            .field("resolve_hosts", &self.resolve_hosts)
            .field("payload", &self.payload)
            .field("on_transfer_progress", &self.on_transfer_progress.is_some())
            .finish()
    }
}

/// Builder for [`Request`].
///
/// Setters are infallible; [`build`](RequestBuilder::build) validates the
/// header lines and the body/multipart exclusivity.
pub struct RequestBuilder {
    method: Method,
    url: String,
    version: Version,
    timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: Option<u32>,
    verify_ssl_peer: bool,
    verify_ssl_host: bool,
    accept_encodings: Option<Vec<String>>,
    headers: Vec<(String, String)>,
    resolve_hosts: Vec<ResolveHost>,
    data: Option<Bytes>,
    mime_fields: Vec<MimeField>,
    on_transfer_progress: Option<ProgressHandler>,
}

impl RequestBuilder {
    fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            version: Version::default(),
            timeout: None,
            follow_redirects: true,
            max_redirects: None,
            verify_ssl_peer: true,
            verify_ssl_host: true,
            accept_encodings: None,
            headers: Vec::new(),
            resolve_hosts: Vec::new(),
            data: None,
            mime_fields: Vec::new(),
            on_transfer_progress: None,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = Some(max);
        self
    }

    pub fn verify_ssl_peer(mut self, verify: bool) -> Self {
        self.verify_ssl_peer = verify;
        self
    }

    pub fn verify_ssl_host(mut self, verify: bool) -> Self {
        self.verify_ssl_host = verify;
        self
    }

    /// Advertises the given encodings, in order.
    pub fn accept_encodings<I, S>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept_encodings = Some(encodings.into_iter().map(Into::into).collect());
        self
    }

    /// Advertises every encoding the transport has built in.
    pub fn accept_all_encodings(mut self) -> Self {
        self.accept_encodings = Some(Vec::new());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn resolve_host(mut self, resolve_host: ResolveHost) -> Self {
        self.resolve_hosts.push(resolve_host);
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn mime_field(mut self, field: MimeField) -> Self {
        self.mime_fields.push(field);
        self
    }

    pub fn on_transfer_progress<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request, TransferProgress) -> ControlFlow<()> + Send + Sync + 'static,
    {
        self.on_transfer_progress = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Request, RequestError> {
        ensure!(self.data.is_none() || self.mime_fields.is_empty(), RequestError::PayloadConflict);

        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(RequestError::invalid_header)?;
            HeaderValue::from_str(value).map_err(RequestError::invalid_header)?;
            headers.push(Bytes::from(format!("{name}: {value}")));
        }

        let payload = match (self.data, self.mime_fields.is_empty()) {
            (Some(data), _) => Payload::Data(data),
            (None, false) => Payload::Mime(self.mime_fields),
            (None, true) => Payload::Empty,
        };

        Ok(Request {
            method: self.method,
            url: self.url,
            version: self.version,
            timeout: self.timeout,
            follow_redirects: self.follow_redirects,
            max_redirects: self.max_redirects,
            verify_ssl_peer: self.verify_ssl_peer,
            verify_ssl_host: self.verify_ssl_host,
            accept_encodings: self.accept_encodings,
            headers,
            resolve_hosts: self.resolve_hosts,
            payload,
            on_transfer_progress: self.on_transfer_progress,
        })
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("data", &self.data.as_ref().map(Bytes::len))
            .field("mime_fields", &self.mime_fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request = Request::get("http://localhost/").build().unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.version(), Version::UseBest);
        assert_eq!(request.timeout(), None);
        assert!(request.follow_redirects());
        assert_eq!(request.max_redirects(), None);
        assert!(request.verify_ssl_peer());
        assert!(request.verify_ssl_host());
        assert!(request.accept_encodings().is_none());
        assert!(request.headers().is_empty());
        assert_eq!(request.payload(), &Payload::Empty);
        assert!(request.progress_handler().is_none());
    }

    #[test]
    fn header_lines_keep_insertion_order() {
        let request = Request::get("http://localhost/")
            .header("Accept", "*/*")
            .header("X-Trace", "abc")
            .build()
            .unwrap();

        assert_eq!(request.headers(), &[Bytes::from_static(b"Accept: */*"), Bytes::from_static(b"X-Trace: abc")]);
    }

    #[test]
    fn rejects_invalid_header_name() {
        let err = Request::get("http://localhost/").header("bad name", "v").build().unwrap_err();
        assert!(matches!(err, RequestError::InvalidHeader { .. }));
    }

    #[test]
    fn rejects_header_value_with_newline() {
        let err = Request::get("http://localhost/").header("X-Split", "a\r\nb: c").build().unwrap_err();
        assert!(matches!(err, RequestError::InvalidHeader { .. }));
    }

    #[test]
    fn data_and_mime_are_exclusive() {
        let err = Request::post("http://localhost/")
            .data("payload")
            .mime_field(MimeField::text("k", "v"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::PayloadConflict));
    }

    #[test]
    fn data_keeps_embedded_nul() {
        let request = Request::post("http://localhost/").data(&b"a\0b"[..]).build().unwrap();
        assert_eq!(request.data().map(Bytes::len), Some(3));
        assert!(request.mime_fields().is_none());
    }

    #[test]
    fn mime_fields_become_payload() {
        let request = Request::post("http://localhost/")
            .mime_field(MimeField::text("name", "value"))
            .mime_field(MimeField::file("upload.txt", "/tmp/upload.txt"))
            .build()
            .unwrap();

        let fields = request.mime_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value(), &MimeValue::Text("value".to_string()));
        assert!(matches!(fields[1].value(), MimeValue::File(_)));
        assert!(request.data().is_none());
    }

    #[test]
    fn empty_encoding_list_is_kept() {
        let request = Request::get("http://localhost/").accept_all_encodings().build().unwrap();
        assert_eq!(request.accept_encodings(), Some(&[][..]));
    }

    #[test]
    fn converts_http_method() {
        assert_eq!(Method::try_from(&http::Method::PATCH).unwrap(), Method::Patch);
        assert_eq!(Method::try_from(&http::Method::CONNECT).unwrap(), Method::Connect);

        let custom = http::Method::from_bytes(b"PURGE").unwrap();
        assert!(matches!(Method::try_from(&custom), Err(RequestError::UnsupportedMethod { .. })));
    }

    #[test]
    fn converts_http_version() {
        assert_eq!(Version::from(http::Version::HTTP_11), Version::Http11);
        assert_eq!(Version::from(http::Version::HTTP_2), Version::Http2);
        assert_eq!(Version::from(http::Version::HTTP_3), Version::UseBest);
    }
}
