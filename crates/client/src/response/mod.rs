//! Response produced by one transaction.
//!
//! Response headers are stored as raw lines appended one after another into a
//! single growable buffer. Every line gets a [`HeaderView`], an `(offset, len)`
//! pair into that buffer, instead of a pointer, so the views stay valid across
//! any reallocation of the buffer. The buffer grows by doubling and the growth
//! always happens before the append that needs it.

mod status;

pub use status::TransferStatus;

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::warn;

/// Capacity the header buffer starts doubling from.
const MIN_HEADER_CAPACITY: usize = 128;

/// A non-owning reference to one header line inside a [`Response`]'s header buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView {
    offset: usize,
    len: usize,
}

impl HeaderView {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolves the view against the buffer it was taken from.
    pub fn resolve<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.offset + self.len]
    }
}

/// One response header line, borrowed from the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    line: &'a [u8],
}

impl<'a> Header<'a> {
    /// The whole line as received, without its trailing CRLF.
    pub fn line(&self) -> &'a [u8] {
        self.line
    }

    /// Everything before the first `:`, or the whole line when there is none.
    pub fn name(&self) -> &'a [u8] {
        match self.colon() {
            Some(idx) => &self.line[..idx],
            None => self.line,
        }
    }

    /// Everything after the first `:` with leading whitespace removed.
    pub fn value(&self) -> &'a [u8] {
        match self.colon() {
            Some(idx) => self.line[idx + 1..].trim_ascii_start(),
            None => &[],
        }
    }

    pub fn value_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.value()).ok()
    }

    fn colon(&self) -> Option<usize> {
        self.line.iter().position(|&b| b == b':')
    }
}

/// The result of one transaction.
///
/// A response is always fully formed: failed transactions carry the failure in
/// [`status`](Response::status) together with whatever transfer information
/// the transport could still report.
#[derive(Clone, Default)]
pub struct Response {
    pub(crate) status: TransferStatus,
    pub(crate) status_code: Option<StatusCode>,
    pub(crate) total_time: Duration,
    pub(crate) num_connects: u64,
    pub(crate) num_redirects: u64,
    header_buf: Vec<u8>,
    header_views: Vec<HeaderView>,
    body: BytesMut,
}

impl Response {
    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// The HTTP status code, `None` when it is unknown.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }

    /// Wall time of the whole transaction, at millisecond resolution.
    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    pub fn num_connects(&self) -> u64 {
        self.num_connects
    }

    pub fn num_redirects(&self) -> u64 {
        self.num_redirects
    }

    /// All accepted header lines, back to back.
    pub fn header_bytes(&self) -> &[u8] {
        &self.header_buf
    }

    pub fn header_views(&self) -> &[HeaderView] {
        &self.header_views
    }

    pub fn headers(&self) -> impl Iterator<Item = Header<'_>> + '_ {
        self.header_views.iter().map(|view| Header { line: view.resolve(&self.header_buf) })
    }

    /// First header whose name matches `name`, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<Header<'_>> {
        self.headers().find(|header| header.name().eq_ignore_ascii_case(name.as_bytes()))
    }

    /// Converts the header lines into an [`HeaderMap`], skipping lines that
    /// are not valid `name: value` pairs.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.header_views.len());
        for header in self.headers() {
            let name = match HeaderName::from_bytes(header.name()) {
                Ok(name) => name,
                Err(e) => {
                    warn!(cause = %e, line = %String::from_utf8_lossy(header.line()), "skip invalid header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_bytes(header.value()) {
                Ok(value) => value,
                Err(e) => {
                    warn!(cause = %e, line = %String::from_utf8_lossy(header.line()), "skip invalid header value");
                    continue;
                }
            };
            map.append(name, value);
        }
        map
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }

    /// Appends one cleaned header line and records its view.
    pub(crate) fn append_header(&mut self, line: &[u8]) {
        let needed = self.header_buf.len() + line.len();
        let mut capacity = self.header_buf.capacity();
        if capacity < needed {
            capacity = capacity.max(MIN_HEADER_CAPACITY);
            while capacity < needed {
                capacity *= 2;
            }
            self.header_buf.reserve_exact(capacity - self.header_buf.len());
        }

        let offset = self.header_buf.len();
        self.header_buf.extend_from_slice(line);
        self.header_views.push(HeaderView { offset, len: line.len() });
    }

    pub(crate) fn append_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    #[cfg(test)]
    pub(crate) fn header_capacity(&self) -> usize {
        self.header_buf.capacity()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("status_code", &self.status_code)
            .field("total_time", &self.total_time)
            .field("num_connects", &self.num_connects)
            .field("num_redirects", &self.num_redirects)
            .field("headers", &self.header_views.len())
            .field("body", &self.body.len())
            .finish()
    }
}
