//! Configuration values accepted by [`Transport::set_option`](super::Transport::set_option).
//!
//! Values are owned. Large or shared data is passed as [`Bytes`] or behind an
//! [`Arc`], so configuring a handle never copies header lines, bodies or
//! multipart parts; the handle only holds another reference until it is reset.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

/// Protocol version negotiation understood by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    /// No preference, the transport picks the best it can do.
    None,
    Http10,
    Http11,
    Http2,
    Http2Tls,
    Http2PriorKnowledge,
}

/// One part of a [`Multipart`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePart {
    /// Named inline data.
    Data { name: String, data: Bytes },
    /// File contents streamed from `path`, announced under `filename`.
    File { filename: String, path: PathBuf },
}

/// A multipart form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    parts: Vec<MimePart>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_part(&mut self, part: MimePart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportOption {
    Url(String),
    /// Plain GET.
    HttpGet,
    /// Request without a response body (HEAD).
    NoBody,
    Post,
    /// Connect to the target and stop there.
    ConnectOnly,
    /// Verb sent as-is on the request line.
    CustomRequest(&'static str),
    HttpVersion(HttpVersion),
    /// Hard deadline for the whole transfer.
    TimeoutMs(u64),
    FollowLocation(bool),
    /// `None` means unlimited.
    MaxRedirects(Option<u32>),
    SslVerifyPeer(bool),
    SslVerifyHost(bool),
    /// Comma separated encodings; the empty string means all built-in ones.
    AcceptEncoding(String),
    /// Request header lines, `Name: value`.
    HttpHeader(Arc<[Bytes]>),
    /// `host:port:addr` resolve entries.
    Resolve(Arc<[String]>),
    /// Raw request body, its length is the length of the bytes.
    PostFields(Bytes),
    MimePost(Arc<Multipart>),
    /// `true` suppresses progress notifications.
    NoProgress(bool),
    NoSignal(bool),
}

impl TransportOption {
    pub fn name(&self) -> &'static str {
        match self {
            TransportOption::Url(_) => "url",
            TransportOption::HttpGet => "http_get",
            TransportOption::NoBody => "no_body",
            TransportOption::Post => "post",
            TransportOption::ConnectOnly => "connect_only",
            TransportOption::CustomRequest(_) => "custom_request",
            TransportOption::HttpVersion(_) => "http_version",
            TransportOption::TimeoutMs(_) => "timeout_ms",
            TransportOption::FollowLocation(_) => "follow_location",
            TransportOption::MaxRedirects(_) => "max_redirects",
            TransportOption::SslVerifyPeer(_) => "ssl_verify_peer",
            TransportOption::SslVerifyHost(_) => "ssl_verify_host",
            TransportOption::AcceptEncoding(_) => "accept_encoding",
            TransportOption::HttpHeader(_) => "http_header",
            TransportOption::Resolve(_) => "resolve",
            TransportOption::PostFields(_) => "post_fields",
            TransportOption::MimePost(_) => "mime_post",
            TransportOption::NoProgress(_) => "no_progress",
            TransportOption::NoSignal(_) => "no_signal",
        }
    }
}
