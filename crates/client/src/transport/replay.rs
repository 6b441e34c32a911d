//! In-process transport that replays a scripted exchange.
//!
//! [`ReplayTransport`] behaves like a real engine from the executor's point of
//! view: it validates and records every configuration call, honours callback
//! registration, delivers header lines one by one in wire order (status line
//! and blank separator included), delivers the body in fixed size chunks and
//! reports transfer information afterwards. The bytes come from an
//! [`Exchange`] instead of a socket.
//!
//! ```
//! use micro_client::transport::replay::{Exchange, ReplayTransport};
//!
//! let exchange = Exchange::from_raw(b"HTTP/1.1 204 No Content\r\nServer: replay\r\n\r\n").unwrap();
//! let transport = ReplayTransport::new(exchange);
//! assert!(transport.config().is_pristine());
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use httparse::Status;
use thiserror::Error;
use tracing::trace;

use super::{
    Callback, HttpVersion, Info, InfoValue, Multipart, OptionError, TransferProgress, TransferSink, Transport,
    TransportCode, TransportOption,
};

/// Maximum number of header fields accepted in a scripted response head.
const MAX_HEADER_NUM: usize = 64;

const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("invalid response head: {source}")]
    InvalidHead {
        #[from]
        source: httparse::Error,
    },

    #[error("incomplete response head")]
    Incomplete,
}

/// A scripted server reply.
#[derive(Debug, Clone)]
pub struct Exchange {
    header_lines: Vec<Bytes>,
    body: Bytes,
    status_code: u16,
    code: TransportCode,
    chunk_size: usize,
    total_time: Duration,
    num_connects: u32,
    num_redirects: u32,
}

impl Exchange {
    /// Parses a raw HTTP/1.x response: head, blank line, then body bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ExchangeError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut parsed = httparse::Response::new(&mut headers);
        let head_len = match parsed.parse(raw)? {
            Status::Complete(len) => len,
            Status::Partial => return Err(ExchangeError::Incomplete),
        };
        let status_code = parsed.code.ok_or(ExchangeError::Incomplete)?;

        let head = Bytes::copy_from_slice(&raw[..head_len]);
        let mut header_lines = Vec::with_capacity(parsed.headers.len() + 2);
        let mut start = 0;
        for (idx, &b) in head.iter().enumerate() {
            if b == b'\n' {
                header_lines.push(head.slice(start..=idx));
                start = idx + 1;
            }
        }

        Ok(Self {
            header_lines,
            body: Bytes::copy_from_slice(&raw[head_len..]),
            status_code,
            code: TransportCode::Ok,
            chunk_size: DEFAULT_CHUNK_SIZE,
            total_time: Duration::ZERO,
            num_connects: 1,
            num_redirects: 0,
        })
    }

    /// A transfer that fails with `code` before any response byte arrives.
    pub fn failure(code: TransportCode) -> Self {
        Self {
            header_lines: Vec::new(),
            body: Bytes::new(),
            status_code: 0,
            code,
            chunk_size: DEFAULT_CHUNK_SIZE,
            total_time: Duration::ZERO,
            num_connects: 0,
            num_redirects: 0,
        }
    }

    /// Size of the body spans handed to the body callback, at least one byte.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn total_time(mut self, total_time: Duration) -> Self {
        self.total_time = total_time;
        self
    }

    pub fn num_connects(mut self, num_connects: u32) -> Self {
        self.num_connects = num_connects;
        self
    }

    pub fn num_redirects(mut self, num_redirects: u32) -> Self {
        self.num_redirects = num_redirects;
        self
    }

    pub fn header_lines(&self) -> &[Bytes] {
        &self.header_lines
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }
}

/// Which request-line option was configured last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    HttpGet,
    NoBody,
    Post,
    ConnectOnly,
    Custom(&'static str),
}

/// Everything configured on a [`ReplayTransport`] since creation or the last reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportConfig {
    pub url: Option<String>,
    pub verb: Option<Verb>,
    pub version: Option<HttpVersion>,
    pub timeout_ms: Option<u64>,
    pub follow_location: Option<bool>,
    pub max_redirects: Option<Option<u32>>,
    pub ssl_verify_peer: Option<bool>,
    pub ssl_verify_host: Option<bool>,
    pub accept_encoding: Option<String>,
    pub headers: Option<Arc<[Bytes]>>,
    pub resolve: Option<Arc<[String]>>,
    pub post_fields: Option<Bytes>,
    pub mime: Option<Arc<Multipart>>,
    pub no_progress: Option<bool>,
    pub no_signal: Option<bool>,
}

impl TransportConfig {
    /// Nothing has been configured.
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TransferInfo {
    response_code: u16,
    total_time: Duration,
    num_connects: u32,
    num_redirects: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Registered {
    header: bool,
    body: bool,
    progress: bool,
}

/// A [`Transport`] replaying one [`Exchange`] on every `perform`.
#[derive(Debug)]
pub struct ReplayTransport {
    exchange: Exchange,
    config: TransportConfig,
    history: Vec<&'static str>,
    registered: Registered,
    info: TransferInfo,
    performs: usize,
    resets: usize,
}

impl ReplayTransport {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            config: TransportConfig::default(),
            history: Vec::new(),
            registered: Registered::default(),
            info: TransferInfo::default(),
            performs: 0,
            resets: 0,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Names of the options set since the last reset, in call order.
    pub fn option_history(&self) -> &[&'static str] {
        &self.history
    }

    pub fn is_registered(&self, callback: Callback) -> bool {
        match callback {
            Callback::Header => self.registered.header,
            Callback::Body => self.registered.body,
            Callback::Progress => self.registered.progress,
        }
    }

    pub fn performs(&self) -> usize {
        self.performs
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    fn replay(&mut self, sink: &mut dyn TransferSink) -> TransportCode {
        let report_progress = self.registered.progress && self.config.no_progress == Some(false);
        let upload_total = self.config.post_fields.as_ref().map_or(0, |data| data.len() as u64);
        let download_total = self.exchange.body.len() as u64;

        let mut progress = TransferProgress { download_total, download_now: 0, upload_total, upload_now: upload_total };
        if report_progress && sink.on_progress(progress).is_break() {
            return TransportCode::AbortedByCallback;
        }

        if self.config.verb == Some(Verb::ConnectOnly) {
            return TransportCode::Ok;
        }

        self.info.response_code = self.exchange.status_code;
        if self.registered.header {
            for line in &self.exchange.header_lines {
                if sink.on_header(line) != line.len() {
                    trace!(len = line.len(), "header callback aborted transfer");
                    return TransportCode::WriteError;
                }
            }
        }

        if self.config.verb == Some(Verb::NoBody) {
            return TransportCode::Ok;
        }

        for chunk in self.exchange.body.chunks(self.exchange.chunk_size) {
            if self.registered.body && sink.on_body(chunk) != chunk.len() {
                trace!(len = chunk.len(), "body callback aborted transfer");
                return TransportCode::WriteError;
            }

            progress.download_now += chunk.len() as u64;
            if report_progress && sink.on_progress(progress).is_break() {
                return TransportCode::AbortedByCallback;
            }
        }

        TransportCode::Ok
    }
}

impl Transport for ReplayTransport {
    fn set_option(&mut self, option: TransportOption) -> Result<(), OptionError> {
        self.history.push(option.name());
        match option {
            TransportOption::Url(url) => {
                url.parse::<http::Uri>().map_err(|e| OptionError::invalid_value("url", e))?;
                self.config.url = Some(url);
            }
            TransportOption::HttpGet => self.config.verb = Some(Verb::HttpGet),
            TransportOption::NoBody => self.config.verb = Some(Verb::NoBody),
            TransportOption::Post => self.config.verb = Some(Verb::Post),
            TransportOption::ConnectOnly => self.config.verb = Some(Verb::ConnectOnly),
            TransportOption::CustomRequest(verb) => self.config.verb = Some(Verb::Custom(verb)),
            TransportOption::HttpVersion(version) => self.config.version = Some(version),
            TransportOption::TimeoutMs(timeout) => self.config.timeout_ms = Some(timeout),
            TransportOption::FollowLocation(follow) => self.config.follow_location = Some(follow),
            TransportOption::MaxRedirects(max) => self.config.max_redirects = Some(max),
            TransportOption::SslVerifyPeer(verify) => self.config.ssl_verify_peer = Some(verify),
            TransportOption::SslVerifyHost(verify) => self.config.ssl_verify_host = Some(verify),
            TransportOption::AcceptEncoding(encoding) => self.config.accept_encoding = Some(encoding),
            TransportOption::HttpHeader(headers) => self.config.headers = Some(headers),
            TransportOption::Resolve(resolve) => self.config.resolve = Some(resolve),
            TransportOption::PostFields(data) => self.config.post_fields = Some(data),
            TransportOption::MimePost(mime) => self.config.mime = Some(mime),
            TransportOption::NoProgress(no_progress) => self.config.no_progress = Some(no_progress),
            TransportOption::NoSignal(no_signal) => self.config.no_signal = Some(no_signal),
        }
        Ok(())
    }

    fn register(&mut self, callback: Callback) {
        match callback {
            Callback::Header => self.registered.header = true,
            Callback::Body => self.registered.body = true,
            Callback::Progress => self.registered.progress = true,
        }
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> TransportCode {
        self.performs += 1;
        self.info = TransferInfo::default();

        if self.config.url.is_none() {
            return TransportCode::UrlMalformat;
        }

        self.info.total_time = self.exchange.total_time;
        if !self.exchange.code.is_ok() {
            return self.exchange.code;
        }

        self.info.num_connects = self.exchange.num_connects;
        self.info.num_redirects = self.exchange.num_redirects;
        self.replay(sink)
    }

    fn info(&self, info: Info) -> InfoValue {
        match info {
            Info::ResponseCode => InfoValue::Long(i64::from(self.info.response_code)),
            Info::TotalTime => InfoValue::Double(self.info.total_time.as_secs_f64()),
            Info::NumConnects => InfoValue::Long(i64::from(self.info.num_connects)),
            Info::RedirectCount => InfoValue::Long(i64::from(self.info.num_redirects)),
        }
    }

    fn reset(&mut self) {
        self.config = TransportConfig::default();
        self.history.clear();
        self.registered = Registered::default();
        self.info = TransferInfo::default();
        self.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use indoc::indoc;

    use super::*;
    use crate::transport::MockTransferSink;

    fn ok_exchange() -> Exchange {
        let raw = indoc! {"
            HTTP/1.1 200 OK
            Content-Type: text/plain
            Content-Length: 10

            0123456789"}
        .replace('\n', "\r\n");
        Exchange::from_raw(raw.as_bytes()).unwrap()
    }

    fn configured(exchange: Exchange) -> ReplayTransport {
        let mut transport = ReplayTransport::new(exchange);
        transport.set_option(TransportOption::Url("http://localhost/".to_string())).unwrap();
        transport.register(Callback::Header);
        transport.register(Callback::Body);
        transport
    }

    #[test]
    fn parses_raw_exchange() {
        let exchange = ok_exchange();
        assert_eq!(exchange.status_code(), 200);
        assert_eq!(
            exchange.header_lines(),
            &[
                Bytes::from_static(b"HTTP/1.1 200 OK\r\n"),
                Bytes::from_static(b"Content-Type: text/plain\r\n"),
                Bytes::from_static(b"Content-Length: 10\r\n"),
                Bytes::from_static(b"\r\n"),
            ]
        );
        assert_eq!(exchange.body(), &Bytes::from_static(b"0123456789"));
    }

    #[test]
    fn rejects_partial_head() {
        let err = Exchange::from_raw(b"HTTP/1.1 200 OK\r\nContent-Type: text").unwrap_err();
        assert!(matches!(err, ExchangeError::Incomplete));
    }

    #[test]
    fn rejects_invalid_url() {
        let mut transport = ReplayTransport::new(ok_exchange());
        let err = transport.set_option(TransportOption::Url("not a url".to_string())).unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { option: "url", .. }));
    }

    #[test]
    fn delivers_lines_then_chunks() {
        let mut transport = configured(ok_exchange().chunk_size(4));
        let mut sink = MockTransferSink::new();
        let mut seq = mockall::Sequence::new();
        for line in ["HTTP/1.1 200 OK\r\n", "Content-Type: text/plain\r\n", "Content-Length: 10\r\n", "\r\n"] {
            sink.expect_on_header()
                .withf(move |data: &[u8]| data == line.as_bytes())
                .times(1)
                .in_sequence(&mut seq)
                .returning(<[u8]>::len);
        }
        for chunk in ["0123", "4567", "89"] {
            sink.expect_on_body()
                .withf(move |data: &[u8]| data == chunk.as_bytes())
                .times(1)
                .in_sequence(&mut seq)
                .returning(<[u8]>::len);
        }
        sink.expect_on_progress().never();

        assert_eq!(transport.perform(&mut sink), TransportCode::Ok);
        assert_eq!(transport.info(Info::ResponseCode).as_long(), 200);
        assert_eq!(transport.info(Info::NumConnects).as_long(), 1);
    }

    #[test]
    fn short_body_write_aborts() {
        let mut transport = configured(ok_exchange().chunk_size(4));
        let mut sink = MockTransferSink::new();
        sink.expect_on_header().returning(<[u8]>::len);
        sink.expect_on_body().times(1).returning(|_| 0);

        assert_eq!(transport.perform(&mut sink), TransportCode::WriteError);
    }

    #[test]
    fn progress_stop_aborts_before_headers() {
        let mut transport = configured(ok_exchange());
        transport.register(Callback::Progress);
        transport.set_option(TransportOption::NoProgress(false)).unwrap();

        let mut sink = MockTransferSink::new();
        sink.expect_on_progress().times(1).returning(|_| ControlFlow::Break(()));
        sink.expect_on_header().never();
        sink.expect_on_body().never();

        assert_eq!(transport.perform(&mut sink), TransportCode::AbortedByCallback);
    }

    #[test]
    fn progress_needs_both_registration_and_option() {
        let mut transport = configured(ok_exchange());
        transport.register(Callback::Progress);

        let mut sink = MockTransferSink::new();
        sink.expect_on_header().returning(<[u8]>::len);
        sink.expect_on_body().returning(<[u8]>::len);
        sink.expect_on_progress().never();

        assert_eq!(transport.perform(&mut sink), TransportCode::Ok);
    }

    #[test]
    fn no_body_skips_body_delivery() {
        let mut transport = configured(ok_exchange());
        transport.set_option(TransportOption::NoBody).unwrap();

        let mut sink = MockTransferSink::new();
        sink.expect_on_header().times(4).returning(<[u8]>::len);
        sink.expect_on_body().never();

        assert_eq!(transport.perform(&mut sink), TransportCode::Ok);
    }

    #[test]
    fn failure_reports_code_without_callbacks() {
        let mut transport = configured(Exchange::failure(TransportCode::CouldntConnect));
        let mut sink = MockTransferSink::new();
        sink.expect_on_header().never();
        sink.expect_on_body().never();

        assert_eq!(transport.perform(&mut sink), TransportCode::CouldntConnect);
        assert_eq!(transport.info(Info::ResponseCode).as_long(), 0);
        assert_eq!(transport.info(Info::NumConnects).as_long(), 0);
    }

    #[test]
    fn missing_url_is_malformed() {
        let mut transport = ReplayTransport::new(ok_exchange());
        let mut sink = MockTransferSink::new();
        assert_eq!(transport.perform(&mut sink), TransportCode::UrlMalformat);
    }

    #[test]
    fn reset_clears_configuration() {
        let mut transport = configured(ok_exchange());
        transport.set_option(TransportOption::PostFields(Bytes::from_static(b"body"))).unwrap();
        assert!(!transport.config().is_pristine());

        transport.reset();

        assert!(transport.config().is_pristine());
        assert!(transport.option_history().is_empty());
        assert!(!transport.is_registered(Callback::Header));
        assert_eq!(transport.resets(), 1);
        assert_eq!(transport.exchange.status_code(), 200);
    }
}
