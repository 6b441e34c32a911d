//! [`Transport`] backed by a libcurl easy handle.
//!
//! Each `perform` runs one blocking transfer on the handle. The streaming
//! callbacks are installed for the duration of that transfer only, so they
//! can borrow the [`TransferSink`] handed to `perform`. Callbacks that were
//! not [registered](Transport::register) consume their data and continue.
//!
//! Transfer information is read once the transfer returns and cached until
//! the next `perform` or `reset`. [`reset`](Transport::reset) resets every
//! option to libcurl's defaults while keeping the handle's connection and
//! DNS caches, which is what makes pooled handles cheaper than fresh ones.

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::str;
use std::time::Duration;

use curl::easy::{Easy, Form, List};
use tracing::trace;

use super::{
    Callback, HttpVersion, Info, InfoValue, MimePart, Multipart, OptionError, TransferProgress, TransferSink, Transport,
    TransportCode, TransportOption,
};

#[derive(Debug, Clone, Copy, Default)]
struct Registered {
    header: bool,
    body: bool,
    progress: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct TransferInfo {
    response_code: u32,
    total_time: Duration,
    num_connects: u32,
    redirect_count: u32,
}

/// A libcurl easy handle.
#[derive(Debug)]
pub struct CurlTransport {
    easy: Easy,
    registered: Registered,
    info: TransferInfo,
}

impl CurlTransport {
    pub fn new() -> Self {
        Self { easy: Easy::new(), registered: Registered::default(), info: TransferInfo::default() }
    }

    fn run(&mut self, sink: &mut dyn TransferSink) -> Result<(), curl::Error> {
        let registered = self.registered;
        let sink = RefCell::new(sink);

        let mut transfer = self.easy.transfer();
        transfer.header_function(|data| !registered.header || sink.borrow_mut().on_header(data) == data.len())?;
        transfer.write_function(|data| {
            if registered.body { Ok(sink.borrow_mut().on_body(data)) } else { Ok(data.len()) }
        })?;
        transfer.progress_function(|download_total, download_now, upload_total, upload_now| {
            if !registered.progress {
                return true;
            }
            let progress = TransferProgress {
                download_total: whole_bytes(download_total),
                download_now: whole_bytes(download_now),
                upload_total: whole_bytes(upload_total),
                upload_now: whole_bytes(upload_now),
            };
            sink.borrow_mut().on_progress(progress) == ControlFlow::Continue(())
        })?;
        transfer.perform()
    }

    fn read_info(&mut self) -> TransferInfo {
        TransferInfo {
            response_code: self.easy.response_code().unwrap_or_default(),
            total_time: self.easy.total_time().unwrap_or_default(),
            num_connects: self.easy.num_connects().map(|n| u32::try_from(n).unwrap_or(u32::MAX)).unwrap_or_default(),
            redirect_count: self.easy.redirect_count().unwrap_or_default(),
        }
    }

    fn apply(&mut self, option: TransportOption) -> Result<(), OptionError> {
        let name = option.name();
        let invalid = |e: curl::Error| OptionError::invalid_value(name, e);
        match option {
            TransportOption::Url(url) => self.easy.url(&url).map_err(invalid),
            TransportOption::HttpGet => self.easy.get(true).map_err(invalid),
            TransportOption::NoBody => self.easy.nobody(true).map_err(invalid),
            TransportOption::Post => self.easy.post(true).map_err(invalid),
            TransportOption::ConnectOnly => self.easy.connect_only(true).map_err(invalid),
            TransportOption::CustomRequest(verb) => self.easy.custom_request(verb).map_err(invalid),
            TransportOption::HttpVersion(version) => self.easy.http_version(curl_version(version)).map_err(invalid),
            TransportOption::TimeoutMs(timeout) => self.easy.timeout(Duration::from_millis(timeout)).map_err(invalid),
            TransportOption::FollowLocation(follow) => self.easy.follow_location(follow).map_err(invalid),
            // a fresh or reset handle already follows without limit
            TransportOption::MaxRedirects(None) => Ok(()),
            TransportOption::MaxRedirects(Some(max)) => self.easy.max_redirections(max).map_err(invalid),
            TransportOption::SslVerifyPeer(verify) => self.easy.ssl_verify_peer(verify).map_err(invalid),
            TransportOption::SslVerifyHost(verify) => self.easy.ssl_verify_host(verify).map_err(invalid),
            TransportOption::AcceptEncoding(encoding) => self.easy.accept_encoding(&encoding).map_err(invalid),
            TransportOption::HttpHeader(lines) => {
                let list = string_list(name, lines.iter().map(|line| &line[..]))?;
                self.easy.http_headers(list).map_err(invalid)
            }
            TransportOption::Resolve(entries) => {
                let list = string_list(name, entries.iter().map(String::as_bytes))?;
                self.easy.resolve(list).map_err(invalid)
            }
            TransportOption::PostFields(data) => {
                self.easy.post_field_size(data.len() as u64).map_err(invalid)?;
                self.easy.post_fields_copy(&data).map_err(invalid)
            }
            TransportOption::MimePost(multipart) => {
                let form = form(name, &multipart)?;
                self.easy.httppost(form).map_err(invalid)
            }
            TransportOption::NoProgress(no_progress) => self.easy.progress(!no_progress).map_err(invalid),
            TransportOption::NoSignal(no_signal) => self.easy.signal(!no_signal).map_err(invalid),
        }
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for CurlTransport {
    fn set_option(&mut self, option: TransportOption) -> Result<(), OptionError> {
        self.apply(option)
    }

    fn register(&mut self, callback: Callback) {
        match callback {
            Callback::Header => self.registered.header = true,
            Callback::Body => self.registered.body = true,
            Callback::Progress => self.registered.progress = true,
        }
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> TransportCode {
        let result = self.run(sink);
        self.info = self.read_info();
        match result {
            Ok(()) => TransportCode::Ok,
            Err(e) => {
                let code = transport_code(&e);
                trace!(cause = %e, %code, "curl transfer failed");
                code
            }
        }
    }

    fn info(&self, info: Info) -> InfoValue {
        match info {
            Info::ResponseCode => InfoValue::Long(i64::from(self.info.response_code)),
            Info::TotalTime => InfoValue::Double(self.info.total_time.as_secs_f64()),
            Info::NumConnects => InfoValue::Long(i64::from(self.info.num_connects)),
            Info::RedirectCount => InfoValue::Long(i64::from(self.info.redirect_count)),
        }
    }

    fn reset(&mut self) {
        self.easy.reset();
        self.registered = Registered::default();
        self.info = TransferInfo::default();
    }
}

/// Maps a libcurl error onto the engine-neutral completion code.
pub fn transport_code(e: &curl::Error) -> TransportCode {
    if e.is_couldnt_resolve_host() {
        TransportCode::CouldntResolveHost
    } else if e.is_couldnt_connect() {
        TransportCode::CouldntConnect
    } else if e.is_ssl_connect_error() {
        TransportCode::SslConnectError
    } else if e.is_operation_timedout() {
        TransportCode::OperationTimedOut
    } else if e.is_got_nothing() {
        TransportCode::GotNothing
    } else if e.is_write_error() {
        TransportCode::WriteError
    } else if e.is_send_error() {
        TransportCode::SendError
    } else if e.is_recv_error() {
        TransportCode::RecvError
    } else if e.is_aborted_by_callback() {
        TransportCode::AbortedByCallback
    } else if e.is_url_malformed() {
        TransportCode::UrlMalformat
    } else if e.is_too_many_redirects() {
        TransportCode::TooManyRedirects
    } else {
        TransportCode::Other(e.code().cast_signed())
    }
}

fn curl_version(version: HttpVersion) -> curl::easy::HttpVersion {
    match version {
        HttpVersion::None => curl::easy::HttpVersion::Any,
        HttpVersion::Http10 => curl::easy::HttpVersion::V10,
        HttpVersion::Http11 => curl::easy::HttpVersion::V11,
        HttpVersion::Http2 => curl::easy::HttpVersion::V2,
        HttpVersion::Http2Tls => curl::easy::HttpVersion::V2TLS,
        HttpVersion::Http2PriorKnowledge => curl::easy::HttpVersion::V2PriorKnowledge,
    }
}

fn string_list<'a>(option: &'static str, items: impl Iterator<Item = &'a [u8]>) -> Result<List, OptionError> {
    let mut list = List::new();
    for item in items {
        let item = str::from_utf8(item).map_err(|e| OptionError::invalid_value(option, e))?;
        list.append(item).map_err(|e| OptionError::invalid_value(option, e))?;
    }
    Ok(list)
}

fn form(option: &'static str, multipart: &Multipart) -> Result<Form, OptionError> {
    let mut form = Form::new();
    for part in multipart.parts() {
        let added = match part {
            MimePart::Data { name, data } => form.part(name).contents(data).add(),
            MimePart::File { filename, path } => form.part(filename).file(path).add(),
        };
        added.map_err(|e| OptionError::invalid_value(option, e))?;
    }
    Ok(form)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "libcurl reports byte counts as non-negative whole doubles"
)]
fn whole_bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 { value as u64 } else { 0 }
}
