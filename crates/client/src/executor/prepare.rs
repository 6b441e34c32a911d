use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::request::{Method, MimeField, MimeValue, Payload, Request, ResolveHost, Version};
use crate::transport::{Callback, HttpVersion, MimePart, Multipart, OptionError, Transport, TransportOption};

/// Transaction-scoped state built by [`configure`] and shared with the handle.
///
/// The executor keeps the owning side; the handle drops its references on
/// reset. Nothing here outlives the transaction.
#[derive(Debug, Default)]
pub(crate) struct Aux {
    pub(crate) headers: Option<Arc<[Bytes]>>,
    pub(crate) resolve: Option<Arc<[String]>>,
    pub(crate) mime: Option<Arc<Multipart>>,
}

impl Aux {
    pub(crate) fn is_empty(&self) -> bool {
        self.headers.is_none() && self.resolve.is_none() && self.mime.is_none()
    }

    pub(crate) fn release(&mut self) {
        self.headers = None;
        self.resolve = None;
        self.mime = None;
    }
}

/// How the executor driving [`configure`] was constructed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mode<'a> {
    /// Bound executors enforce the request timeout on the handle itself.
    pub(crate) bound: bool,
    /// Reactor-wide resolve overrides, appended after the request's own.
    pub(crate) shared_resolve: &'a [ResolveHost],
}

/// Issues the configuration calls needed to run exactly `request` on `handle`.
pub(crate) fn configure<T>(handle: &mut T, request: &Request, mode: Mode<'_>, aux: &mut Aux) -> Result<(), OptionError>
where
    T: Transport + ?Sized,
{
    aux.release();

    handle.register(Callback::Header);
    handle.register(Callback::Body);
    handle.set_option(TransportOption::NoSignal(true))?;
    handle.set_option(TransportOption::Url(request.url().to_string()))?;
    handle.set_option(method_option(request.method()))?;
    handle.set_option(TransportOption::HttpVersion(http_version(request.version())))?;

    if mode.bound
        && let Some(timeout) = request.timeout()
    {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        handle.set_option(TransportOption::TimeoutMs(timeout_ms))?;
    }

    handle.set_option(TransportOption::FollowLocation(request.follow_redirects()))?;
    handle.set_option(TransportOption::MaxRedirects(request.max_redirects()))?;
    handle.set_option(TransportOption::SslVerifyPeer(request.verify_ssl_peer()))?;
    handle.set_option(TransportOption::SslVerifyHost(request.verify_ssl_host()))?;

    if let Some(encodings) = request.accept_encodings() {
        handle.set_option(TransportOption::AcceptEncoding(encodings.join(", ")))?;
    }

    if !request.headers().is_empty() {
        let headers: Arc<[Bytes]> = request.headers().into();
        aux.headers = Some(Arc::clone(&headers));
        handle.set_option(TransportOption::HttpHeader(headers))?;
    }

    let resolve: Vec<String> =
        request.resolve_hosts().iter().chain(mode.shared_resolve).map(ToString::to_string).collect();
    if !resolve.is_empty() {
        let resolve: Arc<[String]> = resolve.into();
        aux.resolve = Some(Arc::clone(&resolve));
        handle.set_option(TransportOption::Resolve(resolve))?;
    }

    match request.payload() {
        Payload::Empty => {}
        Payload::Data(data) => handle.set_option(TransportOption::PostFields(data.clone()))?,
        Payload::Mime(fields) => {
            let mime = Arc::new(multipart(fields));
            aux.mime = Some(Arc::clone(&mime));
            handle.set_option(TransportOption::MimePost(mime))?;
        }
    }

    if request.progress_handler().is_some() {
        handle.register(Callback::Progress);
        handle.set_option(TransportOption::NoProgress(false))?;
    } else {
        handle.set_option(TransportOption::NoProgress(true))?;
    }

    debug!(
        method = %request.method(),
        url = request.url(),
        bound = mode.bound,
        headers = request.headers().len(),
        resolve = aux.resolve.as_ref().map_or(0, |resolve| resolve.len()),
        "prepared transport handle"
    );
    Ok(())
}

fn method_option(method: Method) -> TransportOption {
    match method {
        Method::Get => TransportOption::HttpGet,
        Method::Head => TransportOption::NoBody,
        Method::Post => TransportOption::Post,
        Method::Connect => TransportOption::ConnectOnly,
        Method::Put | Method::Delete | Method::Options | Method::Patch => {
            TransportOption::CustomRequest(method.as_str())
        }
    }
}

fn http_version(version: Version) -> HttpVersion {
    match version {
        Version::UseBest => HttpVersion::None,
        Version::Http10 => HttpVersion::Http10,
        Version::Http11 => HttpVersion::Http11,
        Version::Http2 => HttpVersion::Http2,
        Version::Http2Tls => HttpVersion::Http2Tls,
        Version::Http2PriorKnowledge => HttpVersion::Http2PriorKnowledge,
    }
}

fn multipart(fields: &[MimeField]) -> Multipart {
    let mut multipart = Multipart::new();
    for field in fields {
        let part = match field.value() {
            MimeValue::Text(value) => {
                MimePart::Data { name: field.name().to_string(), data: Bytes::copy_from_slice(value.as_bytes()) }
            }
            MimeValue::File(path) => MimePart::File { filename: field.name().to_string(), path: path.clone() },
        };
        multipart.add_part(part);
    }
    trace!(parts = multipart.len(), "built multipart body");
    multipart
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::ops::ControlFlow;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::request::RequestBuilder;
    use crate::transport::replay::{Exchange, ReplayTransport, Verb};

    const BOUND: Mode<'static> = Mode { bound: true, shared_resolve: &[] };
    const POOLED: Mode<'static> = Mode { bound: false, shared_resolve: &[] };

    fn transport() -> ReplayTransport {
        ReplayTransport::new(Exchange::from_raw(b"HTTP/1.1 200 OK\r\n\r\n").unwrap())
    }

    fn configured(builder: RequestBuilder, mode: Mode<'_>) -> (ReplayTransport, Aux) {
        let request = builder.build().unwrap();
        let mut transport = transport();
        let mut aux = Aux::default();
        configure(&mut transport, &request, mode, &mut aux).unwrap();
        (transport, aux)
    }

    #[test]
    fn minimal_request() {
        let (transport, aux) = configured(Request::get("http://localhost/"), BOUND);
        let config = transport.config();

        assert_eq!(config.url.as_deref(), Some("http://localhost/"));
        assert_eq!(config.verb, Some(Verb::HttpGet));
        assert_eq!(config.version, Some(HttpVersion::None));
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.follow_location, Some(true));
        assert_eq!(config.max_redirects, Some(None));
        assert_eq!(config.ssl_verify_peer, Some(true));
        assert_eq!(config.ssl_verify_host, Some(true));
        assert_eq!(config.accept_encoding, None);
        assert_eq!(config.headers, None);
        assert_eq!(config.resolve, None);
        assert_eq!(config.post_fields, None);
        assert_eq!(config.mime, None);
        assert_eq!(config.no_progress, Some(true));
        assert_eq!(config.no_signal, Some(true));

        assert!(transport.is_registered(Callback::Header));
        assert!(transport.is_registered(Callback::Body));
        assert!(!transport.is_registered(Callback::Progress));
        assert!(aux.is_empty());
    }

    #[test]
    fn maps_methods() {
        let cases = [
            (Method::Get, Verb::HttpGet),
            (Method::Head, Verb::NoBody),
            (Method::Post, Verb::Post),
            (Method::Connect, Verb::ConnectOnly),
            (Method::Put, Verb::Custom("PUT")),
            (Method::Delete, Verb::Custom("DELETE")),
            (Method::Options, Verb::Custom("OPTIONS")),
            (Method::Patch, Verb::Custom("PATCH")),
        ];
        for (method, verb) in cases {
            let (transport, _) = configured(Request::builder(method, "http://localhost/"), BOUND);
            assert_eq!(transport.config().verb, Some(verb), "{method}");
        }
    }

    #[test]
    fn maps_versions() {
        let cases = [
            (Version::Http10, HttpVersion::Http10),
            (Version::Http11, HttpVersion::Http11),
            (Version::Http2, HttpVersion::Http2),
            (Version::Http2Tls, HttpVersion::Http2Tls),
            (Version::Http2PriorKnowledge, HttpVersion::Http2PriorKnowledge),
        ];
        for (version, expected) in cases {
            let (transport, _) = configured(Request::get("http://localhost/").version(version), BOUND);
            assert_eq!(transport.config().version, Some(expected));
        }
    }

    #[test]
    fn timeout_only_when_bound() {
        let builder = || Request::get("http://localhost/").timeout(Duration::from_millis(1500));

        let (bound, _) = configured(builder(), BOUND);
        assert_eq!(bound.config().timeout_ms, Some(1500));

        let (pooled, _) = configured(builder(), POOLED);
        assert_eq!(pooled.config().timeout_ms, None);
        assert!(!pooled.option_history().contains(&"timeout_ms"));
    }

    #[test]
    fn redirect_and_tls_policy_pass_through() {
        let (transport, _) = configured(
            Request::get("https://localhost/")
                .follow_redirects(false)
                .max_redirects(3)
                .verify_ssl_peer(false)
                .verify_ssl_host(false),
            BOUND,
        );
        let config = transport.config();
        assert_eq!(config.follow_location, Some(false));
        assert_eq!(config.max_redirects, Some(Some(3)));
        assert_eq!(config.ssl_verify_peer, Some(false));
        assert_eq!(config.ssl_verify_host, Some(false));
    }

    #[test]
    fn accept_encoding_distinguishes_absent_and_empty() {
        let (absent, _) = configured(Request::get("http://localhost/"), BOUND);
        assert_eq!(absent.config().accept_encoding, None);

        let (all, _) = configured(Request::get("http://localhost/").accept_all_encodings(), BOUND);
        assert_eq!(all.config().accept_encoding.as_deref(), Some(""));

        let (listed, _) = configured(Request::get("http://localhost/").accept_encodings(["gzip", "br"]), BOUND);
        assert_eq!(listed.config().accept_encoding.as_deref(), Some("gzip, br"));
    }

    #[test]
    fn headers_share_request_storage() {
        let request = Request::get("http://localhost/").header("Accept", "*/*").header("X-Id", "7").build().unwrap();
        let mut transport = transport();
        let mut aux = Aux::default();
        configure(&mut transport, &request, BOUND, &mut aux).unwrap();

        let configured = transport.config().headers.as_ref().unwrap();
        assert_eq!(&configured[..], request.headers());
        assert_eq!(configured[0].as_ptr(), request.headers()[0].as_ptr());
        assert!(Arc::ptr_eq(configured, aux.headers.as_ref().unwrap()));
    }

    #[test]
    fn resolve_combines_request_and_shared_lists() {
        let shared = [ResolveHost::new("api.internal", 443, IpAddr::V6(Ipv6Addr::LOCALHOST))];
        let mode = Mode { bound: false, shared_resolve: &shared };
        let (transport, aux) = configured(
            Request::get("http://localhost/").resolve_host(ResolveHost::new(
                "example.com",
                80,
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            )),
            mode,
        );

        let resolve = transport.config().resolve.as_ref().unwrap();
        assert_eq!(&resolve[..], &["example.com:80:10.0.0.1".to_string(), "api.internal:443:[::1]".to_string()]);
        assert!(aux.resolve.is_some());
    }

    #[test]
    fn resolve_is_rebuilt_on_every_prepare() {
        let request = Request::get("http://localhost/")
            .resolve_host(ResolveHost::new("localhost", 80, IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .build()
            .unwrap();
        let mut transport = transport();
        let mut aux = Aux::default();

        configure(&mut transport, &request, BOUND, &mut aux).unwrap();
        let first = Arc::clone(aux.resolve.as_ref().unwrap());
        configure(&mut transport, &request, BOUND, &mut aux).unwrap();
        let second = aux.resolve.as_ref().unwrap();

        assert_eq!(first, *second);
        assert!(!Arc::ptr_eq(&first, second));
    }

    #[test]
    fn empty_resolve_list_is_skipped() {
        let (transport, aux) = configured(Request::get("http://localhost/"), POOLED);
        assert!(!transport.option_history().contains(&"resolve"));
        assert!(aux.resolve.is_none());
    }

    #[test]
    fn raw_body_excludes_multipart() {
        let (transport, aux) = configured(Request::post("http://localhost/").data(&b"a\0b"[..]), BOUND);
        let config = transport.config();
        assert_eq!(config.post_fields.as_ref().map(Bytes::len), Some(3));
        assert_eq!(config.mime, None);
        assert!(!transport.option_history().contains(&"mime_post"));
        assert!(aux.mime.is_none());
    }

    #[test]
    fn multipart_excludes_raw_body() {
        let (transport, aux) = configured(
            Request::post("http://localhost/")
                .mime_field(MimeField::text("name", "value"))
                .mime_field(MimeField::file("report.csv", "/var/data/report.csv")),
            BOUND,
        );
        let config = transport.config();
        assert_eq!(config.post_fields, None);
        assert!(!transport.option_history().contains(&"post_fields"));

        let mime = config.mime.as_ref().unwrap();
        assert_eq!(
            mime.parts(),
            &[
                MimePart::Data { name: "name".to_string(), data: Bytes::from_static(b"value") },
                MimePart::File { filename: "report.csv".to_string(), path: PathBuf::from("/var/data/report.csv") },
            ]
        );
        assert!(Arc::ptr_eq(mime, aux.mime.as_ref().unwrap()));
    }

    #[test]
    fn progress_is_opt_in() {
        let (transport, _) =
            configured(Request::get("http://localhost/").on_transfer_progress(|_, _| ControlFlow::Continue(())), BOUND);
        assert!(transport.is_registered(Callback::Progress));
        assert_eq!(transport.config().no_progress, Some(false));
    }

    #[test]
    fn invalid_url_fails_configuration() {
        let request = Request::get("not a url").build().unwrap();
        let mut transport = transport();
        let mut aux = Aux::default();

        let err = configure(&mut transport, &request, BOUND, &mut aux).unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { option: "url", .. }));
    }
}
