use std::fmt;

/// Native completion code reported by a transport after `perform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCode {
    Ok,
    UrlMalformat,
    CouldntResolveHost,
    CouldntConnect,
    SslConnectError,
    OperationTimedOut,
    /// The server closed the connection without sending anything.
    GotNothing,
    /// A write callback did not consume the whole span it was given.
    WriteError,
    SendError,
    RecvError,
    /// The progress callback asked to stop.
    AbortedByCallback,
    TooManyRedirects,
    /// Engine specific code with no dedicated variant.
    Other(i32),
}

impl TransportCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, TransportCode::Ok)
    }
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportCode::Ok => f.write_str("ok"),
            TransportCode::UrlMalformat => f.write_str("url malformat"),
            TransportCode::CouldntResolveHost => f.write_str("couldn't resolve host"),
            TransportCode::CouldntConnect => f.write_str("couldn't connect"),
            TransportCode::SslConnectError => f.write_str("ssl connect error"),
            TransportCode::OperationTimedOut => f.write_str("operation timed out"),
            TransportCode::GotNothing => f.write_str("got nothing"),
            TransportCode::WriteError => f.write_str("write error"),
            TransportCode::SendError => f.write_str("send error"),
            TransportCode::RecvError => f.write_str("recv error"),
            TransportCode::AbortedByCallback => f.write_str("aborted by callback"),
            TransportCode::TooManyRedirects => f.write_str("too many redirects"),
            TransportCode::Other(code) => write!(f, "transport code {code}"),
        }
    }
}
