use std::fmt;

/// Normalized outcome of one transaction.
///
/// This is independent of the transport's native completion codes; see
/// `executor::convert` for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferStatus {
    Success,
    /// The connection closed without a single response byte.
    ResponseEmpty,
    Timeout,
    ConnectError,
    ConnectDnsError,
    ConnectTlsError,
    /// Writing received data failed, including an aborting write callback.
    DownloadError,
    /// The request could not be configured or sent.
    FailedToStart,
    /// Any other failure. Also the state of a response that never completed.
    #[default]
    Error,
}

impl TransferStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Success => "success",
            TransferStatus::ResponseEmpty => "response_empty",
            TransferStatus::Timeout => "timeout",
            TransferStatus::ConnectError => "connect_error",
            TransferStatus::ConnectDnsError => "connect_dns_error",
            TransferStatus::ConnectTlsError => "connect_tls_error",
            TransferStatus::DownloadError => "download_error",
            TransferStatus::FailedToStart => "failed_to_start",
            TransferStatus::Error => "error",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
