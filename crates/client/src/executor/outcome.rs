use std::time::Duration;

use http::StatusCode;
use tracing::trace;

use crate::response::{Response, TransferStatus};
use crate::transport::{Info, Transport, TransportCode};

/// Maps a transport completion code onto the normalized status taxonomy.
///
/// Codes without a dedicated status map to [`TransferStatus::Error`].
pub fn convert(code: TransportCode) -> TransferStatus {
    match code {
        TransportCode::Ok => TransferStatus::Success,
        TransportCode::GotNothing => TransferStatus::ResponseEmpty,
        TransportCode::OperationTimedOut => TransferStatus::Timeout,
        TransportCode::CouldntConnect => TransferStatus::ConnectError,
        TransportCode::CouldntResolveHost => TransferStatus::ConnectDnsError,
        TransportCode::SslConnectError => TransferStatus::ConnectTlsError,
        TransportCode::WriteError => TransferStatus::DownloadError,
        TransportCode::SendError => TransferStatus::FailedToStart,
        _ => TransferStatus::Error,
    }
}

/// Copies status code, timing and counters reported by `handle` into `response`.
pub(crate) fn copy_transfer_info<T: Transport + ?Sized>(handle: &T, response: &mut Response) {
    let code = handle.info(Info::ResponseCode).as_long();
    response.status_code = u16::try_from(code).ok().and_then(|code| StatusCode::from_u16(code).ok());
    response.total_time = seconds_to_millis(handle.info(Info::TotalTime).as_double());
    response.num_connects = u64::try_from(handle.info(Info::NumConnects).as_long()).unwrap_or(0);
    response.num_redirects = u64::try_from(handle.info(Info::RedirectCount).as_long()).unwrap_or(0);

    trace!(
        status_code = code,
        total_time_ms = response.total_time.as_millis(),
        connects = response.num_connects,
        redirects = response.num_redirects,
        "copied transfer info"
    );
}

/// Completes `response` for a transaction whose deadline passed before the
/// transport reported completion. Nothing the transport reported is trusted.
pub(crate) fn expire(response: &mut Response, elapsed: Duration) {
    response.status = TransferStatus::Timeout;
    response.status_code = None;
    response.total_time = truncate_to_millis(elapsed);
    response.num_connects = 0;
    response.num_redirects = 0;
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is finite, non-negative and far below u64::MAX milliseconds"
)]
fn seconds_to_millis(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_millis((seconds * 1000.0) as u64)
    } else {
        Duration::ZERO
    }
}

fn truncate_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_known_code() {
        let cases = [
            (TransportCode::Ok, TransferStatus::Success),
            (TransportCode::GotNothing, TransferStatus::ResponseEmpty),
            (TransportCode::OperationTimedOut, TransferStatus::Timeout),
            (TransportCode::CouldntConnect, TransferStatus::ConnectError),
            (TransportCode::CouldntResolveHost, TransferStatus::ConnectDnsError),
            (TransportCode::SslConnectError, TransferStatus::ConnectTlsError),
            (TransportCode::WriteError, TransferStatus::DownloadError),
            (TransportCode::SendError, TransferStatus::FailedToStart),
        ];
        for (code, status) in cases {
            assert_eq!(convert(code), status, "{code}");
        }
    }

    #[test]
    fn unmapped_codes_are_errors() {
        for code in [
            TransportCode::UrlMalformat,
            TransportCode::RecvError,
            TransportCode::AbortedByCallback,
            TransportCode::TooManyRedirects,
            TransportCode::Other(0),
            TransportCode::Other(-1),
            TransportCode::Other(9999),
        ] {
            assert_eq!(convert(code), TransferStatus::Error, "{code}");
        }
    }

    #[test]
    fn converts_seconds_at_millisecond_resolution() {
        assert_eq!(seconds_to_millis(1.2345), Duration::from_millis(1234));
        assert_eq!(seconds_to_millis(0.0), Duration::ZERO);
        assert_eq!(seconds_to_millis(-1.0), Duration::ZERO);
        assert_eq!(seconds_to_millis(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn expire_discards_transfer_info() {
        let mut response = Response::default();
        response.status = TransferStatus::Success;
        response.status_code = Some(StatusCode::OK);
        response.num_connects = 2;
        response.num_redirects = 1;

        expire(&mut response, Duration::from_micros(1_500_900));

        assert_eq!(response.status(), TransferStatus::Timeout);
        assert_eq!(response.status_code(), None);
        assert_eq!(response.total_time(), Duration::from_millis(1500));
        assert_eq!(response.num_connects(), 0);
        assert_eq!(response.num_redirects(), 0);
    }
}
