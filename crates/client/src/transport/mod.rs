//! The boundary to the engine that actually moves bytes.
//!
//! The executor never speaks HTTP on the wire itself. It configures a
//! [`Transport`] handle, hands it a [`TransferSink`] for the duration of
//! [`perform`](Transport::perform), and reads the transfer information back
//! once the engine returns a [`TransportCode`].
//!
//! # Callback contract
//!
//! A transport only calls the sink methods that were registered through
//! [`Transport::register`]. For header and body spans the sink returns how
//! many bytes it consumed; anything other than the span length makes the
//! transport abort with [`TransportCode::WriteError`]. A progress callback
//! returning [`ControlFlow::Break`] aborts with
//! [`TransportCode::AbortedByCallback`]. Progress is only reported when the
//! handle was configured with `NoProgress(false)`.
//!
//! Two engines ship with the crate: [`CurlTransport`] drives libcurl, and
//! [`replay::ReplayTransport`] replays scripted exchanges in process.
//!
//! Header spans are single lines in wire order, trailing CRLF included; the
//! status line and the blank separator are delivered too. No header span
//! follows the first body span of a transaction.
//!
//! # Handle lifecycle
//!
//! [`reset`](Transport::reset) returns a handle to its freshly created state:
//! no options, no registered callbacks, no transfer information. Dropping a
//! handle frees it.

mod code;
pub mod curl;
mod error;
mod option;
pub mod replay;

pub use self::curl::CurlTransport;
pub use code::TransportCode;
pub use error::OptionError;
pub use option::{HttpVersion, MimePart, Multipart, TransportOption};

use std::ops::ControlFlow;

/// Streaming callbacks a transport can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    Header,
    Body,
    Progress,
}

/// Transfer information a transport can report after `perform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Info {
    /// Last received HTTP status code, `0` when none.
    ResponseCode,
    /// Total transfer time in seconds.
    TotalTime,
    /// Number of new connections created.
    NumConnects,
    /// Number of redirects followed.
    RedirectCount,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InfoValue {
    Long(i64),
    Double(f64),
}

impl InfoValue {
    #[allow(clippy::cast_possible_truncation, reason = "engines report whole numbers as doubles too")]
    pub fn as_long(&self) -> i64 {
        match *self {
            InfoValue::Long(value) => value,
            InfoValue::Double(value) => value as i64,
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "counters and codes fit in a double")]
    pub fn as_double(&self) -> f64 {
        match *self {
            InfoValue::Long(value) => value as f64,
            InfoValue::Double(value) => value,
        }
    }
}

/// Byte counters passed to progress callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferProgress {
    pub download_total: u64,
    pub download_now: u64,
    pub upload_total: u64,
    pub upload_now: u64,
}

/// Receives the data of a running transfer.
///
/// Called on the thread running `perform`; implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait TransferSink {
    /// One header line. Return `data.len()` to continue.
    fn on_header(&mut self, data: &[u8]) -> usize;

    /// One body chunk. Return `data.len()` to continue.
    fn on_body(&mut self, data: &[u8]) -> usize;

    fn on_progress(&mut self, progress: TransferProgress) -> ControlFlow<()>;
}

/// A reusable handle of the underlying transport engine.
pub trait Transport {
    fn set_option(&mut self, option: TransportOption) -> Result<(), OptionError>;

    /// Enables delivery of one kind of callback to the sink passed to `perform`.
    fn register(&mut self, callback: Callback);

    /// Runs one transfer to completion with the current configuration.
    fn perform(&mut self, sink: &mut dyn TransferSink) -> TransportCode;

    fn info(&self, info: Info) -> InfoValue;

    /// Drops every option, registration and transfer information.
    fn reset(&mut self);
}
