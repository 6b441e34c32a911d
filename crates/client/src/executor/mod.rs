//! Drives one HTTP transaction on one transport handle.
//!
//! An [`Executor`] is built in one of two modes:
//!
//! - **bound** ([`Executor::bound`]): wraps a caller-owned [`Request`] and a
//!   freshly allocated handle. The request timeout is enforced by the handle
//!   and the handle is freed when the executor goes away.
//! - **pooled** ([`Executor::pooled`]): owns its request and leases a handle
//!   from a [`HandlePool`]. Timeouts are the caller's business (see
//!   [`Executor::time_out`]) and the handle is reset and returned to the pool
//!   when the executor goes away.
//!
//! Either way the transaction runs `prepare`, then the transport's
//! `perform`, which streams header lines, body chunks and progress ticks back
//! into the executor, then the outcome translation that completes the
//! [`Response`].
//!
//! ```
//! use micro_client::executor::Executor;
//! use micro_client::request::Request;
//! use micro_client::response::TransferStatus;
//! use micro_client::transport::replay::{Exchange, ReplayTransport};
//!
//! let exchange = Exchange::from_raw(b"HTTP/1.1 200 OK\r\nServer: replay\r\n\r\nhello").unwrap();
//! let request = Request::get("http://localhost/").build().unwrap();
//!
//! let response = Executor::bound(&request, ReplayTransport::new(exchange)).perform();
//! assert_eq!(response.status(), TransferStatus::Success);
//! assert_eq!(response.body(), b"hello");
//! ```

mod accumulator;
mod outcome;
mod prepare;

pub use outcome::convert;

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::pool::{HandleLease, HandlePool};
use crate::request::{Request, ResolveHost};
use crate::response::{Response, TransferStatus};
use crate::transport::{OptionError, Transport};

use accumulator::Accumulator;
use prepare::{Aux, Mode};

enum Binding<'req> {
    Bound(&'req Request),
    Owned { request: Request, resolve_hosts: Rc<[ResolveHost]> },
}

impl Binding<'_> {
    fn request(&self) -> &Request {
        match self {
            Binding::Bound(request) => *request,
            Binding::Owned { request, .. } => request,
        }
    }

    fn mode(&self) -> Mode<'_> {
        match self {
            Binding::Bound(_) => Mode { bound: true, shared_resolve: &[] },
            Binding::Owned { resolve_hosts, .. } => Mode { bound: false, shared_resolve: resolve_hosts },
        }
    }
}

/// One HTTP transaction and the transport handle it runs on.
pub struct Executor<'req, T: Transport> {
    binding: Binding<'req>,
    // dropped before `lease`, the handle may still share it until reset
    aux: Aux,
    lease: HandleLease<T>,
    response: Response,
}

impl<'req, T: Transport> Executor<'req, T> {
    /// Wraps a caller-owned request and a dedicated, fresh handle.
    ///
    /// The handle is freed once the executor is dropped or consumed.
    pub fn bound(request: &'req Request, handle: T) -> Self {
        Self {
            binding: Binding::Bound(request),
            aux: Aux::default(),
            lease: HandleLease::one_shot(handle),
            response: Response::default(),
        }
    }
}

impl<T: Transport> Executor<'static, T> {
    /// Takes ownership of `request` and leases a handle from `pool`.
    ///
    /// `resolve_hosts` are applied after the request's own overrides. The
    /// request timeout is not configured on the handle; a caller enforcing it
    /// completes the transaction through [`time_out`](Executor::time_out).
    pub fn pooled(request: Request, pool: &Rc<RefCell<HandlePool<T>>>, resolve_hosts: Rc<[ResolveHost]>) -> Self {
        Self {
            binding: Binding::Owned { request, resolve_hosts },
            aux: Aux::default(),
            lease: HandleLease::pooled(pool),
            response: Response::default(),
        }
    }
}

impl<T: Transport> Executor<'_, T> {
    pub fn request(&self) -> &Request {
        self.binding.request()
    }

    /// Whether the handle goes back to a pool once the executor is dropped.
    pub fn is_pooled(&self) -> bool {
        self.lease.is_pooled()
    }

    /// Configures the handle for the request.
    ///
    /// [`perform`](Executor::perform) prepares on its own; calling this first
    /// only surfaces configuration errors early. Every call rebuilds the
    /// transaction state shared with the handle.
    pub fn prepare(&mut self) -> Result<(), OptionError> {
        prepare::configure(&mut *self.lease, self.binding.request(), self.binding.mode(), &mut self.aux)
    }

    /// Runs the transaction to completion and hands over its response.
    ///
    /// Never fails: every problem is reported through
    /// [`Response::status`].
    pub fn perform(mut self) -> Response {
        self.transfer()
    }

    /// Completes the transaction as timed out without running it.
    ///
    /// Status code and counters are reset to "unknown", the total time is
    /// `elapsed`.
    pub fn time_out(mut self, elapsed: Duration) -> Response {
        self.expire(elapsed)
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> &T {
        &self.lease
    }

    pub(crate) fn transfer(&mut self) -> Response {
        if let Err(e) = self.prepare() {
            warn!(cause = %e, url = self.binding.request().url(), "failed to prepare transport handle");
            self.response.status = TransferStatus::FailedToStart;
            outcome::copy_transfer_info(&*self.lease, &mut self.response);
            return mem::take(&mut self.response);
        }

        let code = {
            let mut sink = Accumulator::new(self.binding.request(), &mut self.response);
            self.lease.perform(&mut sink)
        };
        self.response.status = outcome::convert(code);
        outcome::copy_transfer_info(&*self.lease, &mut self.response);

        debug!(
            url = self.binding.request().url(),
            %code,
            status = %self.response.status,
            "transfer finished"
        );
        mem::take(&mut self.response)
    }

    pub(crate) fn expire(&mut self, elapsed: Duration) -> Response {
        debug!(
            url = self.binding.request().url(),
            elapsed_ms = elapsed.as_millis(),
            "transaction timed out"
        );
        outcome::expire(&mut self.response, elapsed);
        mem::take(&mut self.response)
    }
}

impl<T: Transport> Drop for Executor<'_, T> {
    fn drop(&mut self) {
        if !self.aux.is_empty() {
            trace!("release transaction state");
        }
        self.aux.release();
    }
}

impl<T: Transport> std::fmt::Debug for Executor<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("request", self.binding.request())
            .field("pooled", &self.is_pooled())
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}
