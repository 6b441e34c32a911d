//! Single-threaded driver for many pooled transactions.
//!
//! A [`Reactor`] owns the [`HandlePool`] and the reactor-wide resolve
//! overrides. [`start`](Reactor::start) turns a request into a pooled
//! [`Executor`] right away, so the handle is leased at submission time, and
//! queues it. [`poll`](Reactor::poll) completes the queued transactions in
//! submission order.
//!
//! Request timeouts are not configured on pooled handles. The reactor tracks
//! them itself: when a queued transaction's timeout has already elapsed at
//! the moment it is polled, it completes through [`Executor::time_out`]
//! instead of reaching the transport. A transaction that is running cannot be
//! interrupted.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use micro_client::reactor::Reactor;
//! use micro_client::request::Request;
//! use micro_client::transport::replay::{Exchange, ReplayTransport};
//!
//! let exchange = Exchange::from_raw(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
//! let mut reactor = Reactor::builder()
//!     .transport_factory(move || ReplayTransport::new(exchange.clone()))
//!     .build()
//!     .unwrap();
//!
//! let done = Rc::new(Cell::new(0));
//! for _ in 0..3 {
//!     let done = Rc::clone(&done);
//!     let request = Request::get("http://localhost/").build().unwrap();
//!     reactor.start(request, move |_, response| {
//!         assert!(response.status().is_success());
//!         done.set(done.get() + 1);
//!     });
//! }
//!
//! reactor.run();
//! assert_eq!(done.get(), 3);
//! assert_eq!(reactor.idle_handles(), 3);
//! ```

mod builder;

pub use builder::{ReactorBuildError, ReactorBuilder};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::{trace, warn};

use crate::executor::Executor;
use crate::pool::HandlePool;
use crate::request::{Request, ResolveHost};
use crate::response::Response;
use crate::transport::Transport;

type Completion = Box<dyn FnOnce(&Request, Response)>;

struct Transaction<T: Transport> {
    executor: Executor<'static, T>,
    started_at: Instant,
    on_complete: Completion,
}

pub struct Reactor<T: Transport> {
    pool: Rc<RefCell<HandlePool<T>>>,
    resolve_hosts: Rc<[ResolveHost]>,
    queue: VecDeque<Transaction<T>>,
}

impl<T: Transport + 'static> Reactor<T> {
    pub fn builder() -> ReactorBuilder<T> {
        ReactorBuilder::new()
    }
}

impl<T: Transport> Reactor<T> {
    /// Queues `request`; `on_complete` receives its response once polled.
    pub fn start<F>(&mut self, request: Request, on_complete: F)
    where
        F: FnOnce(&Request, Response) + 'static,
    {
        let executor = Executor::pooled(request, &self.pool, Rc::clone(&self.resolve_hosts));
        trace!(url = executor.request().url(), queued = self.queue.len() + 1, "transaction started");
        self.queue.push_back(Transaction { executor, started_at: Instant::now(), on_complete: Box::new(on_complete) });
    }

    /// Completes every transaction queued when the call begins and returns
    /// how many completed.
    pub fn poll(&mut self) -> usize {
        self.step(Instant::now)
    }

    /// Like [`poll`](Reactor::poll), with deadlines checked against `now`
    /// instead of the clock.
    pub fn poll_at(&mut self, now: Instant) -> usize {
        self.step(|| now)
    }

    /// Polls until no transaction is left.
    pub fn run(&mut self) {
        while !self.queue.is_empty() {
            self.poll();
        }
    }

    /// Number of queued transactions.
    pub fn active(&self) -> usize {
        self.queue.len()
    }

    pub fn idle_handles(&self) -> usize {
        self.pool.borrow().idle()
    }

    pub fn created_handles(&self) -> usize {
        self.pool.borrow().created()
    }

    pub fn resolve_hosts(&self) -> &[ResolveHost] {
        &self.resolve_hosts
    }

    fn step(&mut self, mut clock: impl FnMut() -> Instant) -> usize {
        let count = self.queue.len();
        for _ in 0..count {
            let Some(Transaction { mut executor, started_at, on_complete }) = self.queue.pop_front() else {
                break;
            };

            let elapsed = clock().saturating_duration_since(started_at);
            let response = match executor.request().timeout() {
                Some(timeout) if elapsed >= timeout => {
                    warn!(
                        url = executor.request().url(),
                        timeout_ms = timeout.as_millis(),
                        elapsed_ms = elapsed.as_millis(),
                        "deadline passed before transfer"
                    );
                    executor.expire(elapsed)
                }
                _ => executor.transfer(),
            };

            on_complete(executor.request(), response);
        }
        count
    }
}

impl<T: Transport> fmt::Debug for Reactor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("pool", &self.pool)
            .field("resolve_hosts", &self.resolve_hosts)
            .field("active", &self.queue.len())
            .finish()
    }
}
