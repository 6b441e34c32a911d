use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use super::Reactor;
use crate::pool::HandlePool;
use crate::request::ResolveHost;
use crate::transport::Transport;

type Factory<T> = Box<dyn Fn() -> T>;

pub struct ReactorBuilder<T> {
    factory: Option<Factory<T>>,
    resolve_hosts: Vec<ResolveHost>,
    reserve: usize,
    max_idle: Option<usize>,
}

#[derive(Error, Debug)]
pub enum ReactorBuildError {
    #[error("transport factory must be set")]
    MissingFactory,
}

impl<T: Transport + 'static> ReactorBuilder<T> {
    pub(super) fn new() -> Self {
        Self { factory: None, resolve_hosts: Vec::new(), reserve: 0, max_idle: None }
    }

    /// Allocates a new transport handle whenever the pool runs dry.
    pub fn transport_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Adds a resolve override applied to every transaction of the reactor.
    pub fn resolve_host(mut self, resolve_host: ResolveHost) -> Self {
        self.resolve_hosts.push(resolve_host);
        self
    }

    /// Number of handles allocated up front.
    pub fn reserve_handles(mut self, count: usize) -> Self {
        self.reserve = count;
        self
    }

    pub fn max_idle_handles(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    pub fn build(self) -> Result<Reactor<T>, ReactorBuildError> {
        let factory = self.factory.ok_or(ReactorBuildError::MissingFactory)?;

        let mut pool = HandlePool::new(factory);
        if let Some(max_idle) = self.max_idle {
            pool = pool.with_max_idle(max_idle);
        }
        pool.reserve(self.reserve);

        debug!(
            reserved = pool.idle(),
            max_idle = ?self.max_idle,
            resolve_hosts = self.resolve_hosts.len(),
            "reactor built"
        );
        Ok(Reactor {
            pool: Rc::new(RefCell::new(pool)),
            resolve_hosts: self.resolve_hosts.into(),
            queue: VecDeque::new(),
        })
    }
}

impl<T> fmt::Debug for ReactorBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorBuilder")
            .field("factory", &self.factory.is_some())
            .field("resolve_hosts", &self.resolve_hosts)
            .field("reserve", &self.reserve)
            .field("max_idle", &self.max_idle)
            .finish()
    }
}
