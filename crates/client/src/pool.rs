//! Free-list of reusable transport handles.
//!
//! Creating a transport handle is expensive compared to resetting one, so a
//! reactor keeps released handles around and hands them to the next
//! transaction. Every handle on the free-list has been reset: it carries no
//! option, callback registration or transfer information from its previous
//! transaction.
//!
//! The pool is single-threaded. A reactor and the executors it drives share it
//! through `Rc<RefCell<HandlePool<T>>>`; nothing here is `Sync`.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::{trace, warn};

use crate::transport::Transport;

type Factory<T> = Box<dyn Fn() -> T>;

pub struct HandlePool<T> {
    idle: Vec<T>,
    factory: Factory<T>,
    max_idle: Option<usize>,
    created: usize,
}

impl<T: Transport> HandlePool<T> {
    /// Creates an empty pool allocating new handles through `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self { idle: Vec::new(), factory: Box::new(factory), max_idle: None, created: 0 }
    }

    /// Caps the number of idle handles; handles released past the cap are freed.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Pops an idle handle, or allocates a fresh one when none is left.
    pub fn acquire(&mut self) -> T {
        if let Some(handle) = self.idle.pop() {
            trace!(idle = self.idle.len(), "reuse pooled transport handle");
            return handle;
        }

        self.created += 1;
        trace!(created = self.created, "allocate transport handle");
        (self.factory)()
    }

    /// Resets `handle` and keeps it for reuse.
    pub fn release(&mut self, mut handle: T) {
        handle.reset();
        if self.is_full() {
            trace!(idle = self.idle.len(), "pool full, free transport handle");
            return;
        }
        self.idle.push(handle);
    }

    /// Allocates up to `count` handles ahead of time.
    pub fn reserve(&mut self, count: usize) {
        for _ in 0..count {
            if self.is_full() {
                break;
            }
            self.created += 1;
            self.idle.push((self.factory)());
        }
    }

    /// Number of handles waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Number of handles allocated by this pool so far.
    pub fn created(&self) -> usize {
        self.created
    }

    fn is_full(&self) -> bool {
        self.max_idle.is_some_and(|max| self.idle.len() >= max)
    }
}

impl<T> fmt::Debug for HandlePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("idle", &self.idle.len())
            .field("max_idle", &self.max_idle)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// What happens to a leased handle when the lease ends.
pub(crate) enum Disposal<T> {
    /// One-shot handle, freed.
    Free,
    /// Reset and pushed back onto the pool.
    Return(Rc<RefCell<HandlePool<T>>>),
}

/// Exclusive use of one transport handle for the duration of a transaction.
///
/// Dropping the lease disposes of the handle exactly once, as selected by the
/// [`Disposal`] tag fixed at construction.
pub(crate) struct HandleLease<T: Transport> {
    // `Some` from construction until `drop`
    handle: Option<T>,
    disposal: Disposal<T>,
}

impl<T: Transport> HandleLease<T> {
    pub(crate) fn one_shot(handle: T) -> Self {
        Self { handle: Some(handle), disposal: Disposal::Free }
    }

    pub(crate) fn pooled(pool: &Rc<RefCell<HandlePool<T>>>) -> Self {
        let handle = pool.borrow_mut().acquire();
        Self { handle: Some(handle), disposal: Disposal::Return(Rc::clone(pool)) }
    }

    pub(crate) fn is_pooled(&self) -> bool {
        matches!(self.disposal, Disposal::Return(_))
    }
}

impl<T: Transport> Deref for HandleLease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.handle.as_ref().expect("handle is leased until drop")
    }
}

impl<T: Transport> DerefMut for HandleLease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.handle.as_mut().expect("handle is leased until drop")
    }
}

impl<T: Transport> Drop for HandleLease<T> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match &self.disposal {
            Disposal::Free => {
                trace!("free one-shot transport handle");
                drop(handle);
            }
            Disposal::Return(pool) => match pool.try_borrow_mut() {
                Ok(mut pool) => pool.release(handle),
                Err(e) => {
                    warn!(cause = %e, "handle pool busy, free transport handle");
                    drop(handle);
                }
            },
        }
    }
}
