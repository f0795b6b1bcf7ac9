//! Current-thread runtime that owns the event loop.

use std::future::Future;
use std::io;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::REACTOR_TARGET;

/// Errors raised while constructing the reactor.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// The underlying runtime could not be built.
    #[error("failed to start reactor: {source}")]
    Build {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Event loop that services timers and I/O on the calling thread.
///
/// Work registered through a [`ReactorHandle`] only makes progress while some
/// caller is inside [`Reactor::block_on`].
#[derive(Debug)]
pub struct Reactor {
    runtime: Runtime,
}

impl Reactor {
    /// Builds a current-thread reactor with timers and I/O enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::Build`] when the runtime cannot be created.
    pub fn new() -> Result<Self, ReactorError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ReactorError::Build { source })?;
        debug!(target: REACTOR_TARGET, "reactor started");
        Ok(Self { runtime })
    }

    /// Runs `future` to completion on this thread, servicing every other
    /// registered timer and task while it is suspended.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Returns a handle for registering work with this reactor.
    #[must_use]
    pub fn handle(&self) -> ReactorHandle {
        ReactorHandle {
            inner: self.runtime.handle().clone(),
        }
    }
}

/// Cloneable reference to a running [`Reactor`].
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    inner: Handle,
}

impl ReactorHandle {
    /// Returns the handle of the reactor driving the caller, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(|inner| Self { inner })
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.spawn(future)
    }
}
