//! Single-threaded reactor and the timeout bridge built on top of it.
//!
//! The [`Reactor`] drives timers and I/O readiness on one thread. A
//! [`Timeout`] registers a one-shot timer with that reactor and reports its
//! expiry either through callbacks ([`Timeout::on_timeout`]) or by resuming a
//! suspended task ([`Timeout::sync`]), so reactor-driven delays read like
//! ordinary function calls to the code awaiting them.

mod reactor;
mod timeout;

pub use reactor::{Reactor, ReactorError, ReactorHandle};
pub use timeout::Timeout;

pub(crate) const REACTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reactor");
