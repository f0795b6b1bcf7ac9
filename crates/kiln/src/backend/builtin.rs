//! The backend compiled into `kiln`, used when no manifest exists for the
//! default identifier.

use std::future::Future;
use std::io;
use std::time::Duration;

use kiln_config::Config;
use kiln_reactor::{ReactorHandle, Timeout};
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use super::{BACKEND_TARGET, BackendError};

/// Delay between heartbeat log lines while idle.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Counters reported when the built-in backend stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Connections accepted and closed.
    pub connections: u64,
    /// Heartbeats emitted.
    pub heartbeats: u64,
}

/// Binds `host:port` and serves until SIGINT or SIGTERM arrives.
pub async fn run(config: &Config, reactor: ReactorHandle) -> Result<ServeSummary, BackendError> {
    let address = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| BackendError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(target: BACKEND_TARGET, %address, "built-in backend listening");
    let shutdown = shutdown_signal()?;
    serve_until(listener, reactor, HEARTBEAT_INTERVAL, shutdown).await
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Every accepted connection is logged and closed straight away. A heartbeat
/// is logged each time `heartbeat` passes without other activity.
pub async fn serve_until<S>(
    listener: TcpListener,
    reactor: ReactorHandle,
    heartbeat: Duration,
    shutdown: S,
) -> Result<ServeSummary, BackendError>
where
    S: Future<Output = ()>,
{
    let timer = Timeout::new(reactor, heartbeat);
    let mut summary = ServeSummary::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    summary.connections += 1;
                    info!(target: BACKEND_TARGET, %peer, "connection accepted");
                    drop(stream);
                }
                Err(error) => {
                    warn!(target: BACKEND_TARGET, %error, "accept failed");
                }
            },
            elapsed = timer.sync() => {
                if elapsed {
                    summary.heartbeats += 1;
                    debug!(target: BACKEND_TARGET, heartbeats = summary.heartbeats, "heartbeat");
                }
            }
        }
    }

    info!(
        target: BACKEND_TARGET,
        connections = summary.connections,
        heartbeats = summary.heartbeats,
        "built-in backend stopped"
    );
    Ok(summary)
}

fn shutdown_signal() -> Result<impl Future<Output = ()>, BackendError> {
    let mut terminate = signal(SignalKind::terminate()).map_err(signal_error)?;
    let mut interrupt = signal(SignalKind::interrupt()).map_err(signal_error)?;
    Ok(async move {
        tokio::select! {
            _ = terminate.recv() => info!(target: BACKEND_TARGET, "received SIGTERM"),
            _ = interrupt.recv() => info!(target: BACKEND_TARGET, "received SIGINT"),
        }
    })
}

fn signal_error(source: io::Error) -> BackendError {
    BackendError::Signal { source }
}
