// Server loop module
// Accepts connections until shutdown, then drains in-flight requests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL: Duration = Duration::from_millis(50);

pub struct ServerLoopConfig {
    pub signals: Arc<SignalHandler>,
    /// Upper bound on waiting for open connections after shutdown
    pub drain_timeout: Duration,
}

/// Run the accept loop on the current `LocalSet`
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // the flag covers a shutdown whose wakeup was already consumed
    while !config.signals.is_shutdown_requested() {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = config.signals.shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_server_stop();
    drain_connections(&active_connections, config.drain_timeout).await;
    Ok(())
}

/// Wait for open connections to finish, at most `timeout`
async fn drain_connections(active: &AtomicUsize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let open = active.load(Ordering::SeqCst);
        if open == 0 {
            logger::log_info("[Shutdown] All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown drain timed out with {open} connection(s) still open"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
