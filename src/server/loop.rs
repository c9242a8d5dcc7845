// Server loop module
// Accepts connections until the shutdown signal fires, then drains them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;

use super::connection::{accept_connection, connection_timeout};
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener` until `shutdown` is notified, then
/// wait for in-flight connections to finish.
///
/// Draining is bounded by the connection timeout; connections still open
/// after that are aborted.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            biased;

            () = shutdown.notified() => {
                logger::log_shutdown("Shutdown requested");
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &mut tasks,
                            &drain_rx,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            // Reap finished connection tasks
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    let _ = drain_tx.send(true);

    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_info(&format!(
            "Waiting for {remaining} connection(s) to finish"
        ));
    }

    let grace = connection_timeout(&state);
    let drained = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, aborting",
            tasks.len(),
            grace.as_secs()
        ));
        tasks.shutdown().await;
    }
    Ok(())
}
