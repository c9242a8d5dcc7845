// Connection handling module
// Accepts a single TCP connection and serves it on its own task
// until it closes or the server starts draining

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `performance.max_connections`.
///
/// Connections over the limit are dropped immediately. Accepted connections
/// are spawned on `tasks` so shutdown can wait for them.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    tasks: &mut JoinSet<()>,
    draining: &watch::Receiver<bool>,
) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    tasks.spawn(handle_connection(
        stream,
        Arc::clone(state),
        Arc::clone(conn_counter),
        draining.clone(),
    ));
}

/// Serve HTTP/1.1 on the stream.
///
/// The whole connection is bounded by `max(read_timeout, write_timeout)`.
/// Once `draining` flips to true the connection finishes the request in
/// progress and closes instead of waiting for the next keep-alive request.
async fn handle_connection(
    stream: TcpStream,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    mut draining: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);

    let performance = &state.config.performance;
    let timeout_duration = connection_timeout(&state);

    let mut builder = http1::Builder::new();
    builder.keep_alive(performance.keep_alive);

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state))),
    );

    let serve = async {
        tokio::pin!(conn);
        if *draining.borrow_and_update() {
            conn.as_mut().graceful_shutdown();
            return conn.await;
        }
        tokio::select! {
            res = conn.as_mut() => res,
            _ = draining.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    };

    match tokio::time::timeout(timeout_duration, serve).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => {
            logger::log_warning(&format!(
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            ));
        }
    }

    conn_counter.fetch_sub(1, Ordering::SeqCst);
}

/// Upper bound for one connection, also used as the shutdown grace period
pub fn connection_timeout(state: &AppState) -> Duration {
    let performance = &state.config.performance;
    Duration::from_secs(std::cmp::max(
        performance.read_timeout,
        performance.write_timeout,
    ))
}
