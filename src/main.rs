use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod server;
mod store;

use logger::{ChangeLog, LogWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    // Worker threads from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let change_log: Arc<dyn ChangeLog> = Arc::new(LogWriter::open_or_stdout(
        cfg.logging.change_log_file.as_deref(),
    ));
    change_log.record(&format!(
        "Static file serving configured for {}",
        cfg.static_files.root
    ));

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(config::AppState::from_config(cfg, Arc::clone(&change_log)));
    logger::log_info(&format!(
        "Articles stored in {}",
        state.store.path().display()
    ));

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    change_log.record(&format!(
        "Server started successfully on port {}",
        addr.port()
    ));

    server::start_server_loop(listener, state, shutdown).await?;
    change_log.record("Server stopped");
    Ok(())
}
