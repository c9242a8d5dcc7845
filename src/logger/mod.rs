//! Logger module
//!
//! Provides logging utilities for the article server including:
//! - Server lifecycle logging
//! - Connection and error logging on stdout/stderr
//! - The append-only change log (see [`writer`])

pub mod writer;

pub use writer::{ChangeLog, LogWriter};

use crate::config::Config;
use std::net::SocketAddr;

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    println!("======================================");
    println!("Article server started successfully");
    println!("Listening on: http://{addr}");
    println!(
        "Static files: {}/ (entry: {})",
        config.static_files.root, config.static_files.index_file
    );
    match config.logging.change_log_file {
        Some(ref path) => println!("Change log: {path}"),
        None => println!("Change log: stdout"),
    }
    if let Some(workers) = config.server.workers {
        println!("Worker threads: {workers}");
    }
    println!("======================================\n");
}

pub fn log_info(message: &str) {
    println!("[INFO] {message}");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    println!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    println!("[API] {method} {path} - {status}");
}

pub fn log_shutdown(reason: &str) {
    println!("\n[Shutdown] {reason}, no longer accepting connections");
}
