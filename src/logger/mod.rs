//! Logger module
//!
//! Provides logging utilities for the front controller including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - Grouped development logging
//! - File-based logging support

pub mod debug;
mod format;
pub mod writer;

pub use debug::DebugLog;
pub use format::AccessLogEntry;

use crate::config::{Config, EnvSettings};
use std::net::SocketAddr;
use writer::Level;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        Level::parse(&config.logging.level),
    )
}

/// Before `init` (and in tests) messages go straight to stdout/stderr
fn write(level: Level, message: &str) {
    match writer::get() {
        Some(w) => w.write(level, message),
        None if level >= Level::Warn => eprintln!("{message}"),
        None => println!("{message}"),
    }
}

fn write_info(message: &str) {
    write(Level::Info, message);
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, env: &EnvSettings) {
    write_info("======================================");
    write_info("Front controller started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Root path: {}", config.app.root_path.display()));
    write_info(&format!("Theme: {}", env.theme));
    write_info(&format!("Default action: {}", config.app.default_action));
    write_info(&format!(
        "Mail relay: {}:{} ({})",
        env.smtp.hostname, env.smtp.port, env.smtp.security
    ));
    if env.is_dev {
        write_info("Development mode: grouped debug log enabled");
    }
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_server_stop() {
    write_info("[Shutdown] Listener closed, no longer accepting connections");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    write_info(message);
}

pub fn log_debug(message: &str) {
    write(Level::Debug, &format!("[DEBUG] {message}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
