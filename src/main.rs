use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod db;
mod dispatch;
mod error;
mod handler;
mod http;
mod logger;
mod mail;
mod mods;
mod server;
mod theme;

use config::{AppState, Config, EnvSettings};
use dispatch::ModRegistry;
use mail::{DnsResolver, LettreTransport, Messaging};
use server::{create_reusable_listener, start_server_loop, ServerLoopConfig, SignalHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Site root: first argument, else the working directory
    let root_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    config::env::load_dotenv(&root_path)?;
    let env = Arc::new(EnvSettings::from_process_env()?);
    let cfg = Config::load_from(&root_path.join("config").to_string_lossy(), &root_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, env))
}

async fn async_main(cfg: Config, env: Arc<EnvSettings>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let messaging = Messaging::new(
        Arc::clone(&env),
        cfg.app.root_path.join(&cfg.app.dkim_key_dir),
        Arc::new(LettreTransport),
        Arc::new(DnsResolver::from_system_conf()),
    );
    let mut registry = ModRegistry::new();
    mods::register(&mut registry, &cfg, &env);

    logger::log_server_start(&addr, &cfg, &env);
    logger::log_info(&format!("Registered actions: {}", registry.actions().join(", ")));

    let drain_timeout = Duration::from_secs(cfg.performance.write_timeout);
    let state = Arc::new(AppState::new(cfg, env, registry, messaging));
    for root in state.roots.roots() {
        logger::log_info(&format!("Theme search path: {}", root.display()));
    }
    logger::log_info(&format!("Database: {}", state.db));

    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(start_server_loop(
            listener,
            state,
            Arc::new(AtomicUsize::new(0)),
            ServerLoopConfig {
                signals,
                drain_timeout,
            },
        ))
        .await
}
