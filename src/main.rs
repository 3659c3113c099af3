use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use formrelay::config::{self, AppState, MailSettings};
use formrelay::logger;
use formrelay::server::{
    create_reusable_listener, drain_connections, start_server_loop, start_signal_handler,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config path (without extension) from the first argument, "config" by default
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;

    let _log_guard = logger::init(&cfg.logging)?;

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let mail = MailSettings::from_env()?;
    logger::log_missing_mail_settings(&mail.missing());

    tokio::fs::create_dir_all(cfg.forms.upload_dir()).await?;

    let listener = create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::with_smtp(cfg, mail));
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::new(Notify::new());
    start_signal_handler(Arc::clone(&shutdown))?;

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    start_server_loop(listener, state, Arc::clone(&active_connections), shutdown).await;

    let remaining = drain_connections(&active_connections, grace).await;
    if remaining > 0 {
        logger::log_warning(&format!("Exiting with {remaining} connection(s) still open"));
    }
    Ok(())
}
