// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::Notify;

/// Start signal handlers (Unix only)
///
/// Spawns a background task that notifies `shutdown` once SIGTERM or SIGINT arrives.
/// Fails if the handlers cannot be registered.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("[SIGNAL] SIGTERM received"),
            _ = sigint.recv() => tracing::info!("[SIGNAL] SIGINT received (Ctrl+C)"),
        }
        shutdown.notify_one();
    });

    tracing::debug!("[SIGNAL] Handlers registered for SIGTERM and SIGINT, pid {}", std::process::id());
    Ok(())
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("[SIGNAL] Ctrl+C received");
            shutdown.notify_one();
        }
    });
    Ok(())
}
