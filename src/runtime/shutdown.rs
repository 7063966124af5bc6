//! OS signal handling for clean application shutdown.
//!
//! The runtime races this helper against its supervised units; when a
//! termination signal arrives, every bot gets stopped through the
//! regular exit path (reports and `before_close` hooks included).

/// Completes when the process receives a termination request.
///
/// Unix: `SIGINT`, `SIGTERM` or `SIGQUIT`. Elsewhere: Ctrl-C.
/// Fails only if signal listeners cannot be registered.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes when the process receives a termination request.
///
/// Unix: `SIGINT`, `SIGTERM` or `SIGQUIT`. Elsewhere: Ctrl-C.
/// Fails only if signal listeners cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
