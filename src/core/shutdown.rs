//! # Process shutdown signals.
//!
//! [`wait_for_shutdown_signal`] resolves once the process is asked to stop and
//! reports which signal did it, so the binary can log it before cancelling the
//! server or the watch client.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT`: Ctrl-C in an interactive terminal.
//! - `SIGTERM`: what `kill`, systemd and Kubernetes send for a graceful stop.
//! - `SIGQUIT`: `Ctrl-\` in a terminal; operators use it for a hard stop.
//!
//! **Other platforms:**
//! - Ctrl-C via [`tokio::signal::ctrl_c`].
//!
//! Once a listener is registered the signal no longer terminates the process
//! on its own: stopping is up to whoever awaits the returned future.

/// Waits for a termination signal and returns its name (`"SIGINT"`,
/// `"SIGTERM"` or `"SIGQUIT"`).
///
/// Each call creates independent signal listeners, so several tasks may wait
/// at once and every one of them is woken by the same signal.
///
/// # Errors
/// Fails only if the signal handlers cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C and returns `"ctrl-c"`.
///
/// Each call creates an independent listener.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
