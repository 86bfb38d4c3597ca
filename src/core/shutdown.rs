//! # OS termination signals.
//!
//! [`shutdown_requested`] resolves once the process receives a termination
//! signal and never resolves when signal handling is disabled or cannot be
//! installed, so it can sit in a `select!` unconditionally.
//!
//! | Platform | Signals                          |
//! |----------|----------------------------------|
//! | Unix     | SIGINT, SIGTERM, SIGQUIT, Ctrl-C |
//! | other    | Ctrl-C                           |

pub(crate) async fn shutdown_requested(enabled: bool) {
    if enabled {
        match termination_signal().await {
            Ok(()) => return,
            Err(e) => tracing::warn!(error = %e, "cannot install signal handlers"),
        }
    }
    std::future::pending::<()>().await
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => tracing::info!("SIGINT received"),
        _ = terminate.recv() => tracing::info!("SIGTERM received"),
        _ = quit.recv() => tracing::info!("SIGQUIT received"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(())
}
