//! Process shutdown triggers.
//!
//! The reload server must not outlive the build tool. Two triggers end
//! the session:
//!
//! - a termination signal (`SIGTERM` on unix, Ctrl-C elsewhere)
//! - end of input on stdin, when stdin is a pipe owned by the parent
//!
//! Terminal stdin is not watched; an interactive shell never closes it.

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::server::ReloadServer;

// ============================================================================
// Types
// ============================================================================

/// What ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// Termination signal received.
    Terminate,
    /// Parent process closed stdin.
    StdinClosed,
}

// ============================================================================
// Public Functions
// ============================================================================

/// Waits for the first shutdown trigger.
pub async fn wait_for_termination() -> ShutdownTrigger {
    let stdin_closed = watch_stdin();

    tokio::select! {
        () = terminate_signal() => ShutdownTrigger::Terminate,
        Ok(()) = stdin_closed => ShutdownTrigger::StdinClosed,
    }
}

/// Spawns a task closing `server` on the first shutdown trigger.
///
/// When `exit` is set the process exits with status 0 once the server
/// has closed.
pub fn spawn_shutdown_watcher(server: Arc<ReloadServer>, exit: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let trigger = wait_for_termination().await;
        info!(?trigger, "Shutting down reload server");

        server.close().await;

        if exit {
            std::process::exit(0);
        }
    })
}

// ============================================================================
// Internal Functions
// ============================================================================

/// Resolves when a termination signal arrives. Pends forever if no
/// handler can be installed.
#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = terminate.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

/// Watches stdin for end of input on a detached thread.
///
/// The returned receiver errors (never resolves `Ok`) when stdin is a
/// terminal.
fn watch_stdin() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    if io::stdin().is_terminal() {
        debug!("Stdin is a terminal; not watching for end of input");
        return rx;
    }

    // Blocking read; a tokio blocking task would hold up runtime shutdown
    let spawned = thread::Builder::new()
        .name("crx-stdin-watch".into())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Failed to spawn stdin watcher");
    }

    rx
}
