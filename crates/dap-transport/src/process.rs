//! Child-process teardown shared by the spawning transports.

use std::time::Duration;
use tokio::process::Child;

/// Grace window between the terminate signal and a forced kill.
pub(crate) const GRACEFUL_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Terminate an adapter child: polite signal, bounded wait, then force.
///
/// Both signals are idempotent; an already-dead child is not an error.
pub(crate) async fn terminate_child(mut child: Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(GRACEFUL_EXIT_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(?status, "adapter process exited");
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "wait for adapter process failed");
        }
        Err(_) => {
            tracing::warn!("adapter process ignored terminate signal, killing");
            let _ = child.kill().await;
        }
    }
}
