//! Shutdown signal handling
//!
//! Ctrl-C (SIGINT) and, on unix, SIGTERM from `docker stop` both end the
//! accept loop so the store is closed cleanly.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Listener for the signals that stop the server
///
/// Handlers are installed by `install`, so a signal delivered before the
/// first `recv` is not lost.
pub struct Shutdown {
    #[cfg(unix)]
    terminate: Signal,
}

impl Shutdown {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next shutdown signal, returning its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    /// Wait for the next shutdown signal, returning its name
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_triggers_shutdown() {
        let mut shutdown = Shutdown::install().unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let received = tokio::time::timeout(Duration::from_secs(5), shutdown.recv())
            .await
            .unwrap();
        assert_eq!(received, "SIGTERM");
    }
}
