use tokio::sync::watch;

/// Held by whoever decides the server should stop.
#[derive(Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Cloned into the accept loop and the scheduler thread.
#[derive(Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

impl ShutdownTx {
    pub fn trigger(&self) {
        let _ = self.0.send(true);
    }
}

impl ShutdownRx {
    /// Resolves once shutdown is signaled or the sender is gone.
    pub async fn wait(mut self) {
        while !*self.0.borrow() {
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }

    /// Non-blocking check, polled by the scheduler every base tick.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (all platforms).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("received ctrl-c");
    }
    Ok(())
}
