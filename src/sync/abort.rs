//! Deploy abort signal.
//!
//! The first Ctrl+C aborts a pending invalidation wait; the second exits.
//! Before a signal is registered, Ctrl+C exits right away since nothing
//! needs to wind down.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

static ABORT: OnceLock<AbortHandle> = OnceLock::new();
static ABORT_REQUESTED: AtomicBool = AtomicBool::new(false);

pub struct AbortHandle(watch::Sender<bool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.send_replace(true);
    }
}

/// Cloneable receiver side; resolves once an abort is requested.
#[derive(Debug, Clone)]
pub struct AbortSignal(watch::Receiver<bool>);

impl AbortSignal {
    pub fn channel() -> (AbortHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (AbortHandle(tx), Self(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    /// Wait for an abort. Pending forever if the handle is dropped.
    pub async fn aborted(&mut self) {
        if self.0.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Install the Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| match ABORT.get() {
        Some(handle) if !ABORT_REQUESTED.swap(true, Ordering::SeqCst) => {
            crate::log!("deploy"; "aborting, press Ctrl+C again to exit");
            handle.abort();
        }
        _ => std::process::exit(130),
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Route Ctrl+C to the returned signal from now on.
pub fn register_abort() -> AbortSignal {
    let (handle, signal) = AbortSignal::channel();
    match ABORT.set(handle) {
        Ok(()) => signal,
        // already registered in this process: hand out another receiver
        Err(_) => ABORT.get().map_or_else(AbortSignal::never, |h| AbortSignal(h.0.subscribe())),
    }
}
