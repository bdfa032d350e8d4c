// Cooperative shutdown token
//
// The original controller had no stop mechanism besides killing the process;
// the loops here check a shared token at every iteration boundary and sleep
// point instead, so the process can drain cleanly on ctrl-c. Behavior between
// checkpoints is unchanged.

use std::time::Duration;
use tokio::sync::watch;

/// Owning side of the token. Dropping the handle also releases the loops.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Receiving side, cloned into every background loop.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/token pair.
pub fn channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

impl ShutdownHandle {
    /// Signal every subscribed loop to stop at its next checkpoint.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `duration`, waking early on shutdown. Returns true when the
    /// caller should stop.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_triggered(),
            changed = self.rx.changed() => {
                // A closed channel means the handle is gone; stop as well.
                changed.is_err() || *self.rx.borrow()
            }
        }
    }

    /// Wait until shutdown is triggered (or the handle is dropped).
    pub async fn wait(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
