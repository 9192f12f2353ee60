use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Run-state flag shared by every user loop and auxiliary task.
///
/// Cloning is cheap; all clones observe the same flag. Once triggered it
/// stays triggered.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Clears the running flag. Later calls are no-ops.
    pub fn trigger(&self) {
        self.sender.send_if_modified(|stopped| {
            if *stopped {
                return false;
            }
            *stopped = true;
            true
        });
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the token has been triggered.
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        drop(receiver.wait_for(|stopped| *stopped).await);
    }

    /// Sleeps for `duration` unless shutdown comes first. Returns `true` when
    /// the full sleep elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_triggered();
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => !self.is_triggered(),
            () = self.triggered() => false,
        }
    }
}
