//! Background expiry sweeper.
//!
//! Runs [`MessageStore::sweep`] on a fixed interval, independent of requests.
//! Each pass finishes before the next wait starts, so passes never overlap.

use std::time::Duration;

use driftbox_core::{MessageStore, env::Environment};
use tokio::{sync::oneshot, task::JoinHandle};

use crate::error::ServerError;

/// Handle to a running sweeper task.
///
/// Dropping the handle without calling [`Sweeper::shutdown`] also stops the
/// task: the closed shutdown channel ends the loop.
pub struct Sweeper {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<u64>,
}

impl Sweeper {
    /// Spawn a sweeper on the current Tokio runtime.
    pub fn spawn<E: Environment>(store: MessageStore<E>, env: E, interval: Duration) -> Self {
        let (shutdown, mut stop) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut passes = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    () = env.sleep(interval) => {
                        let removed = store.sweep();
                        passes += 1;

                        if removed > 0 {
                            tracing::debug!(removed, remaining = store.len(), "swept expired messages");
                        }
                    },
                }
            }

            tracing::debug!(passes, "sweeper stopped");
            passes
        });

        Self { shutdown, task }
    }

    /// Stop the sweeper and wait for it to exit.
    ///
    /// Returns the number of sweep passes that ran.
    pub async fn shutdown(self) -> Result<u64, ServerError> {
        // Err only means the task already exited
        let _ = self.shutdown.send(());

        self.task.await.map_err(|e| ServerError::Internal(format!("sweeper task failed: {e}")))
    }
}
