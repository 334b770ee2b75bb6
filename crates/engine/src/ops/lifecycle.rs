use crate::{Backend, Clock, EngineError, KeyValueStore};

use super::Session;

impl<B: Backend, S: KeyValueStore, C: Clock> Session<B, S, C> {
    /// The app is going to the background or terminating.
    ///
    /// Writes the quota state now instead of waiting for the debounce
    /// window. In-flight swipe submissions keep running.
    pub async fn suspend(&self) -> Result<(), EngineError> {
        tracing::info!("app suspending, flushing quota state");
        self.inner.persister.flush_now().await
    }

    /// Wait for every in-flight swipe submission to finish.
    pub async fn settle(&self) {
        let mut in_flight = std::mem::take(&mut *self.inner.in_flight.lock().await);
        while let Some(finished) = in_flight.join_next().await {
            if let Err(err) = finished {
                tracing::warn!("swipe submission task failed: {err}");
            }
        }
    }

    /// Tear the session down on logout.
    ///
    /// Stops the reset watcher, lets pending submissions finish, then writes
    /// the quota state and stops the persister.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        if let Some(watcher) = self.inner.reset_watcher.lock().await.take() {
            watcher.abort();
        }
        self.settle().await;
        self.inner.persister.shutdown().await
    }
}
