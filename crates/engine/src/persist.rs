//! Debounced write-back of the quota state.
//!
//! Every ledger mutation hands the new snapshot to a background task. The task
//! keeps only the latest snapshot and writes it once no further mutation has
//! arrived for the debounce window. [`Persister::flush_now`] bypasses the
//! window for the app-suspend path.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Instant},
};

use crate::{EngineError, KeyValueStore, QuotaState};

/// Default coalescing window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

enum Command {
    Schedule(QuotaState),
    Flush(oneshot::Sender<Result<(), EngineError>>),
    Shutdown(oneshot::Sender<Result<(), EngineError>>),
}

/// Handle to the persister task.
#[derive(Debug)]
pub struct Persister {
    tx: mpsc::UnboundedSender<Command>,
}

impl Persister {
    /// Spawn the persister task on the current tokio runtime.
    pub fn spawn<S: KeyValueStore>(
        store: Arc<S>,
        key: impl Into<String>,
        window: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, key.into(), window, rx));
        Self { tx }
    }

    /// Queue `state` for a debounced write. Re-arms the window.
    pub fn schedule(&self, state: QuotaState) {
        if self.tx.send(Command::Schedule(state)).is_err() {
            tracing::warn!("quota persister stopped, dropping snapshot");
        }
    }

    /// Write the pending snapshot immediately.
    ///
    /// Resolves once the store has acknowledged the write. On failure the
    /// snapshot stays pending and is retried on the next cycle.
    pub async fn flush_now(&self) -> Result<(), EngineError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack))
            .map_err(|_| EngineError::Closed)?;
        done.await.map_err(|_| EngineError::Closed)?
    }

    /// Flush and stop the task. Later calls return [`EngineError::Closed`].
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(ack))
            .map_err(|_| EngineError::Closed)?;
        done.await.map_err(|_| EngineError::Closed)?
    }
}

async fn run<S: KeyValueStore>(
    store: Arc<S>,
    key: String,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: Option<QuotaState> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let wake_at = deadline;
        let timer = async move {
            match wake_at {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Schedule(state)) => {
                    pending = Some(state);
                    deadline = Some(Instant::now() + window);
                }
                Some(Command::Flush(ack)) => {
                    let result = write_pending(store.as_ref(), &key, &mut pending).await;
                    deadline = pending.is_some().then(|| Instant::now() + window);
                    let _ = ack.send(result);
                }
                Some(Command::Shutdown(ack)) => {
                    let result = write_pending(store.as_ref(), &key, &mut pending).await;
                    let _ = ack.send(result);
                    break;
                }
                None => {
                    if let Err(err) = write_pending(store.as_ref(), &key, &mut pending).await {
                        tracing::warn!("final quota write failed: {err}");
                    }
                    break;
                }
            },
            () = timer => {
                match write_pending(store.as_ref(), &key, &mut pending).await {
                    Ok(()) => deadline = None,
                    Err(err) => {
                        tracing::warn!("quota write failed, retrying in {window:?}: {err}");
                        deadline = Some(Instant::now() + window);
                    }
                }
            }
        }
    }
}

/// Write the pending snapshot, putting it back if the store rejects it.
async fn write_pending<S: KeyValueStore>(
    store: &S,
    key: &str,
    pending: &mut Option<QuotaState>,
) -> Result<(), EngineError> {
    let Some(state) = pending.take() else {
        return Ok(());
    };

    let payload = serde_json::to_string(&state)?;
    match store.set(key, payload).await {
        Ok(()) => {
            tracing::debug!(
                used = state.free_actions_used_today,
                balance = state.currency_balance,
                "quota state persisted"
            );
            Ok(())
        }
        Err(err) => {
            *pending = Some(state);
            Err(err.into())
        }
    }
}
