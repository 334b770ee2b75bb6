use crate::{Backend, Candidate, Clock, DiscoveryQuery, KeyValueStore, RefillSource};

use super::Session;

impl<B: Backend, S: KeyValueStore, C: Clock> Session<B, S, C> {
    /// Reload the deck from discovery.
    ///
    /// The network call runs without holding the deck lock, so swipes keep
    /// working against the old deck meanwhile. Errors and empty results load
    /// the fallback deck; after this returns the deck is never empty unless
    /// the fallback seed itself is.
    pub async fn refill(&self, query: &DiscoveryQuery) -> RefillSource {
        let fetched = self.inner.backend.discover(query).await;

        let mut rng = self.inner.rng.lock().await;
        let mut queue = self.inner.queue.lock().await;
        let source = queue.apply_refill(fetched, &self.inner.fallback_seed, &mut *rng);

        match &source {
            RefillSource::Backend { count } => {
                tracing::info!(count, "deck refilled from discovery");
            }
            RefillSource::Fallback { count, reason } => {
                tracing::warn!(count, %reason, "discovery unavailable, using fallback deck");
            }
        }
        source
    }

    /// Candidate currently on top of the deck.
    pub async fn current_candidate(&self) -> Option<Candidate> {
        self.inner.queue.lock().await.current().cloned()
    }

    /// Candidate shown behind the current one.
    pub async fn next_candidate(&self) -> Option<Candidate> {
        self.inner.queue.lock().await.peek_next().cloned()
    }

    /// Move the deck forward by one, wrapping around.
    pub async fn advance(&self) {
        self.inner.queue.lock().await.advance();
    }

    /// Cursor position and deck length.
    pub async fn deck_position(&self) -> (usize, usize) {
        let queue = self.inner.queue.lock().await;
        (queue.cursor(), queue.len())
    }
}
