//! The module contains the `CandidateQueue` and the `Candidate` type.
//!
//! The queue is cyclic: advancing past the last candidate wraps back to the
//! first one, so the deck never shows an "exhausted" state while it holds
//! items. A refill replaces the whole deck and rewinds the cursor.

use std::fmt;

use rand::{Rng, seq::SliceRandom};

use crate::BackendError;

/// One swipeable profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Opaque identifier. Placeholder ids are used for fallback candidates.
    pub id: String,
    /// `true` when the candidate comes from the local seed deck. Swipes on
    /// these never reach the backend.
    pub is_fallback: bool,
    pub name: String,
    pub age: Option<u8>,
    pub media: Vec<String>,
    pub tags: Vec<String>,
}

impl Candidate {
    /// Candidate fetched from the backend.
    pub fn remote(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_fallback: false,
            name: name.into(),
            age: None,
            media: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: u8) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_media(mut self, media: Vec<String>) -> Self {
        self.media = media;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Where the current deck came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefillSource {
    Backend { count: usize },
    Fallback { count: usize, reason: FallbackReason },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    EmptyResult,
    Network(BackendError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResult => f.write_str("discovery returned no profiles"),
            Self::Network(err) => write!(f, "discovery failed: {err}"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CandidateQueue {
    items: Vec<Candidate>,
    cursor: usize,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the outcome of a discovery call.
    ///
    /// A non-empty result replaces the deck. An error or an empty result loads
    /// a freshly shuffled copy of `seed` instead, every item marked as
    /// fallback. Either way the cursor is rewound to the first item.
    pub fn apply_refill<R: Rng + ?Sized>(
        &mut self,
        fetched: Result<Vec<Candidate>, BackendError>,
        seed: &[Candidate],
        rng: &mut R,
    ) -> RefillSource {
        let reason = match fetched {
            Ok(candidates) if !candidates.is_empty() => {
                let count = candidates.len();
                self.replace(candidates.into_iter().map(|mut c| {
                    c.is_fallback = false;
                    c
                }));
                return RefillSource::Backend { count };
            }
            Ok(_) => FallbackReason::EmptyResult,
            Err(err) => FallbackReason::Network(err),
        };

        self.load_fallback(seed, rng);
        RefillSource::Fallback {
            count: self.items.len(),
            reason,
        }
    }

    /// Replace the deck with a shuffled copy of `seed`.
    pub fn load_fallback<R: Rng + ?Sized>(&mut self, seed: &[Candidate], rng: &mut R) {
        let mut deck = seed.to_vec();
        deck.shuffle(rng);
        self.replace(deck.into_iter().map(|mut c| {
            c.is_fallback = true;
            c
        }));
    }

    fn replace(&mut self, items: impl IntoIterator<Item = Candidate>) {
        self.items = items.into_iter().collect();
        self.cursor = 0;
    }

    /// Candidate under the cursor. `None` only before the first refill.
    pub fn current(&self) -> Option<&Candidate> {
        self.items.get(self.cursor)
    }

    /// Candidate right after the current one, wrapping around.
    pub fn peek_next(&self) -> Option<&Candidate> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get((self.cursor + 1) % self.items.len())
    }

    /// Move to the next candidate, wrapping to the first after the last.
    pub fn advance(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.items.len();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Candidate] {
        &self.items
    }
}
