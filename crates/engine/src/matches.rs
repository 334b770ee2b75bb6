//! The module contains the `Match` entity and the deduplicating `MatchList`.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

/// A mutual match confirmed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: String,
    pub counterparty_id: String,
    pub matched_at: DateTime<Utc>,
}

impl Match {
    /// Match timestamp as RFC 3339 with millisecond precision.
    pub fn matched_at_iso(&self) -> String {
        self.matched_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Matches in arrival order, unique by id.
#[derive(Clone, Debug, Default)]
pub struct MatchList {
    entries: Vec<Match>,
    ids: HashSet<String>,
}

impl MatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` unless a match with the same id is already present.
    ///
    /// Returns `true` if the match was added.
    pub fn insert(&mut self, entry: Match) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Match> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Match {
        Match {
            id: id.to_string(),
            counterparty_id: "p-1".to_string(),
            matched_at: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
        }
    }

    #[test]
    fn duplicate_ids_are_discarded() {
        let mut list = MatchList::new();
        assert!(list.insert(sample("m-1")));
        assert!(!list.insert(sample("m-1")));
        assert!(list.insert(sample("m-2")));
        assert_eq!(list.len(), 2);
        assert!(list.contains("m-1"));
    }

    #[test]
    fn iso_timestamp_keeps_millis() {
        assert_eq!(sample("m").matched_at_iso(), "2023-11-14T22:13:20.123Z");
    }
}
