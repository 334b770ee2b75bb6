//! Built-in seed deck used when discovery fails or comes back empty.

use crate::Candidate;

const SEED: &[(&str, &str, u8, &[&str])] = &[
    ("fallback-ada", "Ada", 29, &["hiking", "coffee"]),
    ("fallback-bruno", "Bruno", 33, &["cycling", "jazz"]),
    ("fallback-chiara", "Chiara", 27, &["books", "travel"]),
    ("fallback-dario", "Dario", 31, &["cooking", "football"]),
    ("fallback-elena", "Elena", 26, &["yoga", "photography"]),
    ("fallback-filippo", "Filippo", 35, &["sailing", "wine"]),
    ("fallback-giulia", "Giulia", 30, &["running", "cinema"]),
    ("fallback-hugo", "Hugo", 28, &["climbing", "board games"]),
];

/// The default fallback deck, in a fixed order. Every candidate is marked
/// `is_fallback`.
pub fn default_seed() -> Vec<Candidate> {
    SEED.iter()
        .map(|(id, name, age, tags)| Candidate {
            id: (*id).to_string(),
            is_fallback: true,
            name: (*name).to_string(),
            age: Some(*age),
            media: Vec::new(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        })
        .collect()
}
