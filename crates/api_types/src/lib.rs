use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub mod discovery {
    use super::*;

    /// Filter parameters sent with a discovery request.
    ///
    /// Every field is optional; the backend applies the user's saved
    /// preferences for anything left unset.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DiscoveryRequest {
        pub min_age: Option<u8>,
        pub max_age: Option<u8>,
        pub max_distance_km: Option<u32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub tags: Vec<String>,
        pub limit: Option<u32>,
    }

    /// One profile record as returned by discovery.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProfileRecord {
        pub id: String,
        pub name: String,
        pub age: Option<u8>,
        #[serde(default)]
        pub photos: Vec<String>,
        #[serde(default)]
        pub tags: Vec<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DiscoveryResponse {
        #[serde(default)]
        pub profiles: Vec<ProfileRecord>,
    }
}

pub mod swipe {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SwipeKind {
        Like,
        Pass,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SwipeRequest {
        pub candidate_id: String,
        pub action: SwipeKind,
        /// Client-generated key; the server may use it to drop retried
        /// duplicates.
        pub idempotency_key: Uuid,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SwipeResponse {
        pub accepted: bool,
        #[serde(default)]
        pub is_match: bool,
        pub match_id: Option<String>,
    }
}

pub mod wallet {
    use super::*;

    /// Server-side view of the user's virtual currency.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletBalance {
        pub balance: u64,
        pub updated_at: Option<DateTime<Utc>>,
    }
}
