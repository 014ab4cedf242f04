use std::fmt::Display;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::{ContentRef, Principal, VoterId};

/// An opaque pre-shared authentication token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHash(String);

impl KeyHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Hash a shared secret into a token: lowercase hex SHA-256.
    pub fn derive(secret: impl AsRef<[u8]>) -> Self {
        Self(HEXLOWER.encode(&Sha256::digest(secret.as_ref())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub voter_id: VoterId,
    /// The principal allowed to vote directly as this voter.
    pub identity: Principal,
    pub weight: u32,
    pub has_voted: bool,
    pub registered_at: DateTime<Utc>,
}

/// A single voter registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoter {
    pub identity: Principal,
    pub voter_id: VoterId,
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub key_hash: KeyHash,
}

fn default_weight() -> u32 {
    1
}

/// A batch of voter registrations, given as parallel arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterBatch {
    pub identities: Vec<Principal>,
    pub voter_ids: Vec<VoterId>,
    pub weights: Vec<u32>,
    /// Reference to the full voter list in the content store.
    pub list_ref: ContentRef,
}

impl VoterBatch {
    pub fn len(&self) -> usize {
        self.voter_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voter_ids.is_empty()
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl NewVoter {
        pub fn example(name: &str) -> Self {
            Self {
                identity: Principal::new(name),
                voter_id: format!("voter-{name}"),
                weight: 1,
                key_hash: KeyHash::example(name),
            }
        }
    }

    impl KeyHash {
        pub fn example(name: &str) -> Self {
            Self::derive(format!("secret-of-{name}"))
        }
    }

    impl VoterBatch {
        pub fn example(names: &[&str]) -> Self {
            Self {
                identities: names.iter().map(|name| Principal::new(*name)).collect(),
                voter_ids: names.iter().map(|name| format!("voter-{name}")).collect(),
                weights: vec![1; names.len()],
                list_ref: "bafy-voter-list".to_string(),
            }
        }
    }
}
