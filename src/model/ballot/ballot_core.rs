use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{BallotId, ContentRef},
    election::spec::{check_length, check_title, MAX_DESCRIPTION_LENGTH},
};

/// A ballot specification, as supplied by the election creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSpec {
    /// Ballot question or contest title.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// May voters select more than one choice?
    #[serde(default)]
    pub multiple_choice: bool,
    /// Reference to the full ballot detail in the content store.
    pub content_ref: ContentRef,
}

impl BallotSpec {
    pub fn validate(&self) -> Result<()> {
        check_title(&self.title)?;
        check_length("Description", &self.description, MAX_DESCRIPTION_LENGTH)
    }
}

/// A single ballot. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Unique within the election, starting at 1.
    pub id: BallotId,
    pub title: String,
    pub description: String,
    pub multiple_choice: bool,
    pub content_ref: ContentRef,
    pub created_at: DateTime<Utc>,
}

/// The ordered, append-only ballots of one election.
#[derive(Debug, Clone, Default)]
pub struct BallotCatalog {
    ballots: Vec<Ballot>,
}

impl BallotCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ballot with the next sequential ID.
    pub(crate) fn push(&mut self, spec: BallotSpec, now: DateTime<Utc>) -> Result<BallotId> {
        spec.validate()?;
        let id = BallotId::try_from(self.ballots.len() + 1)
            .map_err(|_| Error::invalid_input("Too many ballots"))?;
        self.ballots.push(Ballot {
            id,
            title: spec.title,
            description: spec.description,
            multiple_choice: spec.multiple_choice,
            content_ref: spec.content_ref,
            created_at: now,
        });
        Ok(id)
    }

    /// Get a ballot by ID, which must lie in `[1, len]`.
    pub fn get(&self, id: BallotId) -> Result<&Ballot> {
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| self.ballots.get(index))
            .ok_or_else(|| Error::not_found(format!("Ballot {id}")))
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ballot> {
        self.ballots.iter()
    }
}
