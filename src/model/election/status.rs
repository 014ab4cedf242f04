use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Under construction. The only state in which configuration and ballots may change.
    Draft,
    /// Configuration frozen, waiting to open.
    Scheduled,
    /// Accepting votes.
    Active,
    /// Voting finished.
    Completed,
    /// Abandoned before voting opened.
    Cancelled,
    /// Soft-deleted. Fully inert.
    Deleted,
}

impl ElectionStatus {
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Scheduled,
        Self::Active,
        Self::Completed,
        Self::Cancelled,
        Self::Deleted,
    ];

    /// Is `self -> next` one of the lifecycle's edges? Self-loops never are.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ElectionStatus::*;

        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Scheduled, Active)
                | (Active, Completed)
                | (Draft | Scheduled, Cancelled)
                | (Draft | Scheduled | Completed | Cancelled, Deleted)
        )
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Deleted => "DELETED",
        };
        write!(f, "{name}")
    }
}
