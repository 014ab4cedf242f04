use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::model::auth::Rights;

/// A principal is any identity that can make requests: a creator, a voter's
/// bound identity, an administrator or a relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The authenticated origin of a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub principal: Principal,
    pub rights: Rights,
}

impl Caller {
    pub fn new(principal: Principal, rights: Rights) -> Self {
        Self { principal, rights }
    }

    /// An ordinary caller with no administrative rights.
    pub fn user(principal: impl Into<Principal>) -> Self {
        Self::new(principal.into(), Rights::User)
    }

    /// A caller acting for the registry itself.
    pub fn admin(principal: impl Into<Principal>) -> Self {
        Self::new(principal.into(), Rights::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.rights == Rights::Admin
    }
}
