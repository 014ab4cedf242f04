use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    User = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::User => "user",
                Self::Admin => "admin",
            }
        )
    }
}

/// A role that a request guard can demand of an authenticated caller.
pub trait Role {
    fn permits(rights: Rights) -> bool;
}

/// Any authenticated account.
pub struct Any;

impl Role for Any {
    fn permits(_rights: Rights) -> bool {
        true
    }
}

/// Administrators only. Administrators act for the election registry.
pub struct Admin;

impl Role for Admin {
    fn permits(rights: Rights) -> bool {
        rights == Rights::Admin
    }
}
