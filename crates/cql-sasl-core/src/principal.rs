//! Resolved identity of an authenticated client.

use std::fmt;

/// The identity resolved by a successful authentication exchange.
///
/// Carries only the account name; authorization scope is attached by the
/// downstream role layer, never here. Two users are equal when their names
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthenticatedUser {
    name: String,
}

impl AuthenticatedUser {
    /// Create a user with the given account name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The account name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
