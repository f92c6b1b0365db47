//! Admin gate
//!
//! Static allow-list of administrator identities, fixed at startup.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Opaque requester identity supplied by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Set of administrator identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminSet(HashSet<UserId>);

impl AdminSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list of integer identities
    ///
    /// Blank entries are ignored, so `""` and `"1,,2,"` are both accepted.
    ///
    /// # Errors
    /// `ConfigError::InvalidAdminId` for the first entry that is not an integer
    pub fn parse_list(list: &str, source_name: &str) -> Result<Self, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry.parse::<UserId>().map_err(|_| ConfigError::InvalidAdminId {
                    value: entry.to_string(),
                    source_name: source_name.to_string(),
                })
            })
            .collect::<Result<HashSet<_>, _>>()
            .map(Self)
    }

    /// Membership test
    #[inline]
    #[must_use]
    pub fn contains(&self, id: UserId) -> bool {
        self.0.contains(&id)
    }

    /// Number of administrators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nobody is an administrator
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<UserId> for AdminSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Read-only guard for privileged operations
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    admins: AdminSet,
}

impl AdminGate {
    /// Create gate over a fixed set
    #[inline]
    #[must_use]
    pub fn new(admins: AdminSet) -> Self {
        Self { admins }
    }

    /// Check whether `id` is an administrator
    #[inline]
    #[must_use]
    pub fn is_admin(&self, id: UserId) -> bool {
        self.admins.contains(id)
    }
}
