//! User profile and vote rows

use super::climax::ClimaxId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for auth user ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the `profiles` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub display_name: String,
}

/// A row of the `votes` table; existence is the whole payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    pub climax_id: ClimaxId,
    pub user_id: UserId,
}

/// Projection used when only the voted climax matters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct VoteRef {
    pub climax_id: ClimaxId,
}
