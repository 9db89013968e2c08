//! Climax (alternate ending) models

use super::movie::Movie;
use super::profile::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author name shown when no profile row exists
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Newtype for climax row ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClimaxId(String);

impl ClimaxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClimaxId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ClimaxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the `climaxes` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climax {
    pub id: ClimaxId,
    pub movie_slug: String,
    pub movie_title: String,
    pub content: String,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; id and timestamp are assigned remotely
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewClimax {
    pub movie_slug: String,
    pub movie_title: String,
    pub content: String,
    pub author_id: UserId,
}

impl NewClimax {
    /// Submission for `movie`; surrounding whitespace is stripped from `content`
    pub fn new(movie: &Movie, content: &str, author_id: UserId) -> Self {
        Self {
            movie_slug: movie.slug(),
            movie_title: movie.title.clone(),
            content: content.trim().to_string(),
            author_id,
        }
    }
}

/// Climax joined with its vote tally, author name and the viewer's vote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimaxWithVotes {
    pub id: ClimaxId,
    pub movie_slug: String,
    pub movie_title: String,
    pub content: String,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: u64,
    pub has_voted: bool,
}

/// Ordering for a movie's climax list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Votes,
    Latest,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "votes" => Ok(SortOrder::Votes),
            "latest" => Ok(SortOrder::Latest),
            other => Err(format!("unknown sort order '{}' (expected votes|latest)", other)),
        }
    }
}
