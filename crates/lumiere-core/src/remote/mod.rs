//! Remote data clients
//!
//! Direct passthroughs: no caching, batching, retry or rate limiting happens here.
//! Callers show an empty or error state when a call fails.

pub mod baas;
pub mod metadata;

pub use baas::BaasClient;
pub use metadata::MetadataClient;

use crate::auth::Session;
use crate::error::Result;
use crate::models::{ClimaxId, Movie, MovieId, MoviePage};
use async_trait::async_trait;

/// Read access to movie metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage>;

    async fn popular_movies(&self, page: u32) -> Result<MoviePage>;

    /// `Ok(None)` when the movie does not exist or the lookup was refused
    async fn movie_by_id(&self, id: MovieId) -> Result<Option<Movie>>;

    async fn discover_movies(&self, page: u32, language: Option<&str>) -> Result<MoviePage>;
}

/// Remote vote rows, keyed by (climax, session user)
#[async_trait]
pub trait VoteBackend: Send + Sync {
    async fn insert_vote(&self, session: &Session, climax_id: &ClimaxId) -> Result<()>;

    async fn delete_vote(&self, session: &Session, climax_id: &ClimaxId) -> Result<()>;
}
