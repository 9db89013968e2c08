//! Climax feeds: joins of climaxes, vote tallies and author profiles
//!
//! Vote counts are always derived by counting vote rows; no denormalized
//! counter is read or maintained.

use crate::auth::Session;
use crate::error::Result;
use crate::models::{
    language_name, Climax, ClimaxId, ClimaxWithVotes, Movie, Profile, SortOrder, UserId, VoteRef,
    ANONYMOUS_AUTHOR,
};
use crate::remote::BaasClient;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Number of recent climaxes on the home feed
pub const RECENT_CLIMAX_LIMIT: usize = 6;

/// Number of featured movies on the home feed
pub const FEATURED_MOVIE_LIMIT: usize = 8;

/// Votes per climax id
pub fn vote_counts(votes: &[VoteRef]) -> HashMap<ClimaxId, u64> {
    let mut counts = HashMap::new();
    for vote in votes {
        *counts.entry(vote.climax_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Join rows into display cards, preserving the climax order given
pub fn assemble_climaxes(
    climaxes: Vec<Climax>,
    votes: &[VoteRef],
    profiles: &[Profile],
    user_votes: &[VoteRef],
) -> Vec<ClimaxWithVotes> {
    let counts = vote_counts(votes);
    let names: HashMap<&UserId, &str> = profiles
        .iter()
        .map(|p| (&p.id, p.display_name.as_str()))
        .collect();
    let voted: HashSet<&ClimaxId> = user_votes.iter().map(|v| &v.climax_id).collect();

    climaxes
        .into_iter()
        .map(|c| {
            let author_name = names
                .get(&c.author_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());
            let vote_count = counts.get(&c.id).copied().unwrap_or(0);
            let has_voted = voted.contains(&c.id);
            ClimaxWithVotes {
                id: c.id,
                movie_slug: c.movie_slug,
                movie_title: c.movie_title,
                content: c.content,
                author_id: c.author_id,
                author_name,
                created_at: c.created_at,
                vote_count,
                has_voted,
            }
        })
        .collect()
}

/// Most votes first (ties newest first), or newest first
pub fn sort_climaxes(climaxes: &mut [ClimaxWithVotes], order: SortOrder) {
    match order {
        SortOrder::Votes => climaxes.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        SortOrder::Latest => climaxes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// Climaxes written per movie slug
pub fn climax_counts(slugs: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for slug in slugs {
        *counts.entry(slug.clone()).or_insert(0) += 1;
    }
    counts
}

/// Keep only movies in `language`; an empty code keeps everything
pub fn filter_by_language(movies: &[Movie], language: &str) -> Vec<Movie> {
    if language.is_empty() {
        return movies.to_vec();
    }
    movies
        .iter()
        .filter(|m| m.original_language == language)
        .cloned()
        .collect()
}

/// Distinct language codes in `movies`, ordered by display name
pub fn available_languages(movies: &[Movie]) -> Vec<String> {
    let codes: BTreeSet<&str> = movies.iter().map(|m| m.original_language.as_str()).collect();
    let mut codes: Vec<String> = codes.into_iter().map(str::to_string).collect();
    codes.sort_by_key(|code| language_name(code));
    codes
}

/// Load a movie's climaxes with counts, author names and the viewer's votes
pub async fn load_movie_climaxes(
    baas: &BaasClient,
    movie_slug: &str,
    session: Option<&Session>,
) -> Result<Vec<ClimaxWithVotes>> {
    let climaxes = baas.climaxes_for_movie(movie_slug).await?;
    let climax_ids: Vec<ClimaxId> = climaxes.iter().map(|c| c.id.clone()).collect();
    let author_ids: Vec<UserId> = climaxes
        .iter()
        .map(|c| c.author_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let user_votes = async {
        match session {
            Some(s) => baas.user_votes(s, &climax_ids).await,
            None => Ok(Vec::new()),
        }
    };
    let (votes, profiles, user_votes) = tokio::join!(
        baas.votes_for(&climax_ids),
        baas.profiles_for(&author_ids),
        user_votes
    );

    debug!(movie_slug, climaxes = climaxes.len(), "Movie climaxes loaded");
    Ok(assemble_climaxes(climaxes, &votes?, &profiles?, &user_votes?))
}

/// The signed-in author's climaxes, newest first, with vote counts
pub async fn load_my_climaxes(
    baas: &BaasClient,
    session: &Session,
) -> Result<Vec<ClimaxWithVotes>> {
    let (climaxes, profile) = tokio::join!(
        baas.climaxes_by_author(&session.user_id),
        baas.profile(&session.user_id)
    );
    let climaxes = climaxes?;
    let profiles: Vec<Profile> = profile?.into_iter().collect();

    let climax_ids: Vec<ClimaxId> = climaxes.iter().map(|c| c.id.clone()).collect();
    let votes = baas.votes_for(&climax_ids).await?;

    Ok(assemble_climaxes(climaxes, &votes, &profiles, &[]))
}
