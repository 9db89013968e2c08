//! Data models for lumiere

pub mod climax;
pub mod movie;
pub mod profile;

pub use climax::{Climax, ClimaxId, ClimaxWithVotes, NewClimax, SortOrder, ANONYMOUS_AUTHOR};
pub use movie::{
    create_movie_slug, extract_movie_id, image_url, language_name, Movie, MovieId, MoviePage,
    PosterSize, MAX_BROWSE_PAGES,
};
pub use profile::{Profile, UserId, Vote, VoteRef};
