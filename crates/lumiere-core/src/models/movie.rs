//! Movie metadata models (read-only, sourced from the metadata API)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Base URL for poster images
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// The metadata API refuses to paginate past this page
pub const MAX_BROWSE_PAGES: u32 = 500;

/// Metadata API movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl MovieId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
}

impl Movie {
    pub fn slug(&self) -> String {
        create_movie_slug(self.id, &self.title)
    }

    /// Release year, if the date is present and well formed
    pub fn release_year(&self) -> Option<i32> {
        chrono::NaiveDate::parse_from_str(&self.release_date, "%Y-%m-%d")
            .ok()
            .map(|d| chrono::Datelike::year(&d))
    }

    pub fn poster_url(&self, size: PosterSize) -> Option<String> {
        image_url(self.poster_path.as_deref(), size)
    }
}

/// One page of movie results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
}

impl MoviePage {
    /// The page returned for a blank search query
    pub fn empty() -> Self {
        Self {
            page: 1,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }

    /// Total pages as shown to browsers, capped at [`MAX_BROWSE_PAGES`]
    pub fn browsable_pages(&self) -> u32 {
        self.total_pages.min(MAX_BROWSE_PAGES)
    }
}

// ============================================================================
// Slugs
// ============================================================================

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Build `"{id}-{normalized-title}"`
pub fn create_movie_slug(id: MovieId, title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let dashed = WHITESPACE_RUNS.replace_all(&stripped, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    format!("{}-{}", id, collapsed.trim())
}

/// Leading numeric id of a slug; `MovieId(0)` when there is none
pub fn extract_movie_id(slug: &str) -> MovieId {
    let head = slug.split('-').next().unwrap_or_default().trim_start();
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();
    MovieId(digits.parse().unwrap_or(0))
}

// ============================================================================
// Images
// ============================================================================

/// Poster widths served by the image CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PosterSize {
    W92,
    W154,
    W185,
    #[default]
    W342,
    W500,
    W780,
}

impl PosterSize {
    pub fn as_str(self) -> &'static str {
        match self {
            PosterSize::W92 => "w92",
            PosterSize::W154 => "w154",
            PosterSize::W185 => "w185",
            PosterSize::W342 => "w342",
            PosterSize::W500 => "w500",
            PosterSize::W780 => "w780",
        }
    }
}

pub fn image_url(path: Option<&str>, size: PosterSize) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    Some(format!("{}/{}{}", IMAGE_BASE_URL, size.as_str(), path))
}

// ============================================================================
// Languages
// ============================================================================

static LANGUAGE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("en", "English"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("it", "Italian"),
        ("pt", "Portuguese"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("zh", "Chinese"),
        ("hi", "Hindi"),
        ("ar", "Arabic"),
        ("ru", "Russian"),
        ("nl", "Dutch"),
        ("sv", "Swedish"),
        ("da", "Danish"),
        ("no", "Norwegian"),
        ("fi", "Finnish"),
        ("pl", "Polish"),
        ("tr", "Turkish"),
        ("th", "Thai"),
        ("id", "Indonesian"),
        ("ms", "Malay"),
        ("vi", "Vietnamese"),
        ("tl", "Filipino"),
        ("cs", "Czech"),
        ("hu", "Hungarian"),
        ("ro", "Romanian"),
        ("el", "Greek"),
        ("he", "Hebrew"),
        ("uk", "Ukrainian"),
        ("bn", "Bengali"),
        ("ta", "Tamil"),
        ("te", "Telugu"),
        ("ml", "Malayalam"),
        ("mr", "Marathi"),
        ("pa", "Punjabi"),
        ("gu", "Gujarati"),
        ("kn", "Kannada"),
        ("ur", "Urdu"),
        ("fa", "Persian"),
    ])
});

/// Display name for an ISO 639-1 code, or the uppercased code when unknown
pub fn language_name(code: &str) -> String {
    LANGUAGE_NAMES
        .get(code)
        .map(|name| name.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}
