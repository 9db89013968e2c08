//! Output formatting for lumiere commands
//!
//! Every list renders either as a comfy-table or, with `--json`, as pretty JSON.

use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use lumiere_core::draft::RestoredDraft;
use lumiere_core::models::{language_name, ClimaxWithVotes, Movie, MoviePage};
use lumiere_core::validation::{word_count, MAX_WORDS, MIN_WORDS};
use std::collections::HashMap;

// ============================================================================
// Formatters
// ============================================================================

fn header(table: &mut Table, columns: &[&str], no_color: bool) {
    if no_color {
        table.set_header(columns.to_vec());
    } else {
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
}

/// Movies as a table; `counts` adds a climax column keyed by slug
pub fn format_movie_table(
    movies: &[Movie],
    counts: Option<&HashMap<String, usize>>,
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return serde_json::to_string_pretty(movies).unwrap_or_else(|_| "[]".to_string());
    }

    if movies.is_empty() {
        return "No movies found.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut columns = vec!["Slug", "Title", "Year", "Language"];
    if counts.is_some() {
        columns.push("Climaxes");
    }
    header(&mut table, &columns, no_color);

    for movie in movies {
        let slug = movie.slug();
        let year = movie
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut row = vec![
            slug.clone(),
            truncate(&movie.title, 40),
            year,
            language_name(&movie.original_language),
        ];
        if let Some(counts) = counts {
            row.push(counts.get(&slug).copied().unwrap_or(0).to_string());
        }
        table.add_row(Row::from(row));
    }

    table.to_string()
}

/// Footer under a movie listing: page position and language options
pub fn format_page_footer(page: &MoviePage, languages: &[String]) -> String {
    let mut footer = format!(
        "Page {} of {} ({} results)",
        page.page,
        page.browsable_pages().max(1),
        page.total_results
    );
    if !languages.is_empty() {
        let names: Vec<String> = languages
            .iter()
            .map(|code| format!("{} ({})", language_name(code), code))
            .collect();
        footer.push_str(&format!("\nLanguages: {}", names.join(", ")));
    }
    footer
}

pub fn format_climax_table(climaxes: &[ClimaxWithVotes], json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(climaxes).unwrap_or_else(|_| "[]".to_string());
    }

    if climaxes.is_empty() {
        return "No alternate endings yet.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(
        &mut table,
        &["ID", "Movie", "Author", "Votes", "Written", "Ending"],
        no_color,
    );

    for climax in climaxes {
        let votes = if climax.has_voted {
            format!("{} *", climax.vote_count)
        } else {
            climax.vote_count.to_string()
        };
        table.add_row(Row::from(vec![
            climax.id.to_string(),
            truncate(&climax.movie_title, 25),
            truncate(&climax.author_name, 20),
            votes,
            format_relative(climax.created_at, Utc::now()),
            truncate(&climax.content, 60),
        ]));
    }

    table.to_string()
}

pub fn format_movie_info(movie: &Movie, climax_total: usize) -> String {
    let mut lines = vec![];
    lines.push(format!("Title:      {}", movie.title));
    lines.push(format!("Slug:       {}", movie.slug()));
    lines.push(format!(
        "Released:   {}",
        if movie.release_date.is_empty() {
            "-"
        } else {
            movie.release_date.as_str()
        }
    ));
    lines.push(format!(
        "Language:   {}",
        language_name(&movie.original_language)
    ));
    if let Some(url) = movie.poster_url(Default::default()) {
        lines.push(format!("Poster:     {}", url));
    }
    lines.push(format!("Endings:    {}", climax_total));
    lines.join("\n")
}

/// Draft state with a word-count gauge
pub fn format_draft(draft: &RestoredDraft, last_saved: Option<DateTime<Utc>>) -> String {
    let words = word_count(&draft.content);
    let status = if words < MIN_WORDS {
        format!("{} more needed", MIN_WORDS - words)
    } else if words > MAX_WORDS {
        format!("{} over the limit", words - MAX_WORDS)
    } else {
        "ready to publish".to_string()
    };

    let mut lines = vec![];
    lines.push(format!(
        "Movie:      {}",
        draft
            .movie
            .as_ref()
            .map(|m| format!("{} ({})", m.title, m.slug()))
            .unwrap_or_else(|| "none selected".to_string())
    ));
    lines.push(format!(
        "Words:      {} / {}-{} ({})",
        words, MIN_WORDS, MAX_WORDS, status
    ));
    if let Some(at) = last_saved {
        lines.push(format!("Saved:      {}", at.format("%H:%M:%S")));
    }
    if !draft.content.is_empty() {
        lines.push(String::new());
        lines.push(draft.content.clone());
    }
    lines.join("\n")
}

// ============================================================================
// Utilities
// ============================================================================

/// Coarse age of a timestamp ("just now", "5m ago", "3d ago")
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3_600)
    } else if secs < 30 * 86_400 {
        format!("{}d ago", secs / 86_400)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    let single_line = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let char_count = single_line.chars().count();
    if char_count <= max {
        single_line
    } else {
        // Char-based so multi-byte titles never split mid-character
        single_line.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================
