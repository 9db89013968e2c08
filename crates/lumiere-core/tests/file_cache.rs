//! TimedCache, drafts and sessions over the on-disk store

use chrono::{Duration, TimeZone, Utc};
use lumiere_core::cache::CACHE_TTL_MS;
use lumiere_core::clock::ManualClock;
use lumiere_core::draft::{load_draft, save_draft, Draft, DRAFT_KEY};
use lumiere_core::models::{Movie, MovieId, MoviePage};
use lumiere_core::{FileStore, KeyValueStore, Session, TimedCache};
use std::sync::Arc;
use tempfile::TempDir;

fn popular_page() -> MoviePage {
    MoviePage {
        page: 1,
        results: vec![Movie {
            id: MovieId(603),
            title: "The Matrix".to_string(),
            original_language: "en".to_string(),
            poster_path: Some("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg".to_string()),
            release_date: "1999-03-31".to_string(),
        }],
        total_pages: 1,
        total_results: 1,
    }
}

#[test]
fn cached_page_survives_reopen_until_ttl() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());

    {
        let store = FileStore::open(dir.path()).unwrap();
        let cache = TimedCache::with_clock(store, Arc::new(clock.clone()));
        cache.set("popular_movies_1", &popular_page()).unwrap();
    }

    // Fresh process, same directory
    let store = FileStore::open(dir.path()).unwrap();
    let cache = TimedCache::with_clock(store, Arc::new(clock.clone()));

    clock.advance(Duration::milliseconds(CACHE_TTL_MS));
    let hit: Option<MoviePage> = cache.get("popular_movies_1");
    assert_eq!(hit, Some(popular_page()));

    clock.advance(Duration::milliseconds(1));
    assert!(cache.get::<MoviePage>("popular_movies_1").is_none());
    assert!(cache.store().get("popular_movies_1").unwrap().is_none());
}

#[test]
fn corrupt_file_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.set("popular_movies_2", "{\"timestamp\": 1, \"data\"").unwrap();

    let cache = TimedCache::new(store);
    assert!(cache.get::<MoviePage>("popular_movies_2").is_none());

    cache.set("popular_movies_2", &popular_page()).unwrap();
    assert!(cache.get::<MoviePage>("popular_movies_2").is_some());
}

#[test]
fn clear_keeps_unrelated_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

    let store = FileStore::open(dir.path()).unwrap();
    let cache = TimedCache::new(store);
    cache.set("popular_movies_1", &popular_page()).unwrap();
    cache.clear().unwrap();

    assert!(cache.get::<MoviePage>("popular_movies_1").is_none());
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn draft_and_session_share_the_store() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let now = Utc::now();

    save_draft(&store, &Draft::new("An ending in progress", Some(MovieId(603)))).unwrap();
    Session {
        user_id: "user-1".into(),
        email: "tank@zion.org".to_string(),
        access_token: "jwt".to_string(),
        expires_at: Some(now + Duration::hours(1)),
    }
    .save(&store)
    .unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    let draft = load_draft(&reopened).unwrap();
    assert_eq!(draft.movie_id, Some(MovieId(603)));
    assert!(reopened.get(DRAFT_KEY).unwrap().unwrap().contains("\"movieId\":603"));

    let session = Session::load(&reopened, now).unwrap();
    assert_eq!(session.email, "tank@zion.org");
    assert!(Session::load(&reopened, now + Duration::hours(2)).is_none());
}
