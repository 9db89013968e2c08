//! Debounced autosave of an in-progress submission
//!
//! A single draft slot lives under [`DRAFT_KEY`] as `{"content": .., "movieId": ..}`.
//! Changes are persisted 1000 ms after the last edit; the snapshot is deleted
//! once the ending is published or the draft is cleared.

use crate::clock::{Clock, SystemClock};
use crate::debounce::{Debouncer, AUTOSAVE_DEBOUNCE};
use crate::error::{CoreError, Result};
use crate::models::{Movie, MovieId};
use crate::remote::MetadataSource;
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Storage key of the draft slot
pub const DRAFT_KEY: &str = "antiClimax_draft";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub content: String,
    #[serde(rename = "movieId", default, skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<MovieId>,
}

impl Draft {
    pub fn new(content: impl Into<String>, movie_id: Option<MovieId>) -> Self {
        Self {
            content: content.into(),
            movie_id,
        }
    }

    /// Nothing worth saving
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.movie_id.is_none()
    }
}

/// Outcome of autosave attempts so far, published on a watch channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// Completed saves
    pub saved: u64,
    /// Error of the most recent attempt, cleared by the next successful save
    pub last_error: Option<String>,
}

/// Editing state rebuilt from a stored draft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredDraft {
    pub content: String,
    pub movie: Option<Movie>,
}

/// Read the draft slot; a corrupt snapshot counts as no draft
pub fn load_draft(store: &impl KeyValueStore) -> Option<Draft> {
    let raw = match store.get(DRAFT_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "Failed to read draft");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(draft) => Some(draft),
        Err(e) => {
            warn!(error = %e, "Error loading draft");
            None
        }
    }
}

pub fn save_draft(store: &impl KeyValueStore, draft: &Draft) -> Result<()> {
    let json = serde_json::to_string(draft).map_err(CoreError::Serialize)?;
    store.set(DRAFT_KEY, &json)
}

pub fn clear_draft(store: &impl KeyValueStore) -> Result<()> {
    store.remove(DRAFT_KEY)
}

/// Autosave driver for one editing session
pub struct DraftAutosave<S> {
    store: Arc<S>,
    debouncer: Debouncer<Draft>,
    last_saved: Arc<Mutex<Option<DateTime<Utc>>>>,
    saves: watch::Receiver<SaveStatus>,
    writer: JoinHandle<()>,
}

impl<S: KeyValueStore + 'static> DraftAutosave<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, AUTOSAVE_DEBOUNCE, Arc::new(SystemClock))
    }

    pub fn with_options(store: Arc<S>, delay: Duration, clock: Arc<dyn Clock>) -> Self {
        let (debouncer, mut settled) = Debouncer::<Draft>::new(delay);
        let last_saved = Arc::new(Mutex::new(None));
        let (saves_tx, saves_rx) = watch::channel(SaveStatus::default());

        let writer = {
            let store = Arc::clone(&store);
            let last_saved = Arc::clone(&last_saved);
            tokio::spawn(async move {
                while let Some(draft) = settled.recv().await {
                    if draft.is_blank() {
                        continue;
                    }
                    match save_draft(store.as_ref(), &draft) {
                        Ok(()) => {
                            let at = clock.now();
                            *last_saved.lock() = Some(at);
                            saves_tx.send_modify(|status| {
                                status.saved += 1;
                                status.last_error = None;
                            });
                            let words = draft.content.split_whitespace().count();
                            debug!(words, "Draft saved");
                        }
                        Err(e) => {
                            warn!(error = %e, "Draft autosave failed");
                            saves_tx.send_modify(|status| status.last_error = Some(e.to_string()));
                        }
                    }
                }
            })
        };

        Self {
            store,
            debouncer,
            last_saved,
            saves: saves_rx,
            writer,
        }
    }

    /// Record an edit; persisted once edits stop for the debounce period
    pub fn update(&self, draft: Draft) {
        self.debouncer.push(draft);
    }

    /// When the draft was last persisted by this autosave
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        *self.last_saved.lock()
    }

    /// Watch channel notified after every save attempt, failed or not
    pub fn saves(&self) -> watch::Receiver<SaveStatus> {
        self.saves.clone()
    }

    /// Delete the stored snapshot (after publishing, or on explicit clear)
    pub fn clear(&self) -> Result<()> {
        clear_draft(self.store.as_ref())?;
        info!("Draft cleared");
        Ok(())
    }

    /// Rebuild editing state from the stored draft.
    ///
    /// An explicit movie reference (e.g. passed on the command line) wins over
    /// the draft's movie. Movies are re-resolved through `metadata`; a failed
    /// lookup leaves the movie unset.
    pub async fn restore<M: MetadataSource>(
        &self,
        explicit_movie: Option<MovieId>,
        metadata: &M,
    ) -> RestoredDraft {
        let draft = load_draft(self.store.as_ref()).unwrap_or_default();
        let movie_id = explicit_movie.or(draft.movie_id);

        let movie = match movie_id {
            Some(id) => match metadata.movie_by_id(id).await {
                Ok(movie) => movie,
                Err(e) => {
                    warn!(%id, error = %e, "Failed to resolve draft movie");
                    None
                }
            },
            None => None,
        };

        RestoredDraft {
            content: draft.content,
            movie,
        }
    }
}

impl<S> Drop for DraftAutosave<S> {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::MoviePage;
    use crate::storage::MemoryStore;
    use tokio::time::advance;

    struct FixedMetadata;

    #[async_trait::async_trait]
    impl MetadataSource for FixedMetadata {
        async fn search_movies(&self, _query: &str, _page: u32) -> Result<MoviePage> {
            Ok(MoviePage::empty())
        }

        async fn popular_movies(&self, _page: u32) -> Result<MoviePage> {
            Ok(MoviePage::empty())
        }

        async fn movie_by_id(&self, id: MovieId) -> Result<Option<Movie>> {
            Ok(Some(Movie {
                id,
                title: format!("Movie {}", id),
                original_language: "en".to_string(),
                poster_path: None,
                release_date: String::new(),
            }))
        }

        async fn discover_movies(&self, _page: u32, _language: Option<&str>) -> Result<MoviePage> {
            Ok(MoviePage::empty())
        }
    }

    #[test]
    fn test_draft_wire_format() {
        let json = serde_json::to_string(&Draft::new("hi", Some(MovieId(603)))).unwrap();
        assert_eq!(json, r#"{"content":"hi","movieId":603}"#);

        let parsed: Draft = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(parsed.movie_id, None);
    }

    #[test]
    fn test_corrupt_draft_is_absent() {
        let store = MemoryStore::new();
        store.set(DRAFT_KEY, "{not json").unwrap();
        assert!(load_draft(&store).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_then_reload_restores_content() {
        let store = Arc::new(MemoryStore::new());
        let content = "The hero walks away from the explosion and does look back.";

        {
            let autosave = DraftAutosave::new(Arc::clone(&store));
            let mut saves = autosave.saves();
            autosave.update(Draft::new(content, None));

            advance(Duration::from_millis(1000)).await;
            saves.changed().await.unwrap();
            assert!(autosave.last_saved().is_some());
        }

        // Simulated page reload
        let reloaded = DraftAutosave::new(Arc::clone(&store));
        let restored = reloaded.restore(None, &FixedMetadata).await;
        assert_eq!(restored.content, content);
        assert!(restored.movie.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_within_quiet_period_save_once() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc::now());
        let autosave = DraftAutosave::with_options(
            Arc::clone(&store),
            AUTOSAVE_DEBOUNCE,
            Arc::new(clock.clone()),
        );
        let mut saves = autosave.saves();

        autosave.update(Draft::new("one", None));
        advance(Duration::from_millis(500)).await;
        autosave.update(Draft::new("one two", None));
        advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        assert!(store.get(DRAFT_KEY).unwrap().is_none());

        saves.changed().await.unwrap();
        assert_eq!(saves.borrow().saved, 1);
        assert_eq!(load_draft(store.as_ref()).unwrap().content, "one two");
        assert_eq!(autosave.last_saved(), Some(clock.now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_draft_not_saved() {
        let store = Arc::new(MemoryStore::new());
        let autosave = DraftAutosave::new(Arc::clone(&store));
        autosave.update(Draft::default());

        advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(store.is_empty());
        assert!(autosave.last_saved().is_none());
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<()> {
            Err(CoreError::Storage {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_reported() {
        let autosave = DraftAutosave::new(Arc::new(ReadOnlyStore));
        let mut saves = autosave.saves();
        autosave.update(Draft::new("some words", None));

        tokio::time::timeout(Duration::from_secs(5), saves.changed())
            .await
            .expect("failed save should notify watchers")
            .unwrap();
        let status = saves.borrow().clone();
        assert_eq!(status.saved, 0);
        assert!(status.last_error.unwrap().contains("antiClimax_draft"));
        assert!(autosave.last_saved().is_none());
    }

    #[tokio::test]
    async fn test_explicit_movie_wins_over_draft() {
        let store = Arc::new(MemoryStore::new());
        save_draft(store.as_ref(), &Draft::new("text", Some(MovieId(1)))).unwrap();

        let autosave = DraftAutosave::new(Arc::clone(&store));
        let restored = autosave.restore(Some(MovieId(603)), &FixedMetadata).await;
        assert_eq!(restored.movie.unwrap().id, MovieId(603));
        assert_eq!(restored.content, "text");

        let restored = autosave.restore(None, &FixedMetadata).await;
        assert_eq!(restored.movie.unwrap().id, MovieId(1));
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot() {
        let store = Arc::new(MemoryStore::new());
        save_draft(store.as_ref(), &Draft::new("text", None)).unwrap();

        let autosave = DraftAutosave::new(Arc::clone(&store));
        autosave.clear().unwrap();
        assert!(load_draft(store.as_ref()).is_none());
    }
}
