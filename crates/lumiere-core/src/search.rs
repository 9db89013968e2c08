//! Debounced movie search with latest-only results
//!
//! Input is debounced for 300 ms. A settled query resets pagination to page 1
//! and issues one request. Every request is tagged with a monotonically
//! increasing sequence number; a response is applied only if its tag is still
//! the latest issued, so a slow earlier response can never overwrite fresher
//! results. In-flight requests are not cancelled, only ignored.

use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::models::MoviePage;
use crate::remote::MetadataSource;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What to show for an empty settled query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyQuery {
    /// Browse popular movies instead (movie listing)
    Popular,
    /// Show nothing and skip the request (movie picker)
    Clear,
}

/// Current search view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub page: u32,
    pub results: Option<MoviePage>,
    pub error: Option<String>,
    pub loading: bool,
    /// Tag of the response currently displayed
    pub applied_seq: u64,
}

#[derive(Debug, Default)]
struct Shared {
    view: SearchView,
    latest_seq: u64,
}

pub struct SearchDebouncer<M> {
    metadata: Arc<M>,
    debouncer: Debouncer<String>,
    settled: mpsc::UnboundedReceiver<String>,
    shared: Arc<Mutex<Shared>>,
    empty: EmptyQuery,
}

impl<M: MetadataSource + 'static> SearchDebouncer<M> {
    pub fn new(metadata: Arc<M>, empty: EmptyQuery) -> Self {
        Self::with_delay(metadata, empty, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(metadata: Arc<M>, empty: EmptyQuery, delay: Duration) -> Self {
        let (debouncer, settled) = Debouncer::new(delay);
        let shared = Shared {
            view: SearchView {
                page: 1,
                ..SearchView::default()
            },
            latest_seq: 0,
        };
        Self {
            metadata,
            debouncer,
            settled,
            shared: Arc::new(Mutex::new(shared)),
            empty,
        }
    }

    /// Record a keystroke
    pub fn input(&self, text: impl Into<String>) {
        self.debouncer.push(text.into());
    }

    /// Wait for the next settled query; resets pagination to page 1
    pub async fn settle(&mut self) -> Option<String> {
        let query = self.settled.recv().await?;
        let mut shared = self.shared.lock();
        shared.view.query = query.clone();
        shared.view.page = 1;
        debug!(query = %query, "Search query settled");
        Some(query)
    }

    /// Settle the next query and issue its page-1 request
    pub async fn next(&mut self) -> Option<JoinHandle<bool>> {
        self.settle().await?;
        Some(self.request())
    }

    /// Move to `page` of the current query and request it
    pub fn set_page(&self, page: u32) -> JoinHandle<bool> {
        self.shared.lock().view.page = page.max(1);
        self.request()
    }

    /// Issue a request for the current query and page.
    ///
    /// The handle resolves to `true` if the response was applied, `false` if a
    /// newer request superseded it.
    pub fn request(&self) -> JoinHandle<bool> {
        let (seq, query, page) = {
            let mut shared = self.shared.lock();
            shared.latest_seq += 1;
            shared.view.loading = true;
            (shared.latest_seq, shared.view.query.clone(), shared.view.page)
        };

        let metadata = Arc::clone(&self.metadata);
        let shared = Arc::clone(&self.shared);
        let empty = self.empty;

        tokio::spawn(async move {
            let result = if !query.trim().is_empty() {
                Some(metadata.search_movies(&query, page).await)
            } else {
                match empty {
                    EmptyQuery::Popular => Some(metadata.popular_movies(page).await),
                    EmptyQuery::Clear => None,
                }
            };

            let mut guard = shared.lock();
            if seq != guard.latest_seq {
                debug!(
                    seq,
                    latest = guard.latest_seq,
                    query = %query,
                    "Discarding stale search response"
                );
                return false;
            }

            let view = &mut guard.view;
            view.loading = false;
            view.applied_seq = seq;
            match result {
                Some(Ok(page)) => {
                    view.results = Some(page);
                    view.error = None;
                }
                Some(Err(e)) => {
                    warn!(query = %query, error = %e, "Search failed");
                    view.results = None;
                    view.error = Some(e.to_string());
                }
                None => {
                    view.results = None;
                    view.error = None;
                }
            }
            true
        })
    }

    pub fn view(&self) -> SearchView {
        self.shared.lock().view.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::models::{Movie, MovieId};
    use std::collections::HashMap;
    use tokio::time::advance;

    /// Records calls; per-query latency simulates slow responses
    #[derive(Default)]
    struct RecordingMetadata {
        calls: Mutex<Vec<(String, u32)>>,
        latency: HashMap<String, Duration>,
        fail: bool,
    }

    fn page_for(query: &str, page: u32) -> MoviePage {
        MoviePage {
            page,
            results: vec![Movie {
                id: MovieId(query.len() as u64),
                title: query.to_string(),
                original_language: "en".to_string(),
                poster_path: None,
                release_date: String::new(),
            }],
            total_pages: 3,
            total_results: 1,
        }
    }

    #[async_trait::async_trait]
    impl MetadataSource for RecordingMetadata {
        async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage> {
            self.calls.lock().push((query.to_string(), page));
            if let Some(delay) = self.latency.get(query) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail {
                return Err(CoreError::UpstreamUnavailable {
                    operation: "search movies".to_string(),
                    status: 503,
                });
            }
            Ok(page_for(query, page))
        }

        async fn popular_movies(&self, page: u32) -> Result<MoviePage> {
            self.calls.lock().push(("<popular>".to_string(), page));
            Ok(page_for("popular", page))
        }

        async fn movie_by_id(&self, _id: MovieId) -> Result<Option<Movie>> {
            Ok(None)
        }

        async fn discover_movies(&self, page: u32, _language: Option<&str>) -> Result<MoviePage> {
            Ok(page_for("discover", page))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_input_issues_one_search() {
        let metadata = Arc::new(RecordingMetadata::default());
        let mut search = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Clear);

        search.input("a");
        advance(Duration::from_millis(100)).await;
        search.input("ab");
        advance(Duration::from_millis(100)).await;
        search.input("abc");

        let handle = search.next().await.unwrap();
        assert!(handle.await.unwrap());

        advance(Duration::from_secs(2)).await;
        assert_eq!(*metadata.calls.lock(), vec![("abc".to_string(), 1)]);
        assert_eq!(search.view().results.unwrap().results[0].title, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let metadata = Arc::new(RecordingMetadata {
            latency: HashMap::from([
                ("slow".to_string(), Duration::from_millis(800)),
                ("fast".to_string(), Duration::from_millis(10)),
            ]),
            ..Default::default()
        });
        let mut search = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Clear);

        search.input("slow");
        let slow = search.next().await.unwrap();
        search.input("fast");
        let fast = search.next().await.unwrap();

        assert!(fast.await.unwrap());
        assert!(!slow.await.unwrap());

        let view = search.view();
        assert_eq!(view.query, "fast");
        assert_eq!(view.results.unwrap().results[0].title, "fast");
        assert!(!view.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_query_resets_page() {
        let metadata = Arc::new(RecordingMetadata::default());
        let mut search = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Popular);

        search.input("matrix");
        search.next().await.unwrap().await.unwrap();
        search.set_page(3).await.unwrap();
        assert_eq!(search.view().page, 3);

        search.input("matrix reloaded");
        search.next().await.unwrap().await.unwrap();
        assert_eq!(search.view().page, 1);

        let calls = metadata.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                ("matrix".to_string(), 1),
                ("matrix".to_string(), 3),
                ("matrix reloaded".to_string(), 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_policy() {
        let metadata = Arc::new(RecordingMetadata::default());

        let mut browse = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Popular);
        browse.input("");
        browse.next().await.unwrap().await.unwrap();
        assert_eq!(browse.view().results.unwrap().results[0].title, "popular");

        let mut picker = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Clear);
        picker.input("  ");
        picker.next().await.unwrap().await.unwrap();
        assert!(picker.view().results.is_none());

        assert_eq!(metadata.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_becomes_error_state() {
        let metadata = Arc::new(RecordingMetadata {
            fail: true,
            ..Default::default()
        });
        let mut search = SearchDebouncer::new(Arc::clone(&metadata), EmptyQuery::Clear);

        search.input("anything");
        assert!(search.next().await.unwrap().await.unwrap());

        let view = search.view();
        assert!(view.results.is_none());
        assert!(view.error.unwrap().contains("503"));
    }
}
