//! lumiere-core - Core library for lumiere
//!
//! Client-side data layer for browsing movies and writing alternate endings:
//! a TTL cache over a key-value store, metadata and BaaS HTTP clients,
//! debounced draft autosave and search, and optimistic vote reconciliation.

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod error;
pub mod feed;
pub mod models;
pub mod remote;
pub mod search;
pub mod storage;
pub mod validation;
pub mod vote;

pub use auth::Session;
pub use cache::TimedCache;
pub use config::Config;
pub use draft::{Draft, DraftAutosave, SaveStatus};
pub use error::{CoreError, ValidationError};
pub use remote::{BaasClient, MetadataClient, MetadataSource, VoteBackend};
pub use search::{EmptyQuery, SearchDebouncer, SearchView};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use vote::{VoteOutcome, VoteReconciler};
