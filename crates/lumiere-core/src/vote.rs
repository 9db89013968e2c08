//! Optimistic vote state for a single climax card
//!
//! ```text
//! upvote:  Unvoted -> Pending -> Voted      (count + 1 when the transition starts)
//! retract: Voted   -> Pending -> Unvoted    (count - 1 when the transition starts)
//! ```
//!
//! The remote insert/delete is confirmed afterwards. On failure the inverse
//! mutation restores the previous state and count, and the error is returned.
//! While `Pending`, further requests are ignored. Races between separate
//! sessions are settled by the remote uniqueness constraint.

use crate::auth::Session;
use crate::error::Result;
use crate::models::ClimaxId;
use crate::remote::VoteBackend;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Unvoted,
    Voted,
    Pending,
}

/// Why a toggle did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    SignedOut,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Voted { count: u64 },
    Retracted { count: u64 },
    Ignored(IgnoreReason),
}

/// What the card displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSnapshot {
    pub state: VoteState,
    pub count: u64,
}

#[derive(Debug)]
struct Card {
    state: VoteState,
    count: u64,
}

/// Vote toggle for one climax; clones share the same card
#[derive(Debug, Clone)]
pub struct VoteReconciler {
    climax_id: ClimaxId,
    card: Arc<Mutex<Card>>,
}

impl VoteReconciler {
    pub fn new(climax_id: ClimaxId, count: u64, has_voted: bool) -> Self {
        let state = if has_voted {
            VoteState::Voted
        } else {
            VoteState::Unvoted
        };
        Self {
            climax_id,
            card: Arc::new(Mutex::new(Card { state, count })),
        }
    }

    pub fn climax_id(&self) -> &ClimaxId {
        &self.climax_id
    }

    pub fn snapshot(&self) -> VoteSnapshot {
        let card = self.card.lock();
        VoteSnapshot {
            state: card.state,
            count: card.count,
        }
    }

    /// Upvote when unvoted, retract when voted
    pub async fn toggle<B: VoteBackend>(
        &self,
        session: Option<&Session>,
        backend: &B,
    ) -> Result<VoteOutcome> {
        let Some(session) = session else {
            return Ok(VoteOutcome::Ignored(IgnoreReason::SignedOut));
        };

        // Optimistic mutation; the lock is released before awaiting the remote call
        let previous = {
            let mut card = self.card.lock();
            match card.state {
                VoteState::Pending => return Ok(VoteOutcome::Ignored(IgnoreReason::InFlight)),
                VoteState::Unvoted => card.count += 1,
                VoteState::Voted => card.count = card.count.saturating_sub(1),
            }
            let previous = card.state;
            card.state = VoteState::Pending;
            previous
        };

        let remote = match previous {
            VoteState::Unvoted => backend.insert_vote(session, &self.climax_id).await,
            _ => backend.delete_vote(session, &self.climax_id).await,
        };

        let mut card = self.card.lock();
        match remote {
            Ok(()) => {
                let outcome = if previous == VoteState::Unvoted {
                    card.state = VoteState::Voted;
                    VoteOutcome::Voted { count: card.count }
                } else {
                    card.state = VoteState::Unvoted;
                    VoteOutcome::Retracted { count: card.count }
                };
                debug!(climax_id = %self.climax_id, ?outcome, "Vote confirmed");
                Ok(outcome)
            }
            Err(e) => {
                if previous == VoteState::Unvoted {
                    card.count = card.count.saturating_sub(1);
                } else {
                    card.count += 1;
                }
                card.state = previous;
                warn!(climax_id = %self.climax_id, error = %e, "Vote failed, rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::models::UserId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Backend whose calls block until a permit is released
    struct GatedBackend {
        gate: Semaphore,
        fail: bool,
        calls: AtomicUsize,
    }

    impl GatedBackend {
        fn new(fail: bool) -> Self {
            Self {
                gate: Semaphore::new(0),
                fail,
                calls: AtomicUsize::new(0),
            }
        }

        async fn pass(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.expect("gate closed");
            permit.forget();
            if self.fail {
                Err(CoreError::UpstreamUnavailable {
                    operation: "cast vote".to_string(),
                    status: 500,
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl VoteBackend for GatedBackend {
        async fn insert_vote(&self, _session: &Session, _climax_id: &ClimaxId) -> Result<()> {
            self.pass().await
        }

        async fn delete_vote(&self, _session: &Session, _climax_id: &ClimaxId) -> Result<()> {
            self.pass().await
        }
    }

    fn session() -> Session {
        Session {
            user_id: UserId::new("user-1"),
            email: "neo@zion.org".to_string(),
            access_token: "token".to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_optimistic_vote_then_retract() {
        let backend = Arc::new(GatedBackend::new(false));
        let card = VoteReconciler::new(ClimaxId::from("c1"), 7, false);

        let task = {
            let (card, backend) = (card.clone(), Arc::clone(&backend));
            tokio::spawn(async move { card.toggle(Some(&session()), backend.as_ref()).await })
        };

        // Count moves before the remote call resolves
        while backend.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            card.snapshot(),
            VoteSnapshot {
                state: VoteState::Pending,
                count: 8
            }
        );

        backend.gate.add_permits(1);
        assert_eq!(task.await.unwrap().unwrap(), VoteOutcome::Voted { count: 8 });
        assert_eq!(card.snapshot().state, VoteState::Voted);

        backend.gate.add_permits(1);
        let outcome = card.toggle(Some(&session()), backend.as_ref()).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Retracted { count: 7 });
        assert_eq!(
            card.snapshot(),
            VoteSnapshot {
                state: VoteState::Unvoted,
                count: 7
            }
        );
    }

    #[tokio::test]
    async fn test_signed_out_is_noop() {
        let backend = GatedBackend::new(false);
        let card = VoteReconciler::new(ClimaxId::from("c1"), 3, false);

        let outcome = card.toggle(None, &backend).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Ignored(IgnoreReason::SignedOut));
        assert_eq!(card.snapshot().count, 3);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_in_flight_request_is_ignored() {
        let backend = Arc::new(GatedBackend::new(false));
        let card = VoteReconciler::new(ClimaxId::from("c1"), 0, false);

        let task = {
            let (card, backend) = (card.clone(), Arc::clone(&backend));
            tokio::spawn(async move { card.toggle(Some(&session()), backend.as_ref()).await })
        };
        while backend.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = card.toggle(Some(&session()), backend.as_ref()).await.unwrap();
        assert_eq!(second, VoteOutcome::Ignored(IgnoreReason::InFlight));

        backend.gate.add_permits(1);
        task.await.unwrap().unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(card.snapshot().count, 1);
    }

    #[tokio::test]
    async fn test_failed_vote_rolls_back() {
        let backend = GatedBackend::new(true);
        backend.gate.add_permits(2);

        let card = VoteReconciler::new(ClimaxId::from("c1"), 4, false);
        let err = card.toggle(Some(&session()), &backend).await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(
            card.snapshot(),
            VoteSnapshot {
                state: VoteState::Unvoted,
                count: 4
            }
        );

        let voted = VoteReconciler::new(ClimaxId::from("c2"), 4, true);
        assert!(voted.toggle(Some(&session()), &backend).await.is_err());
        assert_eq!(
            voted.snapshot(),
            VoteSnapshot {
                state: VoteState::Voted,
                count: 4
            }
        );
    }
}
