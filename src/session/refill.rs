use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::{Direction, Item, RecommendationRequest},
    services::providers::RecommendationProvider,
    session::store::{QueueTransition, SessionStore},
};

/// Which kind of request a refill sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillKind {
    /// GET /recommend/initial; also yields the session identity
    Initial,
    /// POST /recommend with recent history
    Incremental,
}

/// Why a refill was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No identity yet, so an incremental request cannot be built
    MissingSessionIdentity,
    /// Not logged in, or the service rejected the credential
    NotAuthenticated,
}

/// What the policy decided to do for one trigger
#[derive(Debug, Clone, PartialEq)]
pub enum RefillPlan {
    Initial,
    Incremental(RecommendationRequest),
    Skip(SkipReason),
}

/// Result of one refill attempt, as seen by the rest of the session
///
/// Every failure is absorbed here; callers never receive an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RefillOutcome {
    Appended {
        kind: RefillKind,
        received: usize,
        appended: usize,
    },
    /// The service had nothing new to offer
    Exhausted { kind: RefillKind },
    Skipped(SkipReason),
    Failed { kind: RefillKind, error: String },
}

/// Decides when to contact the recommendation service and merges its answers
#[derive(Clone)]
pub struct RefillPolicy {
    provider: Arc<dyn RecommendationProvider>,
    auth: watch::Receiver<bool>,
    history_window: usize,
}

impl RefillPolicy {
    pub fn new(
        provider: Arc<dyn RecommendationProvider>,
        auth: watch::Receiver<bool>,
        history_window: usize,
    ) -> Self {
        Self {
            provider,
            auth,
            history_window,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.auth.borrow()
    }

    /// Whether a removal should trigger a refill
    ///
    /// Works from the snapshot taken at removal time: the queue held only the
    /// removed item, or it is empty afterwards for any reason.
    pub fn should_refill(transition: &QueueTransition) -> bool {
        transition.was_last || transition.len_after == 0
    }

    /// Picks the request variant for the current store contents
    pub fn plan(&self, store: &SessionStore) -> RefillPlan {
        if store.is_pristine() {
            return if self.is_authenticated() {
                RefillPlan::Initial
            } else {
                RefillPlan::Skip(SkipReason::NotAuthenticated)
            };
        }

        match self.build_request(store) {
            Ok(request) => RefillPlan::Incremental(request),
            Err(_) => RefillPlan::Skip(SkipReason::MissingSessionIdentity),
        }
    }

    /// Builds the incremental request from the last `history_window` decisions
    pub fn build_request(&self, store: &SessionStore) -> AppResult<RecommendationRequest> {
        let user_id = store
            .session_identity()
            .cloned()
            .ok_or(AppError::MissingSessionIdentity)?;

        Ok(RecommendationRequest {
            user_id,
            liked_movie_ids: store.recent_ids(Direction::Accept, self.history_window),
            disliked_movie_ids: store.recent_ids(Direction::Reject, self.history_window),
        })
    }

    /// Plans and performs one refill against `store`
    ///
    /// The store lock is released while the request is in flight; whatever
    /// arrives is appended even if the queue changed in the meantime.
    pub async fn refill(&self, store: &RwLock<SessionStore>) -> RefillOutcome {
        let plan = self.plan(&*store.read().await);

        match plan {
            RefillPlan::Initial => self.initial_fetch(store).await,
            RefillPlan::Incremental(request) => self.incremental_fetch(store, request).await,
            RefillPlan::Skip(reason) => {
                tracing::warn!(reason = ?reason, "Refill skipped");
                RefillOutcome::Skipped(reason)
            }
        }
    }

    /// Fetches the first batch and makes it the whole queue
    ///
    /// The identity is stored before the items; a different identity also
    /// drops the previous decision history.
    pub async fn initial_fetch(&self, store: &RwLock<SessionStore>) -> RefillOutcome {
        if !self.is_authenticated() {
            tracing::warn!("Initial fetch requested before authentication, skipping");
            return RefillOutcome::Skipped(SkipReason::NotAuthenticated);
        }

        let initial = match self.provider.fetch_initial().await {
            Ok(initial) => initial,
            Err(e) => return Self::failed(RefillKind::Initial, e),
        };

        let mut store = store.write().await;
        store.start_session(initial.user_id);
        Self::merge(&mut store, RefillKind::Initial, initial.recommendations)
    }

    async fn incremental_fetch(
        &self,
        store: &RwLock<SessionStore>,
        request: RecommendationRequest,
    ) -> RefillOutcome {
        tracing::debug!(
            user_id = %request.user_id,
            liked = request.liked_movie_ids.len(),
            disliked = request.disliked_movie_ids.len(),
            "Requesting more recommendations"
        );

        let batch = match self.provider.fetch_more(&request).await {
            Ok(batch) => batch,
            Err(e) => return Self::failed(RefillKind::Incremental, e),
        };

        if let Some(message) = batch.message.as_deref() {
            tracing::info!(message = %message, "Recommendation service message");
        }

        let mut store = store.write().await;
        Self::merge(&mut store, RefillKind::Incremental, batch.recommendations)
    }

    fn merge(store: &mut SessionStore, kind: RefillKind, items: Vec<Item>) -> RefillOutcome {
        let received = items.len();
        if received == 0 {
            tracing::info!(kind = ?kind, "No new recommendations available");
            return RefillOutcome::Exhausted { kind };
        }

        let appended = store.append_candidates(items);
        tracing::info!(
            kind = ?kind,
            received,
            appended,
            queue_len = store.len(),
            "Queue refilled"
        );

        RefillOutcome::Appended {
            kind,
            received,
            appended,
        }
    }

    fn failed(kind: RefillKind, error: AppError) -> RefillOutcome {
        if matches!(error, AppError::NotAuthenticated) {
            tracing::warn!(kind = ?kind, "Credential rejected by the service, refill skipped");
            return RefillOutcome::Skipped(SkipReason::NotAuthenticated);
        }

        if error.is_remote() {
            tracing::error!(kind = ?kind, error = %error, "Refill failed, queue left unchanged");
        } else {
            tracing::warn!(kind = ?kind, error = %error, "Refill failed, queue left unchanged");
        }
        RefillOutcome::Failed {
            kind,
            error: error.to_string(),
        }
    }
}
