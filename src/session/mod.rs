//! Recommendation session manager
//!
//! [`Session`] is the entry point for the view layer. It owns the
//! [`SessionStore`], drives gestures through the [`GestureResolver`] and hands
//! queue transitions to the [`RefillPolicy`]. Every state change is published
//! as a [`SessionView`] on a watch channel.

pub mod gesture;
pub mod refill;
pub mod store;

use std::sync::Arc;

use tokio::{
    sync::{watch, Mutex, RwLock},
    task::JoinHandle,
};

use crate::{
    config::SessionConfig,
    models::{Direction, Item, ItemId, SessionIdentity},
    services::providers::RecommendationProvider,
};

pub use gesture::{Animating, GestureResolver, IgnoreReason, ResolverState, Target};
pub use refill::{RefillKind, RefillOutcome, RefillPlan, RefillPolicy, SkipReason};
pub use store::{QueueTransition, SessionStore};

/// Everything the view layer renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub queue: Vec<Item>,
    pub accepted: Vec<Item>,
    pub rejected: Vec<Item>,
    pub animating: Option<Animating>,
    pub last_direction: Option<Direction>,
    pub session_identity: Option<SessionIdentity>,
    pub last_refill: Option<RefillOutcome>,
}

impl SessionView {
    pub fn top(&self) -> Option<&Item> {
        self.queue.last()
    }

    /// The terminal "no more items" state, pending a refill
    pub fn no_more_items(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the accept/reject controls should be enabled
    pub fn controls_enabled(&self) -> bool {
        self.animating.is_none() && !self.queue.is_empty()
    }
}

/// Result of a gesture or button press
#[derive(Debug)]
pub enum DecisionOutcome {
    Resolved {
        item: Item,
        direction: Direction,
        /// Set when the resolution emptied the queue
        refill: Option<JoinHandle<RefillOutcome>>,
    },
    Ignored(IgnoreReason),
}

impl DecisionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, DecisionOutcome::Resolved { .. })
    }

    /// Waits for the refill this decision triggered, if any
    pub async fn wait_refill(self) -> Option<RefillOutcome> {
        match self {
            DecisionOutcome::Resolved {
                refill: Some(handle),
                ..
            } => match handle.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Refill task join error");
                    None
                }
            },
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ViewMeta {
    last_direction: Option<Direction>,
    last_refill: Option<RefillOutcome>,
}

struct SessionInner {
    store: RwLock<SessionStore>,
    resolver: GestureResolver,
    refill: RefillPolicy,
    auth: watch::Receiver<bool>,
    meta: Mutex<ViewMeta>,
    /// Serializes snapshot-and-send so views go out in state order
    publish: Mutex<()>,
    view_tx: watch::Sender<SessionView>,
}

/// Shared handle to one recommendation session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates an empty session
    ///
    /// `auth` reports whether the user is logged in; nothing is fetched until
    /// [`Session::watch_auth`] or [`Session::on_authenticated`] is used.
    pub fn new(
        provider: Arc<dyn RecommendationProvider>,
        auth: watch::Receiver<bool>,
        config: SessionConfig,
    ) -> Self {
        let (view_tx, _) = watch::channel(SessionView::default());

        Self {
            inner: Arc::new(SessionInner {
                store: RwLock::new(SessionStore::new(config.dedupe_candidates)),
                resolver: GestureResolver::new(config.settle_duration),
                refill: RefillPolicy::new(provider, auth.clone(), config.history_window),
                auth,
                meta: Mutex::new(ViewMeta::default()),
                publish: Mutex::new(()),
                view_tx,
            }),
        }
    }

    /// Stream of view snapshots, updated after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionView {
        let store = self.inner.store.read().await;
        let meta = self.inner.meta.lock().await;

        let animating = match self.inner.resolver.state() {
            ResolverState::Idle => None,
            ResolverState::Resolving(animating) => Some(animating),
        };

        SessionView {
            queue: store.queue().to_vec(),
            accepted: store.accepted().iter().map(|d| d.item.clone()).collect(),
            rejected: store.rejected().iter().map(|d| d.item.clone()).collect(),
            animating,
            last_direction: meta.last_direction,
            session_identity: store.session_identity().cloned(),
            last_refill: meta.last_refill.clone(),
        }
    }

    pub async fn queue(&self) -> Vec<Item> {
        self.inner.store.read().await.queue().to_vec()
    }

    pub async fn accepted(&self) -> Vec<Item> {
        let store = self.inner.store.read().await;
        store.accepted().iter().map(|d| d.item.clone()).collect()
    }

    pub async fn rejected(&self) -> Vec<Item> {
        let store = self.inner.store.read().await;
        store.rejected().iter().map(|d| d.item.clone()).collect()
    }

    pub fn is_animating(&self) -> bool {
        self.inner.resolver.is_resolving()
    }

    /// Resolves the top item in `direction` (button or keyboard stand-in for a swipe)
    pub async fn trigger_decision(&self, direction: Direction) -> DecisionOutcome {
        self.decide(Target::Top, direction).await
    }

    /// Resolves a swipe performed on the card showing `item_id`
    pub async fn swipe(&self, item_id: ItemId, direction: Direction) -> DecisionOutcome {
        self.decide(Target::Item(item_id), direction).await
    }

    async fn decide(&self, target: Target, direction: Direction) -> DecisionOutcome {
        let resolution = {
            // Held across begin so an append cannot change the top underneath it
            let store = self.inner.store.read().await;
            match self.inner.resolver.begin(store.top(), &target, direction) {
                Ok(resolution) => resolution,
                Err(reason) => return DecisionOutcome::Ignored(reason),
            }
        };

        self.inner.meta.lock().await.last_direction = Some(direction);
        self.publish().await;

        let outcome = match resolution.commit(&self.inner.store).await {
            Ok(committed) => {
                let refill = RefillPolicy::should_refill(&committed.transition)
                    .then(|| self.spawn_refill());
                DecisionOutcome::Resolved {
                    item: committed.item,
                    direction: committed.direction,
                    refill,
                }
            }
            Err(reason) => DecisionOutcome::Ignored(reason),
        };

        self.publish().await;
        outcome
    }

    /// Removes an already decided item from the queue and runs the refill check
    ///
    /// This is the idempotent retry of the removal step; an item with no
    /// recorded decision is left in place so it cannot be lost unrecorded.
    pub async fn remove_item(&self, id: &ItemId) -> Option<JoinHandle<RefillOutcome>> {
        let transition = {
            let mut store = self.inner.store.write().await;
            if store.contains(id) && store.decision_for(id).is_none() {
                tracing::warn!(item_id = %id, "Refusing to remove an undecided item");
                return None;
            }
            store.remove_from_queue(id)
        };

        self.publish().await;

        RefillPolicy::should_refill(&transition).then(|| self.spawn_refill())
    }

    /// Runs one refill now, e.g. a retry from the "no more items" state
    pub async fn request_refill(&self) -> RefillOutcome {
        let outcome = self.inner.refill.refill(&self.inner.store).await;
        self.finish_refill(outcome).await
    }

    /// Performs the initial fetch for a freshly authenticated user
    pub async fn on_authenticated(&self) -> RefillOutcome {
        let outcome = self.inner.refill.initial_fetch(&self.inner.store).await;
        self.finish_refill(outcome).await
    }

    /// Follows the auth status, fetching the first batch on every false → true edge
    ///
    /// An initially-true status counts as an edge. Each fetch replaces the
    /// queue, and a different user identity also clears decision history. The
    /// task ends when the status sender is dropped.
    pub fn watch_auth(&self) -> JoinHandle<()> {
        let session = self.clone();
        let mut auth = self.inner.auth.clone();

        tokio::spawn(async move {
            let mut was_authenticated = false;

            loop {
                let authenticated = *auth.borrow_and_update();

                if authenticated && !was_authenticated {
                    tracing::info!("User authenticated, fetching initial recommendations");
                    session.on_authenticated().await;
                } else if !authenticated && was_authenticated {
                    tracing::info!("User logged out, initial fetch re-armed");
                }
                was_authenticated = authenticated;

                if auth.changed().await.is_err() {
                    tracing::debug!("Auth status sender dropped, stopping watcher");
                    break;
                }
            }
        })
    }

    fn spawn_refill(&self) -> JoinHandle<RefillOutcome> {
        let session = self.clone();
        tokio::spawn(async move { session.request_refill().await })
    }

    async fn finish_refill(&self, outcome: RefillOutcome) -> RefillOutcome {
        self.inner.meta.lock().await.last_refill = Some(outcome.clone());
        self.publish().await;
        outcome
    }

    async fn publish(&self) {
        let _publishing = self.inner.publish.lock().await;
        let view = self.snapshot().await;
        self.inner.view_tx.send_replace(view);
    }
}
