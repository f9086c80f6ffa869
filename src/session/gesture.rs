use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::RwLock;

use crate::{
    models::{Direction, Item, ItemId},
    session::store::{QueueTransition, SessionStore},
};

/// The card currently playing its exit animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animating {
    pub item_id: ItemId,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResolverState {
    #[default]
    Idle,
    Resolving(Animating),
}

/// Which item a gesture is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Whatever is on top (buttons, keyboard)
    Top,
    /// A specific card (swipe on a rendered card)
    Item(ItemId),
}

/// Why a gesture did not start a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Another resolution is still settling
    Busy,
    EmptyQueue,
    /// The gesture targeted a card that is not on top
    NotOnTop,
    /// The item left the queue while its animation was playing
    Stale,
}

/// A finished resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub item: Item,
    pub direction: Direction,
    pub transition: QueueTransition,
}

/// Serializes directional input into at most one decision per item
///
/// Idle → Resolving happens under a lock as a single check-and-set, so a
/// gesture arriving mid-settle is dropped rather than queued.
#[derive(Debug)]
pub struct GestureResolver {
    state: Mutex<ResolverState>,
    settle: Duration,
}

impl GestureResolver {
    pub fn new(settle: Duration) -> Self {
        Self {
            state: Mutex::new(ResolverState::Idle),
            settle,
        }
    }

    pub fn settle_duration(&self) -> Duration {
        self.settle
    }

    pub fn state(&self) -> ResolverState {
        self.lock_state().clone()
    }

    pub fn is_resolving(&self) -> bool {
        matches!(*self.lock_state(), ResolverState::Resolving(_))
    }

    /// Starts resolving `top` if the resolver is idle and the target matches
    ///
    /// The returned [`Resolution`] holds the resolver in `Resolving` until it
    /// is committed or dropped.
    pub fn begin(
        &self,
        top: Option<&Item>,
        target: &Target,
        direction: Direction,
    ) -> Result<Resolution<'_>, IgnoreReason> {
        let mut state = self.lock_state();

        if let ResolverState::Resolving(animating) = &*state {
            tracing::debug!(
                animating = %animating.item_id,
                direction = %direction,
                "Gesture dropped while resolving"
            );
            return Err(IgnoreReason::Busy);
        }

        let item = top.ok_or(IgnoreReason::EmptyQueue)?;

        if let Target::Item(id) = target {
            if *id != item.id {
                tracing::debug!(requested = %id, top = %item.id, "Gesture on a card that is not on top");
                return Err(IgnoreReason::NotOnTop);
            }
        }

        *state = ResolverState::Resolving(Animating {
            item_id: item.id.clone(),
            direction,
        });
        tracing::debug!(item_id = %item.id, direction = %direction, "Resolution started");

        Ok(Resolution {
            resolver: self,
            item: item.clone(),
            direction,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self) {
        *self.lock_state() = ResolverState::Idle;
    }
}

/// An in-progress resolution; returns the resolver to `Idle` when dropped
#[derive(Debug)]
pub struct Resolution<'a> {
    resolver: &'a GestureResolver,
    item: Item,
    direction: Direction,
}

impl Resolution<'_> {
    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Waits out the settle duration, then records and removes the item
    ///
    /// Both store mutations happen under one write lock. The animating flag is
    /// cleared only after they complete.
    pub async fn commit(self, store: &RwLock<SessionStore>) -> Result<Committed, IgnoreReason> {
        tokio::time::sleep(self.resolver.settle).await;

        let mut store = store.write().await;

        if !store.contains(&self.item.id) {
            tracing::warn!(item_id = %self.item.id, "Item left the queue before its decision settled");
            return Err(IgnoreReason::Stale);
        }

        store.record(self.item.clone(), self.direction);
        let transition = store.remove_from_queue(&self.item.id);

        tracing::info!(
            item_id = %self.item.id,
            direction = %self.direction,
            queue_len = transition.len_after,
            "Item resolved"
        );

        Ok(Committed {
            item: self.item.clone(),
            direction: self.direction,
            transition,
        })
    }
}

impl Drop for Resolution<'_> {
    fn drop(&mut self) {
        self.resolver.finish();
    }
}
