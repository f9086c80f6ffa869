use std::collections::HashSet;

use crate::models::{Decision, Direction, Item, ItemId, SessionIdentity};

/// What a call to [`SessionStore::remove_from_queue`] did to the queue
///
/// Captured while the store is locked so the refill check works from the
/// pre-removal snapshot rather than whatever the queue looks like later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTransition {
    pub len_before: usize,
    pub len_after: usize,
    pub removed: Option<ItemId>,
    /// The removed item was the only one queued
    pub was_last: bool,
}

/// Authoritative in-memory state of one recommendation session
///
/// The queue is consumed from the tail: the last element is the item
/// currently presented.
#[derive(Debug, Default)]
pub struct SessionStore {
    queue: Vec<Item>,
    accepted: Vec<Decision>,
    rejected: Vec<Decision>,
    identity: Option<SessionIdentity>,
    dedupe_candidates: bool,
}

impl SessionStore {
    pub fn new(dedupe_candidates: bool) -> Self {
        Self {
            dedupe_candidates,
            ..Self::default()
        }
    }

    pub fn record_accept(&mut self, item: Item) -> bool {
        self.record(item, Direction::Accept)
    }

    pub fn record_reject(&mut self, item: Item) -> bool {
        self.record(item, Direction::Reject)
    }

    /// Appends `item` to the history for `direction`
    ///
    /// Does not touch the queue. An item that already has a decision is left
    /// alone so it can never end up in both lists; returns whether it was recorded.
    pub fn record(&mut self, item: Item, direction: Direction) -> bool {
        if let Some(existing) = self.decision_for(&item.id) {
            tracing::warn!(
                item_id = %item.id,
                existing = %existing,
                requested = %direction,
                "Item already decided, ignoring duplicate decision"
            );
            return false;
        }

        tracing::debug!(item_id = %item.id, direction = %direction, "Decision recorded");
        let decision = Decision::new(item, direction);
        match direction {
            Direction::Accept => self.accepted.push(decision),
            Direction::Reject => self.rejected.push(decision),
        }
        true
    }

    /// Deletes the queued item with `id`; a missing id is a no-op
    pub fn remove_from_queue(&mut self, id: &ItemId) -> QueueTransition {
        let len_before = self.queue.len();
        let was_last = len_before == 1 && self.queue[0].id == *id;

        // Duplicates can only exist with dedupe off; the presented copy is the tail one
        let position = self.queue.iter().rposition(|item| item.id == *id);
        let removed = position.map(|index| self.queue.remove(index).id);

        if removed.is_none() {
            tracing::debug!(item_id = %id, "Item not in queue, nothing to remove");
        }

        QueueTransition {
            len_before,
            len_after: self.queue.len(),
            removed,
            was_last,
        }
    }

    /// Appends a batch to the queue tail in arrival order
    ///
    /// With dedupe enabled, ids already queued, already decided, or repeated
    /// within the batch are dropped. Returns how many items were appended.
    pub fn append_candidates(&mut self, items: Vec<Item>) -> usize {
        let received = items.len();

        if !self.dedupe_candidates {
            self.queue.extend(items);
            return received;
        }

        let mut seen: HashSet<ItemId> = self
            .queue
            .iter()
            .chain(self.accepted.iter().map(|d| &d.item))
            .chain(self.rejected.iter().map(|d| &d.item))
            .map(|item| item.id.clone())
            .collect();

        let before = self.queue.len();
        for item in items {
            if seen.insert(item.id.clone()) {
                self.queue.push(item);
            }
        }
        let appended = self.queue.len() - before;

        if appended < received {
            tracing::debug!(
                received,
                appended,
                dropped = received - appended,
                "Dropped duplicate candidates"
            );
        }

        appended
    }

    /// Assigns the session identity; overwriting with the same value is harmless
    pub fn set_session_identity(&mut self, identity: SessionIdentity) {
        if let Some(existing) = &self.identity {
            if *existing != identity {
                tracing::info!(previous = %existing, current = %identity, "Session identity replaced");
            }
        }
        self.identity = Some(identity);
    }

    /// Starts a fresh session for `identity` ahead of its first batch
    ///
    /// The queue is always cleared. Decision history is kept only when the
    /// identity is unchanged, so a different user never inherits it. Returns
    /// whether history was discarded.
    pub fn start_session(&mut self, identity: SessionIdentity) -> bool {
        let switched = self
            .identity
            .as_ref()
            .is_some_and(|existing| *existing != identity);

        if switched {
            tracing::info!(
                discarded_accepted = self.accepted.len(),
                discarded_rejected = self.rejected.len(),
                "New session identity, clearing decision history"
            );
            self.accepted.clear();
            self.rejected.clear();
        }
        if !self.queue.is_empty() {
            tracing::debug!(discarded = self.queue.len(), "Replacing queued candidates");
            self.queue.clear();
        }

        self.set_session_identity(identity);
        switched
    }

    pub fn session_identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn queue(&self) -> &[Item] {
        &self.queue
    }

    /// The item currently presented
    pub fn top(&self) -> Option<&Item> {
        self.queue.last()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.queue.iter().any(|item| item.id == *id)
    }

    pub fn accepted(&self) -> &[Decision] {
        &self.accepted
    }

    pub fn rejected(&self) -> &[Decision] {
        &self.rejected
    }

    /// Which list `id` was recorded in, if any
    pub fn decision_for(&self, id: &ItemId) -> Option<Direction> {
        if self.accepted.iter().any(|d| d.item.id == *id) {
            Some(Direction::Accept)
        } else if self.rejected.iter().any(|d| d.item.id == *id) {
            Some(Direction::Reject)
        } else {
            None
        }
    }

    /// Ids of the `window` most recent decisions in `direction`, oldest first
    pub fn recent_ids(&self, direction: Direction, window: usize) -> Vec<ItemId> {
        let history = match direction {
            Direction::Accept => &self.accepted,
            Direction::Reject => &self.rejected,
        };
        let start = history.len().saturating_sub(window);
        history[start..].iter().map(|d| d.item.id.clone()).collect()
    }

    /// Nothing fetched, nothing decided, no identity yet
    pub fn is_pristine(&self) -> bool {
        self.queue.is_empty()
            && self.accepted.is_empty()
            && self.rejected.is_empty()
            && self.identity.is_none()
    }
}
