//! Live listener registry and new-tag fan-out
//!
//! Listeners are grouped by [`SubscriptionScope`]: one user's own tags, or
//! every user's tags. A record owned by user `U` is delivered to the `User(U)`
//! set and, independently, to the `All` set.
//!
//! # Concurrency
//!
//! The map sits behind a `std::sync::RwLock` that is held only to mutate or
//! snapshot it, never across an await. Delivery uses `try_send`, so a slow or
//! dead listener cannot stall the broadcaster. A listener whose buffer is full
//! or whose receiver is gone is dropped from the registry; the rest of the
//! fan-out continues.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use tagscan_common::{AssetTagRecord, TagEvent, UserId};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Audience key for a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// Tags created by one user
    User(UserId),
    /// Tags created by anyone
    All,
}

impl fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionScope::User(id) => write!(f, "user:{}", id),
            SubscriptionScope::All => write!(f, "ALL"),
        }
    }
}

/// Why a single listener could not take an event
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("listener disconnected")]
    Closed,
    #[error("listener buffer full")]
    Full,
}

/// Sending half of one live connection
#[derive(Debug, Clone)]
pub struct ListenerChannel {
    id: Uuid,
    tx: mpsc::Sender<TagEvent>,
}

impl ListenerChannel {
    pub fn new(tx: mpsc::Sender<TagEvent>) -> Self {
        Self { id: Uuid::new_v4(), tx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn deliver(&self, event: TagEvent) -> Result<(), DeliveryError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
        })
    }
}

/// Outcome of one [`SubscriptionRegistry::broadcast`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of live listener channels keyed by scope
pub struct SubscriptionRegistry {
    scopes: RwLock<HashMap<SubscriptionScope, HashMap<Uuid, ListenerChannel>>>,
    channel_capacity: usize,
}

impl SubscriptionRegistry {
    /// `channel_capacity` bounds the per-listener buffer created by [`Self::open_channel`]
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Allocate a listener channel (not yet subscribed)
    pub fn open_channel(&self) -> (ListenerChannel, mpsc::Receiver<TagEvent>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        (ListenerChannel::new(tx), rx)
    }

    /// Register `channel` under `scope`
    ///
    /// A channel lives in at most one scope; subscribing it again moves it.
    pub fn subscribe(&self, scope: SubscriptionScope, channel: ListenerChannel) {
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);

        let id = channel.id;
        scopes.retain(|other, set| {
            if *other != scope {
                set.remove(&id);
            }
            !set.is_empty()
        });
        scopes.entry(scope).or_default().insert(id, channel);

        debug!(scope = %scope, channel = %id, "Listener subscribed");
    }

    /// Remove a channel; unknown scopes or ids are a no-op
    ///
    /// Returns whether anything was removed.
    pub fn unsubscribe(&self, scope: SubscriptionScope, channel_id: Uuid) -> bool {
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);

        let Some(set) = scopes.get_mut(&scope) else {
            return false;
        };
        let removed = set.remove(&channel_id).is_some();
        if set.is_empty() {
            scopes.remove(&scope);
        }

        if removed {
            debug!(scope = %scope, channel = %channel_id, "Listener unsubscribed");
        }
        removed
    }

    /// Deliver a `newTag` event for `record` to its owner's listeners and to
    /// every `All` listener
    ///
    /// Never fails: broken listeners are removed and counted in the report.
    pub fn broadcast(&self, record: &AssetTagRecord) -> DeliveryReport {
        let targets = [SubscriptionScope::User(record.owner_user_id), SubscriptionScope::All];

        // Snapshot so concurrent unsubscribes cannot disturb iteration
        let snapshot: Vec<(SubscriptionScope, ListenerChannel)> = {
            let scopes = self.scopes.read().unwrap_or_else(PoisonError::into_inner);
            targets
                .iter()
                .filter_map(|scope| scopes.get(scope).map(|set| (scope, set)))
                .flat_map(|(scope, set)| set.values().map(move |ch| (*scope, ch.clone())))
                .collect()
        };

        let event = TagEvent::NewTag { tag: record.clone() };
        let mut report = DeliveryReport::default();

        for (scope, channel) in snapshot {
            match channel.deliver(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        scope = %scope,
                        channel = %channel.id,
                        error = %e,
                        "Dropping listener after failed delivery"
                    );
                    self.unsubscribe(scope, channel.id);
                    report.dropped += 1;
                }
            }
        }

        debug!(
            asset_tag = %record.asset_tag,
            owner = record.owner_user_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast new tag"
        );
        report
    }

    /// Total registered channels across all scopes
    pub fn listener_count(&self) -> usize {
        let scopes = self.scopes.read().unwrap_or_else(PoisonError::into_inner);
        scopes.values().map(HashMap::len).sum()
    }

    /// Channels registered under one scope
    pub fn scope_listener_count(&self, scope: SubscriptionScope) -> usize {
        let scopes = self.scopes.read().unwrap_or_else(PoisonError::into_inner);
        scopes.get(&scope).map_or(0, HashMap::len)
    }

    /// Number of scopes with at least one channel
    pub fn scope_count(&self) -> usize {
        self.scopes.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
