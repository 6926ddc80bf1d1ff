//! Pending follow-up expectations per conversation.
//!
//! Entries live for the lifetime of the process. Without a TTL an abandoned
//! conversation keeps its entry until the next round for that context
//! overwrites it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::types::{ContextId, EntityType};

#[derive(Debug, Clone, Copy)]
struct PendingSession {
    expected: EntityType,
    opened_at: Instant,
}

/// Maps a conversation to the entity type the chatbot is waiting for.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    pending: RwLock<HashMap<ContextId, PendingSession>>,
    locks: Mutex<HashMap<ContextId, Arc<Mutex<()>>>>,
    ttl: Option<Duration>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub async fn clear(&self, context: &ContextId) {
        if let Some(session) = self.pending.write().await.remove(context) {
            debug!(
                "Cleared pending {} session for {context}",
                session.expected
            );
        }
    }

    pub async fn set(&self, context: &ContextId, expected: EntityType) {
        debug!("Opening pending {expected} session for {context}");
        self.pending.write().await.insert(
            context.clone(),
            PendingSession {
                expected,
                opened_at: Instant::now(),
            },
        );
    }

    pub async fn get(&self, context: &ContextId) -> Option<EntityType> {
        let session = *self.pending.read().await.get(context)?;
        if !self.is_expired(session) {
            return Some(session.expected);
        }
        self.evict_if_expired(context).await
    }

    /// Removes the entry if it is expired under the write lock. A session
    /// opened since the read is kept and returned.
    async fn evict_if_expired(&self, context: &ContextId) -> Option<EntityType> {
        let mut pending = self.pending.write().await;
        let session = *pending.get(context)?;
        if self.is_expired(session) {
            debug!("Pending session for {context} expired");
            pending.remove(context);
            return None;
        }
        Some(session.expected)
    }

    fn is_expired(&self, session: PendingSession) -> bool {
        self.ttl
            .is_some_and(|ttl| session.opened_at.elapsed() > ttl)
    }

    /// Serializes message handling for one context.
    ///
    /// Hold the guard across a dispatch decision and the round it triggers.
    pub async fn lock_context(&self, context: &ContextId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(context.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
