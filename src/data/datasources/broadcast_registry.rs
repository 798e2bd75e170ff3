use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, Weak,
};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::{data::models::store_message::StoreMessage, util::lock};

/// Receives broadcasts from the store.
pub trait BroadcastObserver: Send + Sync {
    fn on_broadcast(&self, message: &StoreMessage);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

static GLOBAL_REGISTRY: Lazy<Arc<BroadcastRegistry>> =
    Lazy::new(|| Arc::new(BroadcastRegistry::new()));

/// Fan-out point for inbound store broadcasts.
///
/// Observers are held weakly and keyed by identity. Delivery iterates over a
/// snapshot taken under the lock and runs outside it, so observers may
/// register or unregister from inside a callback.
#[derive(Default)]
pub struct BroadcastRegistry {
    observers: Mutex<Vec<(ObserverId, Weak<dyn BroadcastObserver>)>>,
    next_id: AtomicU64,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry the host's broadcast receiver feeds.
    pub fn global() -> Arc<BroadcastRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    pub fn register(&self, observer: Weak<dyn BroadcastObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, observer));
        id
    }

    pub fn unregister(&self, id: ObserverId) {
        lock(&self.observers).retain(|(existing, _)| *existing != id);
    }

    /// Delivers `message` to every live observer. Dead entries are pruned.
    pub fn notify(&self, message: &StoreMessage) {
        let snapshot: Vec<Arc<dyn BroadcastObserver>> = {
            let mut observers = lock(&self.observers);
            observers.retain(|(_, o)| o.strong_count() > 0);
            observers.iter().filter_map(|(_, o)| o.upgrade()).collect()
        };
        debug!(action = %message.action, observers = snapshot.len(), "New message received in broadcast");
        for observer in snapshot {
            observer.on_broadcast(message);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.observers)
            .iter()
            .filter(|(_, o)| o.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
