use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Token handed to the owner of a registered operation.
pub struct CancelHandle {
    id: String,
    generation: u64,
    receiver: broadcast::Receiver<()>,
}

impl CancelHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolves once the operation is cancelled or superseded.
    pub async fn cancelled(&mut self) {
        // A closed channel means the sender was replaced or dropped.
        let _ = self.receiver.recv().await;
    }
}

/// Cancellation tokens keyed by id (a tab, or an outstanding host call).
///
/// Registering an id that is already live cancels the previous holder, so the
/// newest operation for a tab always wins.
pub struct CancelRegistry {
    senders: Mutex<HashMap<String, (u64, broadcast::Sender<()>)>>,
    next_generation: AtomicU64,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn register(&self, id: &str) -> CancelHandle {
        let (tx, rx) = broadcast::channel(1);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let previous = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), (generation, tx));
        if let Some((_, old)) = previous {
            let _ = old.send(());
        }
        CancelHandle {
            id: id.to_string(),
            generation,
            receiver: rx,
        }
    }

    pub fn cancel(&self, id: &str) -> bool {
        let removed = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some((_, tx)) = removed {
            let _ = tx.send(());
            return true;
        }
        false
    }

    /// Unregister a finished operation. A newer registration under the same
    /// id is left untouched.
    pub fn remove(&self, handle: &CancelHandle) {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        if senders
            .get(&handle.id)
            .is_some_and(|(generation, _)| *generation == handle.generation)
        {
            senders.remove(&handle.id);
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }
}

impl Default for CancelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
