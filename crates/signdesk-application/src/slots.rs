use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Lazily created per-key slots, each behind its own lock.
///
/// Holding one slot's lock never blocks another key. The map lock is only
/// held to look up or insert a slot, never across a slot's critical section.
pub struct SlotArena<T> {
    slots: Arc<RwLock<HashMap<String, Arc<Mutex<T>>>>>,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Mutex<T>>> {
        self.slots.read().await.get(key).cloned()
    }

    /// Returns the slot for `key`, creating it with `init` if absent.
    pub async fn get_or_insert_with<F>(&self, key: &str, init: F) -> Arc<Mutex<T>>
    where
        F: FnOnce() -> T,
    {
        if let Some(slot) = self.get(key).await {
            return slot;
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Drops the slot for `key` unless someone still holds a handle to it.
    ///
    /// Returns `true` if the slot was removed.
    pub async fn remove_if_idle(&self, key: &str) -> bool {
        let mut slots = self.slots.write().await;
        match slots.get(key) {
            Some(slot) if Arc::strong_count(slot) == 1 => {
                slots.remove(key);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_shares_a_slot() {
        let arena: SlotArena<u32> = SlotArena::new();
        let a = arena.get_or_insert_with("a", || 1).await;
        let again = arena.get_or_insert_with("a", || 99).await;
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(*again.lock().await, 1);
        assert_eq!(arena.len().await, 1);
    }

    #[tokio::test]
    async fn test_busy_slot_is_not_removed() {
        let arena: SlotArena<u32> = SlotArena::new();
        let held = arena.get_or_insert_with("a", || 1).await;
        assert!(!arena.remove_if_idle("a").await);

        drop(held);
        assert!(arena.remove_if_idle("a").await);
        assert!(arena.is_empty().await);
        assert!(!arena.remove_if_idle("a").await);
    }

    #[tokio::test]
    async fn test_slots_do_not_block_each_other() {
        let arena: SlotArena<u32> = SlotArena::new();
        let a = arena.get_or_insert_with("a", || 0).await;
        let _guard = a.lock().await;

        let b = arena.get_or_insert_with("b", || 0).await;
        *b.lock().await += 1;
        assert_eq!(*b.lock().await, 1);
    }
}
