//! Cancelable per-key delay scheduler.
//!
//! # Responsibility
//! - Coalesce rapid successive values for the same key into the latest one.
//! - Report which keys have been quiet for a full window.
//!
//! # Invariants
//! - At most one pending value exists per key.
//! - Scheduling a key again cancels its previous value and restarts the window.
//! - Time only advances through the `now` arguments supplied by the caller.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    due_at: Instant,
}

/// Debounce buffer keyed by `K`.
#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    window: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedules `value` for `key`, due one window after `now`.
    ///
    /// Returns `true` when an older pending value was canceled.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) -> bool {
        let due_at = now + self.window;
        self.pending
            .insert(key, Pending { value, due_at })
            .is_some()
    }

    /// Cancels the pending value for `key`, returning it.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|pending| pending.value)
    }

    /// Pending value for `key`, if one is waiting.
    pub fn pending(&self, key: &K) -> Option<&V> {
        self.pending.get(key).map(|pending| &pending.value)
    }

    /// Cancels every pending value whose key matches `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, _| !predicate(key));
        before - self.pending.len()
    }

    /// Puts back a value taken by `take_due`/`drain`, unless a newer value
    /// was scheduled for the key meanwhile.
    pub fn requeue(&mut self, key: K, value: V, due_at: Instant) -> bool {
        if self.pending.contains_key(&key) {
            return false;
        }
        self.pending.insert(key, Pending { value, due_at });
        true
    }

    /// Removes and returns every value due at or before `now`, oldest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.due_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        self.take_keys(due_keys)
    }

    /// Removes and returns every pending value, oldest first.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.pending.keys().cloned().collect();
        self.take_keys(keys)
    }

    /// Earliest instant at which a pending value becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.due_at).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take_keys(&mut self, keys: Vec<K>) -> Vec<(K, V)> {
        let mut taken: Vec<(Instant, K, V)> = keys
            .into_iter()
            .filter_map(|key| {
                self.pending
                    .remove(&key)
                    .map(|pending| (pending.due_at, key, pending.value))
            })
            .collect();
        taken.sort_by_key(|(due_at, _, _)| *due_at);
        taken
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    const WINDOW: Duration = Duration::from_millis(500);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn rapid_edits_coalesce_to_last_value() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        assert!(!debouncer.schedule("title", "G", t));
        assert!(debouncer.schedule("title", "Gro", t + ms(50)));
        assert!(debouncer.schedule("title", "Groceries", t + ms(100)));

        assert!(debouncer.take_due(t + ms(550)).is_empty());
        assert_eq!(debouncer.take_due(t + ms(600)), [("title", "Groceries")]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn keys_are_debounced_independently() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("text", 1, t);
        debouncer.schedule("done", 2, t + ms(300));

        assert_eq!(debouncer.next_due(), Some(t + WINDOW));
        assert_eq!(debouncer.take_due(t + ms(500)), [("text", 1)]);
        assert_eq!(debouncer.take_due(t + ms(800)), [("done", 2)]);
    }

    #[test]
    fn cancel_discards_pending_value() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule(1, "a", t);
        debouncer.schedule(2, "b", t);

        assert_eq!(debouncer.pending(&1), Some(&"a"));
        assert_eq!(debouncer.cancel(&1), Some("a"));
        assert_eq!(debouncer.pending(&1), None);
        assert_eq!(debouncer.cancel_where(|key| *key == 2), 1);
        assert!(debouncer.take_due(t + ms(1_000)).is_empty());
    }

    #[test]
    fn requeue_does_not_override_newer_value() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("k", "old", t);
        let taken = debouncer.take_due(t + WINDOW);
        assert_eq!(taken, [("k", "old")]);

        debouncer.schedule("k", "new", t + ms(600));
        assert!(!debouncer.requeue("k", "old", t + WINDOW));
        assert_eq!(debouncer.drain(), [("k", "new")]);

        assert!(debouncer.requeue("k", "old", t));
        assert_eq!(debouncer.take_due(t), [("k", "old")]);
    }

    #[test]
    fn drain_returns_values_in_due_order() {
        let t = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("late", 2, t + ms(200));
        debouncer.schedule("early", 1, t);
        assert_eq!(debouncer.drain(), [("early", 1), ("late", 2)]);
    }
}
