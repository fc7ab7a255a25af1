use dashmap::DashMap;
use tokio::time::{Duration, Instant};

use crate::types::SessionKey;

struct Entry<T> {
    value: T,
    created: Instant,
}

/// TTL-bounded concurrent map of ephemeral sessions.
///
/// An entry older than `ttl` is treated as absent by every lookup and
/// evicted on the spot; [`sweep`](Self::sweep) clears the ones nobody asks
/// about again.
pub struct Registry<T> {
    entries: DashMap<SessionKey, Entry<T>>,
    ttl: Duration,
}

impl<T: Clone> Registry<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.created) >= self.ttl
    }

    /// Store `value`, replacing any previous entry. Returns the replaced value
    /// if it was still live.
    pub fn insert(&self, key: SessionKey, value: T) -> Option<T> {
        let now = Instant::now();
        self.entries
            .insert(key, Entry { value, created: now })
            .filter(|old| !self.expired(old, now))
            .map(|old| old.value)
    }

    /// Live value under `key`, if any.
    pub fn get(&self, key: &SessionKey) -> Option<T> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !self.expired(&entry, now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, e| self.expired(e, now));
        None
    }

    /// Mutate a live entry in place. The creation instant is kept.
    pub fn update<R>(&self, key: &SessionKey, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;
        if self.expired(&entry, now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| self.expired(e, now));
            return None;
        }
        Some(f(&mut entry.value))
    }

    /// Atomically remove and return the live entry if `accept` approves it.
    /// A rejected entry stays in place; an expired one is evicted.
    pub fn take_if(&self, key: &SessionKey, accept: impl FnOnce(&T) -> bool) -> Option<T> {
        let now = Instant::now();
        let mut stale = false;
        let removed = self.entries.remove_if(key, |_, e| {
            if self.expired(e, now) {
                stale = true;
                return true;
            }
            accept(&e.value)
        });
        match removed {
            Some((_, entry)) if !stale => Some(entry.value),
            _ => None,
        }
    }

    pub fn remove(&self, key: &SessionKey) -> Option<T> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .filter(|(_, e)| !self.expired(e, now))
            .map(|(_, e)| e.value)
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !self.expired(e, now));
        before.saturating_sub(self.entries.len())
    }

    /// Entries currently stored, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::types::{Identity, TenantId};

    fn key(who: &str) -> SessionKey {
        SessionKey::new(TenantId::from("1"), Identity::from(who))
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let reg = Registry::new(Duration::from_secs(600));
        reg.insert(key("a"), 1u32);
        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(reg.get(&key("a")), Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(reg.get(&key("a")), None);
        assert!(reg.is_empty(), "expired entry evicted on lookup");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired() {
        let reg = Registry::new(Duration::from_secs(10));
        reg.insert(key("old"), 1u32);
        tokio::time::advance(Duration::from_secs(6)).await;
        reg.insert(key("new"), 2u32);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(reg.sweep(), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&key("new")), Some(2));
    }

    #[test]
    fn insert_replaces_and_reports_live_value() {
        let reg = Registry::new(Duration::from_secs(60));
        assert_eq!(reg.insert(key("a"), 1u32), None);
        assert_eq!(reg.insert(key("a"), 2u32), Some(1));
        assert_eq!(reg.get(&key("a")), Some(2));
    }

    #[test]
    fn zero_ttl_means_always_expired() {
        let reg = Registry::new(Duration::ZERO);
        reg.insert(key("a"), 1u32);
        assert_eq!(reg.get(&key("a")), None);
        reg.insert(key("b"), 1u32);
        assert_eq!(reg.take_if(&key("b"), |_| true), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn take_if_leaves_rejected_entries() {
        let reg = Registry::new(Duration::from_secs(60));
        reg.insert(key("a"), 5u32);
        assert_eq!(reg.take_if(&key("a"), |v| *v > 10), None);
        assert_eq!(reg.get(&key("a")), Some(5));
        assert_eq!(reg.take_if(&key("a"), |v| *v == 5), Some(5));
        assert_eq!(reg.get(&key("a")), None);
    }

    #[test]
    fn update_mutates_live_entry() {
        let reg = Registry::new(Duration::from_secs(60));
        reg.insert(key("a"), 1u32);
        assert_eq!(reg.update(&key("a"), |v| {
            *v += 1;
            *v
        }), Some(2));
        assert_eq!(reg.update(&key("missing"), |v| *v), None);
    }
}
