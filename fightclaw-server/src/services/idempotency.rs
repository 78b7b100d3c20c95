use std::collections::VecDeque;

use uuid::Uuid;

/// Cached response for a previously-accepted `moveId`, keyed so a retried
/// submission returns the exact same payload (spec §3 `IdempotencyRecord`).
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub body: serde_json::Value,
    pub state_version_at_time: u64,
}

struct Entry {
    move_id: Uuid,
    response: CachedResponse,
}

/// Bounded per-match cache, capacity `IDEMPOTENCY_MAX`. Eviction is
/// FIFO-with-protection: the oldest entry is dropped only if its
/// `stateVersion` is more than one behind the current version (spec §3, §9
/// "Idempotency cache eviction").
pub struct IdempotencyCache {
    capacity: usize,
    entries: VecDeque<Entry>,
}

impl IdempotencyCache {
    pub fn new(capacity: usize) -> Self {
        IdempotencyCache {
            capacity,
            entries: VecDeque::new(),
        }
    }

    pub fn get(&self, move_id: Uuid) -> Option<CachedResponse> {
        self.entries
            .iter()
            .find(|e| e.move_id == move_id)
            .map(|e| e.response.clone())
    }

    pub fn insert(&mut self, move_id: Uuid, response: CachedResponse, current_version: u64) {
        if self.entries.iter().any(|e| e.move_id == move_id) {
            return;
        }

        while self.entries.len() >= self.capacity {
            let protected = self
                .entries
                .front()
                .is_some_and(|e| e.response.state_version_at_time + 1 >= current_version);
            if protected {
                break;
            }
            self.entries.pop_front();
        }

        if self.entries.len() < self.capacity {
            self.entries.push_back(Entry { move_id, response });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(v: u64) -> CachedResponse {
        CachedResponse {
            status: 200,
            body: serde_json::json!({"stateVersion": v}),
            state_version_at_time: v,
        }
    }

    #[test]
    fn duplicate_move_id_returns_cached_verbatim() {
        let mut cache = IdempotencyCache::new(200);
        let id = Uuid::new_v4();
        cache.insert(id, resp(1), 1);
        let got = cache.get(id).unwrap();
        assert_eq!(got.state_version_at_time, 1);
    }

    #[test]
    fn eviction_protects_recent_state_versions() {
        let mut cache = IdempotencyCache::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.insert(a, resp(1), 2);
        cache.insert(b, resp(2), 2);
        // both entries are within the protection window (>= current - 1 == 1)
        let c = Uuid::new_v4();
        cache.insert(c, resp(3), 3);
        assert_eq!(cache.entries.len(), 2);
        assert!(cache.get(a).is_none() || cache.get(b).is_none());
    }

    #[test]
    fn new_entry_admitted_when_oldest_outside_protection() {
        let mut cache = IdempotencyCache::new(1);
        let a = Uuid::new_v4();
        cache.insert(a, resp(1), 1);
        let b = Uuid::new_v4();
        // current version now far ahead; oldest (v1) is outside the v>=current-1 window
        cache.insert(b, resp(10), 10);
        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_some());
    }
}
