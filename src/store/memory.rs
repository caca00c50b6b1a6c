//! In-memory storage implementation

use super::entry::Entry;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::time::{Duration, Instant, SystemTime};

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<Bytes, Slot, BuildHasherDefault<SipHasher13>>;

/// Number of keys drawn per active-expiry round
pub const SWEEP_SAMPLE_SIZE: usize = 20;

/// Sampling continues while more than this fraction of a round was expired
pub const SWEEP_EXPIRED_THRESHOLD: f64 = 0.25;

/// Wall-clock time one active expiration pass may spend before yielding
pub const SWEEP_TIME_BUDGET: Duration = Duration::from_millis(25);

/// An entry and the position of its key in `Keyspace::keys`
struct Slot {
    entry: Entry,
    index: usize,
}

/// The map plus a dense key list, so random sampling never walks the map
struct Keyspace {
    entries: StoreMap,
    keys: Vec<Bytes>,
}

impl Keyspace {
    fn with_capacity(capacity: usize) -> Self {
        Keyspace {
            entries: HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            ),
            keys: Vec::with_capacity(capacity),
        }
    }

    fn insert(&mut self, key: Bytes, entry: Entry) {
        match self.entries.get_mut(&key) {
            Some(slot) => slot.entry = entry,
            None => {
                self.keys.push(key.clone());
                let index = self.keys.len() - 1;
                self.entries.insert(key, Slot { entry, index });
            }
        }
    }

    fn remove(&mut self, key: &[u8]) -> Option<Entry> {
        let slot = self.entries.remove(key)?;
        self.keys.swap_remove(slot.index);

        // The former last key now sits where the removed one was
        if let Some(moved) = self.keys.get(slot.index) {
            if let Some(moved_slot) = self.entries.get_mut(moved) {
                moved_slot.index = slot.index;
            }
        }
        Some(slot.entry)
    }

    /// Remove the entry if it has expired, then return what is left
    fn live_entry(&mut self, key: &[u8], now: SystemTime) -> Option<&mut Entry> {
        if self.remove_if_expired(key, now) {
            return None;
        }
        self.entries.get_mut(key).map(|slot| &mut slot.entry)
    }

    /// True only if the key was present and expired (and is now gone)
    fn remove_if_expired(&mut self, key: &[u8], now: SystemTime) -> bool {
        let expired = self
            .entries
            .get(key)
            .map(|slot| slot.entry.is_expired_at(now))
            .unwrap_or(false);

        if expired {
            self.remove(key);
        }
        expired
    }
}

/// In-memory key-value store
///
/// Shared by every connection. Each method takes the lock for exactly one
/// key operation and releases it before returning, so callers never hold it
/// across I/O. Expired entries are removed the moment they are looked at.
pub struct MemoryStore {
    map: Mutex<Keyspace>,
}

impl MemoryStore {
    /// Create a new memory store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new memory store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            map: Mutex::new(Keyspace::with_capacity(capacity)),
        }
    }

    /// Get a copy of the live entry for a key
    pub fn get(&self, key: &[u8]) -> Option<Entry> {
        self.read(key, |entry| entry.cloned())
    }

    /// Run `f` against the live entry for a key without copying it
    pub fn read<R>(&self, key: &[u8], f: impl FnOnce(Option<&Entry>) -> R) -> R {
        let mut map = self.map.lock();
        let entry = map.live_entry(key, SystemTime::now());
        f(entry.map(|e| &*e))
    }

    /// Insert or replace the entry for a key
    pub fn set(&self, key: impl Into<Bytes>, entry: Entry) {
        self.map.lock().insert(key.into(), entry);
    }

    /// Delete a key, returns true if a live entry was removed
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut map = self.map.lock();
        match map.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    /// Check if a key exists (and is not expired)
    pub fn contains(&self, key: &[u8]) -> bool {
        let mut map = self.map.lock();
        map.live_entry(key, SystemTime::now()).is_some()
    }

    /// Get a copy of the live entry for a key, or `default` when absent
    pub fn get_or_default(&self, key: &[u8], default: Entry) -> Entry {
        self.get(key).unwrap_or(default)
    }

    /// Atomically read and modify the slot for a key
    ///
    /// `f` sees `None` when the key is absent or expired. Whatever the slot
    /// holds when `f` returns is written back; leaving `None` deletes the key.
    pub fn update<R>(&self, key: &Bytes, f: impl FnOnce(&mut Option<Entry>) -> R) -> R {
        let mut map = self.map.lock();
        let now = SystemTime::now();

        let mut slot = map.remove(key).filter(|entry| !entry.is_expired_at(now));
        let result = f(&mut slot);

        if let Some(entry) = slot {
            map.insert(key.clone(), entry);
        }
        result
    }

    /// Drop the key if its entry has expired
    ///
    /// Returns false for live keys and for keys that are already gone.
    pub fn remove_if_expired(&self, key: &[u8]) -> bool {
        self.map.lock().remove_if_expired(key, SystemTime::now())
    }

    /// Number of stored keys, including expired ones not yet reclaimed
    pub fn len(&self) -> usize {
        self.map.lock().keys.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw up to `amount` distinct keys uniformly at random
    ///
    /// Costs O(`amount`) whatever the size of the store.
    pub fn sample_keys<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<Bytes> {
        self.map
            .lock()
            .keys
            .choose_multiple(rng, amount)
            .cloned()
            .collect()
    }

    /// Active expiration pass with the thread-local RNG
    pub fn sweep_expired(&self) -> SweepStats {
        self.sweep_expired_with(&mut rand::thread_rng())
    }

    /// Active expiration pass
    ///
    /// Samples `SWEEP_SAMPLE_SIZE` keys per round and checks each one under
    /// its own lock acquisition. Another round follows while more than
    /// `SWEEP_EXPIRED_THRESHOLD` of the sample had expired, until the pass
    /// has used up `SWEEP_TIME_BUDGET`; the next pass picks up from there.
    pub fn sweep_expired_with<R: Rng + ?Sized>(&self, rng: &mut R) -> SweepStats {
        let started = Instant::now();
        let mut stats = SweepStats::default();

        // Every productive round removes at least one key, so this bound only
        // matters when writers keep adding expired keys during the pass.
        let max_rounds = self.len();

        while stats.rounds < max_rounds {
            let sample = self.sample_keys(rng, SWEEP_SAMPLE_SIZE);
            if sample.is_empty() {
                break;
            }

            let expired = sample
                .iter()
                .filter(|key| self.remove_if_expired(key))
                .count();

            stats.rounds += 1;
            stats.sampled += sample.len();
            stats.expired += expired;

            if expired as f64 / sample.len() as f64 <= SWEEP_EXPIRED_THRESHOLD {
                break;
            }
            if started.elapsed() >= SWEEP_TIME_BUDGET {
                stats.out_of_time = true;
                break;
            }
        }

        stats
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one active expiration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Sampling rounds performed
    pub rounds: usize,
    /// Keys inspected across all rounds
    pub sampled: usize,
    /// Keys found expired (and removed)
    pub expired: usize,
    /// The pass stopped on `SWEEP_TIME_BUDGET` with expired keys left over
    pub out_of_time: bool,
}
