use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use log::{debug, warn};
use messages::data::CacheEntryInfo;
use parking_lot::RwLock;

type Slot<K> = (String, K);

#[derive(Debug)]
struct Entries<K, V> {
    values: HashMap<Slot<K>, BTreeMap<u64, V>>,
    /// The generation of the last clear covering every model.
    cleared_all: u64,
    /// The generation of the last clear scoped to each model.
    cleared: HashMap<String, u64>,
}

impl<K, V> Entries<K, V> {
    fn cleared_since(&self, model: &str, generation: u64) -> bool {
        self.cleared_all > generation
            || self.cleared.get(model).is_some_and(|&g| g > generation)
    }
}

/// A store of values keyed by model name, artifact key and model version.
///
/// Each `(model, key)` slot retains its most recent `retention` versions. Every
/// clear bumps the cache generation, writers capture the generation before they
/// start computing and their write is discarded if a clear covering its model
/// happened in the meantime.
#[derive(Debug)]
pub struct VersionedCache<K, V> {
    kind: &'static str,
    entries: RwLock<Entries<K, V>>,
    retention: AtomicUsize,
    generation: AtomicU64,
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new `VersionedCache`.
    ///
    /// # Arguments
    /// * `kind` - The kind of artifact stored, used in diagnostics.
    /// * `retention` - The amount of versions kept per slot.
    pub fn new(kind: &'static str, retention: usize) -> Self {
        Self {
            kind,
            entries: RwLock::new(Entries {
                values: HashMap::new(),
                cleared_all: 0,
                cleared: HashMap::new(),
            }),
            retention: AtomicUsize::new(retention.max(1)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn set_retention(&self, retention: usize) {
        self.retention.store(retention.max(1), Ordering::Relaxed);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `value` unless the results of `model` were cleared after
    /// `generation` was read.
    ///
    /// # Returns
    /// Whether the value was stored.
    pub fn insert(&self, generation: u64, model: &str, key: K, version: u64, value: V) -> bool {
        let mut entries = self.entries.write();

        if entries.cleared_since(model, generation) {
            warn!(kind = self.kind, model = model; "discarding a stale cache write");
            return false;
        }

        let versions = entries.values.entry((model.to_string(), key)).or_default();
        versions.insert(version, value);

        let retention = self.retention.load(Ordering::Relaxed);
        while versions.len() > retention {
            versions.pop_first();
        }

        true
    }

    pub fn get(&self, model: &str, key: &K, version: u64) -> Option<V> {
        self.entries
            .read()
            .values
            .get(&(model.to_string(), key.clone()))
            .and_then(|versions| versions.get(&version).cloned())
    }

    /// The most recent version stored for the slot.
    pub fn latest(&self, model: &str, key: &K) -> Option<(u64, V)> {
        self.entries
            .read()
            .values
            .get(&(model.to_string(), key.clone()))
            .and_then(|versions| versions.last_key_value())
            .map(|(&version, value)| (version, value.clone()))
    }

    /// Every retained version of the slot, oldest first.
    pub fn history(&self, model: &str, key: &K) -> Vec<(u64, V)> {
        self.entries
            .read()
            .values
            .get(&(model.to_string(), key.clone()))
            .map(|versions| versions.iter().map(|(&v, value)| (v, value.clone())).collect())
            .unwrap_or_default()
    }

    /// The keys holding at least one version for `model`, in no particular order.
    pub fn keys(&self, model: &str) -> Vec<K> {
        self.entries
            .read()
            .values
            .keys()
            .filter(|(m, _)| m == model)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Removes every entry matching `pred` and bumps the generation.
    ///
    /// # Arguments
    /// * `model` - The only model `pred` can match, `None` if it may match any.
    /// * `pred` - Selects the entries to remove.
    ///
    /// # Returns
    /// The amount of removed entries.
    pub fn clear_where<F>(&self, model: Option<&str>, pred: F) -> usize
    where
        F: Fn(&str, &K, u64) -> bool,
    {
        let mut entries = self.entries.write();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        match model {
            Some(model) => {
                entries.cleared.insert(model.to_string(), generation);
            }
            None => entries.cleared_all = generation,
        }

        let mut removed = 0;
        entries.values.retain(|(model, key), versions| {
            let before = versions.len();
            versions.retain(|&version, _| !pred(model, key, version));
            removed += before - versions.len();
            !versions.is_empty()
        });

        debug!(kind = self.kind, removed = removed; "cache cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Describes every entry of the cache.
    ///
    /// # Arguments
    /// * `describe_key` - Renders the artifact key of an entry.
    /// * `byte_size` - The approximate size of a value.
    pub fn infos<D, S>(&self, describe_key: D, byte_size: S) -> Vec<CacheEntryInfo>
    where
        D: Fn(&K) -> String,
        S: Fn(&V) -> usize,
    {
        let (describe_key, byte_size) = (&describe_key, &byte_size);

        let mut infos: Vec<_> = self
            .entries
            .read()
            .values
            .iter()
            .flat_map(|((model, key), versions)| {
                versions.iter().map(move |(&version, value)| CacheEntryInfo {
                    kind: self.kind.to_string(),
                    model_name: model.clone(),
                    key: describe_key(key),
                    version,
                    byte_size: byte_size(value),
                })
            })
            .collect();

        infos.sort_by(|a, b| {
            (&a.model_name, &a.key, a.version).cmp(&(&b.model_name, &b.key, b.version))
        });
        infos
    }
}
