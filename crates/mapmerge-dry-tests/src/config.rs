// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use mapmerge_app_core::config::{ConfigError, ConfigStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory [`ConfigStore`]. Clones share state, so a test can hand one
/// clone to a `ConfigService` and inspect the other.
///
/// # Example
///
/// ```
/// use mapmerge_dry_tests::InMemoryConfigStore;
/// use mapmerge_app_core::config::ConfigStore;
///
/// let store = InMemoryConfigStore::new();
/// store.save_raw("merge", br#"{"significant_digits":4}"#).unwrap();
/// assert!(store.contains_key("merge"));
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`.
    pub fn with_data<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        let store = Self::new();
        store
            .lock()
            .data
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make every `load_raw` fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Make every `save_raw` fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// `load_raw` calls so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// `save_raw` calls so far, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().data.keys().cloned().collect()
    }

    /// True if `key` holds a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Raw bytes stored under `key`, without counting a load.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.data.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_save_load() {
        let store = InMemoryConfigStore::new();
        store.save_raw("merge", b"{}").unwrap();
        assert_eq!(store.load_raw("merge").unwrap(), b"{}");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("merge"), Err(ConfigError::NotFound)));
    }

    #[test]
    fn failures_still_count_and_store_nothing() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        assert!(matches!(store.save_raw("merge", b"{}"), Err(ConfigError::Other(_))));
        assert_eq!(store.save_count(), 1);
        assert!(!store.contains_key("merge"));

        store.set_fail_on_load(true);
        assert!(store.load_raw("merge").is_err());
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn with_data_prepopulates_sorted_keys() {
        let store =
            InMemoryConfigStore::with_data([("b", b"2".to_vec()), ("a", b"1".to_vec())]);
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.peek("a"), Some(b"1".to_vec()));
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn clones_share_state() {
        let a = InMemoryConfigStore::new();
        let b = a.clone();
        a.save_raw("merge", b"{}").unwrap();
        assert!(b.contains_key("merge"));
        b.set_fail_on_load(true);
        assert!(a.load_raw("merge").is_err());
    }
}
