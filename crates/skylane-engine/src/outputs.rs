// Output store.
// A type-keyed map publishing action results for later actions to consume.
// Reads never fail: an unset key yields its declared default, computed
// once and cached.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::action::short_type_name;
use crate::error::MissingValueError;

/// A declared output slot. The key type itself is the identity; the value
/// carries a default used whenever no action has published the slot.
pub trait OutputKey: 'static {
    type Value: Clone + Send + Sync + 'static;

    /// The value reads yield when the key was never explicitly written.
    /// Computed at most once per run and cached.
    fn default_value() -> Self::Value;
}

#[derive(Default)]
struct OutputMaps {
    /// Explicitly published values. Last write wins.
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    /// Defaults computed on first read of an unset key.
    cached_defaults: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

/// Keyed storage for values published by actions.
///
/// Internally locked so an action that fans out concurrent sub-operations
/// (say, resolving several secrets at once) can share the store safely.
#[derive(Default)]
pub struct OutputStore {
    inner: Mutex<OutputMaps>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value under `K`, replacing any earlier value.
    pub fn set<K: OutputKey>(&self, value: K::Value) {
        self.inner
            .lock()
            .values
            .insert(TypeId::of::<K>(), Arc::new(value));
    }

    /// Read the value under `K`. Never fails: falls back to the cached
    /// default, computing it on first access.
    pub fn get<K: OutputKey>(&self) -> K::Value {
        let mut inner = self.inner.lock();
        let key = TypeId::of::<K>();

        if let Some(value) = inner.values.get(&key) {
            if let Some(value) = value.downcast_ref::<K::Value>() {
                return value.clone();
            }
        }

        if let Some(cached) = inner.cached_defaults.get(&key) {
            if let Some(cached) = cached.downcast_ref::<K::Value>() {
                return cached.clone();
            }
        }

        let default = K::default_value();
        inner.cached_defaults.insert(key, Arc::new(default.clone()));
        default
    }

    /// Read an `Option`-valued key, converting an absent value into a
    /// [`MissingValueError`] attributed to `reading_action`.
    pub fn require<K, T>(&self, reading_action: &str) -> Result<T, MissingValueError>
    where
        K: OutputKey<Value = Option<T>>,
        T: Clone + Send + Sync + 'static,
    {
        self.get::<K>()
            .ok_or_else(|| MissingValueError::new(short_type_name::<K>(), reading_action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct IpaPath;

    impl OutputKey for IpaPath {
        type Value = Option<String>;

        fn default_value() -> Option<String> {
            None
        }
    }

    struct BuildNumber;

    static BUILD_NUMBER_DEFAULTS: AtomicUsize = AtomicUsize::new(0);

    impl OutputKey for BuildNumber {
        type Value = u32;

        fn default_value() -> u32 {
            BUILD_NUMBER_DEFAULTS.fetch_add(1, Ordering::SeqCst);
            1
        }
    }

    #[test]
    fn unset_key_yields_default() {
        let store = OutputStore::new();
        assert_eq!(store.get::<IpaPath>(), None);
    }

    #[test]
    fn default_is_computed_once_and_cached() {
        let store = OutputStore::new();
        let before = BUILD_NUMBER_DEFAULTS.load(Ordering::SeqCst);
        assert_eq!(store.get::<BuildNumber>(), 1);
        assert_eq!(store.get::<BuildNumber>(), 1);
        assert_eq!(store.get::<BuildNumber>(), 1);
        assert_eq!(BUILD_NUMBER_DEFAULTS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn last_write_wins() {
        let store = OutputStore::new();
        store.set::<IpaPath>(Some("/out/app-1.ipa".into()));
        store.set::<IpaPath>(Some("/out/app-2.ipa".into()));
        assert_eq!(store.get::<IpaPath>(), Some("/out/app-2.ipa".to_string()));
    }

    #[test]
    fn explicit_write_shadows_cached_default() {
        let store = OutputStore::new();
        assert_eq!(store.get::<IpaPath>(), None);
        store.set::<IpaPath>(Some("/out/app.ipa".into()));
        assert_eq!(store.get::<IpaPath>(), Some("/out/app.ipa".to_string()));
    }

    #[test]
    fn require_converts_absence_into_descriptive_error() {
        let store = OutputStore::new();
        let err = store.require::<IpaPath, String>("UploadToAppStore").unwrap_err();
        assert_eq!(err.value, "IpaPath");
        assert_eq!(err.action, "UploadToAppStore");

        store.set::<IpaPath>(Some("/out/app.ipa".into()));
        assert_eq!(
            store.require::<IpaPath, String>("UploadToAppStore").unwrap(),
            "/out/app.ipa"
        );
    }
}
