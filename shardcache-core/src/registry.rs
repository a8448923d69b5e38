//! Process-wide name to group directory.
//!
//! Grounded on `original_source/ocache.go`'s package-level `groups` map
//! guarded by a `sync.RWMutex`: `NewGroup` takes the write lock,
//! `GetGroup` takes the read lock. Rust has no ambient package-level
//! globals in the same sense, so per the design notes this is an explicit
//! service object a caller constructs once (typically one per process) and
//! threads through, rather than a `static`.

use std::sync::Arc;

use parking_lot::RwLock;
use shardcache_common::Getter;

use crate::group::Group;

/// A read-mostly directory of groups, keyed by name.
#[derive(Default)]
pub struct Registry {
    groups: RwLock<hashbrown::HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group named `name` with local-cache byte cap `cap_bytes`
    /// and backing source `getter`, and registers it.
    ///
    /// A duplicate name silently overwrites the prior binding, matching the
    /// Go original (the spec flags this as caller error but does not
    /// enforce it).
    pub fn new_group(&self, name: impl Into<String>, cap_bytes: usize, getter: Arc<dyn Getter>) -> Arc<Group> {
        let name = name.into();
        let group = Group::new(name.clone(), cap_bytes, getter);
        self.groups.write().insert(name, group.clone());
        group
    }

    /// Looks up a previously registered group by name.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use shardcache_common::BackingFn;

    use super::*;

    fn noop_getter() -> Arc<dyn Getter> {
        Arc::new(BackingFn(|key: &str| Ok(key.as_bytes().to_vec())))
    }

    #[test]
    fn unknown_group_returns_none() {
        let registry = Registry::new();
        assert!(registry.get_group("missing").is_none());
    }

    #[test]
    fn registered_group_is_retrievable_by_name() {
        let registry = Registry::new();
        let group = registry.new_group("g", 1024, noop_getter());
        assert!(Arc::ptr_eq(&group, &registry.get_group("g").unwrap()));
    }

    #[test]
    fn duplicate_name_silently_overwrites() {
        let registry = Registry::new();
        let first = registry.new_group("g", 1024, noop_getter());
        let second = registry.new_group("g", 1024, noop_getter());
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &registry.get_group("g").unwrap()));
    }
}
