//! An in-memory registry tree.
//!
//! Used as the test fixture for the engine and as the backend for offline snapshots.
//! A snapshot is a YAML (or JSON) document mapping hive names to key trees:
//!
//! ```yaml
//! HKEY_CURRENT_USER:
//!   keys:
//!     Software:
//!       keys:
//!         Foo:
//!           values:
//!             "": { type: string, data: "findme-secret" }
//! HKEY_LOCAL_MACHINE:
//!   keys:
//!     Protected:
//!       fault: access_denied
//! ```
//!
//! The `fault` field injects the failures the live registry produces, so failure
//! isolation can be exercised without special privileges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{join_path, Hive, RegistryKey, RegistryStore, RegistryValue, PATH_SEPARATOR};
use crate::errors::{SearchError, SearchResult};

/// A failure to raise when a key is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFault {
    /// Opening the key is refused.
    AccessDenied,
    /// The key disappears between enumeration and open.
    Vanished,
    /// The key opens but its children cannot be listed.
    EnumerationDenied,
    /// The key opens but reading any value fails.
    CorruptValues,
}

/// One key of the in-memory tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyNode {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, Arc<KeyNode>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, RegistryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<KeyFault>,
}

impl KeyNode {
    fn descend_mut(&mut self, path: &str) -> &mut KeyNode {
        let mut node = self;
        for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            let child = node.keys.entry(segment.to_string()).or_default();
            node = Arc::make_mut(child);
        }
        node
    }
}

/// Registry backed by an in-memory tree.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hives: BTreeMap<Hive, Arc<KeyNode>>,
    live_handles: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Creates a store with no hives. Every root is unavailable until populated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML snapshot.
    pub fn from_yaml(text: &str) -> SearchResult<Self> {
        let hives: BTreeMap<Hive, KeyNode> = serde_yaml::from_str(text)?;
        Ok(Self::from_hives(hives))
    }

    /// Parses a JSON snapshot.
    pub fn from_json(text: &str) -> SearchResult<Self> {
        let hives: BTreeMap<Hive, KeyNode> = serde_json::from_str(text)?;
        Ok(Self::from_hives(hives))
    }

    /// Loads a snapshot file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> SearchResult<Self> {
        let text = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    fn from_hives(hives: BTreeMap<Hive, KeyNode>) -> Self {
        Self {
            hives: hives
                .into_iter()
                .map(|(hive, node)| (hive, Arc::new(node)))
                .collect(),
            live_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serializes the tree back into snapshot YAML.
    pub fn to_yaml(&self) -> SearchResult<String> {
        Ok(serde_yaml::to_string(&self.hives)?)
    }

    fn node_mut(&mut self, hive: Hive, path: &str) -> &mut KeyNode {
        let root = self.hives.entry(hive).or_default();
        Arc::make_mut(root).descend_mut(path)
    }

    /// Creates `path` (and any missing parents) under `hive`.
    pub fn insert_key(&mut self, hive: Hive, path: &str) -> &mut Self {
        self.node_mut(hive, path);
        self
    }

    /// Stores a value on `path`, creating the key if needed.
    pub fn insert_value(
        &mut self,
        hive: Hive,
        path: &str,
        name: &str,
        value: RegistryValue,
    ) -> &mut Self {
        self.node_mut(hive, path)
            .values
            .insert(name.to_string(), value);
        self
    }

    /// Makes touching `path` fail with `fault`. An empty path targets the hive root.
    pub fn set_fault(&mut self, hive: Hive, path: &str, fault: KeyFault) -> &mut Self {
        self.node_mut(hive, path).fault = Some(fault);
        self
    }

    /// Number of key handles currently open.
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    fn handle(&self, name: String, node: Arc<KeyNode>) -> MemoryKey {
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        MemoryKey {
            name,
            node,
            live_handles: Arc::clone(&self.live_handles),
        }
    }
}

impl RegistryStore for MemoryStore {
    type Key = MemoryKey;

    fn open_root(&self, hive: Hive) -> SearchResult<MemoryKey> {
        let node = self
            .hives
            .get(&hive)
            .ok_or_else(|| SearchError::root_unavailable(hive, "hive is not present"))?;
        match node.fault {
            Some(KeyFault::AccessDenied) => {
                Err(SearchError::root_unavailable(hive, "access denied"))
            }
            Some(KeyFault::Vanished) => {
                Err(SearchError::root_unavailable(hive, "hive has vanished"))
            }
            _ => Ok(self.handle(hive.name().to_string(), Arc::clone(node))),
        }
    }
}

/// Handle to a key of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryKey {
    name: String,
    node: Arc<KeyNode>,
    live_handles: Arc<AtomicUsize>,
}

impl MemoryKey {
    fn check_enumerable(&self) -> SearchResult<()> {
        if self.node.fault == Some(KeyFault::EnumerationDenied) {
            return Err(SearchError::access_denied(self.name.as_str()));
        }
        Ok(())
    }
}

impl RegistryKey for MemoryKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn subkey_names(&self) -> SearchResult<Vec<String>> {
        self.check_enumerable()?;
        Ok(self.node.keys.keys().cloned().collect())
    }

    fn subkey_count(&self) -> SearchResult<usize> {
        self.check_enumerable()?;
        Ok(self.node.keys.len())
    }

    fn open_subkey(&self, name: &str) -> SearchResult<Option<MemoryKey>> {
        let Some(child) = self.node.keys.get(name) else {
            return Ok(None);
        };
        let path = join_path(&self.name, name);
        match child.fault {
            Some(KeyFault::AccessDenied) => Err(SearchError::access_denied(path)),
            Some(KeyFault::Vanished) => Ok(None),
            _ => {
                self.live_handles.fetch_add(1, Ordering::SeqCst);
                Ok(Some(MemoryKey {
                    name: path,
                    node: Arc::clone(child),
                    live_handles: Arc::clone(&self.live_handles),
                }))
            }
        }
    }

    fn value_names(&self) -> SearchResult<Vec<String>> {
        Ok(self.node.values.keys().cloned().collect())
    }

    fn value(&self, name: &str) -> SearchResult<Option<RegistryValue>> {
        if self.node.fault == Some(KeyFault::CorruptValues) {
            return Err(SearchError::invalid_data(
                self.name.as_str(),
                format!("value '{}' could not be decoded", name),
            ));
        }
        Ok(self.node.values.get(name).cloned())
    }
}

impl Drop for MemoryKey {
    fn drop(&mut self) {
        self.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
