//! Read-only access to a hierarchical key/value store.
//!
//! The search engine never talks to the Windows API directly. It walks whatever
//! implements [`RegistryStore`], which keeps the traversal testable on any platform:
//! [`MemoryStore`] backs the tests and offline snapshots, and `WindowsRegistry`
//! (Windows only) reads the live registry.
//!
//! A [`RegistryKey`] is a handle. Whatever the backend holds open for it is released
//! when the value is dropped, so a handle never outlives the scope that opened it.

pub mod memory;
#[cfg(windows)]
pub mod windows;

pub use memory::{KeyFault, KeyNode, MemoryKey, MemoryStore};
#[cfg(windows)]
pub use windows::{WindowsKey, WindowsRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SearchResult;

/// Separator between key names in a full registry path.
pub const PATH_SEPARATOR: char = '\\';

/// Top-level entry points into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hive {
    #[serde(rename = "HKEY_CLASSES_ROOT", alias = "HKCR")]
    ClassesRoot,
    #[serde(rename = "HKEY_CURRENT_USER", alias = "HKCU")]
    CurrentUser,
    #[serde(rename = "HKEY_LOCAL_MACHINE", alias = "HKLM")]
    LocalMachine,
    #[serde(rename = "HKEY_USERS", alias = "HKU")]
    Users,
    #[serde(rename = "HKEY_CURRENT_CONFIG", alias = "HKCC")]
    CurrentConfig,
}

impl Hive {
    /// Hives searched when nothing else is configured.
    pub const DEFAULT_ROOTS: [Hive; 3] = [Hive::CurrentUser, Hive::LocalMachine, Hive::Users];

    /// Full name as it appears at the start of every key path.
    pub fn name(self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Parses either the full name or the usual abbreviation, ignoring case.
    pub fn parse(s: &str) -> Option<Hive> {
        let upper = s.trim().to_ascii_uppercase();
        let hive = match upper.as_str() {
            "HKEY_CLASSES_ROOT" | "HKCR" => Hive::ClassesRoot,
            "HKEY_CURRENT_USER" | "HKCU" => Hive::CurrentUser,
            "HKEY_LOCAL_MACHINE" | "HKLM" => Hive::LocalMachine,
            "HKEY_USERS" | "HKU" => Hive::Users,
            "HKEY_CURRENT_CONFIG" | "HKCC" => Hive::CurrentConfig,
            _ => return None,
        };
        Some(hive)
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed payload of a registry value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RegistryValue {
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Dword(u32),
    Qword(u64),
    Binary(Vec<u8>),
    None,
}

impl RegistryValue {
    /// The payload as text, for the value kinds that are stored as a single string.
    ///
    /// Multi-strings and numeric or binary data return `None` and never take part in
    /// value matching.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegistryValue::String(s) | RegistryValue::ExpandString(s) => Some(s),
            _ => None,
        }
    }
}

/// Joins a parent path and a child name the way registry paths are written.
pub fn join_path(parent: &str, child: &str) -> String {
    let mut path = String::with_capacity(parent.len() + child.len() + 1);
    path.push_str(parent);
    path.push(PATH_SEPARATOR);
    path.push_str(child);
    path
}

/// An open handle to one key.
pub trait RegistryKey: Sized {
    /// Full path of the key, starting with the hive name.
    fn name(&self) -> &str;

    /// Names of the immediate children.
    fn subkey_names(&self) -> SearchResult<Vec<String>>;

    /// Number of immediate children.
    fn subkey_count(&self) -> SearchResult<usize>;

    /// Opens a child for reading. `Ok(None)` means the child no longer exists.
    fn open_subkey(&self, name: &str) -> SearchResult<Option<Self>>;

    /// Names of the values stored directly on this key. The default value is `""`.
    fn value_names(&self) -> SearchResult<Vec<String>>;

    /// Reads one value. `Ok(None)` means it disappeared after enumeration.
    fn value(&self, name: &str) -> SearchResult<Option<RegistryValue>>;
}

/// A source of root keys, shared by every worker of a search.
pub trait RegistryStore: Send + Sync {
    type Key: RegistryKey;

    /// Opens the top-level key of `hive`.
    fn open_root(&self, hive: Hive) -> SearchResult<Self::Key>;
}
