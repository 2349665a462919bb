//! Live registry access through `winreg`.
//!
//! Every key is opened with `KEY_READ | KEY_WOW64_64KEY`, so 32-bit builds still see the
//! native 64-bit view. The underlying `HKEY` is closed when the [`WindowsKey`] drops.

use winreg::enums::{
    RegType, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_USERS, KEY_READ, KEY_WOW64_64KEY,
};
use winreg::types::FromRegValue;
use winreg::{RegKey, RegValue};

use super::{join_path, Hive, RegistryKey, RegistryStore, RegistryValue};
use crate::errors::{SearchError, SearchResult};

const READ_FLAGS: u32 = KEY_READ | KEY_WOW64_64KEY;

/// The registry of the running machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl RegistryStore for WindowsRegistry {
    type Key = WindowsKey;

    fn open_root(&self, hive: Hive) -> SearchResult<WindowsKey> {
        let predef = match hive {
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        };
        let key = RegKey::predef(predef)
            .open_subkey_with_flags("", READ_FLAGS)
            .map_err(|e| SearchError::root_unavailable(hive, e.to_string()))?;
        Ok(WindowsKey {
            name: hive.name().to_string(),
            key,
        })
    }
}

/// Handle to one live registry key.
#[derive(Debug)]
pub struct WindowsKey {
    name: String,
    key: RegKey,
}

impl RegistryKey for WindowsKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn subkey_names(&self) -> SearchResult<Vec<String>> {
        self.key
            .enum_keys()
            .map(|name| name.map_err(|e| SearchError::from_io(&self.name, e)))
            .collect()
    }

    fn subkey_count(&self) -> SearchResult<usize> {
        let info = self
            .key
            .query_info()
            .map_err(|e| SearchError::from_io(&self.name, e))?;
        Ok(info.sub_keys as usize)
    }

    fn open_subkey(&self, name: &str) -> SearchResult<Option<WindowsKey>> {
        let path = join_path(&self.name, name);
        match self.key.open_subkey_with_flags(name, READ_FLAGS) {
            Ok(key) => Ok(Some(WindowsKey { name: path, key })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SearchError::from_io(&path, e)),
        }
    }

    fn value_names(&self) -> SearchResult<Vec<String>> {
        self.key
            .enum_values()
            .map(|entry| {
                entry
                    .map(|(name, _)| name)
                    .map_err(|e| SearchError::from_io(&self.name, e))
            })
            .collect()
    }

    fn value(&self, name: &str) -> SearchResult<Option<RegistryValue>> {
        match self.key.get_raw_value(name) {
            Ok(raw) => convert(&self.name, &raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SearchError::from_io(&self.name, e)),
        }
    }
}

fn convert(path: &str, raw: &RegValue) -> SearchResult<RegistryValue> {
    let decode_err = |e: std::io::Error| SearchError::invalid_data(path, e.to_string());
    let value = match raw.vtype {
        RegType::REG_SZ => RegistryValue::String(String::from_reg_value(raw).map_err(decode_err)?),
        RegType::REG_EXPAND_SZ => {
            RegistryValue::ExpandString(String::from_reg_value(raw).map_err(decode_err)?)
        }
        RegType::REG_MULTI_SZ => {
            RegistryValue::MultiString(Vec::<String>::from_reg_value(raw).map_err(decode_err)?)
        }
        RegType::REG_DWORD => RegistryValue::Dword(u32::from_reg_value(raw).map_err(decode_err)?),
        RegType::REG_QWORD => RegistryValue::Qword(u64::from_reg_value(raw).map_err(decode_err)?),
        RegType::REG_NONE => RegistryValue::None,
        _ => RegistryValue::Binary(raw.bytes.clone()),
    };
    Ok(value)
}
