//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::traits::DurableStorage;
use crate::StorageResult;

/// Storage that lives only as long as the process.
///
/// Backs the session cache when session-scoped durability is selected:
/// nothing written here is observable by the next page instance.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.write().expect("lock poisoned");
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.write().expect("lock poisoned");
        Ok(data.remove(key).is_some())
    }
}
