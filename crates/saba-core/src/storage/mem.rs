use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

/// In-process key-value store. Used by tests and as the degraded mode when
/// the durable store is unavailable.
#[derive(Default)]
pub struct MemStorage {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}
