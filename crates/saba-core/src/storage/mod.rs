mod file;
mod mem;

pub use file::FileStorage;
pub use mem::MemStorage;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SabaConfig;
use crate::error::{Result, SabaError};
use crate::model::{Conversation, Memory, Task};

/// Store keys — one whole-collection JSON document each.
pub const KEY_CONVERSATIONS: &str = "conversations";
pub const KEY_TASKS: &str = "tasks";
pub const KEY_MEMORIES: &str = "memories";

/// Enum wrapper for storage backends. Dispatches to the concrete
/// implementation.
pub enum Storage {
    File(FileStorage),
    Memory(MemStorage),
}

impl Storage {
    /// `get(key)` — JSON-decoded value or absent. Absence is not an error.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self {
            Storage::File(s) => s.get(key),
            Storage::Memory(s) => s.get(key),
        }
    }

    /// `set(key, value)` — whole-value overwrite. No partial updates.
    pub fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        match self {
            Storage::File(s) => s.set(key, value),
            Storage::Memory(s) => s.set(key, value),
        }
    }

    fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| SabaError::Persistence(format!("corrupt '{key}' collection: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn save_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        self.set(key, &serde_json::to_value(items)?)
    }

    pub fn load_conversations(&self) -> Result<Vec<Conversation>> {
        self.load_collection(KEY_CONVERSATIONS)
    }

    pub fn save_conversations(&self, conversations: &[Conversation]) -> Result<()> {
        self.save_collection(KEY_CONVERSATIONS, conversations)
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        self.load_collection(KEY_TASKS)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.save_collection(KEY_TASKS, tasks)
    }

    pub fn load_memories(&self) -> Result<Vec<Memory>> {
        self.load_collection(KEY_MEMORIES)
    }

    pub fn save_memories(&self, memories: &[Memory]) -> Result<()> {
        self.save_collection(KEY_MEMORIES, memories)
    }
}

/// Create a storage backend from the given configuration.
pub fn create_backend(config: &SabaConfig) -> Result<Storage> {
    match config.storage.backend.as_str() {
        "file" => {
            let dir = config.data_dir()?;
            Ok(Storage::File(FileStorage::open(&dir)?))
        }
        "memory" => Ok(Storage::Memory(MemStorage::new())),
        other => Err(SabaError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}
