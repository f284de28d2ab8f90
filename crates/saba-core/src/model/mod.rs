mod conversation;
mod memory;
mod task;


pub use conversation::{derive_title, Conversation, Message, Role, TITLE_MAX_CHARS};
pub use memory::{validate_memory_content, Memory, MAX_MEMORY_LENGTH};
pub use task::{Task, TaskDraft, TaskKind};
