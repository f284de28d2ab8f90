//! The conversation orchestrator — the single owner and mutator of the
//! application state tree.
//!
//! Per turn: append the user message, insert an assistant placeholder, invoke
//! the composer, and resolve the placeholder with either the final reply or
//! the fixed apology. On conversation switch, the previous conversation is
//! summarized into a durable memory. All collection mutations flow through
//! this type; the render layer only reads.

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::SabaConfig;
use crate::error::{Result, SabaError};
use crate::flows::{compose_response, summarize_conversation, ComposedReply};
use crate::model::{
    validate_memory_content, Conversation, Memory, Message, Task, TaskDraft,
};
use crate::oracle::Oracle;
use crate::storage::Storage;

/// The single user-visible failure string. Oracle failures are terminal for
/// the turn — no retry — and always resolve to this.
pub const APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

/// Intent recorded on an apology turn.
pub const ERROR_INTENT: &str = "error";

/// The in-memory state tree: conversations, tasks, memories, and the active
/// conversation. Mutated only through [`Orchestrator`] methods.
#[derive(Debug, Default)]
pub struct AppState {
    pub conversations: Vec<Conversation>,
    pub tasks: Vec<Task>,
    pub memories: Vec<Memory>,
    pub active_conversation: Option<Uuid>,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Resolved,
    Failed,
}

/// What a completed turn produced, for the render layer to surface.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation_id: Uuid,
    pub message: Message,
    /// A task derived from the utterance, already assigned an id and added
    /// to the task list. Callers surface a notification when present.
    pub task: Option<Task>,
    pub status: TurnStatus,
}

pub struct Orchestrator<O: Oracle> {
    oracle: O,
    storage: Storage,
    config: SabaConfig,
    state: AppState,
    /// Latest turn token per conversation. A resolution whose token no
    /// longer matches is stale and silently dropped.
    turn_tokens: HashMap<Uuid, u64>,
    next_token: u64,
}

impl<O: Oracle> Orchestrator<O> {
    /// Build an orchestrator, loading collections from the store. A missing
    /// or unreadable store reads as empty — the session proceeds in memory.
    pub fn new(oracle: O, storage: Storage, config: SabaConfig) -> Self {
        let conversations = load_or_empty(storage.load_conversations(), "conversations");
        let tasks = load_or_empty(storage.load_tasks(), "tasks");
        let memories = load_or_empty(storage.load_memories(), "memories");

        Self {
            oracle,
            storage,
            config,
            state: AppState {
                conversations,
                tasks,
                memories,
                active_conversation: None,
            },
            turn_tokens: HashMap::new(),
            next_token: 0,
        }
    }

    // -- Read accessors --

    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn memories(&self) -> &[Memory] {
        &self.state.memories
    }

    /// The oracle backing this orchestrator, for callers that run flows
    /// directly (e.g. standalone intent classification).
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.state.active_conversation?;
        self.state.conversations.iter().find(|c| c.id == id)
    }

    // -- Turn pipeline --

    /// Run one turn: user message in, assistant message out.
    ///
    /// Starts a new conversation when none is active. The placeholder is
    /// inserted before the oracle is invoked and is always resolved — to the
    /// composed reply on success, to the apology on any failure.
    pub async fn send_message(&mut self, user_input: &str) -> Result<TurnOutcome> {
        if user_input.trim().is_empty() {
            return Err(SabaError::InvalidInput("message cannot be empty".into()));
        }

        let user_message = Message::user(user_input.to_string());
        let conversation_id = match self.state.active_conversation {
            Some(id) if self.state.conversations.iter().any(|c| c.id == id) => {
                if let Some(convo) = self.conversation_mut(id) {
                    convo.push(user_message);
                }
                id
            }
            _ => {
                // Newest conversation first, matching list render order.
                let convo = Conversation::new(user_message);
                let id = convo.id;
                self.state.conversations.insert(0, convo);
                self.state.active_conversation = Some(id);
                id
            }
        };

        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id;
        if let Some(convo) = self.conversation_mut(conversation_id) {
            convo.push(placeholder);
        }

        let token = self.begin_turn(conversation_id);
        tracing::debug!(%conversation_id, token, "turn started");

        let composed = compose_response(&self.oracle, user_input).await;

        self.resolve_turn(conversation_id, placeholder_id, token, composed)
            .ok_or_else(|| SabaError::NotFound(format!("conversation {conversation_id}")))
    }

    fn begin_turn(&mut self, conversation_id: Uuid) -> u64 {
        self.next_token += 1;
        self.turn_tokens.insert(conversation_id, self.next_token);
        self.next_token
    }

    /// Apply a turn result to its placeholder. Returns `None` when the
    /// resolution is stale (the token no longer matches the latest turn for
    /// the conversation) or the placeholder is gone — both are silently
    /// dropped, leaving state untouched.
    fn resolve_turn(
        &mut self,
        conversation_id: Uuid,
        placeholder_id: Uuid,
        token: u64,
        composed: Result<ComposedReply>,
    ) -> Option<TurnOutcome> {
        if self.turn_tokens.get(&conversation_id) != Some(&token) {
            tracing::debug!(%conversation_id, token, "dropping stale turn resolution");
            return None;
        }

        let (reply, status) = match composed {
            Ok(reply) => (reply, TurnStatus::Resolved),
            Err(e) => {
                tracing::warn!(%conversation_id, error = %e, "turn failed, resolving to apology");
                (
                    ComposedReply {
                        response: APOLOGY.to_string(),
                        intent: ERROR_INTENT.to_string(),
                        entities: Vec::new(),
                        task: None,
                    },
                    TurnStatus::Failed,
                )
            }
        };

        let task_draft = reply.task;
        let message = {
            let convo = self
                .state
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)?;
            let msg = convo.message_mut(placeholder_id)?;
            msg.resolve(reply.response, Some(reply.intent), reply.entities);
            msg.clone()
        };

        let task = task_draft.map(|draft| self.add_task(draft));
        self.persist_conversations();
        tracing::debug!(%conversation_id, ?status, "turn resolved");

        Some(TurnOutcome {
            conversation_id,
            message,
            task,
            status,
        })
    }

    // -- Conversation management --

    /// Make another conversation active. The previous conversation, if any,
    /// is summarized into a memory first; the switch completes regardless of
    /// the summarization outcome.
    pub async fn select_conversation(&mut self, id: Uuid) -> Result<Option<Memory>> {
        if !self.state.conversations.iter().any(|c| c.id == id) {
            return Err(SabaError::NotFound(format!("conversation {id}")));
        }

        let mut memory = None;
        if let Some(previous) = self.state.active_conversation {
            if previous != id {
                memory = self.capture_memory_from(previous).await;
            }
        }
        self.state.active_conversation = Some(id);
        Ok(memory)
    }

    /// Leave the active conversation so the next message starts a fresh one.
    /// The previous conversation is summarized into a memory.
    pub async fn new_conversation(&mut self) -> Option<Memory> {
        let memory = match self.state.active_conversation {
            Some(previous) => self.capture_memory_from(previous).await,
            None => None,
        };
        self.state.active_conversation = None;
        memory
    }

    /// Delete a conversation. Unknown ids are a no-op.
    pub fn delete_conversation(&mut self, id: Uuid) {
        let before = self.state.conversations.len();
        self.state.conversations.retain(|c| c.id != id);
        if self.state.conversations.len() == before {
            return;
        }
        if self.state.active_conversation == Some(id) {
            self.state.active_conversation = None;
        }
        self.turn_tokens.remove(&id);
        self.persist_conversations();
    }

    /// Summarize a conversation as it stands right now and, if it revealed a
    /// durable fact, store it as a memory. Failures are logged and read as
    /// "nothing to remember" — summarization never blocks a switch.
    async fn capture_memory_from(&mut self, conversation_id: Uuid) -> Option<Memory> {
        if !self.config.memory.enabled {
            return None;
        }
        // Snapshot the message list at the moment of switching; later turns
        // in other conversations must not leak into this summary.
        let messages: Vec<Message> = self
            .state
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)?
            .messages
            .clone();

        let summary = match summarize_conversation(
            &self.oracle,
            &messages,
            self.config.memory.min_messages,
        )
        .await
        {
            Ok(summary) => summary?,
            Err(e) => {
                tracing::warn!(%conversation_id, error = %e, "memory summarization failed");
                return None;
            }
        };

        let memory = Memory::new(summary);
        self.state.memories.insert(0, memory.clone());
        self.persist_memories();
        tracing::debug!(%conversation_id, memory_id = %memory.id, "memory captured");
        Some(memory)
    }

    // -- Task and memory CRUD --

    /// Add a task, assigning it an id. Newest first.
    pub fn add_task(&mut self, draft: TaskDraft) -> Task {
        let task = Task::from_draft(draft);
        self.state.tasks.insert(0, task.clone());
        self.persist_tasks();
        task
    }

    /// Delete a task. Unknown ids are a no-op.
    pub fn delete_task(&mut self, id: Uuid) {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| t.id != id);
        if self.state.tasks.len() != before {
            self.persist_tasks();
        }
    }

    /// Add a memory directly. Newest first.
    pub fn add_memory(&mut self, content: &str) -> Result<Memory> {
        validate_memory_content(content)?;
        let memory = Memory::new(content.trim().to_string());
        self.state.memories.insert(0, memory.clone());
        self.persist_memories();
        Ok(memory)
    }

    /// Delete a memory. Unknown ids are a no-op.
    pub fn delete_memory(&mut self, id: Uuid) {
        let before = self.state.memories.len();
        self.state.memories.retain(|m| m.id != id);
        if self.state.memories.len() != before {
            self.persist_memories();
        }
    }

    // -- Persistence (whole-collection overwrite; failures degrade to
    //    in-memory operation for the session) --

    fn persist_conversations(&self) {
        if let Err(e) = self.storage.save_conversations(&self.state.conversations) {
            tracing::warn!(error = %e, "failed to persist conversations, continuing in memory");
        }
    }

    fn persist_tasks(&self) {
        if let Err(e) = self.storage.save_tasks(&self.state.tasks) {
            tracing::warn!(error = %e, "failed to persist tasks, continuing in memory");
        }
    }

    fn persist_memories(&self) {
        if let Err(e) = self.storage.save_memories(&self.state.memories) {
            tracing::warn!(error = %e, "failed to persist memories, continuing in memory");
        }
    }

    fn conversation_mut(&mut self, id: Uuid) -> Option<&mut Conversation> {
        self.state.conversations.iter_mut().find(|c| c.id == id)
    }
}

fn load_or_empty<T>(result: Result<Vec<T>>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load {what}, starting empty");
            Vec::new()
        }
    }
}
