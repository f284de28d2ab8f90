use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three task-like things the assistant can derive from an utterance.
/// Closed set: anything else coming back from the oracle is rejected at the
/// flow boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Task,
    Alarm,
    Reminder,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "Task"),
            Self::Alarm => write!(f, "Alarm"),
            Self::Reminder => write!(f, "Reminder"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "alarm" => Ok(Self::Alarm),
            "reminder" => Ok(Self::Reminder),
            _ => Err(format!("unknown task kind: {s}")),
        }
    }
}

/// A task, alarm, or reminder derived from conversation or added directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub kind: TaskKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn from_draft(draft: TaskDraft) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: draft.kind,
            content: draft.content,
            time: draft.time,
        }
    }
}

/// A task without an id — the shape in which tasks arrive from the composer
/// or from direct user input, before the orchestrator assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub kind: TaskKind,
    pub content: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}
