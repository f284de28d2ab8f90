//! End-to-end turns through the public API with a scripted oracle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use saba_core::config::SabaConfig;
use saba_core::error::{Result, SabaError};
use saba_core::model::TaskKind;
use saba_core::oracle::Oracle;
use saba_core::storage::{FileStorage, MemStorage, Storage};
use saba_core::{Orchestrator, TurnStatus, APOLOGY};

struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Oracle for ScriptedOracle {
    async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SabaError::Oracle("script exhausted".into())))
    }
}

const GREETING: &str = r#"{"response":"Hello! How can I help?","intent":"greeting","entities":[]}"#;

fn assistant(responses: Vec<Result<String>>) -> Orchestrator<ScriptedOracle> {
    Orchestrator::new(
        ScriptedOracle::new(responses),
        Storage::Memory(MemStorage::new()),
        SabaConfig::default(),
    )
}

#[tokio::test]
async fn reminder_utterance_creates_task_with_time() {
    let raw = r#"{"response":"I'll remind you to call mom at 5pm tomorrow.","intent":"set_reminder","entities":["mom","5pm","tomorrow"],"task":{"type":"Reminder","content":"Call mom","time":"2024-08-16T17:00:00Z"}}"#;
    let mut saba = assistant(vec![Ok(raw.to_string())]);

    let outcome = saba
        .send_message("Remind me to call mom at 5pm tomorrow")
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::Resolved);
    let task = outcome.task.expect("reminder should surface a task");
    assert_eq!(task.kind, TaskKind::Reminder);
    assert!(task.time.is_some());
    assert_eq!(saba.tasks().len(), 1);
}

#[tokio::test]
async fn oracle_failure_resolves_to_apology_turn() {
    let mut saba = assistant(vec![Err(SabaError::Oracle("connection refused".into()))]);

    let outcome = saba.send_message("hello?").await.unwrap();

    assert_eq!(outcome.status, TurnStatus::Failed);
    assert_eq!(outcome.message.content, APOLOGY);
    assert_eq!(outcome.message.intent.as_deref(), Some("error"));
    // no dangling placeholder after the failure
    assert_eq!(saba.active_conversation().unwrap().processing_count(), 0);
}

#[tokio::test]
async fn one_message_conversation_produces_no_memory() {
    let mut saba = assistant(vec![Err(SabaError::Oracle("down".into()))]);
    saba.send_message("hi").await.unwrap();
    let calls_after_turn = saba_calls(&saba);

    let memory = saba.new_conversation().await;
    assert!(memory.is_none());
    assert!(saba.memories().is_empty());
    assert_eq!(saba_calls(&saba), calls_after_turn, "no summarizer call");
}

#[tokio::test]
async fn six_message_conversation_produces_one_memory() {
    let mut responses: Vec<Result<String>> =
        (0..3).map(|_| Ok(GREETING.to_string())).collect();
    responses.push(Ok(
        r#"{"summary":"User's birthday is October 26th."}"#.to_string()
    ));
    let mut saba = assistant(responses);

    saba.send_message("hey").await.unwrap();
    saba.send_message("My birthday is October 26th").await.unwrap();
    saba.send_message("see you!").await.unwrap();
    assert_eq!(saba.active_conversation().unwrap().messages.len(), 6);

    let memory = saba.new_conversation().await.expect("one memory expected");
    assert_eq!(memory.content, "User's birthday is October 26th.");
    assert_eq!(saba.memories().len(), 1);
}

#[tokio::test]
async fn collections_survive_a_restart_via_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SabaConfig::default();
    config.storage.path = Some(dir.path().to_string_lossy().into_owned());

    let conversation_id = {
        let storage = Storage::File(FileStorage::open(dir.path()).unwrap());
        let mut saba = Orchestrator::new(
            ScriptedOracle::new(vec![Ok(GREETING.to_string())]),
            storage,
            config.clone(),
        );
        saba.send_message("remember me").await.unwrap();
        saba.add_memory("User likes short answers.").unwrap();
        saba.active_conversation().unwrap().id
    };

    let storage = Storage::File(FileStorage::open(dir.path()).unwrap());
    let saba = Orchestrator::new(ScriptedOracle::new(vec![]), storage, config);

    assert_eq!(saba.conversations().len(), 1);
    assert_eq!(saba.conversations()[0].id, conversation_id);
    assert_eq!(saba.conversations()[0].messages.len(), 2);
    assert_eq!(saba.memories().len(), 1);
    // nothing was persisted mid-flight
    assert_eq!(saba.conversations()[0].processing_count(), 0);
}

fn saba_calls(saba: &Orchestrator<ScriptedOracle>) -> usize {
    saba.oracle().call_count()
}
