use std::io::{BufRead, Write};

use anyhow::{bail, Context, Error, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use uuid::Uuid;

use saba_core::config::{global_config_path, SabaConfig};
use saba_core::flows::{classify_intent, extract_entities};
use saba_core::model::{TaskDraft, TaskKind};
use saba_core::oracle::OracleClient;
use saba_core::orchestrator::{Orchestrator, TurnOutcome, TurnStatus};
use saba_core::storage::create_backend;

#[derive(Parser)]
#[command(name = "saba", about = "SABA: personal assistant in your terminal", version)]
enum Cli {
    /// Write a starter config to ~/.config/saba/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Interactive chat session
    Chat,
    /// Send a single message (starts a fresh conversation)
    Send {
        /// The message text
        text: String,
    },
    /// Manage stored conversations
    Conversations {
        #[command(subcommand)]
        cmd: ConversationsCmd,
    },
    /// Manage tasks, alarms, and reminders
    Tasks {
        #[command(subcommand)]
        cmd: TasksCmd,
    },
    /// Manage what SABA remembers about you
    Memories {
        #[command(subcommand)]
        cmd: MemoriesCmd,
    },
    /// Classify a message's intent and entities without sending it
    Analyze {
        /// The message text
        text: String,
    },
    /// Show configuration and collection counts
    Status,
}

#[derive(Subcommand)]
enum ConversationsCmd {
    /// List conversations, newest first
    List,
    /// Delete a conversation (full UUID or short 8-char prefix)
    Delete { id: String },
}

#[derive(Subcommand)]
enum TasksCmd {
    /// List tasks, newest first
    List,
    /// Add a task directly
    Add {
        /// Task content
        content: String,
        /// Kind: task, alarm, or reminder
        #[arg(short, long, default_value = "task")]
        kind: String,
        /// Due time, RFC 3339 (e.g. 2026-09-01T17:00:00Z)
        #[arg(short, long)]
        time: Option<String>,
    },
    /// Delete a task (full UUID or short 8-char prefix)
    Delete { id: String },
}

#[derive(Subcommand)]
enum MemoriesCmd {
    /// List memories, newest first
    List,
    /// Add a memory directly
    Add {
        /// The fact to remember, one sentence
        content: String,
    },
    /// Delete a memory (full UUID or short 8-char prefix)
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = SabaConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| SabaConfig::default());

    match cli {
        Cli::Init { force } => cmd_init(force),
        Cli::Chat => cmd_chat(&config).await,
        Cli::Send { text } => cmd_send(&config, &text).await,
        Cli::Conversations { cmd } => cmd_conversations(&config, cmd).await,
        Cli::Tasks { cmd } => cmd_tasks(&config, cmd),
        Cli::Memories { cmd } => cmd_memories(&config, cmd),
        Cli::Analyze { text } => cmd_analyze(&config, &text).await,
        Cli::Status => cmd_status(&config),
    }
}

async fn cmd_analyze(config: &SabaConfig, text: &str) -> Result<()> {
    let oracle = OracleClient::from_config(&config.oracle)
        .context("failed to create oracle client")?;

    // Independent reads of the same input: run them concurrently.
    let (intent, entities) = tokio::join!(
        classify_intent(&oracle, text),
        extract_entities(&oracle, text),
    );

    let intent = intent?;
    println!("intent:     {} ({:.2})", intent.intent.cyan(), intent.confidence);
    println!("entities:   {}", entities?.join(", "));
    Ok(())
}

fn make_assistant(config: &SabaConfig) -> Result<Orchestrator<OracleClient>> {
    let oracle = OracleClient::from_config(&config.oracle)
        .context("failed to create oracle client")?;
    let storage = create_backend(config).context("failed to open storage")?;
    Ok(Orchestrator::new(oracle, storage, config.clone()))
}

fn cmd_init(force: bool) -> Result<()> {
    let path = global_config_path().context("cannot determine config directory")?;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let starter = toml::to_string_pretty(&SabaConfig::default())?;
    std::fs::write(&path, starter)?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn cmd_chat(config: &SabaConfig) -> Result<()> {
    let mut saba = make_assistant(config)?;
    println!(
        "{} ({} · {})",
        "SABA is listening.".bold(),
        config.oracle.provider,
        config.oracle.model
    );
    println!("commands: /new  /list  /switch <n>  /quit");

    let stdin = std::io::stdin();
    loop {
        print!("{} ", "you>".green().bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/q" => break,
            "/new" => {
                if let Some(memory) = saba.new_conversation().await {
                    print_memory_saved(&memory.content);
                }
                println!("started a new conversation");
            }
            "/list" => {
                for (idx, convo) in saba.conversations().iter().enumerate() {
                    let marker = if saba.active_conversation().map(|c| c.id) == Some(convo.id) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {idx}: {}", convo.title);
                }
            }
            _ if line.starts_with("/switch") => {
                let idx: Option<usize> = line
                    .strip_prefix("/switch")
                    .map(str::trim)
                    .and_then(|s| s.parse().ok());
                match idx.and_then(|i| saba.conversations().get(i).map(|c| c.id)) {
                    Some(id) => match saba.select_conversation(id).await {
                        Ok(Some(memory)) => print_memory_saved(&memory.content),
                        Ok(None) => {}
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    },
                    None => eprintln!("{}", "no such conversation".red()),
                }
            }
            _ => match saba.send_message(line).await {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
        }
    }

    // Capture anything worth remembering before exit.
    if let Some(memory) = saba.new_conversation().await {
        print_memory_saved(&memory.content);
    }
    Ok(())
}

async fn cmd_send(config: &SabaConfig, text: &str) -> Result<()> {
    let mut saba = make_assistant(config)?;
    let outcome = saba.send_message(text).await?;
    print_outcome(&outcome);
    if let Some(memory) = saba.new_conversation().await {
        print_memory_saved(&memory.content);
    }
    Ok(())
}

async fn cmd_conversations(config: &SabaConfig, cmd: ConversationsCmd) -> Result<()> {
    let mut saba = make_assistant(config)?;
    match cmd {
        ConversationsCmd::List => {
            if saba.conversations().is_empty() {
                println!("no conversations");
                return Ok(());
            }
            for convo in saba.conversations() {
                println!(
                    "{}  {}  {} ({} messages)",
                    short_id(convo.id).dimmed(),
                    convo.created_at.format("%Y-%m-%d %H:%M"),
                    convo.title,
                    convo.messages.len()
                );
            }
        }
        ConversationsCmd::Delete { id } => {
            let id = resolve_id(&id, saba.conversations().iter().map(|c| c.id))?;
            saba.delete_conversation(id);
            println!("deleted {}", short_id(id));
        }
    }
    Ok(())
}

fn cmd_tasks(config: &SabaConfig, cmd: TasksCmd) -> Result<()> {
    let mut saba = make_assistant(config)?;
    match cmd {
        TasksCmd::List => {
            if saba.tasks().is_empty() {
                println!("no tasks");
                return Ok(());
            }
            for task in saba.tasks() {
                let time = task
                    .time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<8}  {}  [{}]",
                    short_id(task.id).dimmed(),
                    task.kind.to_string().yellow(),
                    task.content,
                    time
                );
            }
        }
        TasksCmd::Add { content, kind, time } => {
            let kind: TaskKind = kind.parse().map_err(Error::msg)?;
            let time = time
                .map(|t| {
                    chrono::DateTime::parse_from_rfc3339(&t)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .with_context(|| format!("invalid time '{t}' (expected RFC 3339)"))
                })
                .transpose()?;
            let task = saba.add_task(TaskDraft { kind, content, time });
            println!("added {} {}", task.kind.to_string().yellow(), short_id(task.id));
        }
        TasksCmd::Delete { id } => {
            let id = resolve_id(&id, saba.tasks().iter().map(|t| t.id))?;
            saba.delete_task(id);
            println!("deleted {}", short_id(id));
        }
    }
    Ok(())
}

fn cmd_memories(config: &SabaConfig, cmd: MemoriesCmd) -> Result<()> {
    let mut saba = make_assistant(config)?;
    match cmd {
        MemoriesCmd::List => {
            if saba.memories().is_empty() {
                println!("no memories");
                return Ok(());
            }
            for memory in saba.memories() {
                println!("{}  {}", short_id(memory.id).dimmed(), memory.content);
            }
        }
        MemoriesCmd::Add { content } => {
            let memory = saba.add_memory(&content)?;
            println!("remembered {}", short_id(memory.id));
        }
        MemoriesCmd::Delete { id } => {
            let id = resolve_id(&id, saba.memories().iter().map(|m| m.id))?;
            saba.delete_memory(id);
            println!("deleted {}", short_id(id));
        }
    }
    Ok(())
}

fn cmd_status(config: &SabaConfig) -> Result<()> {
    let saba = make_assistant(config)?;
    println!("{}", "SABA status".bold());
    println!("oracle:   {} · {}", config.oracle.provider, config.oracle.model);
    println!("storage:  {} ({})", config.storage.backend, config.data_dir()?.display());
    println!("conversations: {}", saba.conversations().len());
    println!("tasks:         {}", saba.tasks().len());
    println!("memories:      {}", saba.memories().len());
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome.status {
        TurnStatus::Resolved => println!("{} {}", "saba>".cyan().bold(), outcome.message.content),
        TurnStatus::Failed => println!("{} {}", "saba>".red().bold(), outcome.message.content),
    }
    if let Some(ref task) = outcome.task {
        println!(
            "{} your {} has been added",
            "task added:".yellow(),
            task.kind.to_string().to_lowercase()
        );
    }
}

fn print_memory_saved(content: &str) {
    println!("{} {}", "memory saved:".green(), content);
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Resolve a full UUID or a short 8-char prefix against a collection.
fn resolve_id(input: &str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    if let Ok(id) = input.parse::<Uuid>() {
        return Ok(id);
    }
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(&input.to_lowercase()))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no entry matches '{input}'"),
        _ => bail!("'{input}' is ambiguous, use more characters"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_is_eight_chars() {
        let id = Uuid::now_v7();
        assert_eq!(short_id(id).len(), 8);
    }

    #[test]
    fn test_resolve_id_full_uuid() {
        let id = Uuid::now_v7();
        assert_eq!(resolve_id(&id.to_string(), std::iter::empty()).unwrap(), id);
    }

    #[test]
    fn test_resolve_id_prefix() {
        let id = Uuid::now_v7();
        let prefix = short_id(id);
        assert_eq!(resolve_id(&prefix, vec![id].into_iter()).unwrap(), id);
    }

    #[test]
    fn test_resolve_id_no_match() {
        assert!(resolve_id("deadbeef", std::iter::empty()).is_err());
    }
}
