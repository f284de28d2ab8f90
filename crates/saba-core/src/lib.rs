//! SABA core — conversation orchestration for a personal assistant.
//!
//! A turn flows one direction: user input → orchestrator → response
//! composer → merged result → storage + render layer. On conversation
//! switch the previous conversation is distilled into a durable memory.
//! The render surface (CLI, web, whatever) stays outside this crate and
//! only calls the orchestrator's API.

pub mod config;
pub mod error;
pub mod flows;
pub mod model;
pub mod oracle;
pub mod orchestrator;
pub mod storage;

pub use error::{Result, SabaError};
pub use orchestrator::{AppState, Orchestrator, TurnOutcome, TurnStatus, APOLOGY, ERROR_INTENT};
