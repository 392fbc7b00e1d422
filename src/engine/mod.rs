//! UCI engine access.
//!
//! [`EngineClient`] is the raw request/response contract; [`UciEngine`]
//! implements it over a child process. [`EngineSession`] owns one client
//! for the lifetime of the bridge and turns its output into typed replies.

pub mod session;
pub mod uci;

use async_trait::async_trait;

use crate::config::MoveSettings;
use crate::error::EngineError;

pub use session::EngineSession;
pub use uci::UciEngine;

/// Search limits passed through to `go`.
pub type SearchLimits = MoveSettings;

/// Score as reported by the engine, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Centipawns(i32),
    Mate(i32),
}

/// One parsed `info` line. Fields the engine did not report are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub score: Option<RawScore>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub pv: Vec<String>,
}

/// Everything the engine printed for one `go`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutput {
    pub best_move: String,
    pub info: Vec<InfoLine>,
}

/// Identity reported during the `uci` handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineId {
    pub name: String,
    pub author: Option<String>,
}

#[async_trait]
pub trait EngineClient: Send {
    /// Start the engine and complete the `uci`/`uciok` handshake.
    async fn initialize(&mut self) -> Result<EngineId, EngineError>;

    async fn is_ready(&mut self) -> Result<(), EngineError>;

    async fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError>;

    async fn position(&mut self, fen: &str) -> Result<(), EngineError>;

    async fn go(&mut self, limits: &SearchLimits) -> Result<SearchOutput, EngineError>;

    async fn quit(&mut self) -> Result<(), EngineError>;
}
