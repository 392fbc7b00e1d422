//! Connection to the physical board.
//!
//! The board reports squares the player touched as four-character tokens
//! (`e2e4`) and takes commands framed as `x<command>z`.

pub mod line;
pub mod tcp;

use async_trait::async_trait;
use chess::Color;
use std::fmt;

use crate::error::BoardLinkError;

pub use line::{LineLink, StdioLink};
pub use tcp::TcpLink;

/// Command for the board firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Connected,
    /// Back to the standard variant and starting position.
    ResetVariant,
    GameWhite,
    GameBlack,
    /// Undo the last physical move.
    Invalid,
    Ok,
    /// Engine move the player must reproduce, in long algebraic notation.
    Move(String),
}

impl BoardCommand {
    pub fn new_game(human: Color) -> Self {
        match human {
            Color::White => BoardCommand::GameWhite,
            Color::Black => BoardCommand::GameBlack,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BoardCommand::Connected => "CONNECTED",
            BoardCommand::ResetVariant => "RSTVAR",
            BoardCommand::GameWhite => "GAMEWHITE",
            BoardCommand::GameBlack => "GAMEBLACK",
            BoardCommand::Invalid => "INVALID",
            BoardCommand::Ok => "OK",
            BoardCommand::Move(uci) => uci,
        }
    }

    /// Wire form expected by the firmware.
    pub fn frame(&self) -> String {
        format!("x{}z", self.as_str())
    }
}

impl fmt::Display for BoardCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Token(String),
    /// The board went away; a `Connected` may follow.
    Disconnected,
    /// No more input will ever arrive.
    Closed,
}

#[async_trait]
pub trait BoardLink: Send {
    async fn next_event(&mut self) -> Result<LinkEvent, BoardLinkError>;

    async fn send(&mut self, command: &BoardCommand) -> Result<(), BoardLinkError>;
}
