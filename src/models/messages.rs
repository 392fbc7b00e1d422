use actix::Message;
use serde::{Deserialize, Serialize};

/// Board widget configuration pushed to spectators.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    pub orientation: String,
    /// FEN, or `start` for the initial position.
    pub position: String,
    pub show_notation: bool,
}

/// Message sent from server to spectators
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "message_type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Board(BoardUpdate),
    Pgn(String),
    Turn(String),
    Console(String),
    TopPlayer(String),
    BottomPlayer(String),
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Board(_) => "board",
            ServerMessage::Pgn(_) => "pgn",
            ServerMessage::Turn(_) => "turn",
            ServerMessage::Console(_) => "console",
            ServerMessage::TopPlayer(_) => "top_player",
            ServerMessage::BottomPlayer(_) => "bottom_player",
        }
    }
}

/// Message type for WebSocket communication
#[derive(Message)]
#[rtype(result = "()")]
pub struct SpectatorMessage(pub String);
