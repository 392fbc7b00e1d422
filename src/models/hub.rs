use actix::Addr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::console::ConsoleBuffer;
use crate::models::{ServerMessage, SpectatorMessage};
use crate::websocket::SpectatorSocket;

/// Order in which a late spectator receives the current state.
const SNAPSHOT_ORDER: [&str; 5] = ["top_player", "bottom_player", "board", "pgn", "turn"];

/// Connected spectators plus the last value of every event, so that a page
/// opened mid-game starts from the current state.
pub struct SpectatorHub {
    pub sessions: Mutex<HashMap<String, Addr<SpectatorSocket>>>,
    latest: Mutex<HashMap<&'static str, String>>,
    console: Arc<ConsoleBuffer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SpectatorHub {
    pub fn new(console: Arc<ConsoleBuffer>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            latest: Mutex::new(HashMap::new()),
            console,
        }
    }

    /// Send to every spectator. Console lines are not remembered here since
    /// the console buffer already keeps them.
    ///
    /// Must not log: console lines come through here.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Ok(text) = serde_json::to_string(message) else {
            return;
        };
        if !matches!(message, ServerMessage::Console(_)) {
            lock(&self.latest).insert(message.kind(), text.clone());
        }
        let sessions: Vec<Addr<SpectatorSocket>> = lock(&self.sessions).values().cloned().collect();
        for addr in sessions {
            addr.do_send(SpectatorMessage(text.clone()));
        }
    }

    /// Serialized messages that bring a new page up to date.
    pub fn snapshot(&self) -> Vec<String> {
        let mut messages: Vec<String> = {
            let latest = lock(&self.latest);
            SNAPSHOT_ORDER
                .iter()
                .filter_map(|kind| latest.get(kind).cloned())
                .collect()
        };
        for line in self.console.snapshot() {
            if let Ok(text) = serde_json::to_string(&ServerMessage::Console(line)) {
                messages.push(text);
            }
        }
        messages
    }

    pub fn register(&self, id: String, addr: Addr<SpectatorSocket>) -> usize {
        let mut sessions = lock(&self.sessions);
        sessions.insert(id, addr);
        sessions.len()
    }

    pub fn unregister(&self, id: &str) -> usize {
        let mut sessions = lock(&self.sessions);
        sessions.remove(id);
        sessions.len()
    }
}
