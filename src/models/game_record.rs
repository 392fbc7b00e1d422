use chess::Color;
use chrono::NaiveDateTime;
use std::fmt;

/// PGN result tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PgnResult {
    WhiteWins,
    BlackWins,
    Draw,
    #[default]
    Ongoing,
}

impl PgnResult {
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => PgnResult::WhiteWins,
            Color::Black => PgnResult::BlackWins,
        }
    }
}

impl fmt::Display for PgnResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PgnResult::WhiteWins => "1-0",
            PgnResult::BlackWins => "0-1",
            PgnResult::Draw => "1/2-1/2",
            PgnResult::Ongoing => "*",
        })
    }
}

/// One ply of the game as it goes into the PGN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub san: String,
    pub uci: String,
    pub mover: Color,
    /// Engine comment such as `{0.35/18 1.2s}`; empty for human moves.
    pub annotation: String,
}

/// Snapshot of the game for persistence and display. Rebuilt from the
/// session whenever the history changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub pgn_text: String,
    pub event: String,
    pub site: String,
    pub date: String,
    pub white_name: String,
    pub white_elo: String,
    pub black_name: String,
    pub black_elo: String,
    pub result: PgnResult,
    /// Taken at the first move; names the PGN file.
    pub started_at: Option<NaiveDateTime>,
}

/// Header values that do not depend on the moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    pub event: String,
    pub site: String,
    pub date: String,
    pub white_name: String,
    pub white_elo: String,
    pub black_name: String,
    pub black_elo: String,
}

impl GameRecord {
    pub fn build(
        headers: Headers,
        history: &[HistoryEntry],
        result: PgnResult,
        started_at: Option<NaiveDateTime>,
    ) -> Self {
        let mut record = GameRecord {
            pgn_text: String::new(),
            event: headers.event,
            site: headers.site,
            date: headers.date,
            white_name: headers.white_name,
            white_elo: headers.white_elo,
            black_name: headers.black_name,
            black_elo: headers.black_elo,
            result,
            started_at,
        };
        record.pgn_text = record.render(history);
        record
    }

    fn render(&self, history: &[HistoryEntry]) -> String {
        let mut pgn = String::new();
        for (tag, value) in [
            ("Event", &self.event),
            ("Site", &self.site),
            ("Date", &self.date),
            ("White", &self.white_name),
            ("Black", &self.black_name),
        ] {
            pgn.push_str(&format!("[{} \"{}\"]\n", tag, value));
        }
        pgn.push_str(&format!("[Result \"{}\"]\n", self.result));
        pgn.push_str(&format!("[WhiteElo \"{}\"]\n", self.white_elo));
        pgn.push_str(&format!("[BlackElo \"{}\"]\n\n", self.black_elo));
        pgn.push_str(&movetext(history));
        pgn.push_str(&self.result.to_string());
        pgn
    }

    /// File name for this game, e.g. `2024.03.09-14.05.33.pgn`.
    pub fn file_name(&self) -> Option<String> {
        self.started_at
            .map(|t| format!("{}.pgn", t.format("%Y.%m.%d-%H.%M.%S")))
    }
}

/// Numbered move list; each entry is followed by its annotation, if any.
pub fn movetext(history: &[HistoryEntry]) -> String {
    let mut text = String::new();
    for (ply, entry) in history.iter().enumerate() {
        if ply % 2 == 0 {
            text.push_str(&format!("{}. ", ply / 2 + 1));
        }
        text.push_str(&entry.san);
        if !entry.annotation.is_empty() {
            text.push(' ');
            text.push_str(&entry.annotation);
        }
        text.push(' ');
    }
    text
}
