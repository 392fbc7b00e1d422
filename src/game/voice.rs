//! Speech cadence. Every function here only computes when each cue should
//! play; nothing sleeps. Callers chain announcements by feeding the
//! returned delay into the next call.

use crate::game::utils::piece_name;

/// Gap between two spoken characters.
pub const CUE_STEP_MS: u64 = 750;
/// Time reserved for a castling announcement.
pub const CASTLING_MS: u64 = 2500;
/// Offset of the check cue after a castling announcement.
pub const CASTLING_CHECK_MS: u64 = 1750;

/// One audio cue, `delay_ms` after the announcement started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub name: String,
    pub delay_ms: u64,
}

impl Cue {
    pub fn new(name: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            name: name.into(),
            delay_ms,
        }
    }
}

/// Pronounce a SAN move starting at `start_ms`.
///
/// Piece letters are named on the 1st, 4th and 6th characters (the piece,
/// a promotion after `x..`, or `=X`); every other character is spoken as
/// is. Castling is a single cue occupying a fixed block.
pub fn pronounce_move(san: &str, start_ms: u64) -> (Vec<Cue>, u64) {
    let castle = if san.starts_with("O-O-O") {
        Some("O-O-O")
    } else if san.starts_with("O-O") {
        Some("O-O")
    } else {
        None
    };
    if let Some(castle) = castle {
        let mut cues = vec![Cue::new(castle, start_ms)];
        if san.contains('+') {
            cues.push(Cue::new("+", start_ms + CASTLING_CHECK_MS));
        }
        return (cues, start_ms + CASTLING_MS);
    }

    let mut cues = Vec::with_capacity(san.len());
    let mut at = start_ms;
    for (index, ch) in san.chars().enumerate() {
        let named = match index {
            0 => piece_name(ch),
            3 | 5 if ch != 'K' => piece_name(ch),
            _ => None,
        };
        let name = named.map(str::to_string).unwrap_or_else(|| ch.to_string());
        cues.push(Cue::new(name, at));
        at += CUE_STEP_MS;
    }
    (cues, at)
}

/// Pronounce a pawn score such as `-0.35`.
pub fn pronounce_score(score: &str, start_ms: u64) -> (Vec<Cue>, u64) {
    let intro = start_ms + 500;
    let mut cues = vec![Cue::new("score", intro)];
    let mut at = intro + CUE_STEP_MS;
    for ch in score.chars() {
        let name = if ch == '.' {
            "point".to_string()
        } else {
            ch.to_string()
        };
        cues.push(Cue::new(name, at));
        at += CUE_STEP_MS;
    }
    (cues, at)
}

/// Pronounce a forced mate distance.
pub fn pronounce_mate(moves: i32, start_ms: u64) -> (Vec<Cue>, u64) {
    let intro = start_ms + 250;
    let mut cues = vec![Cue::new("mate", intro)];
    let mut at = intro + 1250;
    for ch in moves.to_string().chars() {
        cues.push(Cue::new(ch.to_string(), at));
        at += CUE_STEP_MS;
    }
    (cues, at)
}
