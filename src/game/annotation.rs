//! Turns engine search info into the move comment used in the PGN and on
//! the console, e.g. `{0.35/18 1.2s}` or `{#3/24 0.8s}`.

use chess::Color;

use crate::engine::{InfoLine, RawScore};

/// Evaluation seen from the human player's side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
    None,
}

/// A finished search, normalised for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub best_move: String,
    pub score: Score,
    pub depth: u32,
    pub elapsed_ms: u64,
}

impl EngineReply {
    /// Fold the info lines of one search. Only lines carrying a depth count,
    /// and later lines overwrite earlier ones.
    ///
    /// Centipawn scores are negated when the human plays White; mate
    /// distances are kept as the engine reported them.
    pub fn from_search(best_move: impl Into<String>, info: &[InfoLine], human: Color) -> Self {
        let mut reply = EngineReply {
            best_move: best_move.into(),
            score: Score::None,
            depth: 0,
            elapsed_ms: 0,
        };
        for line in info {
            let Some(depth) = line.depth else {
                continue;
            };
            reply.depth = depth;
            reply.elapsed_ms = line.time_ms.unwrap_or(0);
            match line.score {
                Some(RawScore::Centipawns(cp)) => {
                    reply.score = Score::Centipawns(match human {
                        Color::White => -cp,
                        Color::Black => cp,
                    });
                }
                Some(RawScore::Mate(n)) => reply.score = Score::Mate(n),
                None => {}
            }
        }
        reply
    }

    /// The score as pawns with two decimals, for display and speech.
    pub fn pawns(&self) -> Option<String> {
        match self.score {
            Score::Centipawns(cp) => Some(format_pawns(cp)),
            _ => None,
        }
    }
}

pub fn format_pawns(cp: i32) -> String {
    format!("{:.2}", cp as f64 / 100.0)
}

/// Seconds with one decimal, halves rounded up.
fn format_seconds(ms: u64) -> String {
    let tenths = (ms + 50) / 100;
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Brace comment for a reply; empty when there is nothing worth printing.
pub fn annotate(reply: &EngineReply) -> String {
    match reply.score {
        Score::Mate(1) => String::new(),
        Score::Mate(n) => format!(
            "{{#{}/{} {}s}}",
            n,
            reply.depth,
            format_seconds(reply.elapsed_ms)
        ),
        Score::Centipawns(cp) => format!(
            "{{{}/{} {}s}}",
            format_pawns(cp),
            reply.depth,
            format_seconds(reply.elapsed_ms)
        ),
        Score::None => String::new(),
    }
}
