//! Chess rules capability used by the session.
//!
//! Legality, move generation and FEN come from the `chess` crate; this
//! module adds what the session needs on top of it: SAN rendering, an undo
//! stack, and draw detection by repetition, the fifty-move rule and
//! insufficient material.

use chess::{BitBoard, Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Rank, Square};
use std::str::FromStr;

use crate::game::utils::{has_insufficient_material, piece_letter};

/// Raw sensor-derived intent, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl MoveRequest {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Parse long algebraic notation such as `e2e4` or `e7e8q`.
    pub fn from_uci(text: &str) -> Option<Self> {
        let text = text.trim();
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return None;
        }
        let from = Square::from_str(&text[0..2].to_lowercase()).ok()?;
        let to = Square::from_str(&text[2..4].to_lowercase()).ok()?;
        let promotion = match text[4..].to_ascii_lowercase().as_str() {
            "" => None,
            "q" => Some(Piece::Queen),
            "r" => Some(Piece::Rook),
            "b" => Some(Piece::Bishop),
            "n" => Some(Piece::Knight),
            _ => return None,
        };
        Some(Self {
            from,
            to,
            promotion,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

/// A move that has been played on the adapter's board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub san: String,
    pub uci: String,
    pub mover: Color,
    pub castle: Option<CastleSide>,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl Outcome {
    pub fn is_draw(&self) -> bool {
        !matches!(self, Outcome::Checkmate { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::Checkmate { .. } => "checkmate",
            Outcome::Stalemate => "draw by stalemate",
            Outcome::InsufficientMaterial => "draw by insufficient material",
            Outcome::FiftyMoveRule => "draw by 50-move rule",
            Outcome::ThreefoldRepetition => "draw by repetition of position",
        }
    }
}

#[derive(Debug, Clone)]
struct Ply {
    board: Board,
    halfmove_clock: u32,
}

#[derive(Debug, Clone)]
pub struct RulesAdapter {
    start: Board,
    /// Move counters of the starting position.
    start_halfmove: u32,
    start_fullmove: u32,
    /// Positions after each ply, most recent last.
    plies: Vec<Ply>,
    moves: Vec<AppliedMove>,
}

impl Default for RulesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesAdapter {
    pub fn new() -> Self {
        Self::with_board(Board::default())
    }

    /// Missing or malformed move counters default to `0 1`.
    pub fn from_fen(fen: &str) -> Result<Self, chess::Error> {
        let mut rules = Self::with_board(Board::from_str(fen)?);
        let mut counters = fen.split_whitespace().skip(4);
        if let Some(halfmove) = counters.next().and_then(|f| f.parse().ok()) {
            rules.start_halfmove = halfmove;
        }
        if let Some(fullmove) = counters.next().and_then(|f| f.parse().ok()) {
            rules.start_fullmove = fullmove;
        }
        Ok(rules)
    }

    fn with_board(start: Board) -> Self {
        Self {
            start,
            start_halfmove: 0,
            start_fullmove: 1,
            plies: Vec::new(),
            moves: Vec::new(),
        }
    }

    /// Back to the standard starting position.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn board(&self) -> Board {
        self.plies.last().map(|p| p.board).unwrap_or(self.start)
    }

    fn halfmove_clock(&self) -> u32 {
        self.plies
            .last()
            .map(|p| p.halfmove_clock)
            .unwrap_or(self.start_halfmove)
    }

    fn fullmove_number(&self) -> u32 {
        let black_started = u32::from(self.start.side_to_move() == Color::Black);
        self.start_fullmove + (self.plies.len() as u32 + black_started) / 2
    }

    /// Full FEN with the real halfmove clock and fullmove number.
    pub fn fen(&self) -> String {
        let board = self.board().to_string();
        let position: Vec<&str> = board.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            position.join(" "),
            self.halfmove_clock(),
            self.fullmove_number()
        )
    }

    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    pub fn moves(&self) -> &[AppliedMove] {
        &self.moves
    }

    /// Destination squares reachable from `from`.
    ///
    /// Castling is encoded as the king's own two-square move, so the king's
    /// landing square (g1/c1, g8/c8) appears here directly.
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let board = self.board();
        let mut destinations: Vec<Square> = MoveGen::new_legal(&board)
            .filter(|m| m.get_source() == from)
            .map(|m| m.get_dest())
            .collect();
        destinations.dedup();
        destinations
    }

    /// True when a pawn on `from` would land on its last rank at `to`.
    pub fn is_promotion(&self, from: Square, to: Square) -> bool {
        let board = self.board();
        if board.piece_on(from) != Some(Piece::Pawn) {
            return false;
        }
        match board.color_on(from) {
            Some(Color::White) => to.get_rank() == Rank::Eighth,
            Some(Color::Black) => to.get_rank() == Rank::First,
            None => false,
        }
    }

    /// The legal move matching a request, if any.
    pub fn resolve(&self, request: &MoveRequest) -> Option<ChessMove> {
        let board = self.board();
        let candidate = ChessMove::new(request.from, request.to, request.promotion);
        if board.legal(candidate) {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn apply(&mut self, request: &MoveRequest) -> Option<AppliedMove> {
        let chess_move = self.resolve(request)?;
        Some(self.play(chess_move))
    }

    pub fn apply_uci(&mut self, text: &str) -> Option<AppliedMove> {
        let request = MoveRequest::from_uci(text)?;
        self.apply(&request)
    }

    /// Take back the last move.
    pub fn undo(&mut self) -> Option<AppliedMove> {
        self.plies.pop()?;
        self.moves.pop()
    }

    fn play(&mut self, chess_move: ChessMove) -> AppliedMove {
        let board = self.board();
        let san = san(&board, chess_move);
        let mover = board.side_to_move();
        let castle = castle_side(&board, chess_move);
        let resets_clock = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || board.piece_on(chess_move.get_dest()).is_some();
        let halfmove_clock = if resets_clock {
            0
        } else {
            self.halfmove_clock() + 1
        };

        self.plies.push(Ply {
            board: board.make_move_new(chess_move),
            halfmove_clock,
        });
        let applied = AppliedMove {
            san,
            uci: chess_move.to_string(),
            mover,
            castle,
        };
        self.moves.push(applied.clone());
        applied
    }

    fn repetitions(&self) -> usize {
        let current = self.board().get_hash();
        std::iter::once(&self.start)
            .chain(self.plies.iter().map(|p| &p.board))
            .filter(|b| b.get_hash() == current)
            .count()
    }

    /// Terminal state of the current position, if the game is over.
    pub fn outcome(&self) -> Option<Outcome> {
        let board = self.board();
        match board.status() {
            BoardStatus::Checkmate => {
                return Some(Outcome::Checkmate {
                    winner: !board.side_to_move(),
                })
            }
            BoardStatus::Stalemate => return Some(Outcome::Stalemate),
            BoardStatus::Ongoing => {}
        }
        if has_insufficient_material(&board) {
            Some(Outcome::InsufficientMaterial)
        } else if self.halfmove_clock() >= 100 {
            Some(Outcome::FiftyMoveRule)
        } else if self.repetitions() >= 3 {
            Some(Outcome::ThreefoldRepetition)
        } else {
            None
        }
    }
}

fn castle_side(board: &Board, chess_move: ChessMove) -> Option<CastleSide> {
    if board.piece_on(chess_move.get_source()) != Some(Piece::King) {
        return None;
    }
    let from = chess_move.get_source().get_file().to_index() as i32;
    let to = chess_move.get_dest().get_file().to_index() as i32;
    match to - from {
        2 => Some(CastleSide::King),
        -2 => Some(CastleSide::Queen),
        _ => None,
    }
}

/// Standard algebraic notation of a legal move on `board`.
pub fn san(board: &Board, chess_move: ChessMove) -> String {
    let source = chess_move.get_source();
    let dest = chess_move.get_dest();
    let piece = board.piece_on(source).unwrap_or(Piece::Pawn);

    let mut text = match castle_side(board, chess_move) {
        Some(CastleSide::King) => "O-O".to_string(),
        Some(CastleSide::Queen) => "O-O-O".to_string(),
        None => {
            let mut text = String::new();
            if piece == Piece::Pawn {
                if source.get_file() != dest.get_file() {
                    text.push_str(&source.to_string()[0..1]);
                    text.push('x');
                }
                text.push_str(&dest.to_string());
                if let Some(promotion) = chess_move.get_promotion() {
                    text.push('=');
                    text.push(piece_letter(promotion));
                }
            } else {
                text.push(piece_letter(piece));
                text.push_str(&disambiguation(board, chess_move, piece));
                if board.piece_on(dest).is_some() {
                    text.push('x');
                }
                text.push_str(&dest.to_string());
            }
            text
        }
    };

    let after = board.make_move_new(chess_move);
    if after.status() == BoardStatus::Checkmate {
        text.push('#');
    } else if *after.checkers() != BitBoard::new(0) {
        text.push('+');
    }
    text
}

fn disambiguation(board: &Board, chess_move: ChessMove, piece: Piece) -> String {
    let source = chess_move.get_source();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| {
            m.get_dest() == chess_move.get_dest()
                && m.get_source() != source
                && board.piece_on(m.get_source()) == Some(piece)
        })
        .map(|m| m.get_source())
        .collect();
    if rivals.is_empty() {
        return String::new();
    }
    let square = source.to_string();
    if rivals.iter().all(|r| r.get_file() != source.get_file()) {
        square[0..1].to_string()
    } else if rivals.iter().all(|r| r.get_rank() != source.get_rank()) {
        square[1..2].to_string()
    } else {
        square
    }
}
