use chess::{Board, Color, Piece, Square};

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Turn banner shown to spectators, e.g. "white to play".
pub fn turn_text(color: Color) -> String {
    format!("{} to play", color_to_string(color))
}

/// Spoken name of a piece letter in SAN.
pub fn piece_name(letter: char) -> Option<&'static str> {
    match letter {
        'K' => Some("king"),
        'Q' => Some("queen"),
        'R' => Some("rook"),
        'B' => Some("bishop"),
        'N' => Some("knight"),
        _ => None,
    }
}

pub fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn is_light(square: Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}

/// Check if the board has insufficient material for checkmate
///
/// Covers bare kings, a single minor piece, and any number of bishops that
/// all stand on squares of one colour.
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut knights = 0;
    let mut light_bishops = 0;
    let mut dark_bishops = 0;

    for square in *board.combined() {
        match board.piece_on(square) {
            Some(Piece::Pawn) | Some(Piece::Rook) | Some(Piece::Queen) => return false,
            Some(Piece::Knight) => knights += 1,
            Some(Piece::Bishop) => {
                if is_light(square) {
                    light_bishops += 1;
                } else {
                    dark_bishops += 1;
                }
            }
            Some(Piece::King) | None => {}
        }
    }

    let minors = knights + light_bishops + dark_bishops;
    if minors <= 1 {
        return true;
    }
    knights == 0 && (light_bishops == 0 || dark_bishops == 0)
}
