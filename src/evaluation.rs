use shakmaty::{Board, Chess, Color, Piece, Position, Role};

use crate::types::{Score, SCORE_MATE};

/// Material values in centipawns, indexed by `role_index`.
pub const PIECE_VALUE: [Score; 6] = [100, 320, 330, 500, 900, 0];

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

/// Maps a Role to our table index (0-5)
pub fn role_index(role: Role) -> usize {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

/// Weights of the positional terms. All zero: the evaluation is material only until tuned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalWeights {
    pub piece_squares: Score,
    pub king_safety: Score,
    pub pawn_structure: Score,
    pub mobility: Score,
    pub center_control: Score,
}

/// Checkmate sentinel for a mated side: negative when White is mated.
pub fn mate_sentinel(mated: Color) -> Score {
    match mated {
        Color::White => -SCORE_MATE,
        Color::Black => SCORE_MATE,
    }
}

/// Evaluates a position with the default (material only) weights.
/// Returns score from White's perspective.
pub fn evaluate(pos: &Chess) -> Score {
    evaluate_with(pos, &EvalWeights::default())
}

pub fn evaluate_with(pos: &Chess, weights: &EvalWeights) -> Score {
    if pos.is_checkmate() {
        return mate_sentinel(pos.turn());
    }

    let board = pos.board();
    let mut score = material_balance(board);

    // Unweighted terms are skipped.
    if weights.piece_squares != 0 {
        score += weights.piece_squares * piece_square_term(board);
    }
    if weights.king_safety != 0 {
        score += weights.king_safety * king_safety_term(board);
    }
    if weights.pawn_structure != 0 {
        score += weights.pawn_structure * pawn_structure_term(board);
    }
    if weights.mobility != 0 {
        score += weights.mobility * mobility_term(pos);
    }
    if weights.center_control != 0 {
        score += weights.center_control * center_control_term(board);
    }

    score
}

/// White material minus Black material.
pub fn material_balance(board: &Board) -> Score {
    let mut score = 0;
    for role in ROLES {
        let value = PIECE_VALUE[role_index(role)];
        let white = board.by_piece(Piece { color: Color::White, role }).count() as Score;
        let black = board.by_piece(Piece { color: Color::Black, role }).count() as Score;
        score += value * (white - black);
    }
    score
}

// Extension hooks. Each returns a White-relative additive term; none is tuned yet.

pub fn piece_square_term(_board: &Board) -> Score {
    0
}

pub fn king_safety_term(_board: &Board) -> Score {
    0
}

pub fn pawn_structure_term(_board: &Board) -> Score {
    0
}

pub fn mobility_term(_pos: &Chess) -> Score {
    0
}

pub fn center_control_term(_board: &Board) -> Score {
    0
}
