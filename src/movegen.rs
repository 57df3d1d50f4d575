use arrayvec::ArrayVec;
use shakmaty::{Chess, Move, Position};

pub type OrderedMoves = ArrayVec<Move, 256>;

/// Generates and orders the legal moves of a position.
/// Captures (en passant included) come first, quiet moves after. Both groups keep the
/// generator's order, so the result is a stable partition of `pos.legal_moves()`.
pub fn order_moves(pos: &Chess) -> OrderedMoves {
    order(pos.legal_moves())
}

/// Stable capture-first partition of an arbitrary move sequence.
pub fn order(moves: impl IntoIterator<Item = Move>) -> OrderedMoves {
    let mut ordered = OrderedMoves::new();
    let mut quiet = OrderedMoves::new();

    for mv in moves {
        if mv.is_capture() {
            ordered.push(mv);
        } else {
            quiet.push(mv);
        }
    }

    ordered.extend(quiet);
    ordered
}
