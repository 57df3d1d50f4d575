use std::str::FromStr;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, MoveList, Position};

use crate::error::{EngineError, EngineResult};

/// Terminal status of a position, including the draw rules that need game history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::Ongoing
    }

    pub fn is_draw(self) -> bool {
        matches!(
            self,
            GameStatus::Stalemate
                | GameStatus::InsufficientMaterial
                | GameStatus::ThreefoldRepetition
                | GameStatus::FiftyMoveRule
        )
    }
}

pub fn legal_moves(pos: &Chess) -> MoveList {
    pos.legal_moves()
}

pub fn is_legal(pos: &Chess, mv: &Move) -> bool {
    pos.legal_moves().contains(mv)
}

/// Successor position. `mv` must come from `legal_moves(pos)`.
pub fn apply(pos: &Chess, mv: &Move) -> Chess {
    let mut next = pos.clone();
    next.play_unchecked(mv);
    next
}

/// Classify `pos`. `repetitions` counts how often this exact position occurred in the game,
/// the current occurrence included.
pub fn status(pos: &Chess, repetitions: usize) -> GameStatus {
    if pos.is_checkmate() {
        GameStatus::Checkmate { winner: !pos.turn() }
    } else if pos.is_stalemate() {
        GameStatus::Stalemate
    } else if pos.is_insufficient_material() {
        GameStatus::InsufficientMaterial
    } else if repetitions >= 3 {
        GameStatus::ThreefoldRepetition
    } else if pos.halfmoves() >= 100 {
        GameStatus::FiftyMoveRule
    } else {
        GameStatus::Ongoing
    }
}

/// Parse UCI text against `pos`. Unparseable text and illegal moves are distinct errors.
pub fn parse_uci(pos: &Chess, text: &str) -> EngineResult<Move> {
    let text = text.trim();
    let uci = UciMove::from_str(text).map_err(|_| EngineError::MalformedMoveNotation {
        text: text.to_string(),
    })?;
    uci.to_move(pos).map_err(|_| EngineError::IllegalMoveAttempt {
        uci: text.to_string(),
        fen: to_fen(pos),
    })
}

pub fn to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// SAN with check/mate suffix, as written in PGN movetext.
pub fn to_san(pos: &Chess, mv: &Move) -> String {
    let mut scratch = pos.clone();
    SanPlus::from_move_and_play_unchecked(&mut scratch, mv).to_string()
}

pub fn to_fen(pos: &Chess) -> String {
    Fen(pos.clone().into_setup(EnPassantMode::Legal)).to_string()
}

pub fn from_fen(text: &str) -> EngineResult<Chess> {
    let invalid = |reason: String| EngineError::InvalidPosition {
        fen: text.to_string(),
        reason,
    };
    let fen: Fen = text.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|e| invalid(format!("{e}")))
}

/// Board, side to move, castling rights and en passant square: the FEN fields that decide
/// whether two positions repeat.
pub fn repetition_key(pos: &Chess) -> String {
    to_fen(pos)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

    #[test]
    fn test_parse_uci_legal() {
        let pos = Chess::default();
        let mv = parse_uci(&pos, "e2e4").unwrap();
        assert_eq!(to_uci(&mv), "e2e4");
        assert_eq!(to_san(&pos, &mv), "e4");
    }

    #[test]
    fn test_parse_uci_malformed() {
        let pos = Chess::default();
        let err = parse_uci(&pos, "e9zz").unwrap_err();
        assert!(matches!(err, EngineError::MalformedMoveNotation { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_uci_illegal() {
        let pos = Chess::default();
        let err = parse_uci(&pos, "e2e5").unwrap_err();
        assert!(matches!(err, EngineError::IllegalMoveAttempt { .. }), "got {err:?}");
    }

    #[test]
    fn test_status_checkmate() {
        let pos = from_fen(FOOLS_MATE).unwrap();
        assert_eq!(status(&pos, 1), GameStatus::Checkmate { winner: Color::Black });
        assert!(legal_moves(&pos).is_empty());
    }

    #[test]
    fn test_status_stalemate() {
        let pos = from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(status(&pos, 1), GameStatus::Stalemate);
        assert!(status(&pos, 1).is_draw());
    }

    #[test]
    fn test_status_insufficient_material() {
        let pos = from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(status(&pos, 1), GameStatus::InsufficientMaterial);
    }

    #[test]
    fn test_status_fifty_moves_and_repetition() {
        let pos = from_fen("4k3/8/8/8/8/8/R7/4K3 w - - 100 80").unwrap();
        assert_eq!(status(&pos, 1), GameStatus::FiftyMoveRule);
        assert_eq!(status(&Chess::default(), 3), GameStatus::ThreefoldRepetition);
        assert_eq!(status(&Chess::default(), 2), GameStatus::Ongoing);
    }

    #[test]
    fn test_fen_round_trip_and_repetition_key() {
        let pos = Chess::default();
        let fen = to_fen(&pos);
        assert_eq!(fen, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(repetition_key(&from_fen(&fen).unwrap()), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(from_fen("not a fen"), Err(EngineError::InvalidPosition { .. })));
    }

    #[test]
    fn test_apply_does_not_touch_original() {
        let pos = Chess::default();
        let mv = parse_uci(&pos, "g1f3").unwrap();
        let next = apply(&pos, &mv);
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(next.turn(), Color::Black);
        assert!(is_legal(&pos, &mv));
        assert!(!is_legal(&next, &mv));
    }
}
