use shakmaty::Move;

use crate::difficulty::Difficulty;

pub type Score = i32;

pub const SCORE_INFINITY: Score = 30_000;
/// Checkmate sentinel. Mate scores fill `SCORE_MATE..=SCORE_MATE + MAX_PLY`, above any
/// reachable material total.
pub const SCORE_MATE: Score = 20_000;
pub const MAX_PLY: usize = 128;
pub const DEFAULT_OPENING_PLIES: usize = 4;

/// Engine options settable over UCI.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineConfig {
    pub difficulty: Difficulty,
}

/// Outcome of one search invocation. Score is in centipawns, positive favours White.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: Score,
    pub depth: u8,
    pub nodes: u64,
}

/// True when `score` lies in the checkmate regime.
pub fn is_mate_score(score: Score) -> bool {
    (SCORE_MATE..=SCORE_MATE + MAX_PLY as Score).contains(&score.abs())
}
