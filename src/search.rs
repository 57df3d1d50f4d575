use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use shakmaty::{Chess, Color, Position};
use tracing::{debug, error};

use crate::difficulty::Difficulty;
use crate::error::{EngineError, EngineResult};
use crate::evaluation::{evaluate, mate_sentinel};
use crate::movegen::order_moves;
use crate::rules;
use crate::types::{is_mate_score, Score, SearchResult, MAX_PLY, SCORE_INFINITY, SCORE_MATE};

/// Deadline checks happen when `nodes & TIME_CHECK_MASK == 0`.
const TIME_CHECK_MASK: u64 = 1023;

/// Mutable search state shared across recursion
pub struct SearchState {
    pub nodes: u64,
    pub start_time: Instant,
    /// Raised from outside to abort; never cleared by the search itself.
    pub stop: Arc<AtomicBool>,
    pub time_limit_ms: u64,
    /// Set once the deadline passes.
    pub timed_out: bool,
    pub root_best_move: Option<shakmaty::Move>,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            start_time: Instant::now(),
            stop: Arc::new(AtomicBool::new(false)),
            time_limit_ms: 0,
            timed_out: false,
            root_best_move: None,
        }
    }

    pub fn reset(&mut self) {
        self.nodes = 0;
        self.timed_out = false;
        self.start_time = Instant::now();
        self.root_best_move = None;
    }

    fn check_time(&mut self) {
        if self.time_limit_ms > 0 {
            let elapsed = self.start_time.elapsed().as_millis() as u64;
            if elapsed >= self.time_limit_ms {
                self.timed_out = true;
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.timed_out || self.stop.load(Ordering::Relaxed)
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Difficulty-driven front door to the search.
pub struct Engine {
    state: SearchState,
}

impl Engine {
    pub fn new() -> Self {
        Self { state: SearchState::new() }
    }

    /// Flag that aborts a running search from another thread. A flag raised before a
    /// search starts stops that search at its first node.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.state.stop.clone()
    }

    /// Install a fresh, lowered stop flag and return it. Call before handing the engine to
    /// a worker so a `stop` sent right after launch is never lost.
    pub fn new_stop_handle(&mut self) -> Arc<AtomicBool> {
        self.state.stop = Arc::new(AtomicBool::new(false));
        self.state.stop.clone()
    }

    /// Best move for `pos` within the budget of `difficulty`.
    /// `best_move` is `None` only when `pos` has no legal moves.
    pub fn get_best_move(&mut self, pos: &Chess, difficulty: Difficulty) -> EngineResult<SearchResult> {
        let profile = difficulty.profile();
        self.search_depth(pos, profile.depth, profile.time_limit_ms)
    }

    /// Search with an explicit depth and deadline (0 = none).
    pub fn search_depth(&mut self, pos: &Chess, depth: u8, time_limit_ms: u64) -> EngineResult<SearchResult> {
        self.state.reset();
        self.state.time_limit_ms = time_limit_ms;

        let result = search(pos, &mut self.state, depth);

        if let Some(mv) = &result.best_move
            && !rules::is_legal(pos, mv)
        {
            let fen = rules::to_fen(pos);
            let mv = rules::to_uci(mv);
            error!(%fen, %mv, "search produced a move outside the root legal set");
            return Err(EngineError::SearchInvariantViolation { mv, fen });
        }

        Ok(result)
    }

    /// Nodes visited by the most recent search.
    pub fn get_nodes_searched(&self) -> u64 {
        self.state.nodes
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn side_sign(color: Color) -> Score {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Score of a position without legal moves, relative to the side to move.
/// Mates found closer to the root score higher.
fn terminal_score(pos: &Chess, ply: usize) -> Score {
    if pos.is_check() {
        let turn = pos.turn();
        side_sign(turn) * mate_sentinel(turn) - MAX_PLY.saturating_sub(ply) as Score
    } else {
        0
    }
}

/// Format a side-to-move relative score for UCI output (centipawns or mate-in-N).
pub fn format_score(score: Score) -> String {
    if is_mate_score(score) {
        let mate_ply = SCORE_MATE + MAX_PLY as Score - score.abs();
        let mate_moves = (mate_ply + 1) / 2;
        if score > 0 {
            format!("score mate {}", mate_moves)
        } else {
            format!("score mate -{}", mate_moves)
        }
    } else {
        format!("score cp {}", score)
    }
}

/// Alpha-beta search to `max_depth`. Returns a White-relative score.
///
/// Without a deadline this is a single fixed-depth pass. With one it deepens from depth 1 and
/// keeps the result of the last completed iteration.
pub fn search(pos: &Chess, state: &mut SearchState, max_depth: u8) -> SearchResult {
    let max_depth = max_depth.max(1);
    let first_depth = if state.time_limit_ms > 0 { 1 } else { max_depth };
    let sign = side_sign(pos.turn());

    let mut best_move = None;
    let mut best_score: Score = 0;
    let mut completed: u8 = 0;

    for depth in first_depth..=max_depth {
        state.root_best_move = None;
        let score = negamax(pos, state, depth, 0, -SCORE_INFINITY, SCORE_INFINITY);

        if state.is_stopped() {
            // Partial iteration only counts when nothing completed before it
            if best_move.is_none() {
                best_move = state.root_best_move.take();
            }
            debug!(depth, nodes = state.nodes, "search stopped");
            break;
        }

        best_score = sign * score;
        best_move = state.root_best_move.take();
        completed = depth;

        debug!(
            depth,
            score = best_score,
            nodes = state.nodes,
            elapsed_ms = state.start_time.elapsed().as_millis() as u64,
            "iteration complete"
        );

        if is_mate_score(score) {
            break;
        }
    }

    if best_move.is_none() && completed == 0 {
        // Stopped before any root move finished
        best_move = order_moves(pos).first().cloned();
        best_score = evaluate(pos);
    }

    SearchResult {
        best_move,
        score: best_score,
        depth: completed,
        nodes: state.nodes,
    }
}

/// Negamax with alpha-beta pruning. Scores are relative to the side to move.
fn negamax(
    pos: &Chess,
    state: &mut SearchState,
    depth: u8,
    ply: usize,
    mut alpha: Score,
    beta: Score,
) -> Score {
    state.nodes += 1;
    if state.nodes & TIME_CHECK_MASK == 0 {
        state.check_time();
    }
    if state.is_stopped() {
        return 0;
    }

    let moves = order_moves(pos);

    // Checkmate or stalemate
    if moves.is_empty() {
        return terminal_score(pos, ply);
    }

    // Draw rules; never at the root, which must still produce a move
    if ply > 0 && (pos.is_insufficient_material() || pos.halfmoves() >= 100) {
        return 0;
    }

    if depth == 0 || ply >= MAX_PLY {
        return side_sign(pos.turn()) * evaluate(pos);
    }

    let mut best_score = -SCORE_INFINITY;

    for mv in &moves {
        let child = rules::apply(pos, mv);
        let score = -negamax(&child, state, depth - 1, ply + 1, -beta, -alpha);

        if state.is_stopped() {
            return best_score;
        }

        if score > best_score {
            best_score = score;
            if ply == 0 {
                state.root_best_move = Some(mv.clone());
            }
        }

        if score > alpha {
            alpha = score;
        }

        // Beta cutoff
        if alpha >= beta {
            break;
        }
    }

    best_score
}
