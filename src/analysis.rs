use shakmaty::Chess;
use shakmaty::Position;
use tracing::debug;

use crate::error::EngineResult;
use crate::evaluation::evaluate;
use crate::movegen::order_moves;
use crate::rules;
use crate::search::Engine;
use crate::store::Side;
use crate::types::Score;

pub const INACCURACY_CP: Score = 50;
pub const MISTAKE_CP: Score = 100;
pub const BLUNDER_CP: Score = 300;
pub const DEFAULT_REVIEW_DEPTH: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Severity {
    pub fn from_loss(loss: Score) -> Option<Severity> {
        if loss >= BLUNDER_CP {
            Some(Severity::Blunder)
        } else if loss >= MISTAKE_CP {
            Some(Severity::Mistake)
        } else if loss >= INACCURACY_CP {
            Some(Severity::Inaccuracy)
        } else {
            None
        }
    }
}

/// One of the player's moves that lost evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveAssessment {
    /// 1-based ply number within the game
    pub ply: usize,
    pub played: String,
    pub best: String,
    /// Centipawns lost against the best move, from the player's side
    pub loss: Score,
    pub severity: Severity,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameReview {
    /// Number of moves the player made
    pub total_moves: usize,
    /// Percentage of player moves that lost less than an inaccuracy
    pub accuracy: u32,
    pub blunders: Vec<MoveAssessment>,
    pub mistakes: Vec<MoveAssessment>,
    pub inaccuracies: Vec<MoveAssessment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub category: &'static str,
    pub message: String,
}

/// Review the `player`'s moves of a game given as UCI moves from `start`.
///
/// Every legal alternative is scored with a `depth - 1` search after it is played, so the
/// played move and the best move are always compared on the same horizon.
pub fn review_game(start: &Chess, moves: &[String], player: Side, depth: u8) -> EngineResult<GameReview> {
    let depth = depth.max(1);
    let mut engine = Engine::new();
    let mut review = GameReview::default();
    let mut pos = start.clone();
    let mut clean = 0usize;

    for (i, text) in moves.iter().enumerate() {
        let mv = rules::parse_uci(&pos, text)?;

        if Side::from(pos.turn()) == player {
            review.total_moves += 1;
            let sign = match player {
                Side::White => 1,
                Side::Black => -1,
            };

            let mut best_score = Score::MIN;
            let mut best_move = None;
            let mut played_score = 0;
            for candidate in order_moves(&pos) {
                let child = rules::apply(&pos, &candidate);
                let score = sign * score_after(&mut engine, &child, depth - 1)?;
                if score > best_score {
                    best_score = score;
                    best_move = Some(candidate.clone());
                }
                if candidate == mv {
                    played_score = score;
                }
            }

            let loss = (best_score - played_score).max(0);
            debug!(ply = i + 1, mv = %text, loss, "reviewed move");

            match Severity::from_loss(loss) {
                None => clean += 1,
                Some(severity) => {
                    let best = best_move.map(|b| rules::to_san(&pos, &b)).unwrap_or_default();
                    let assessment = MoveAssessment {
                        ply: i + 1,
                        played: rules::to_san(&pos, &mv),
                        best,
                        loss,
                        severity,
                    };
                    match severity {
                        Severity::Blunder => review.blunders.push(assessment),
                        Severity::Mistake => review.mistakes.push(assessment),
                        Severity::Inaccuracy => review.inaccuracies.push(assessment),
                    }
                }
            }
        }

        pos = rules::apply(&pos, &mv);
    }

    review.accuracy = if review.total_moves == 0 {
        100
    } else {
        ((clean as f64 / review.total_moves as f64) * 100.0).round() as u32
    };
    Ok(review)
}

/// White-relative score of `pos` looking `depth` plies ahead.
fn score_after(engine: &mut Engine, pos: &Chess, depth: u8) -> EngineResult<Score> {
    if depth == 0 {
        return Ok(evaluate(pos));
    }
    Ok(engine.search_depth(pos, depth, 0)?.score)
}

/// Coaching messages for a review, most severe problems first.
pub fn feedback(review: &GameReview) -> Vec<Feedback> {
    let mut items = Vec::new();

    let verdict = match review.accuracy {
        90.. => "Excellent precision, keep it up.",
        75..=89 => "Solid play with a few slips.",
        60..=74 => "Decent game, but several moves gave away value.",
        _ => "Many moves lost material; slow down and check each move for hanging pieces.",
    };
    items.push(Feedback {
        category: "Accuracy",
        message: format!("{}% of your {} moves kept the evaluation. {}", review.accuracy, review.total_moves, verdict),
    });

    for (category, list) in [
        ("Blunders", &review.blunders),
        ("Mistakes", &review.mistakes),
        ("Inaccuracies", &review.inaccuracies),
    ] {
        if list.is_empty() {
            continue;
        }
        let detail: Vec<String> = list
            .iter()
            .map(|a| format!("ply {}: {} (better {}, -{} cp)", a.ply, a.played, a.best, a.loss))
            .collect();
        items.push(Feedback {
            category,
            message: detail.join("; "),
        });
    }

    if !review.blunders.is_empty() {
        items.push(Feedback {
            category: "Next steps",
            message: "Before each move, list the opponent's captures and checks that it allows.".to_string(),
        });
    }

    items
}
