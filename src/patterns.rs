//! Opponent pattern mining over persisted games
//!
//! Groups a user's games by opening key (the first few plies of SAN movetext) and reports each
//! group with its frequency and confidence. Nothing is cached between calls: every analysis is
//! a function of the store contents at call time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::store::{GameRecord, GameStore, UserId};
use crate::types::DEFAULT_OPENING_PLIES;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Opening,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Normalised opening key, e.g. `"e4 e5 Nf3 Nc6"`
    pub name: String,
    /// Number of games sharing the key
    pub frequency: u32,
    /// `frequency / games considered`, always within [0, 1]
    pub confidence: f64,
}

pub struct OpponentModel {
    store: Arc<dyn GameStore>,
    opening_plies: usize,
}

impl OpponentModel {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            opening_plies: DEFAULT_OPENING_PLIES,
        }
    }

    /// Number of plies that make up an opening key (at least 1).
    pub fn with_opening_plies(mut self, plies: usize) -> Self {
        self.opening_plies = plies.max(1);
        self
    }

    pub fn opening_plies(&self) -> usize {
        self.opening_plies
    }

    /// Ranked opening patterns for `user_id`, most frequent first.
    pub fn analyze_player_patterns(&self, user_id: UserId) -> EngineResult<Vec<Pattern>> {
        let games = self.store.games_for_user(user_id)?;
        let patterns = mine_openings(&games, self.opening_plies);
        info!(user_id, games = games.len(), patterns = patterns.len(), "analysed player patterns");
        Ok(patterns)
    }

    /// Replace the user's stored snapshot with `patterns`.
    pub fn save_patterns(&self, user_id: UserId, patterns: &[Pattern]) -> EngineResult<()> {
        self.store.replace_patterns(user_id, patterns)?;
        debug!(user_id, count = patterns.len(), "saved pattern snapshot");
        Ok(())
    }

    pub fn load_patterns(&self, user_id: UserId) -> EngineResult<Vec<Pattern>> {
        Ok(self.store.patterns_for_user(user_id)?)
    }
}

/// Group games by opening key. Games without any move are not considered.
pub fn mine_openings(games: &[GameRecord], plies: usize) -> Vec<Pattern> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut considered: u32 = 0;

    for game in games {
        if let Some(key) = opening_key(&game_tokens(game), plies) {
            *counts.entry(key).or_default() += 1;
            considered += 1;
        }
    }

    let mut patterns: Vec<Pattern> = counts
        .into_iter()
        .map(|(name, frequency)| Pattern {
            kind: PatternKind::Opening,
            name,
            frequency,
            confidence: frequency as f64 / considered as f64,
        })
        .collect();

    patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.name.cmp(&b.name)));
    patterns
}

/// SAN tokens of a game: the stored move list, or the PGN movetext when the list is empty.
fn game_tokens(game: &GameRecord) -> Vec<String> {
    if !game.moves.is_empty() {
        return game.moves.clone();
    }
    game.pgn.as_deref().map(movetext_tokens).unwrap_or_default()
}

/// Key made of the first `plies` normalised tokens, joined by single spaces.
pub fn opening_key<S: AsRef<str>>(moves: &[S], plies: usize) -> Option<String> {
    let tokens: Vec<String> = moves
        .iter()
        .filter_map(|m| normalize_token(m.as_ref()))
        .take(plies)
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Split PGN text into move tokens. Tag pairs, comments, variations, NAGs, move numbers
/// and the result token are dropped.
pub fn movetext_tokens(pgn: &str) -> Vec<String> {
    let mut text = String::with_capacity(pgn.len());
    let mut comment = false;
    let mut variation_depth = 0usize;

    for line in pgn.lines() {
        if line.trim_start().starts_with('[') {
            continue;
        }
        for ch in line.chars() {
            match ch {
                '{' => comment = true,
                '}' => comment = false,
                '(' if !comment => variation_depth += 1,
                ')' if !comment => variation_depth = variation_depth.saturating_sub(1),
                _ if comment || variation_depth > 0 => {}
                _ => text.push(ch),
            }
        }
        text.push(' ');
    }

    text.split_whitespace().filter_map(normalize_token).collect()
}

/// Strip move numbers and annotation marks; `None` for tokens that are not moves.
fn normalize_token(token: &str) -> Option<String> {
    let token = token.trim().trim_end_matches(['+', '#', '!', '?']);
    // Zero castling must be caught before leading digits are taken as a move number
    let token = match token {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        other => other,
    };
    let token = token.trim_start_matches(|c: char| c.is_ascii_digit());
    let token = token.trim_start_matches('.');

    if token.is_empty() || token.starts_with('$') || matches!(token, "*" | "-0" | "-1" | "/2-1/2") {
        return None;
    }
    Some(token.to_string())
}
