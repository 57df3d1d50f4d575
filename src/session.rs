//! One human-vs-engine game from first move to stored result
//!
//! The session validates player moves, asks the [`Engine`] for computer moves, records every
//! ply and, once the game ends, writes the final [`GameRecord`], counts the result in the
//! player's totals and refreshes their opening patterns. Undo keeps the stored move log and
//! record in step with the board.
//!
//! # Error Handling
//!
//! Bad move text and illegal moves are rejected before anything changes. Store failures never
//! interrupt play: they are logged and handed back in [`PlyReport::warnings`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use shakmaty::{Chess, Color, Move, Position, Square};
use tracing::{info, warn};

use crate::analysis::{self, GameReview};
use crate::difficulty::Difficulty;
use crate::error::{EngineError, EngineResult};
use crate::evaluation::evaluate;
use crate::patterns::OpponentModel;
use crate::rules::{self, GameStatus};
use crate::search::Engine;
use crate::store::{GameId, GameResult, GameStore, MoveRecord, PlayerOutcome, Side, StoreError, UserId};
use crate::types::{Score, SearchResult};

/// What happened on one applied ply.
#[derive(Debug)]
pub struct PlyReport {
    pub uci: String,
    pub san: String,
    /// White-relative evaluation of the position before the move
    pub evaluation: Score,
    pub status: GameStatus,
    /// Present for engine moves
    pub search: Option<SearchResult>,
    pub warnings: Vec<StoreError>,
}

struct Ply {
    before: Chess,
    mv: Move,
    san: String,
}

struct Recording {
    store: Arc<dyn GameStore>,
    model: OpponentModel,
    user_id: UserId,
    game_id: Option<GameId>,
    /// Outcome already added to the user's totals for this game
    counted: Option<PlayerOutcome>,
}

pub struct GameSession {
    initial: Chess,
    position: Chess,
    player_side: Side,
    difficulty: Difficulty,
    engine: Engine,
    plies: Vec<Ply>,
    seen: HashMap<String, usize>,
    status: GameStatus,
    recording: Option<Recording>,
}

impl GameSession {
    pub fn new(player_side: Side, difficulty: Difficulty) -> Self {
        Self::from_position(Chess::default(), player_side, difficulty)
    }

    pub fn from_position(position: Chess, player_side: Side, difficulty: Difficulty) -> Self {
        let mut seen = HashMap::new();
        seen.insert(rules::repetition_key(&position), 1);
        let status = rules::status(&position, 1);
        Self {
            initial: position.clone(),
            position,
            player_side,
            difficulty,
            engine: Engine::new(),
            plies: Vec::new(),
            seen,
            status,
            recording: None,
        }
    }

    /// Record this game for `user_id` in `store`.
    pub fn with_store(mut self, store: Arc<dyn GameStore>, user_id: UserId) -> Self {
        let model = OpponentModel::new(store.clone());
        self.recording = Some(Recording {
            store,
            model,
            user_id,
            game_id: None,
            counted: None,
        });
        self
    }

    /// Create the stored game record. Without a store this is a no-op.
    pub fn start(&mut self) -> Vec<StoreError> {
        let mut warnings = Vec::new();
        if let Some(rec) = self.recording.as_mut() {
            match rec.store.create_game(rec.user_id, self.player_side, self.difficulty.level()) {
                Ok(id) => {
                    info!(game_id = id, user_id = rec.user_id, difficulty = self.difficulty.level(), "game started");
                    rec.game_id = Some(id);
                }
                Err(err) => note(&mut warnings, "create game", err),
            }
        }
        warnings
    }

    /// Apply a player move given in UCI notation.
    pub fn make_move(&mut self, uci: &str) -> EngineResult<PlyReport> {
        if self.status.is_over() {
            return Err(EngineError::GameOver);
        }
        let mv = rules::parse_uci(&self.position, uci)?;
        Ok(self.apply(mv, None))
    }

    /// Let the engine choose and play a move for the side to move.
    pub fn make_ai_move(&mut self) -> EngineResult<PlyReport> {
        if self.status.is_over() {
            return Err(EngineError::GameOver);
        }
        let result = self.engine.get_best_move(&self.position, self.difficulty)?;
        let mv = result
            .best_move
            .clone()
            .ok_or_else(|| EngineError::SearchInvariantViolation {
                mv: "0000".to_string(),
                fen: rules::to_fen(&self.position),
            })?;
        Ok(self.apply(mv, Some(result)))
    }

    fn apply(&mut self, mv: Move, search: Option<SearchResult>) -> PlyReport {
        let before = self.position.clone();
        let evaluation = evaluate(&before);
        let san = rules::to_san(&before, &mv);
        let uci = rules::to_uci(&mv);

        self.position = rules::apply(&before, &mv);
        let key = rules::repetition_key(&self.position);
        let count = {
            let entry = self.seen.entry(key).or_insert(0);
            *entry += 1;
            *entry
        };
        self.status = rules::status(&self.position, count);

        let mut warnings = Vec::new();
        if let Some(rec) = &self.recording
            && let Some(game_id) = rec.game_id
        {
            let record = MoveRecord {
                game_id,
                move_number: self.plies.len() as u32 + 1,
                side: Side::from(before.turn()),
                uci: uci.clone(),
                san: san.clone(),
                fen_before: rules::to_fen(&before),
                fen_after: rules::to_fen(&self.position),
                evaluation,
            };
            if let Err(err) = rec.store.append_move(&record) {
                note(&mut warnings, "append move", err);
            }
        }

        self.plies.push(Ply { before, mv, san: san.clone() });

        if self.status.is_over() {
            info!(status = ?self.status, plies = self.plies.len(), "game over");
            self.finish(&mut warnings);
        }

        PlyReport {
            uci,
            san,
            evaluation,
            status: self.status,
            search,
            warnings,
        }
    }

    fn finish(&mut self, warnings: &mut Vec<StoreError>) {
        let pgn = self.pgn();
        let final_fen = self.fen();
        let moves = self.san_moves();
        let result = self.result();
        let outcome = result.outcome_for(self.player_side);

        let Some(rec) = self.recording.as_mut() else {
            return;
        };
        let Some(game_id) = rec.game_id else {
            return;
        };

        match rec.store.get_game(game_id) {
            Ok(Some(mut record)) => {
                record.result = result;
                record.total_moves = moves.len() as u32;
                record.moves = moves;
                record.pgn = Some(pgn);
                record.final_fen = Some(final_fen);
                record.ended_at = Some(Utc::now());
                if let Err(err) = rec.store.update_game(&record) {
                    note(warnings, "update game", err);
                }
            }
            Ok(None) => note(warnings, "update game", StoreError::GameNotFound(game_id)),
            Err(err) => note(warnings, "load game", err),
        }

        if let Some(outcome) = outcome
            && rec.counted.is_none()
        {
            match rec.store.record_outcome(rec.user_id, outcome) {
                Ok(()) => rec.counted = Some(outcome),
                Err(err) => note(warnings, "record outcome", err),
            }
        }

        let refreshed = rec
            .model
            .analyze_player_patterns(rec.user_id)
            .and_then(|patterns| rec.model.save_patterns(rec.user_id, &patterns));
        match refreshed {
            Ok(()) => {}
            Err(EngineError::PersistenceUnavailable(err)) => note(warnings, "refresh patterns", err),
            Err(err) => warn!(%err, "pattern refresh failed"),
        }
    }

    /// Take back the last ply, returning any store warnings. `None` when there is nothing to undo.
    ///
    /// The stored move log is cut back to the remaining plies. Undoing out of a finished game
    /// reopens its record and takes the result back out of the player's totals.
    pub fn undo_move(&mut self) -> Option<Vec<StoreError>> {
        let ply = self.plies.pop()?;
        let was_over = self.status.is_over();
        let key = rules::repetition_key(&self.position);
        if let Some(count) = self.seen.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.seen.remove(&key);
            }
        }
        self.position = ply.before;
        let count = self
            .seen
            .get(&rules::repetition_key(&self.position))
            .copied()
            .unwrap_or(1);
        self.status = rules::status(&self.position, count);

        let mut warnings = Vec::new();
        let kept = self.plies.len() as u32;
        let moves = self.san_moves();
        if let Some(rec) = self.recording.as_mut()
            && let Some(game_id) = rec.game_id
        {
            if let Err(err) = rec.store.truncate_moves(game_id, kept) {
                note(&mut warnings, "truncate moves", err);
            }
            if was_over {
                match rec.store.get_game(game_id) {
                    Ok(Some(mut record)) => {
                        record.result = GameResult::Ongoing;
                        record.total_moves = kept;
                        record.moves = moves;
                        record.pgn = None;
                        record.final_fen = None;
                        record.ended_at = None;
                        if let Err(err) = rec.store.update_game(&record) {
                            note(&mut warnings, "reopen game", err);
                        }
                    }
                    Ok(None) => note(&mut warnings, "reopen game", StoreError::GameNotFound(game_id)),
                    Err(err) => note(&mut warnings, "load game", err),
                }
                if let Some(outcome) = rec.counted {
                    match rec.store.retract_outcome(rec.user_id, outcome) {
                        Ok(()) => rec.counted = None,
                        Err(err) => note(&mut warnings, "retract outcome", err),
                    }
                }
            }
        }
        Some(warnings)
    }

    pub fn is_player_turn(&self) -> bool {
        Side::from(self.position.turn()) == self.player_side
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn result(&self) -> GameResult {
        match self.status {
            GameStatus::Ongoing => GameResult::Ongoing,
            GameStatus::Checkmate { winner: Color::White } => GameResult::WhiteWin,
            GameStatus::Checkmate { winner: Color::Black } => GameResult::BlackWin,
            _ => GameResult::Draw,
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        rules::to_fen(&self.position)
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.recording.as_ref().and_then(|r| r.game_id)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn legal_moves(&self) -> Vec<String> {
        rules::legal_moves(&self.position).iter().map(rules::to_uci).collect()
    }

    /// Legal moves starting on `from`, in UCI notation.
    pub fn legal_moves_from(&self, from: Square) -> Vec<String> {
        rules::legal_moves(&self.position)
            .iter()
            .filter(|m| m.from() == Some(from))
            .map(rules::to_uci)
            .collect()
    }

    pub fn san_moves(&self) -> Vec<String> {
        self.plies.iter().map(|p| p.san.clone()).collect()
    }

    pub fn uci_moves(&self) -> Vec<String> {
        self.plies.iter().map(|p| rules::to_uci(&p.mv)).collect()
    }

    /// Nodes visited by the engine's most recent move.
    pub fn nodes_searched(&self) -> u64 {
        self.engine.get_nodes_searched()
    }

    /// Review the player's moves so far at `depth`.
    pub fn review(&self, depth: u8) -> EngineResult<GameReview> {
        analysis::review_game(&self.initial, &self.uci_moves(), self.player_side, depth)
    }

    /// The game so far as PGN with a seven-tag roster.
    pub fn pgn(&self) -> String {
        let (white, black) = match self.player_side {
            Side::White => ("Player", "Engine"),
            Side::Black => ("Engine", "Player"),
        };
        let result = self.result().pgn_token();

        let mut out = String::new();
        out.push_str("[Event \"Sparring game\"]\n");
        out.push_str("[Site \"?\"]\n");
        out.push_str(&format!("[Date \"{}\"]\n", Utc::now().format("%Y.%m.%d")));
        out.push_str("[Round \"-\"]\n");
        out.push_str(&format!("[White \"{white}\"]\n"));
        out.push_str(&format!("[Black \"{black}\"]\n"));
        out.push_str(&format!("[Result \"{result}\"]\n"));
        let initial_fen = rules::to_fen(&self.initial);
        if initial_fen != rules::to_fen(&Chess::default()) {
            out.push_str("[SetUp \"1\"]\n");
            out.push_str(&format!("[FEN \"{initial_fen}\"]\n"));
        }
        out.push('\n');

        let mut number = u32::from(self.initial.fullmoves());
        let mut tokens: Vec<String> = Vec::with_capacity(self.plies.len() + 1);
        for (i, ply) in self.plies.iter().enumerate() {
            match ply.before.turn() {
                Color::White => tokens.push(format!("{number}. {}", ply.san)),
                Color::Black if i == 0 => tokens.push(format!("{number}... {}", ply.san)),
                Color::Black => tokens.push(ply.san.clone()),
            }
            if ply.before.turn() == Color::Black {
                number += 1;
            }
        }
        tokens.push(result.to_string());
        out.push_str(&tokens.join(" "));
        out
    }
}

fn note(warnings: &mut Vec<StoreError>, context: &str, err: StoreError) {
    warn!(%err, context, "persistence failed, continuing without it");
    warnings.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameRecord, MemoryStore, StoreResult, UserRecord};
    use crate::patterns::Pattern;
    use std::io;

    /// Store whose every call fails, standing in for an unreachable database.
    struct DownStore;

    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "store down")))
    }

    impl GameStore for DownStore {
        fn create_user(&self, _: &str) -> StoreResult<UserId> {
            down()
        }
        fn get_user(&self, _: UserId) -> StoreResult<Option<UserRecord>> {
            down()
        }
        fn find_user(&self, _: &str) -> StoreResult<Option<UserRecord>> {
            down()
        }
        fn record_outcome(&self, _: UserId, _: PlayerOutcome) -> StoreResult<()> {
            down()
        }
        fn retract_outcome(&self, _: UserId, _: PlayerOutcome) -> StoreResult<()> {
            down()
        }
        fn create_game(&self, _: UserId, _: Side, _: u8) -> StoreResult<GameId> {
            down()
        }
        fn update_game(&self, _: &GameRecord) -> StoreResult<()> {
            down()
        }
        fn get_game(&self, _: GameId) -> StoreResult<Option<GameRecord>> {
            down()
        }
        fn games_for_user(&self, _: UserId) -> StoreResult<Vec<GameRecord>> {
            down()
        }
        fn append_move(&self, _: &MoveRecord) -> StoreResult<()> {
            down()
        }
        fn moves_for_game(&self, _: GameId) -> StoreResult<Vec<MoveRecord>> {
            down()
        }
        fn truncate_moves(&self, _: GameId, _: u32) -> StoreResult<()> {
            down()
        }
        fn replace_patterns(&self, _: UserId, _: &[Pattern]) -> StoreResult<()> {
            down()
        }
        fn patterns_for_user(&self, _: UserId) -> StoreResult<Vec<Pattern>> {
            down()
        }
    }

    fn level(n: u8) -> Difficulty {
        Difficulty::new(n).unwrap()
    }

    #[test]
    fn test_legal_move_accepted() {
        let mut game = GameSession::new(Side::White, level(2));
        let report = game.make_move("e2e4").unwrap();
        assert_eq!(report.san, "e4");
        assert_eq!(report.evaluation, 0);
        assert!(game.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert!(!game.is_player_turn());
    }

    #[test]
    fn test_illegal_move_leaves_state_unchanged() {
        let mut game = GameSession::new(Side::White, level(2));
        let before = game.fen();
        assert!(matches!(game.make_move("e2e5"), Err(EngineError::IllegalMoveAttempt { .. })));
        assert!(matches!(game.make_move("hello"), Err(EngineError::MalformedMoveNotation { .. })));
        assert_eq!(game.fen(), before);
        assert!(game.san_moves().is_empty());
    }

    #[test]
    fn test_detects_checkmate() {
        let mut game = GameSession::new(Side::White, level(2));
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            game.make_move(mv).unwrap();
        }
        assert!(game.is_game_over());
        assert_eq!(game.result(), GameResult::BlackWin);
        assert!(matches!(game.make_move("a2a3"), Err(EngineError::GameOver)));
        assert!(matches!(game.make_ai_move(), Err(EngineError::GameOver)));
    }

    #[test]
    fn test_detects_threefold_repetition() {
        let mut game = GameSession::new(Side::White, level(1));
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_move(mv).unwrap();
        }
        assert_eq!(game.status(), GameStatus::ThreefoldRepetition);
        assert_eq!(game.result(), GameResult::Draw);
    }

    #[test]
    fn test_ai_reply_is_legal_and_recorded() {
        let store = Arc::new(MemoryStore::new());
        let mut game = GameSession::new(Side::White, level(2)).with_store(store.clone(), 9);
        assert!(game.start().is_empty());
        let game_id = game.game_id().unwrap();

        game.make_move("e2e4").unwrap();
        let report = game.make_ai_move().unwrap();
        assert!(report.search.is_some());
        assert!(report.warnings.is_empty());
        game.make_move("d2d4").unwrap();
        game.make_ai_move().unwrap();

        let moves = store.moves_for_game(game_id).unwrap();
        assert_eq!(moves.len(), 4);
        assert_eq!(moves[0].uci, "e2e4");
        assert_eq!(moves[1].side, Side::Black);
        assert_eq!(moves[3].move_number, 4);
    }

    #[test]
    fn test_finished_game_updates_record_and_patterns() {
        let store = Arc::new(MemoryStore::new());
        let user_id = store.create_user("f3-player").unwrap();
        let mut game = GameSession::new(Side::White, level(3)).with_store(store.clone(), user_id);
        game.start();
        for mv in ["f2f3", "e7e5", "g2g4"] {
            game.make_move(mv).unwrap();
        }
        let report = game.make_ai_move().unwrap();
        assert_eq!(report.uci, "d8h4");
        assert_eq!(report.status, GameStatus::Checkmate { winner: Color::Black });

        let record = store.get_game(game.game_id().unwrap()).unwrap().unwrap();
        assert_eq!(record.result, GameResult::BlackWin);
        assert_eq!(record.total_moves, 4);
        assert_eq!(record.moves, vec!["f3", "e5", "g4", "Qh4#"]);
        assert!(record.pgn.unwrap().ends_with("1. f3 e5 2. g4 Qh4# 0-1"));
        assert!(record.ended_at.is_some());
        assert!(report.warnings.is_empty());

        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!((user.total_games, user.games_won, user.games_lost, user.games_drawn), (1, 0, 1, 0));

        let patterns = store.patterns_for_user(user_id).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].name, "f3 e5 g4 Qh4");
    }

    #[test]
    fn test_drawn_game_counts_for_player() {
        let store = Arc::new(MemoryStore::new());
        let user_id = store.create_user("shuffler").unwrap();
        let mut game = GameSession::new(Side::Black, level(1)).with_store(store.clone(), user_id);
        game.start();
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_move(mv).unwrap();
        }
        assert_eq!(game.result(), GameResult::Draw);
        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!((user.total_games, user.games_drawn), (1, 1));
    }

    #[test]
    fn test_unregistered_user_outcome_is_a_warning() {
        let store = Arc::new(MemoryStore::new());
        let mut game = GameSession::new(Side::White, level(1)).with_store(store.clone(), 42);
        game.start();
        for mv in ["f2f3", "e7e5", "g2g4"] {
            game.make_move(mv).unwrap();
        }
        let report = game.make_move("d8h4").unwrap();
        assert!(game.is_game_over());
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(report.warnings[0], StoreError::UserNotFound(42)));
    }

    #[test]
    fn test_store_failures_do_not_block_play() {
        let mut game = GameSession::new(Side::White, level(1)).with_store(Arc::new(DownStore), 1);
        assert_eq!(game.start().len(), 1);
        assert!(game.game_id().is_none());
        let report = game.make_move("e2e4").unwrap();
        assert!(report.warnings.is_empty(), "nothing to record without a game id");
        assert!(game.make_ai_move().is_ok());
    }

    #[test]
    fn test_store_failure_mid_game_is_a_warning() {
        let mut game = GameSession::new(Side::White, level(1)).with_store(Arc::new(DownStore), 1);
        if let Some(rec) = game.recording.as_mut() {
            rec.game_id = Some(1);
        }
        let report = game.make_move("e2e4").unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(report.warnings[0], StoreError::Io(_)));
    }

    #[test]
    fn test_undo_restores_position() {
        let mut game = GameSession::new(Side::White, level(1));
        game.make_move("e2e4").unwrap();
        game.make_move("e7e5").unwrap();
        assert!(game.undo_move().is_some());
        assert!(game.undo_move().is_some());
        assert!(game.undo_move().is_none());
        assert_eq!(game.fen(), rules::to_fen(&Chess::default()));
        assert_eq!(game.status(), GameStatus::Ongoing);
    }

    #[test]
    fn test_undo_reopens_finished_game() {
        let mut game = GameSession::new(Side::White, level(1));
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            game.make_move(mv).unwrap();
        }
        assert!(game.undo_move().is_some());
        assert!(!game.is_game_over());
        assert!(game.legal_moves().contains(&"d8h4".to_string()));
    }

    #[test]
    fn test_undo_keeps_stored_move_log_in_step() {
        let store = Arc::new(MemoryStore::new());
        let mut game = GameSession::new(Side::White, level(1)).with_store(store.clone(), 3);
        game.start();
        let game_id = game.game_id().unwrap();
        game.make_move("e2e4").unwrap();
        game.make_move("e7e5").unwrap();
        assert!(game.undo_move().unwrap().is_empty());
        game.make_move("c7c5").unwrap();

        let moves = store.moves_for_game(game_id).unwrap();
        let numbers: Vec<u32> = moves.iter().map(|m| m.move_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(moves[1].uci, "c7c5");
    }

    #[test]
    fn test_undo_out_of_finished_game_reopens_record() {
        let store = Arc::new(MemoryStore::new());
        let user_id = store.create_user("takeback").unwrap();
        let mut game = GameSession::new(Side::White, level(1)).with_store(store.clone(), user_id);
        game.start();
        let game_id = game.game_id().unwrap();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            game.make_move(mv).unwrap();
        }
        assert_eq!(store.get_user(user_id).unwrap().unwrap().games_lost, 1);

        assert!(game.undo_move().unwrap().is_empty());
        let record = store.get_game(game_id).unwrap().unwrap();
        assert_eq!(record.result, GameResult::Ongoing);
        assert!(record.ended_at.is_none());
        assert_eq!(record.total_moves, 3);
        assert_eq!(store.moves_for_game(game_id).unwrap().len(), 3);
        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!((user.total_games, user.games_lost), (0, 0));

        game.make_move("d8h4").unwrap();
        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!((user.total_games, user.games_lost), (1, 1));
        assert_eq!(store.get_game(game_id).unwrap().unwrap().result, GameResult::BlackWin);
    }

    #[test]
    fn test_legal_moves_from_square() {
        let game = GameSession::new(Side::White, level(1));
        let mut knight = game.legal_moves_from(Square::G1);
        knight.sort();
        assert_eq!(knight, vec!["g1f3", "g1h3"]);
        assert_eq!(game.legal_moves().len(), 20);
    }

    #[test]
    fn test_review_flags_hung_queen() {
        let mut game = GameSession::new(Side::White, level(1));
        for mv in ["e2e4", "e7e5", "d1h5", "b8c6", "h5e5"] {
            game.make_move(mv).unwrap();
        }
        let review = game.review(2).unwrap();
        assert_eq!(review.total_moves, 3);
        assert_eq!(review.blunders.len(), 1);
        assert_eq!(review.blunders[0].played, "Qxe5+");
    }

    #[test]
    fn test_pgn_from_black_to_move_position() {
        let pos = rules::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").unwrap();
        let mut game = GameSession::from_position(pos, Side::Black, level(1));
        game.make_move("c7c5").unwrap();
        game.make_move("g1f3").unwrap();
        let pgn = game.pgn();
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains("[White \"Engine\"]"));
        assert!(pgn.ends_with("1... c5 2. Nf3 *"), "got {pgn}");
    }
}
