//! Persistence contract and two stores
//!
//! The core only talks to [`GameStore`]; connection and file lifecycles stay with whoever
//! builds the store. [`MemoryStore`] keeps everything in process, [`JsonStore`] mirrors the
//! same tables to a JSON file after every write. A write that cannot be persisted leaves the
//! tables as they were.
//!
//! # Concurrency
//!
//! Both stores guard their tables with one `parking_lot` mutex, so concurrent pattern
//! replaces for the same user serialise and the last writer wins.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shakmaty::Color;
use thiserror::Error;
use tracing::{debug, info};

use crate::patterns::Pattern;
use crate::types::Score;

pub type UserId = u64;
pub type GameId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Ongoing,
    WhiteWin,
    BlackWin,
    Draw,
}

impl GameResult {
    /// PGN result token
    pub fn pgn_token(self) -> &'static str {
        match self {
            GameResult::Ongoing => "*",
            GameResult::WhiteWin => "1-0",
            GameResult::BlackWin => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }

    /// Result seen by the player on `side`; `None` while the game is running.
    pub fn outcome_for(self, side: Side) -> Option<PlayerOutcome> {
        match (self, side) {
            (GameResult::Ongoing, _) => None,
            (GameResult::Draw, _) => Some(PlayerOutcome::Drawn),
            (GameResult::WhiteWin, Side::White) | (GameResult::BlackWin, Side::Black) => Some(PlayerOutcome::Won),
            (GameResult::WhiteWin, Side::Black) | (GameResult::BlackWin, Side::White) => Some(PlayerOutcome::Lost),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerOutcome {
    Won,
    Lost,
    Drawn,
}

pub const MAX_USERNAME_LEN: usize = 50;

/// A registered player and the running totals over their finished games.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub total_games: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
}

impl UserRecord {
    fn count(&mut self, outcome: PlayerOutcome, delta: i64) {
        let bump = |n: &mut u32| *n = (*n as i64 + delta).max(0) as u32;
        bump(&mut self.total_games);
        match outcome {
            PlayerOutcome::Won => bump(&mut self.games_won),
            PlayerOutcome::Lost => bump(&mut self.games_lost),
            PlayerOutcome::Drawn => bump(&mut self.games_drawn),
        }
    }
}

/// One game of one user. Created at game start, updated once at game end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub user_id: UserId,
    pub player_side: Side,
    pub ai_difficulty: u8,
    pub result: GameResult,
    pub total_moves: u32,
    /// SAN movetext tokens in play order
    pub moves: Vec<String>,
    pub pgn: Option<String>,
    pub final_fen: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: GameId,
    /// 1-based ply number
    pub move_number: u32,
    pub side: Side,
    pub uci: String,
    pub san: String,
    pub fen_before: String,
    pub fen_after: String,
    /// White-relative evaluation of the position before the move
    pub evaluation: Score,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Game {0} not found")]
    GameNotFound(GameId),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("Invalid username {0:?} (1-50 characters)")]
    InvalidUsername(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD capabilities the core needs from persistence.
pub trait GameStore: Send + Sync {
    /// Register `username` (trimmed). Usernames are unique.
    fn create_user(&self, username: &str) -> StoreResult<UserId>;
    fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRecord>>;
    fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>>;
    /// Count one finished game in the user's totals.
    fn record_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()>;
    /// Undo an earlier `record_outcome`, for a finished game that was reopened.
    fn retract_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()>;

    fn create_game(&self, user_id: UserId, player_side: Side, ai_difficulty: u8) -> StoreResult<GameId>;
    /// Replace the stored record with the same `game_id`.
    fn update_game(&self, record: &GameRecord) -> StoreResult<()>;
    fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>>;
    /// All games of a user, oldest first.
    fn games_for_user(&self, user_id: UserId) -> StoreResult<Vec<GameRecord>>;
    fn append_move(&self, record: &MoveRecord) -> StoreResult<()>;
    fn moves_for_game(&self, game_id: GameId) -> StoreResult<Vec<MoveRecord>>;
    /// Keep only the first `keep` plies of the game's move log.
    fn truncate_moves(&self, game_id: GameId, keep: u32) -> StoreResult<()>;
    /// Drop every stored pattern of the user, then store `patterns`.
    fn replace_patterns(&self, user_id: UserId, patterns: &[Pattern]) -> StoreResult<()>;
    fn patterns_for_user(&self, user_id: UserId) -> StoreResult<Vec<Pattern>>;
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    next_user_id: UserId,
    #[serde(default)]
    users: BTreeMap<UserId, UserRecord>,
    next_game_id: GameId,
    games: BTreeMap<GameId, GameRecord>,
    moves: BTreeMap<GameId, Vec<MoveRecord>>,
    patterns: HashMap<UserId, Vec<Pattern>>,
}

impl Tables {
    fn create_user(&mut self, username: &str) -> StoreResult<UserId> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(StoreError::InvalidUsername(username.to_string()));
        }
        if self.find_user(username).is_some() {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        self.next_user_id += 1;
        let user_id = self.next_user_id;
        self.users.insert(
            user_id,
            UserRecord {
                user_id,
                username: username.to_string(),
                created_at: Utc::now(),
                total_games: 0,
                games_won: 0,
                games_lost: 0,
                games_drawn: 0,
            },
        );
        Ok(user_id)
    }

    fn find_user(&self, username: &str) -> Option<&UserRecord> {
        let username = username.trim();
        self.users.values().find(|u| u.username == username)
    }

    fn count_outcome(&mut self, user_id: UserId, outcome: PlayerOutcome, delta: i64) -> StoreResult<()> {
        let user = self.users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;
        user.count(outcome, delta);
        Ok(())
    }

    fn truncate_moves(&mut self, game_id: GameId, keep: u32) -> StoreResult<()> {
        if !self.games.contains_key(&game_id) {
            return Err(StoreError::GameNotFound(game_id));
        }
        if let Some(moves) = self.moves.get_mut(&game_id) {
            moves.retain(|m| m.move_number <= keep);
        }
        Ok(())
    }

    fn create_game(&mut self, user_id: UserId, player_side: Side, ai_difficulty: u8) -> GameId {
        self.next_game_id += 1;
        let game_id = self.next_game_id;
        self.games.insert(
            game_id,
            GameRecord {
                game_id,
                user_id,
                player_side,
                ai_difficulty,
                result: GameResult::Ongoing,
                total_moves: 0,
                moves: Vec::new(),
                pgn: None,
                final_fen: None,
                started_at: Utc::now(),
                ended_at: None,
            },
        );
        game_id
    }

    fn update_game(&mut self, record: &GameRecord) -> StoreResult<()> {
        match self.games.get_mut(&record.game_id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::GameNotFound(record.game_id)),
        }
    }

    fn games_for_user(&self, user_id: UserId) -> Vec<GameRecord> {
        self.games
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect()
    }

    fn append_move(&mut self, record: &MoveRecord) -> StoreResult<()> {
        if !self.games.contains_key(&record.game_id) {
            return Err(StoreError::GameNotFound(record.game_id));
        }
        self.moves.entry(record.game_id).or_default().push(record.clone());
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    fn create_user(&self, username: &str) -> StoreResult<UserId> {
        self.tables.lock().create_user(username)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.lock().users.get(&user_id).cloned())
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.lock().find_user(username).cloned())
    }

    fn record_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()> {
        self.tables.lock().count_outcome(user_id, outcome, 1)
    }

    fn retract_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()> {
        self.tables.lock().count_outcome(user_id, outcome, -1)
    }

    fn create_game(&self, user_id: UserId, player_side: Side, ai_difficulty: u8) -> StoreResult<GameId> {
        Ok(self.tables.lock().create_game(user_id, player_side, ai_difficulty))
    }

    fn update_game(&self, record: &GameRecord) -> StoreResult<()> {
        self.tables.lock().update_game(record)
    }

    fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>> {
        Ok(self.tables.lock().games.get(&game_id).cloned())
    }

    fn games_for_user(&self, user_id: UserId) -> StoreResult<Vec<GameRecord>> {
        Ok(self.tables.lock().games_for_user(user_id))
    }

    fn append_move(&self, record: &MoveRecord) -> StoreResult<()> {
        self.tables.lock().append_move(record)
    }

    fn moves_for_game(&self, game_id: GameId) -> StoreResult<Vec<MoveRecord>> {
        Ok(self.tables.lock().moves.get(&game_id).cloned().unwrap_or_default())
    }

    fn truncate_moves(&self, game_id: GameId, keep: u32) -> StoreResult<()> {
        self.tables.lock().truncate_moves(game_id, keep)
    }

    fn replace_patterns(&self, user_id: UserId, patterns: &[Pattern]) -> StoreResult<()> {
        self.tables.lock().patterns.insert(user_id, patterns.to_vec());
        Ok(())
    }

    fn patterns_for_user(&self, user_id: UserId) -> StoreResult<Vec<Pattern>> {
        Ok(self.tables.lock().patterns.get(&user_id).cloned().unwrap_or_default())
    }
}

/// Store backed by a single JSON file, rewritten after every mutation.
pub struct JsonStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let tables: Tables = serde_json::from_str(&contents)?;
            info!(path = %path.display(), games = tables.games.len(), "loaded store");
            tables
        } else {
            info!(path = %path.display(), "no store file found, starting empty");
            Tables::default()
        };
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, tables: &Tables) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tables)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "store written");
        Ok(())
    }

    /// Apply `op` to a copy of the tables and keep it only once the file is written, so a
    /// failed write leaves memory and disk agreeing.
    fn write<T>(&self, op: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.tables.lock();
        let mut next = tables.clone();
        let out = op(&mut next)?;
        self.persist(&next)?;
        *tables = next;
        Ok(out)
    }
}

impl GameStore for JsonStore {
    fn create_user(&self, username: &str) -> StoreResult<UserId> {
        self.write(|t| t.create_user(username))
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.lock().users.get(&user_id).cloned())
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.lock().find_user(username).cloned())
    }

    fn record_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()> {
        self.write(|t| t.count_outcome(user_id, outcome, 1))
    }

    fn retract_outcome(&self, user_id: UserId, outcome: PlayerOutcome) -> StoreResult<()> {
        self.write(|t| t.count_outcome(user_id, outcome, -1))
    }

    fn create_game(&self, user_id: UserId, player_side: Side, ai_difficulty: u8) -> StoreResult<GameId> {
        self.write(|t| Ok(t.create_game(user_id, player_side, ai_difficulty)))
    }

    fn update_game(&self, record: &GameRecord) -> StoreResult<()> {
        self.write(|t| t.update_game(record))
    }

    fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>> {
        Ok(self.tables.lock().games.get(&game_id).cloned())
    }

    fn games_for_user(&self, user_id: UserId) -> StoreResult<Vec<GameRecord>> {
        Ok(self.tables.lock().games_for_user(user_id))
    }

    fn append_move(&self, record: &MoveRecord) -> StoreResult<()> {
        self.write(|t| t.append_move(record))
    }

    fn moves_for_game(&self, game_id: GameId) -> StoreResult<Vec<MoveRecord>> {
        Ok(self.tables.lock().moves.get(&game_id).cloned().unwrap_or_default())
    }

    fn truncate_moves(&self, game_id: GameId, keep: u32) -> StoreResult<()> {
        self.write(|t| t.truncate_moves(game_id, keep))
    }

    fn replace_patterns(&self, user_id: UserId, patterns: &[Pattern]) -> StoreResult<()> {
        self.write(|t| {
            t.patterns.insert(user_id, patterns.to_vec());
            Ok(())
        })
    }

    fn patterns_for_user(&self, user_id: UserId) -> StoreResult<Vec<Pattern>> {
        Ok(self.tables.lock().patterns.get(&user_id).cloned().unwrap_or_default())
    }
}
