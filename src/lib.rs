//! Chess sparring engine: difficulty-scaled alpha-beta search over `shakmaty` positions,
//! game sessions with pluggable persistence, and opening patterns mined from a player's
//! past games.

pub mod analysis;
pub mod difficulty;
pub mod error;
pub mod evaluation;
pub mod movegen;
pub mod patterns;
pub mod rules;
pub mod search;
pub mod session;
pub mod store;
pub mod types;
pub mod uci;

pub use difficulty::Difficulty;
pub use error::{EngineError, EngineResult};
pub use search::Engine;
pub use session::GameSession;
