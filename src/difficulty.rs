use crate::error::{EngineError, EngineResult};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;
pub const DEFAULT_LEVEL: u8 = 3;

/// Concrete effort budget for one difficulty level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyProfile {
    pub level: u8,
    pub depth: u8,
    /// Hard search deadline in milliseconds; 0 means depth-limited only.
    pub time_limit_ms: u64,
}

/// Indexed by `level - 1`. Depth and time ceiling never decrease with level.
const PROFILES: [DifficultyProfile; 10] = [
    DifficultyProfile { level: 1, depth: 1, time_limit_ms: 0 },
    DifficultyProfile { level: 2, depth: 1, time_limit_ms: 0 },
    DifficultyProfile { level: 3, depth: 2, time_limit_ms: 0 },
    DifficultyProfile { level: 4, depth: 2, time_limit_ms: 0 },
    DifficultyProfile { level: 5, depth: 3, time_limit_ms: 0 },
    DifficultyProfile { level: 6, depth: 3, time_limit_ms: 0 },
    DifficultyProfile { level: 7, depth: 4, time_limit_ms: 5_000 },
    DifficultyProfile { level: 8, depth: 4, time_limit_ms: 10_000 },
    DifficultyProfile { level: 9, depth: 5, time_limit_ms: 20_000 },
    DifficultyProfile { level: 10, depth: 6, time_limit_ms: 30_000 },
];

/// User-facing difficulty level, validated to 1..=10.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u8);

impl Difficulty {
    pub fn new(level: u8) -> EngineResult<Self> {
        if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            Ok(Self(level))
        } else {
            Err(EngineError::InvalidDifficulty(level))
        }
    }

    /// Out-of-range levels snap to the nearest valid one.
    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn profile(self) -> DifficultyProfile {
        PROFILES[(self.0 - MIN_LEVEL) as usize]
    }

    pub fn all() -> impl Iterator<Item = Difficulty> {
        (MIN_LEVEL..=MAX_LEVEL).map(Difficulty)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(DEFAULT_LEVEL)
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = EngineError;

    fn try_from(level: u8) -> EngineResult<Self> {
        Self::new(level)
    }
}
