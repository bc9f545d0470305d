//! Crate error type
//!
//! The simulation step itself never fails; these errors surface from stage
//! loading, config parsing and the binary's file access.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// An external stage override with no rows cannot produce a playable grid
    #[error("stage override {world}-{stage} has zero rows")]
    EmptyStage { world: u8, stage: u8 },

    #[error("stage key {world}-{stage} is outside worlds 1-8 / stages 1-4")]
    InvalidStageKey { world: u8, stage: u8 },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
