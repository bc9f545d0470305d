//! Tilerun - a deterministic side-scrolling platformer core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tile grid, generation, physics, entities, flow)
//! - `config`: Explicit configuration object (level-type rule, cue names, overrides)
//! - `audio`: Fire-and-forget sound cue contract
//! - `view`: Read-only snapshot handed to render collaborators
//! - `error`: Crate error type

pub mod audio;
pub mod config;
pub mod error;
pub mod sim;
pub mod view;

pub use audio::{CueSink, LogCueSink, SoundCue};
pub use config::{GameConfig, LevelTypeRule};
pub use error::GameError;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, all velocities are px/tick at this rate)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Tile edge length in pixels
    pub const TILE: f32 = 40.0;
    /// Rows in a generated stage
    pub const GRID_ROWS: usize = 15;

    /// Physics (px/tick, px/tick²)
    pub const GRAVITY: f32 = 0.65;
    pub const MAX_FALL: f32 = 20.0;
    pub const WALK_SPEED: f32 = 3.0;
    pub const RUN_SPEED: f32 = 5.5;
    pub const ACCEL: f32 = 0.5;
    pub const FRICTION: f32 = 0.84;
    pub const JUMP_VY_WALK: f32 = -14.0;
    pub const JUMP_VY_RUN: f32 = -15.5;
    /// Horizontal speed above which the run launch speed is used
    pub const RUN_JUMP_THRESHOLD: f32 = 2.0;
    /// Fraction of gravity applied while jump is held on the way up
    pub const JUMP_HOLD_G: f32 = 0.42;

    /// Player timers (ticks)
    pub const INVINCIBLE_TICKS: u32 = 120;
    pub const STAR_TICKS: u32 = 600;
    pub const FIRE_COOLDOWN_TICKS: u32 = 20;
    pub const DEATH_IMPULSE: f32 = -12.0;

    /// Stomp tuning
    pub const STOMP_TOLERANCE: f32 = 12.0;
    pub const STOMP_REBOUND: f32 = -10.0;
    pub const SHELL_KICK_SPEED: f32 = 8.0;
    /// Ticks after a kick during which the shell ignores the player
    pub const SHELL_KICK_GRACE: u32 = 12;

    /// Boss tuning
    pub const BOSS_HP: u8 = 5;
    /// Ticks between Starred-contact hits on the boss
    pub const BOSS_CONTACT_COOLDOWN: u32 = 30;

    /// Flagpole
    pub const FLAG_MIN_BONUS: u64 = 500;
    pub const FLAG_MAX_BONUS: u64 = 5000;
    pub const FLAG_CLEAR_TICKS: u32 = 150;

    /// Score table
    pub const SCORE_STOMP: u64 = 100;
    pub const SCORE_HAMMER_BRO_STOMP: u64 = 1000;
    pub const SCORE_CONTACT_KILL: u64 = 200;
    pub const SCORE_BOSS: u64 = 5000;
    pub const SCORE_BRICK: u64 = 50;
    pub const SCORE_COIN: u64 = 200;
    pub const SCORE_POWERUP: u64 = 1000;
    pub const SCORE_TIME_PER_SEC: u64 = 50;
    /// Coins needed for an extra life
    pub const COINS_PER_LIFE: u32 = 100;

    /// World/stage bounds
    pub const WORLDS: u8 = 8;
    pub const STAGES_PER_WORLD: u8 = 4;
}

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    angle.rem_euclid(360.0)
}

/// Tile column containing pixel x (negative x maps below zero)
#[inline]
pub fn tile_of(px: f32) -> i32 {
    (px / consts::TILE).floor() as i32
}
