//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (geometry, spawner and session streams are independent)
//! - Stable iteration order (enemies by ID)
//! - No rendering, audio playback or platform dependencies

pub mod collision;
pub mod enemy;
pub mod interact;
pub mod items;
pub mod level;
pub mod player;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod tile;

pub use collision::{Aabb, Kinematics, MotionParams};
pub use enemy::{Enemy, EnemyKind, KoopaState};
pub use interact::{Contact, Effects, classify};
pub use items::{Flagpole, PowerUp, PowerUpKind, Projectile, ProjectileKind};
pub use level::{GeneratedStage, LevelType, StageKey, StageSource, generate, place_or_skip};
pub use player::{Buttons, Player, PowerTier};
pub use spawn::spawn;
pub use state::{GamePhase, GameState, StageSession};
pub use tick::{TickInput, autopilot, demo_start, tick};
pub use tile::{TileCoord, TileGrid, TileKind};
