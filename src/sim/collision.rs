//! Kinematics and rectangle-vs-tile collision
//!
//! Every moving entity except the firebar owns a `Kinematics` and advances it
//! through the same integrator: semi-implicit Euler gravity, then an
//! axis-separated sweep (horizontal first, then vertical) against solid tiles.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::tile::{TileCoord, TileGrid};
use crate::consts::*;
use crate::tile_of;

/// Overlap below this depth counts as touching, not colliding
const SKIN: f32 = 1e-3;
/// Depth of the probe strip under an entity's feet
const GROUND_PROBE: f32 = 2.0;

/// Axis-aligned box, top-left origin, y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }
    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }
    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Strict overlap (shared edges do not count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.right() - other.left() > SKIN
            && other.right() - self.left() > SKIN
            && self.bottom() - other.top() > SKIN
            && other.bottom() - self.top() > SKIN
    }

    /// Inclusive tile range (c0, c1, r0, r1) the box may touch
    pub fn tile_span(&self) -> (i32, i32, i32, i32) {
        (
            tile_of(self.left()),
            tile_of(self.right()),
            tile_of(self.top()),
            tile_of(self.bottom()),
        )
    }
}

/// Per-caller integration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Added to vy every tick
    pub gravity: f32,
    /// Terminal downward speed
    pub max_fall: f32,
}

impl MotionParams {
    pub const PLAYER: Self = Self {
        gravity: GRAVITY,
        max_fall: MAX_FALL,
    };
    /// Dying player: half gravity, no tile contact
    pub const DYING: Self = Self {
        gravity: GRAVITY * 0.5,
        max_fall: MAX_FALL,
    };
    pub const WALKER: Self = Self {
        gravity: GRAVITY * 0.8,
        max_fall: 12.0,
    };
    pub const BOSS: Self = Self {
        gravity: GRAVITY * 0.4,
        max_fall: 10.0,
    };
    pub const POWERUP: Self = Self {
        gravity: GRAVITY * 0.7,
        max_fall: 10.0,
    };
    pub const FIREBALL: Self = Self {
        gravity: GRAVITY * 0.8,
        max_fall: 12.0,
    };
    pub const HAMMER: Self = Self {
        gravity: 0.4,
        max_fall: MAX_FALL,
    };
    /// Boss flames fly straight
    pub const FLAME: Self = Self {
        gravity: 0.0,
        max_fall: f32::MAX,
    };
}

/// What happened during one `move_and_collide`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepResult {
    /// Horizontal motion was stopped by a solid tile
    pub hit_wall: bool,
    /// Downward motion was stopped by a solid tile
    pub landed: bool,
    /// Upward motion was stopped; the struck tile for the bump contract
    pub head_bump: Option<TileCoord>,
}

/// Position, velocity, box and ground state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Top-left corner
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub on_ground: bool,
}

impl Kinematics {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            vel: Vec2::ZERO,
            size: Vec2::new(w, h),
            on_ground: false,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Semi-implicit Euler gravity. Holding jump on the way up scales gravity down.
    pub fn apply_gravity(&mut self, params: &MotionParams, jump_held: bool) {
        let scale = if jump_held && self.vel.y < 0.0 {
            JUMP_HOLD_G
        } else {
            1.0
        };
        self.vel.y = (self.vel.y + params.gravity * scale).min(params.max_fall);
    }

    /// Move without tile contact (dying player, thrown hammers, flames)
    pub fn advance_unclipped(&mut self) {
        self.pos += self.vel;
    }

    /// Gravity plus collision in one call
    pub fn step(&mut self, params: &MotionParams, grid: &TileGrid, jump_held: bool) -> StepResult {
        self.apply_gravity(params, jump_held);
        self.move_and_collide(grid)
    }

    /// Axis-separated move against solid tiles.
    ///
    /// After each axis the box overlaps no solid tile. The ground probe runs
    /// after the horizontal pass so walking off a ledge clears `on_ground`
    /// even on a tick with no vertical displacement.
    pub fn move_and_collide(&mut self, grid: &TileGrid) -> StepResult {
        let mut result = StepResult::default();

        // Horizontal
        let dx = self.vel.x;
        if dx != 0.0 {
            self.pos.x += dx;
            let bounds = self.bounds();
            let mut hits = grid.solid_tiles_in(&bounds).map(|t| t.bounds()).peekable();
            if hits.peek().is_some() {
                if dx > 0.0 {
                    let edge = hits.map(|b| b.left()).fold(f32::INFINITY, f32::min);
                    self.pos.x = edge - self.size.x;
                } else {
                    let edge = hits.map(|b| b.right()).fold(f32::NEG_INFINITY, f32::max);
                    self.pos.x = edge;
                }
                self.vel.x = 0.0;
                result.hit_wall = true;
            }
        }

        // Ground re-check
        let feet = Aabb::new(self.pos.x, self.bottom(), self.size.x, GROUND_PROBE);
        self.on_ground = self.vel.y >= 0.0 && grid.any_solid_in(&feet);

        // Vertical
        let dy = self.vel.y;
        if dy != 0.0 {
            self.pos.y += dy;
            let bounds = self.bounds();
            let hits: Vec<TileCoord> = grid.solid_tiles_in(&bounds).collect();
            if !hits.is_empty() {
                if dy > 0.0 {
                    let edge = hits
                        .iter()
                        .map(|t| t.bounds().top())
                        .fold(f32::INFINITY, f32::min);
                    self.pos.y = edge - self.size.y;
                    self.on_ground = true;
                    result.landed = true;
                } else {
                    let edge = hits
                        .iter()
                        .map(|t| t.bounds().bottom())
                        .fold(f32::NEG_INFINITY, f32::max);
                    self.pos.y = edge;
                    self.on_ground = false;
                    result.head_bump = self.pick_struck_tile(&hits, edge);
                }
                self.vel.y = 0.0;
            } else if dy < 0.0 {
                self.on_ground = false;
            }
        }

        result
    }

    /// Of the tiles hit overhead, the one in the lowest row nearest our center
    fn pick_struck_tile(&self, hits: &[TileCoord], edge: f32) -> Option<TileCoord> {
        let cx = self.center().x;
        hits.iter()
            .filter(|t| (t.bounds().bottom() - edge).abs() < SKIN)
            .min_by(|a, b| {
                let da = (a.bounds().center().x - cx).abs();
                let db = (b.bounds().center().x - cx).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Fell below the bottom edge of the stage
    pub fn below_stage(&self, grid: &TileGrid) -> bool {
        self.pos.y > grid.pixel_height()
    }
}
