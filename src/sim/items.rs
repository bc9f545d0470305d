//! Projectiles, pickups, cosmetic effects and the flagpole

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Kinematics, MotionParams};
use super::player::Player;
use super::tile::{TileCoord, TileGrid};
use crate::consts::*;

/// Ticks any projectile may live
pub const PROJECTILE_LIFETIME: u32 = 180;
pub const FIREBALL_SIZE: f32 = 10.0;
pub const ENEMY_SHOT_SIZE: f32 = 12.0;
const FIREBALL_SPEED: f32 = 7.0;
const FIREBALL_BOUNCE_VY: f32 = -5.0;
const FIREBALL_MAX_BOUNCES: u32 = 4;

/// Projectile sub-kind. Fireballs belong to the player, the rest are hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Fireball,
    Hammer,
    Flame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub body: Kinematics,
    pub age: u32,
    pub bounces: u32,
    pub alive: bool,
}

impl Projectile {
    fn new(kind: ProjectileKind, pos: Vec2, vel: Vec2, size: f32) -> Self {
        let mut body = Kinematics::new(pos.x, pos.y, size, size);
        body.vel = vel;
        Self {
            kind,
            body,
            age: 0,
            bounces: 0,
            alive: true,
        }
    }

    pub fn fireball(x: f32, y: f32, dir: f32) -> Self {
        Self::new(
            ProjectileKind::Fireball,
            Vec2::new(x, y),
            Vec2::new(FIREBALL_SPEED * dir.signum(), -3.0),
            FIREBALL_SIZE,
        )
    }

    /// Arcing throw toward `dir`
    pub fn hammer(x: f32, y: f32, dir: f32) -> Self {
        Self::new(
            ProjectileKind::Hammer,
            Vec2::new(x, y),
            Vec2::new(3.0 * dir.signum(), -6.0),
            ENEMY_SHOT_SIZE,
        )
    }

    /// Straight flame with a small vertical drift
    pub fn flame(x: f32, y: f32, dir: f32, drift: f32) -> Self {
        Self::new(
            ProjectileKind::Flame,
            Vec2::new(x, y),
            Vec2::new(3.0 * dir.signum(), drift),
            ENEMY_SHOT_SIZE,
        )
    }

    pub fn is_hostile(&self) -> bool {
        self.kind != ProjectileKind::Fireball
    }

    pub fn bounds(&self) -> Aabb {
        self.body.bounds()
    }

    pub fn update(&mut self, grid: &TileGrid) {
        if !self.alive {
            return;
        }
        self.age += 1;
        match self.kind {
            ProjectileKind::Fireball => {
                let result = self.body.step(&MotionParams::FIREBALL, grid, false);
                if result.landed {
                    self.body.vel.y = FIREBALL_BOUNCE_VY;
                    self.bounces += 1;
                }
                if result.hit_wall || self.bounces > FIREBALL_MAX_BOUNCES {
                    self.alive = false;
                }
            }
            ProjectileKind::Hammer => {
                self.body.apply_gravity(&MotionParams::HAMMER, false);
                self.body.advance_unclipped();
            }
            ProjectileKind::Flame => {
                self.body.apply_gravity(&MotionParams::FLAME, false);
                self.body.advance_unclipped();
            }
        }

        let x = self.body.pos.x;
        if self.age > PROJECTILE_LIFETIME
            || x < 0.0
            || x > grid.pixel_width()
            || self.body.below_stage(grid)
        {
            self.alive = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Mushroom,
    Flower,
    Star,
}

const POWERUP_SIZE: f32 = TILE - 4.0;
const POWERUP_SPEED: f32 = 1.5;
const EMERGE_SPEED: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub body: Kinematics,
    /// Rising out of the source tile; no gravity or collision yet
    pub emerging: bool,
    emerge_to: f32,
    speed: f32,
    pub alive: bool,
}

impl PowerUp {
    /// Starts inside the bumped tile and rises until it rests one tile above
    pub fn from_tile(kind: PowerUpKind, tile: TileCoord) -> Self {
        let x = tile.col as f32 * TILE + 2.0;
        let y = tile.row as f32 * TILE;
        Self {
            kind,
            body: Kinematics::new(x, y, POWERUP_SIZE, POWERUP_SIZE),
            emerging: true,
            emerge_to: y - POWERUP_SIZE,
            speed: POWERUP_SPEED,
            alive: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.body.bounds()
    }

    pub fn update(&mut self, grid: &TileGrid) {
        if !self.alive {
            return;
        }
        if self.emerging {
            self.body.pos.y -= EMERGE_SPEED;
            if self.body.pos.y <= self.emerge_to {
                self.body.pos.y = self.emerge_to;
                self.emerging = false;
            }
            return;
        }
        self.body.vel.x = self.speed;
        let result = self.body.step(&MotionParams::POWERUP, grid, false);
        if result.hit_wall {
            self.speed = -self.speed;
        }
        if self.body.below_stage(grid) {
            self.alive = false;
        }
    }
}

const COIN_POP_TICKS: u32 = 40;

/// Coin that hops out of a coin block (cosmetic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinPop {
    pub pos: Vec2,
    pub vy: f32,
    pub age: u32,
}

impl CoinPop {
    pub fn from_tile(tile: TileCoord) -> Self {
        Self {
            pos: Vec2::new(
                tile.col as f32 * TILE + TILE * 0.5 - 8.0,
                tile.row as f32 * TILE,
            ),
            vy: -8.0,
            age: 0,
        }
    }

    pub fn update(&mut self) {
        self.vy += 0.6;
        self.pos.y += self.vy;
        self.age += 1;
    }

    pub fn alive(&self) -> bool {
        self.age < COIN_POP_TICKS
    }
}

/// What a particle depicts, for the render collaborator's palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    Brick,
    Enemy,
}

/// Debris (cosmetic, never affects gameplay)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: u32,
}

impl Particle {
    pub fn scatter<R: Rng>(kind: ParticleKind, at: Vec2, rng: &mut R) -> Self {
        Self {
            kind,
            pos: at,
            vel: Vec2::new(rng.random_range(-4.0..4.0), rng.random_range(-8.0..-2.0)),
            life: 35,
        }
    }

    /// `count` particles bursting from `at`
    pub fn burst<R: Rng>(kind: ParticleKind, at: Vec2, count: usize, rng: &mut R) -> Vec<Self> {
        (0..count).map(|_| Self::scatter(kind, at, rng)).collect()
    }

    pub fn update(&mut self) {
        self.vel.y += 0.5;
        self.pos += self.vel;
        self.life = self.life.saturating_sub(1);
    }

    pub fn alive(&self) -> bool {
        self.life > 0
    }
}

const FLAG_WIDTH: f32 = 8.0;
const FLAG_SLIDE_SPEED: f32 = 3.0;
const FLAG_DROP_SPEED: f32 = 5.0;
const WALK_OFF_SPEED: f32 = 2.0;

/// End-of-stage flagpole and its scripted sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flagpole {
    pub x: f32,
    pub top: f32,
    pub bottom: f32,
    /// Flag cloth position, drops while the player slides
    pub flag_y: f32,
    pub sliding: bool,
    /// Slide finished; player walks off while `clear_timer` runs
    pub done: bool,
    pub clear_timer: u32,
    /// Computed once at first contact
    pub bonus: u64,
}

impl Flagpole {
    /// Pole four columns from the stage end, spanning rows 3 to 13
    pub fn for_grid(grid: &TileGrid) -> Self {
        let rows = grid.height() as f32;
        let top = (rows - 12.0) * TILE;
        Self {
            x: (grid.width() as f32 - 4.0) * TILE,
            top,
            bottom: (rows - 2.0) * TILE,
            flag_y: top,
            sliding: false,
            done: false,
            clear_timer: 0,
            bonus: 0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.top, FLAG_WIDTH, self.bottom - self.top)
    }

    /// Tiered bonus for contact at `player_y` (player's top edge).
    /// Top of the pole pays the maximum, anything near the base pays the minimum.
    pub fn bonus_at(&self, player_y: f32) -> u64 {
        let span = self.bottom - self.top - 32.0;
        let ratio = 1.0 - ((player_y - self.top) / span).clamp(0.0, 1.0);
        let tier = (ratio * 10.0).floor() as u64;
        (tier * FLAG_MIN_BONUS).clamp(FLAG_MIN_BONUS, FLAG_MAX_BONUS)
    }

    /// First contact: lock the player and compute the bonus. `None` if no
    /// contact or the sequence already started.
    pub fn try_grab(&mut self, player: &mut Player) -> Option<u64> {
        if self.sliding || player.dead || !player.body.bounds().overlaps(&self.bounds()) {
            return None;
        }
        self.sliding = true;
        player.body.vel = Vec2::ZERO;
        self.bonus = self.bonus_at(player.body.pos.y);
        log::debug!("Flagpole grabbed at y={:.0}, bonus {}", player.body.pos.y, self.bonus);
        Some(self.bonus)
    }

    /// Drive the scripted sequence. Returns true on the tick the slide finishes.
    pub fn update(&mut self, player: &mut Player, grid: &TileGrid) -> bool {
        if !self.sliding {
            return false;
        }
        if !self.done {
            self.flag_y = (self.flag_y + FLAG_DROP_SPEED).min(self.bottom - 20.0);
            player.body.pos.x = self.x - player.body.size.x - 2.0;
            player.body.pos.y += FLAG_SLIDE_SPEED;
            player.body.vel = Vec2::ZERO;
            let rest = self.bottom - player.body.size.y;
            if player.body.pos.y >= rest {
                player.body.pos.y = rest;
                player.body.on_ground = true;
                self.done = true;
                self.clear_timer = FLAG_CLEAR_TICKS;
                return true;
            }
            return false;
        }

        // Walk off to the right
        player.facing = 1.0;
        player.body.vel.x = WALK_OFF_SPEED;
        player.body.step(&MotionParams::PLAYER, grid, false);
        let max_x = (grid.pixel_width() - player.body.size.x).max(0.0);
        player.body.pos.x = player.body.pos.x.min(max_x);
        false
    }

    /// Count down after the slide. Returns true once the stage should advance.
    pub fn tick_clear(&mut self) -> bool {
        if !self.done {
            return false;
        }
        self.clear_timer = self.clear_timer.saturating_sub(1);
        self.clear_timer == 0
    }
}
