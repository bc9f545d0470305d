//! Enemy variants and the per-variant update dispatcher
//!
//! Each variant carries only the state it needs: a firebar has no body and no
//! shell flag, a goomba has no hit points. `Enemy::update` is the single entry
//! point; ranged attackers push their shots into the caller's projectile list.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Kinematics, MotionParams};
use super::items::Projectile;
use super::tile::TileGrid;
use crate::consts::*;
use crate::{tile_of, wrap_degrees};

pub const ENEMY_SIZE: f32 = TILE - 6.0;
pub const BOSS_SIZE: f32 = TILE * 2.0;
pub const FIREBAR_SIZE: f32 = 16.0;

const WALKER_SPEED: f32 = 1.0;
/// Boss patrol speed (px/tick)
const BOSS_SPEED: f32 = 1.6;
const DEATH_TICKS: u32 = 20;
const BOSS_DEATH_TICKS: u32 = 30;
const HAMMER_FIRST_THROW: u32 = 60;
const HAMMER_JITTER: u32 = 30;
const BOSS_FIRST_FLAME: u32 = 180;
const BOSS_FLAME_INTERVAL: u32 = 100;
const BOSS_FLAME_JITTER: u32 = 40;

/// Ground-bound body with a signed cruising speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walker {
    pub body: Kinematics,
    /// Signed horizontal speed; survives the integrator zeroing vx on walls
    pub speed: f32,
}

impl Walker {
    fn new(x: f32, y: f32, size: f32, speed: f32) -> Self {
        Self {
            body: Kinematics::new(x, y, size, size),
            speed,
        }
    }

    /// Move one tick. Turns at walls, and at ledges when `ledge_turn` is set.
    fn advance(&mut self, params: &MotionParams, grid: &TileGrid, ledge_turn: bool) {
        self.body.vel.x = self.speed;
        let result = self.body.step(params, grid, false);
        if result.hit_wall {
            self.speed = -self.speed;
        } else if ledge_turn && self.body.on_ground && self.speed != 0.0 && !self.ground_ahead(grid) {
            self.speed = -self.speed;
        }
    }

    /// Is the tile just past the leading edge, one row under the feet, solid?
    fn ground_ahead(&self, grid: &TileGrid) -> bool {
        let b = self.body.bounds();
        let col = if self.speed > 0.0 {
            tile_of(b.right())
        } else {
            tile_of(b.left() - 1.0)
        };
        grid.is_solid(col, tile_of(b.bottom() + 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KoopaState {
    Walking,
    /// Retracted; `speed == 0` is a resting shell
    Shell {
        speed: f32,
        /// Ticks left during which the player who kicked it is ignored
        kick_grace: u32,
    },
}

/// Fixed-center circular motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub center: Vec2,
    pub radius: f32,
    /// Degrees, [0, 360)
    pub angle: f32,
    /// Degrees per tick
    pub speed: f32,
}

impl Orbit {
    /// Top-left of the hazard box at the current angle
    pub fn position(&self) -> Vec2 {
        let rad = self.angle.to_radians();
        self.center + Vec2::new(rad.cos(), rad.sin()) * self.radius - Vec2::splat(FIREBAR_SIZE * 0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    Goomba(Walker),
    Koopa {
        walker: Walker,
        state: KoopaState,
    },
    HammerBro {
        walker: Walker,
        throw_timer: u32,
    },
    Firebar(Orbit),
    Boss {
        walker: Walker,
        fire_timer: u32,
        hp: u8,
        /// Starred-contact hits are rate limited by this countdown
        contact_cooldown: u32,
        /// Patrol corridor in pixels (left, right)
        patrol: (f32, f32),
    },
}

/// Outcome of a successful stomp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompOutcome {
    Killed,
    Shelled,
    Kicked,
    /// Moving shell stopped in place
    Stopped,
}

/// Outcome of a projectile hit or Starred contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Immune,
    Killed,
    BossHurt { hp_left: u8 },
    BossDefeated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub alive: bool,
    /// Corpse display countdown after death
    pub death_timer: u32,
    pub kind: EnemyKind,
}

impl Enemy {
    fn with_kind(id: u32, kind: EnemyKind) -> Self {
        Self {
            id,
            alive: true,
            death_timer: 0,
            kind,
        }
    }

    pub fn goomba(id: u32, x: f32, y: f32) -> Self {
        Self::with_kind(id, EnemyKind::Goomba(Walker::new(x, y, ENEMY_SIZE, -WALKER_SPEED)))
    }

    pub fn koopa(id: u32, x: f32, y: f32) -> Self {
        Self::with_kind(
            id,
            EnemyKind::Koopa {
                walker: Walker::new(x, y, ENEMY_SIZE, -WALKER_SPEED),
                state: KoopaState::Walking,
            },
        )
    }

    pub fn hammer_bro(id: u32, x: f32, y: f32) -> Self {
        Self::with_kind(
            id,
            EnemyKind::HammerBro {
                walker: Walker::new(x, y, ENEMY_SIZE, -WALKER_SPEED),
                throw_timer: HAMMER_FIRST_THROW,
            },
        )
    }

    pub fn firebar(id: u32, center: Vec2, radius: f32, angle: f32, speed: f32) -> Self {
        Self::with_kind(
            id,
            EnemyKind::Firebar(Orbit {
                center,
                radius,
                angle: wrap_degrees(angle),
                speed,
            }),
        )
    }

    pub fn boss(id: u32, x: f32, y: f32, patrol: (f32, f32)) -> Self {
        Self::with_kind(
            id,
            EnemyKind::Boss {
                walker: Walker::new(x, y, BOSS_SIZE, -BOSS_SPEED),
                fire_timer: BOSS_FIRST_FLAME,
                hp: BOSS_HP,
                contact_cooldown: 0,
                patrol,
            },
        )
    }

    /// Short type name for logs and snapshots
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EnemyKind::Goomba(_) => "goomba",
            EnemyKind::Koopa {
                state: KoopaState::Walking,
                ..
            } => "koopa",
            EnemyKind::Koopa { .. } => "shell",
            EnemyKind::HammerBro { .. } => "hammer-bro",
            EnemyKind::Firebar(_) => "firebar",
            EnemyKind::Boss { .. } => "boss",
        }
    }

    pub fn walker(&self) -> Option<&Walker> {
        match &self.kind {
            EnemyKind::Goomba(walker)
            | EnemyKind::Koopa { walker, .. }
            | EnemyKind::HammerBro { walker, .. }
            | EnemyKind::Boss { walker, .. } => Some(walker),
            EnemyKind::Firebar(_) => None,
        }
    }

    pub fn bounds(&self) -> Aabb {
        match &self.kind {
            EnemyKind::Firebar(orbit) => {
                let pos = orbit.position();
                Aabb::new(pos.x, pos.y, FIREBAR_SIZE, FIREBAR_SIZE)
            }
            _ => self
                .walker()
                .map(|w| w.body.bounds())
                .unwrap_or_else(|| Aabb::new(0.0, 0.0, 0.0, 0.0)),
        }
    }

    /// Hazards that plain contact never kills and stomps never affect
    pub fn is_hazard(&self) -> bool {
        matches!(self.kind, EnemyKind::Firebar(_) | EnemyKind::Boss { .. })
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.kind, EnemyKind::Boss { .. })
    }

    /// Firebars let projectiles pass straight through
    pub fn takes_projectile_hits(&self) -> bool {
        !matches!(self.kind, EnemyKind::Firebar(_))
    }

    /// A kicked shell currently sliding
    pub fn is_moving_shell(&self) -> bool {
        matches!(
            self.kind,
            EnemyKind::Koopa {
                state: KoopaState::Shell { speed, .. },
                ..
            } if speed != 0.0
        )
    }

    /// Shell still ignoring the player who kicked it
    pub fn in_kick_grace(&self) -> bool {
        matches!(
            self.kind,
            EnemyKind::Koopa {
                state: KoopaState::Shell { kick_grace, .. },
                ..
            } if kick_grace > 0
        )
    }

    pub fn hp(&self) -> Option<u8> {
        match self.kind {
            EnemyKind::Boss { hp, .. } => Some(hp),
            _ => None,
        }
    }

    pub fn kill(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.death_timer = if self.is_boss() {
            BOSS_DEATH_TICKS
        } else {
            DEATH_TICKS
        };
    }

    /// Advance one tick. Dead enemies only run down their death timer.
    pub fn update<R: Rng>(
        &mut self,
        grid: &TileGrid,
        player_x: f32,
        rng: &mut R,
        shots: &mut Vec<Projectile>,
    ) {
        if !self.alive {
            self.death_timer = self.death_timer.saturating_sub(1);
            return;
        }

        match &mut self.kind {
            EnemyKind::Goomba(walker) => walker.advance(&MotionParams::WALKER, grid, true),
            EnemyKind::Koopa { walker, state } => match state {
                KoopaState::Walking => walker.advance(&MotionParams::WALKER, grid, true),
                KoopaState::Shell { speed, kick_grace } => {
                    *kick_grace = kick_grace.saturating_sub(1);
                    // Sliding shells cross gaps instead of turning at ledges
                    walker.speed = *speed;
                    walker.advance(&MotionParams::WALKER, grid, false);
                    *speed = walker.speed;
                }
            },
            EnemyKind::HammerBro {
                walker,
                throw_timer,
            } => {
                walker.advance(&MotionParams::WALKER, grid, false);
                *throw_timer = throw_timer.saturating_sub(1);
                if *throw_timer == 0 {
                    *throw_timer = HAMMER_FIRST_THROW + rng.random_range(0..=HAMMER_JITTER);
                    let b = walker.body.bounds();
                    let dir = if player_x > b.left() { 1.0 } else { -1.0 };
                    shots.push(Projectile::hammer(b.center().x, b.top(), dir));
                }
            }
            EnemyKind::Firebar(orbit) => {
                orbit.angle = wrap_degrees(orbit.angle + orbit.speed);
                return;
            }
            EnemyKind::Boss {
                walker,
                fire_timer,
                contact_cooldown,
                patrol,
                ..
            } => {
                *contact_cooldown = contact_cooldown.saturating_sub(1);
                walker.advance(&MotionParams::BOSS, grid, false);
                let b = walker.body.bounds();
                if b.left() < patrol.0 {
                    walker.speed = walker.speed.abs();
                } else if b.right() > patrol.1 {
                    walker.speed = -walker.speed.abs();
                }
                *fire_timer = fire_timer.saturating_sub(1);
                if *fire_timer == 0 {
                    *fire_timer = BOSS_FLAME_INTERVAL + rng.random_range(0..=BOSS_FLAME_JITTER);
                    let dir = if walker.speed < 0.0 { -1.0 } else { 1.0 };
                    let c = b.center();
                    shots.push(Projectile::flame(c.x, c.y, dir, rng.random_range(-2.0..=2.0)));
                }
            }
        }

        let fell = self
            .walker()
            .map(|w| w.body.below_stage(grid))
            .unwrap_or(false);
        if fell {
            // Off the bottom: gone, no corpse
            self.alive = false;
            self.death_timer = 0;
        }
    }

    /// Apply a qualifying stomp from a player centered at `player_cx`.
    /// Hazards are never stomped; callers route them to contact instead.
    pub fn stomp(&mut self, player_cx: f32) -> Option<StompOutcome> {
        let outcome = match &mut self.kind {
            EnemyKind::Goomba(_) | EnemyKind::HammerBro { .. } => StompOutcome::Killed,
            EnemyKind::Koopa { walker, state } => match state {
                KoopaState::Walking => {
                    walker.speed = 0.0;
                    walker.body.vel.x = 0.0;
                    *state = KoopaState::Shell {
                        speed: 0.0,
                        kick_grace: 0,
                    };
                    StompOutcome::Shelled
                }
                KoopaState::Shell { speed, kick_grace } if *speed == 0.0 => {
                    let dir = if player_cx < walker.body.center().x {
                        1.0
                    } else {
                        -1.0
                    };
                    *speed = SHELL_KICK_SPEED * dir;
                    *kick_grace = SHELL_KICK_GRACE;
                    StompOutcome::Kicked
                }
                KoopaState::Shell { speed, .. } => {
                    *speed = 0.0;
                    walker.speed = 0.0;
                    walker.body.vel.x = 0.0;
                    StompOutcome::Stopped
                }
            },
            EnemyKind::Firebar(_) | EnemyKind::Boss { .. } => return None,
        };
        if outcome == StompOutcome::Killed {
            self.kill();
        }
        Some(outcome)
    }

    /// Projectile hit, or Starred contact when `from_contact`.
    ///
    /// Boss contact hits respect the contact cooldown; projectile hits always land.
    pub fn hit(&mut self, from_contact: bool) -> HitOutcome {
        if !self.alive {
            return HitOutcome::Immune;
        }
        let outcome = match &mut self.kind {
            EnemyKind::Firebar(_) => HitOutcome::Immune,
            EnemyKind::Boss {
                hp,
                contact_cooldown,
                ..
            } => {
                if from_contact {
                    if *contact_cooldown > 0 {
                        return HitOutcome::Immune;
                    }
                    *contact_cooldown = BOSS_CONTACT_COOLDOWN;
                }
                *hp = hp.saturating_sub(1);
                if *hp == 0 {
                    HitOutcome::BossDefeated
                } else {
                    HitOutcome::BossHurt { hp_left: *hp }
                }
            }
            _ => HitOutcome::Killed,
        };
        if matches!(outcome, HitOutcome::Killed | HitOutcome::BossDefeated) {
            self.kill();
        }
        outcome
    }
}
