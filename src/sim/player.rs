//! Player controller
//!
//! Power tier × protection × life state machine on top of the shared
//! integrator. Input is a boolean capability set sampled once per tick.

use serde::{Deserialize, Serialize};

use super::collision::{Kinematics, MotionParams};
use super::items::{PowerUpKind, Projectile};
use super::tile::{TileCoord, TileGrid};
use crate::consts::*;

/// Player box edge
pub const PLAYER_SIZE: f32 = TILE - 8.0;

/// Power tier; ordering follows the promotion chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum PowerTier {
    #[default]
    Small,
    Super,
    Fire,
}

impl PowerTier {
    /// Big tiers break bricks and get a flower from question blocks
    pub fn is_big(self) -> bool {
        self >= PowerTier::Super
    }
}

/// Per-tick input capability set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    pub move_left: bool,
    pub move_right: bool,
    pub run: bool,
    pub jump: bool,
    pub fire: bool,
}

/// Result of `Player::damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Starred, invincible or already dying
    Ignored,
    /// Lost one tier and started the grace window
    Downgraded(PowerTier),
    Died,
}

/// What one player update produced for the rest of the tick
#[derive(Debug, Clone, Default)]
pub struct PlayerStep {
    /// Tile struck from below
    pub bump: Option<TileCoord>,
    pub fireball: Option<Projectile>,
    pub jumped: bool,
    /// Fell past the bottom of the stage this tick
    pub fell: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub body: Kinematics,
    /// +1 facing right, -1 facing left
    pub facing: f32,
    pub tier: PowerTier,
    /// Post-hit grace countdown
    pub invincible: u32,
    pub star_timer: u32,
    pub dead: bool,
    pub death_timer: u32,
    pub fire_cooldown: u32,
    /// Jump still held since launch (variable jump height)
    jump_held: bool,
    /// Jump button state last tick, for edge detection
    prev_jump: bool,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            body: Kinematics::new(x, y, PLAYER_SIZE, PLAYER_SIZE),
            facing: 1.0,
            tier: PowerTier::Small,
            invincible: 0,
            star_timer: 0,
            dead: false,
            death_timer: 0,
            fire_cooldown: 0,
            jump_held: false,
            prev_jump: false,
        }
    }

    /// Spawn point for a stage of `rows` rows: column 2, standing above the ground rows
    pub fn spawn(rows: usize) -> Self {
        let row = rows.saturating_sub(4) as f32;
        Self::new(2.0 * TILE, row * TILE)
    }

    pub fn is_big(&self) -> bool {
        self.tier.is_big()
    }

    pub fn is_starred(&self) -> bool {
        self.star_timer > 0
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible > 0
    }

    /// Would a hit do anything right now?
    pub fn is_vulnerable(&self) -> bool {
        !self.dead && !self.is_starred() && !self.is_invincible()
    }

    /// Render hint: blink while dying or in the grace window
    pub fn blink_hidden(&self) -> bool {
        (self.dead && self.death_timer % 4 < 2) || (!self.dead && self.invincible % 8 >= 4)
    }

    /// Advance one tick under `buttons`. Dying players ignore input.
    pub fn update(&mut self, buttons: &Buttons, grid: &TileGrid) -> PlayerStep {
        let mut step = PlayerStep::default();

        if self.dead {
            self.death_timer += 1;
            self.body.apply_gravity(&MotionParams::DYING, false);
            self.body.advance_unclipped();
            return step;
        }

        self.invincible = self.invincible.saturating_sub(1);
        self.star_timer = self.star_timer.saturating_sub(1);
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);

        let top_speed = if buttons.run { RUN_SPEED } else { WALK_SPEED };
        let vel = &mut self.body.vel;
        if buttons.move_right {
            vel.x = (vel.x + ACCEL).min(top_speed);
            self.facing = 1.0;
        } else if buttons.move_left {
            vel.x = (vel.x - ACCEL).max(-top_speed);
            self.facing = -1.0;
        } else {
            vel.x *= FRICTION;
            if vel.x.abs() < 0.1 {
                vel.x = 0.0;
            }
        }

        let jump_edge = buttons.jump && !self.prev_jump;
        self.prev_jump = buttons.jump;
        if jump_edge && self.body.on_ground {
            self.body.vel.y = if self.body.vel.x.abs() > RUN_JUMP_THRESHOLD {
                JUMP_VY_RUN
            } else {
                JUMP_VY_WALK
            };
            self.body.on_ground = false;
            self.jump_held = true;
            step.jumped = true;
        }
        if !buttons.jump {
            self.jump_held = false;
        }

        if buttons.fire && self.tier == PowerTier::Fire && self.fire_cooldown == 0 {
            let x = self.body.pos.x + if self.facing > 0.0 { self.body.size.x } else { 0.0 };
            let y = self.body.pos.y + self.body.size.y * 0.3;
            step.fireball = Some(Projectile::fireball(x, y, self.facing));
            self.fire_cooldown = FIRE_COOLDOWN_TICKS;
        }

        let result = self.body.step(&MotionParams::PLAYER, grid, self.jump_held);
        step.bump = result.head_bump;

        let max_x = (grid.pixel_width() - self.body.size.x).max(0.0);
        self.body.pos.x = self.body.pos.x.clamp(0.0, max_x);

        if self.body.below_stage(grid) {
            step.fell = self.kill();
        }
        step
    }

    /// Apply one hit
    pub fn damage(&mut self) -> DamageOutcome {
        if !self.is_vulnerable() {
            return DamageOutcome::Ignored;
        }
        match self.tier {
            PowerTier::Fire | PowerTier::Super => {
                self.tier = if self.tier == PowerTier::Fire {
                    PowerTier::Super
                } else {
                    PowerTier::Small
                };
                self.invincible = INVINCIBLE_TICKS;
                DamageOutcome::Downgraded(self.tier)
            }
            PowerTier::Small => {
                self.kill();
                DamageOutcome::Died
            }
        }
    }

    /// Enter Dying. Returns false if already dying.
    pub fn kill(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.death_timer = 0;
        self.body.vel.x = 0.0;
        self.body.vel.y = DEATH_IMPULSE;
        self.body.on_ground = false;
        true
    }

    /// Apply a power-up. Returns true if the tier or star state changed.
    pub fn give(&mut self, kind: PowerUpKind) -> bool {
        match kind {
            PowerUpKind::Mushroom if self.tier == PowerTier::Small => {
                self.tier = PowerTier::Super;
                true
            }
            PowerUpKind::Flower if self.tier < PowerTier::Fire => {
                self.tier = PowerTier::Fire;
                true
            }
            PowerUpKind::Star => {
                self.star_timer = STAR_TICKS;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tile::TileKind;

    /// Flat floor on the bottom two rows, open above
    fn flat_grid(width: usize) -> TileGrid {
        let mut grid = TileGrid::new(width, GRID_ROWS);
        for col in 0..width as i32 {
            grid.set(col, GRID_ROWS as i32 - 1, TileKind::Ground);
            grid.set(col, GRID_ROWS as i32 - 2, TileKind::Ground);
        }
        grid
    }

    fn settled_player(grid: &TileGrid) -> Player {
        let mut p = Player::spawn(GRID_ROWS);
        for _ in 0..30 {
            p.update(&Buttons::default(), grid);
        }
        assert!(p.body.on_ground);
        p
    }

    fn press(jump: bool) -> Buttons {
        Buttons {
            jump,
            ..Default::default()
        }
    }

    #[test]
    fn test_spawn_settles_on_ground() {
        let grid = flat_grid(20);
        let p = settled_player(&grid);
        let floor = (GRID_ROWS - 2) as f32 * TILE;
        assert!((p.body.bounds().bottom() - floor).abs() < 1e-3);
    }

    #[test]
    fn test_jump_on_rising_edge_only() {
        let grid = flat_grid(20);
        let mut p = settled_player(&grid);
        let step = p.update(&press(true), &grid);
        assert!(step.jumped);
        assert!(p.body.vel.y < 0.0);

        // Hold through landing: no second launch without a release
        let mut relaunched = false;
        for _ in 0..120 {
            relaunched |= p.update(&press(true), &grid).jumped;
        }
        assert!(p.body.on_ground);
        assert!(!relaunched);

        p.update(&press(false), &grid);
        assert!(p.update(&press(true), &grid).jumped);
    }

    #[test]
    fn test_run_jump_is_higher() {
        let grid = flat_grid(40);
        let mut p = settled_player(&grid);
        let run = Buttons {
            move_right: true,
            run: true,
            ..Default::default()
        };
        for _ in 0..20 {
            p.update(&run, &grid);
        }
        assert!(p.body.vel.x > RUN_JUMP_THRESHOLD);
        p.update(&Buttons { jump: true, ..run }, &grid);
        // Launch speed plus one tick of held gravity
        let expected = JUMP_VY_RUN + GRAVITY * JUMP_HOLD_G;
        assert!((p.body.vel.y - expected).abs() < 1e-4);
    }

    #[test]
    fn test_friction_stops_player() {
        let grid = flat_grid(20);
        let mut p = settled_player(&grid);
        p.body.vel.x = 3.0;
        for _ in 0..60 {
            p.update(&Buttons::default(), &grid);
        }
        assert_eq!(p.body.vel.x, 0.0);
    }

    #[test]
    fn test_damage_chain() {
        let mut p = Player::new(0.0, 0.0);
        p.tier = PowerTier::Fire;
        assert_eq!(p.damage(), DamageOutcome::Downgraded(PowerTier::Super));
        // Grace window swallows the next hit
        assert_eq!(p.damage(), DamageOutcome::Ignored);
        p.invincible = 0;
        assert_eq!(p.damage(), DamageOutcome::Downgraded(PowerTier::Small));
        assert_eq!(p.invincible, INVINCIBLE_TICKS);
        p.invincible = 0;
        assert_eq!(p.damage(), DamageOutcome::Died);
        assert!(p.dead);
        assert_eq!(p.body.vel.y, DEATH_IMPULSE);
        assert_eq!(p.damage(), DamageOutcome::Ignored);
    }

    #[test]
    fn test_star_blocks_damage() {
        let mut p = Player::new(0.0, 0.0);
        p.give(PowerUpKind::Star);
        assert!(p.is_starred());
        assert_eq!(p.damage(), DamageOutcome::Ignored);
        assert_eq!(p.tier, PowerTier::Small);
    }

    #[test]
    fn test_power_up_rules() {
        let mut p = Player::new(0.0, 0.0);
        assert!(p.give(PowerUpKind::Mushroom));
        assert_eq!(p.tier, PowerTier::Super);
        // Mushroom only promotes Small
        assert!(!p.give(PowerUpKind::Mushroom));
        assert!(p.give(PowerUpKind::Flower));
        assert_eq!(p.tier, PowerTier::Fire);
        assert!(!p.give(PowerUpKind::Mushroom));
        assert_eq!(p.tier, PowerTier::Fire);

        let mut small = Player::new(0.0, 0.0);
        assert!(small.give(PowerUpKind::Flower));
        assert_eq!(small.tier, PowerTier::Fire);
    }

    #[test]
    fn test_fire_needs_tier_and_cooldown() {
        let grid = flat_grid(20);
        let mut p = settled_player(&grid);
        let fire = Buttons {
            fire: true,
            ..Default::default()
        };
        assert!(p.update(&fire, &grid).fireball.is_none());

        p.tier = PowerTier::Fire;
        assert!(p.update(&fire, &grid).fireball.is_some());
        assert!(p.update(&fire, &grid).fireball.is_none());
        for _ in 0..FIRE_COOLDOWN_TICKS - 1 {
            p.update(&Buttons::default(), &grid);
        }
        assert!(p.update(&fire, &grid).fireball.is_some());
    }

    #[test]
    fn test_dying_ignores_input_and_falls() {
        let grid = flat_grid(20);
        let mut p = settled_player(&grid);
        p.kill();
        let x = p.body.pos.x;
        let y = p.body.pos.y;
        for _ in 0..10 {
            p.update(
                &Buttons {
                    move_right: true,
                    jump: true,
                    ..Default::default()
                },
                &grid,
            );
        }
        assert_eq!(p.body.pos.x, x);
        assert!(p.body.pos.y < y, "death impulse carries the player up first");
        assert_eq!(p.death_timer, 10);
    }

    #[test]
    fn test_falling_out_kills() {
        let grid = TileGrid::new(10, GRID_ROWS);
        let mut p = Player::spawn(GRID_ROWS);
        let mut fell = false;
        for _ in 0..200 {
            fell |= p.update(&Buttons::default(), &grid).fell;
        }
        assert!(fell);
        assert!(p.dead);
    }

    #[test]
    fn test_head_bump_reported() {
        let mut grid = flat_grid(20);
        let row = GRID_ROWS as i32 - 6;
        grid.set(2, row, TileKind::Question);
        let mut p = settled_player(&grid);
        let mut bump = None;
        p.update(&press(true), &grid);
        for _ in 0..30 {
            bump = bump.or(p.update(&press(true), &grid).bump);
        }
        assert_eq!(bump, Some(TileCoord::new(2, row)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tier_regression_is_monotone(start in 0u8..3, gaps in proptest::collection::vec(0u32..200, 3)) {
                let mut p = Player::new(0.0, 0.0);
                p.tier = match start {
                    0 => PowerTier::Small,
                    1 => PowerTier::Super,
                    _ => PowerTier::Fire,
                };
                let mut seen = vec![p.tier];
                for wait in gaps {
                    p.invincible = p.invincible.saturating_sub(wait);
                    match p.damage() {
                        DamageOutcome::Downgraded(tier) => {
                            let prev = *seen.last().unwrap();
                            prop_assert!(tier < prev);
                            prop_assert_eq!(tier as u8 + 1, prev as u8, "tier skipped");
                            seen.push(tier);
                        }
                        DamageOutcome::Died => {
                            prop_assert_eq!(*seen.last().unwrap(), PowerTier::Small);
                            prop_assert!(p.dead);
                        }
                        DamageOutcome::Ignored => prop_assert!(p.is_invincible() || p.dead),
                    }
                }
            }
        }
    }
}
