//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically, plus the flow
//! controller that moves between title, stages and the end screens.

use super::interact::{Effects, apply_bump, resolve};
use super::level::StageKey;
use super::player::{Buttons, PowerTier};
use super::state::{GamePhase, GameState, StageSession};
use crate::audio::SoundCue;
use crate::consts::*;
use crate::tile_of;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held movement/action buttons
    pub buttons: Buttons,
    /// Start / continue on the title and end screens
    pub confirm: bool,
    /// Cycle the starting world on the title screen
    pub cycle_world: bool,
    /// Reload the current stage (operator)
    pub restart: bool,
    /// Jump to the next stage (operator)
    pub skip: bool,
    /// Demo mode - autopilot drives the player
    pub demo: bool,
}

/// What the stage asked the controller to do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Continue,
    Cleared,
    DeathReload,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.cues.clear();
    state.time_ticks += 1;

    match state.phase {
        GamePhase::Title => {
            if input.cycle_world {
                state.world_select = state.world_select % WORLDS + 1;
                log::debug!("World select: {}", state.world_select);
            }
            if input.confirm {
                state.start_run(state.world_select);
            }
        }
        GamePhase::Playing => {
            if input.restart {
                log::info!("Restarting stage {}", state.key);
                state.load_stage(state.key);
            } else if input.skip {
                log::info!("Skipping stage {}", state.key);
                match state.key.next() {
                    Some(key) => {
                        state.load_stage(key);
                    }
                    None => finish_run(state, GamePhase::Victory),
                }
            } else {
                play(state, input, dt);
            }
        }
        GamePhase::WorldClear => {
            if input.confirm {
                match state.key.next() {
                    Some(key) => {
                        state.load_stage(key);
                    }
                    None => finish_run(state, GamePhase::Victory),
                }
            }
        }
        GamePhase::GameOver | GamePhase::Victory => {
            if input.confirm {
                log::info!("Back to title");
                state.phase = GamePhase::Title;
            }
        }
    }
}

fn finish_run(state: &mut GameState, phase: GamePhase) {
    log::info!("Run finished: {:?}, score {}", phase, state.score);
    state.phase = phase;
    state.session = None;
}

/// One Playing tick, then whatever transition it triggered
fn play(state: &mut GameState, input: &TickInput, dt: f32) {
    let reload_after = state.config.death_reload_ticks;
    let view_width = state.config.view_width;
    let Some(session) = state.session.as_mut() else {
        log::warn!("Playing without a stage, returning to title");
        state.phase = GamePhase::Title;
        return;
    };

    let buttons = if input.demo {
        autopilot(session)
    } else {
        input.buttons
    };
    let mut fx = Effects::default();
    let outcome = step_stage(session, &buttons, dt, reload_after, view_width, &mut fx);
    let time_bonus = session.time_left.max(0.0).floor() as u64 * SCORE_TIME_PER_SEC;
    state.apply_effects(fx);

    match outcome {
        StageOutcome::Continue => {}
        StageOutcome::Cleared => {
            state.score += time_bonus;
            log::info!("Stage {} clear, time bonus {}", state.key, time_bonus);
            advance(state);
        }
        StageOutcome::DeathReload => {
            state.lives = state.lives.saturating_sub(1);
            if state.lives == 0 {
                finish_run(state, GamePhase::GameOver);
            } else {
                log::info!("Lost a life, {} left", state.lives);
                state.load_stage(state.key);
            }
        }
    }
}

fn advance(state: &mut GameState) {
    let key = state.key;
    if key.is_final() {
        finish_run(state, GamePhase::Victory);
    } else if key.is_last_stage_of_world() {
        log::info!("World {} clear", key.world);
        state.phase = GamePhase::WorldClear;
        state.session = None;
    } else if let Some(next) = key.next() {
        state.load_stage(next);
    }
}

/// Move every entity, resolve interactions and report the stage outcome
fn step_stage(
    session: &mut StageSession,
    buttons: &Buttons,
    dt: f32,
    reload_after: u32,
    view_width: f32,
    fx: &mut Effects,
) -> StageOutcome {
    // Countdown freezes once the flagpole takes over
    if !session.flagpole.sliding && !session.player.dead {
        session.time_left -= dt;
        if session.time_left <= 0.0 {
            session.time_left = 0.0;
            if session.player.kill() {
                log::info!("Time up on stage {}", session.key);
                fx.cue(SoundCue::Death);
            }
        }
    }

    if !session.flagpole.sliding {
        let step = session.player.update(buttons, &session.grid);
        if step.jumped {
            fx.cue(SoundCue::Jump);
        }
        if step.fell {
            fx.cue(SoundCue::Death);
        }
        if let Some(fireball) = step.fireball {
            session.projectiles.push(fireball);
            fx.cue(SoundCue::Fire);
        }
        if let Some(at) = step.bump {
            apply_bump(session, at, fx);
        }
    }

    let player_x = session.player.body.center().x;
    {
        let StageSession {
            grid,
            enemies,
            projectiles,
            powerups,
            coin_pops,
            particles,
            rng,
            ..
        } = &mut *session;
        for powerup in powerups.iter_mut() {
            powerup.update(grid);
        }
        for projectile in projectiles.iter_mut() {
            projectile.update(grid);
        }
        // Enemy shots join the projectile list and move from next tick
        for enemy in enemies.iter_mut() {
            enemy.update(grid, player_x, rng, projectiles);
        }
        for pop in coin_pops.iter_mut() {
            pop.update();
        }
        for particle in particles.iter_mut() {
            particle.update();
        }
    }

    resolve(session, fx);

    {
        let StageSession {
            player,
            flagpole,
            grid,
            ..
        } = &mut *session;
        if flagpole.update(player, grid) {
            fx.cue(SoundCue::Clear);
        }
    }

    session.prune();
    session.update_camera(view_width);

    if session.flagpole.tick_clear() {
        StageOutcome::Cleared
    } else if session.player.dead && session.player.death_timer > reload_after {
        StageOutcome::DeathReload
    } else {
        StageOutcome::Continue
    }
}

/// How far ahead the autopilot looks for enemies
const AUTOPILOT_ENEMY_RANGE: f32 = 3.0 * TILE;
/// Fire range for Fire-tier autopilot
const AUTOPILOT_FIRE_RANGE: f32 = 8.0 * TILE;

/// Demo input: run right, jump at walls, gaps and nearby enemies, fire when possible
pub fn autopilot(session: &StageSession) -> Buttons {
    let player = &session.player;
    let grid = &session.grid;
    let b = player.body.bounds();

    let ahead = tile_of(b.right() + 4.0);
    let wall = grid.is_solid(ahead, tile_of(b.bottom() - 1.0)) || grid.is_solid(ahead, tile_of(b.top()));
    let below = tile_of(b.bottom() + 1.0);
    let gap_col = tile_of(b.right() + TILE * 0.5);
    let gap = (below..grid.height() as i32).all(|row| !grid.is_solid(gap_col, row));

    let enemy_dist = session
        .enemies
        .iter()
        .filter(|e| e.alive)
        .map(|e| e.bounds())
        .filter(|eb| (eb.center().y - b.center().y).abs() < 2.0 * TILE)
        .map(|eb| eb.left() - b.right())
        .filter(|&d| d >= -4.0)
        .fold(f32::INFINITY, f32::min);

    let want_jump = wall || gap || enemy_dist < AUTOPILOT_ENEMY_RANGE;
    // Press on the ground, hold while rising, release on the way down so the
    // next press registers as a fresh edge
    let jump = if player.body.on_ground {
        want_jump
    } else {
        player.body.vel.y < 0.0
    };

    Buttons {
        move_left: false,
        move_right: true,
        run: true,
        jump,
        fire: player.tier == PowerTier::Fire && enemy_dist < AUTOPILOT_FIRE_RANGE,
    }
}

/// First stage of the selected world, used by the demo binary
pub fn demo_start(state: &mut GameState) -> Option<StageKey> {
    if state.phase != GamePhase::Title {
        return None;
    }
    let input = TickInput {
        confirm: true,
        ..Default::default()
    };
    tick(state, &input, SIM_DT);
    (state.phase == GamePhase::Playing).then_some(state.key)
}
