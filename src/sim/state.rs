//! Game state and the per-stage session
//!
//! A `StageSession` owns everything that lives and dies with one stage load.
//! Restart, skip and death-reload throw it away and build a fresh one.

use std::ops::Range;

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::enemy::Enemy;
use super::interact::Effects;
use super::items::{CoinPop, Flagpole, Particle, PowerUp, Projectile};
use super::level::{LevelType, StageKey, StageSource, generate};
use super::player::Player;
use super::spawn::spawn;
use super::tile::TileGrid;
use crate::audio::SoundCue;
use crate::config::GameConfig;
use crate::consts::COINS_PER_LIFE;
use crate::error::GameError;
use crate::view::{camera_for, visible_columns};

/// Stream id for the behavior/effects generator (hammer timing, flames, debris)
const FX_STREAM: u64 = 0x0a02_bdbf_7bb3_c0a7;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// World select, waiting for confirm
    Title,
    Playing,
    /// Stage 4 of a non-final world cleared
    WorldClear,
    GameOver,
    /// World 8 stage 4 cleared
    Victory,
}

/// Everything owned by one loaded stage
#[derive(Debug, Clone)]
pub struct StageSession {
    pub key: StageKey,
    pub level_type: LevelType,
    pub source: StageSource,
    pub grid: TileGrid,
    pub player: Player,
    /// Stable order by id
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub powerups: Vec<PowerUp>,
    pub coin_pops: Vec<CoinPop>,
    pub particles: Vec<Particle>,
    pub flagpole: Flagpole,
    /// Left edge of the view in pixels
    pub camera_x: f32,
    /// Stage countdown in seconds
    pub time_left: f32,
    /// Behavior/effects RNG, reseeded on every load
    pub rng: Pcg32,
}

impl StageSession {
    /// Build and populate a stage
    pub fn load(key: StageKey, config: &GameConfig) -> Result<Self, GameError> {
        let stage = generate(key, key.level_seed(), config)?;
        let enemies = spawn(&stage.grid, key, stage.width, config);
        log::info!(
            "Loaded stage {} ({:?}, {:?}): {} columns, {} enemies",
            key,
            stage.level_type,
            stage.source,
            stage.width,
            enemies.len()
        );
        let mut session = Self::with_grid(
            key,
            stage.level_type,
            stage.grid,
            enemies,
            config.stage_time_secs,
        );
        session.source = stage.source;
        Ok(session)
    }

    /// Session over an existing grid, player at the spawn point
    pub fn with_grid(
        key: StageKey,
        level_type: LevelType,
        grid: TileGrid,
        mut enemies: Vec<Enemy>,
        time_secs: f32,
    ) -> Self {
        enemies.sort_by_key(|e| e.id);
        let player = Player::spawn(grid.height());
        let flagpole = Flagpole::for_grid(&grid);
        Self {
            key,
            level_type,
            source: StageSource::Procedural,
            grid,
            player,
            enemies,
            projectiles: Vec::new(),
            powerups: Vec::new(),
            coin_pops: Vec::new(),
            particles: Vec::new(),
            flagpole,
            camera_x: 0.0,
            time_left: time_secs,
            rng: Pcg32::new(key.level_seed(), FX_STREAM),
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    /// Center the view on the player, clamped to the stage
    pub fn update_camera(&mut self, view_width: f32) {
        self.camera_x = camera_for(self.player.body.pos.x, view_width, self.grid.pixel_width());
    }

    /// Columns a `view_width` viewport at the current camera can show
    pub fn visible_columns(&self, view_width: f32) -> Range<usize> {
        visible_columns(self.camera_x, view_width, self.grid.width())
    }

    /// Drop dead entities; corpses stay while their death timer runs
    pub fn prune(&mut self) {
        self.projectiles.retain(|p| p.alive);
        self.powerups.retain(|p| p.alive);
        self.coin_pops.retain(CoinPop::alive);
        self.particles.retain(Particle::alive);
        self.enemies.retain(|e| e.alive || e.death_timer > 0);
    }
}

/// Complete game state
#[derive(Debug)]
pub struct GameState {
    pub phase: GamePhase,
    /// World chosen on the title screen (1..=8)
    pub world_select: u8,
    /// Stage being played (or just cleared)
    pub key: StageKey,
    pub score: u64,
    pub coins: u32,
    pub lives: u8,
    pub session: Option<StageSession>,
    /// Cues raised by the last tick
    pub cues: Vec<SoundCue>,
    /// Most recent stage-load failure
    pub last_error: Option<GameError>,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub config: GameConfig,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            phase: GamePhase::Title,
            world_select: 1,
            key: StageKey { world: 1, stage: 1 },
            score: 0,
            coins: 0,
            lives: config.starting_lives,
            session: None,
            cues: Vec::new(),
            last_error: None,
            time_ticks: 0,
            config,
        }
    }

    /// Fresh run from stage 1 of `world`
    pub fn start_run(&mut self, world: u8) {
        self.score = 0;
        self.coins = 0;
        self.lives = self.config.starting_lives;
        let key = StageKey::new(world, 1).unwrap_or(StageKey { world: 1, stage: 1 });
        log::info!("New run from world {}", key.world);
        self.load_stage(key);
    }

    /// Discard the current session and build `key`. On failure fall back to Title.
    pub fn load_stage(&mut self, key: StageKey) -> bool {
        self.key = key;
        match StageSession::load(key, &self.config) {
            Ok(session) => {
                self.session = Some(session);
                self.phase = GamePhase::Playing;
                true
            }
            Err(e) => {
                log::error!("Stage {} failed to load: {}", key, e);
                self.session = None;
                self.last_error = Some(e);
                self.phase = GamePhase::Title;
                false
            }
        }
    }

    /// Fold one tick's effects into the run totals
    pub fn apply_effects(&mut self, fx: Effects) {
        self.score += fx.score;
        self.lives = self.lives.saturating_add(fx.lives);
        for _ in 0..fx.coins {
            self.coins += 1;
            if self.coins % COINS_PER_LIFE == 0 {
                self.lives = self.lives.saturating_add(1);
                self.cues.push(SoundCue::OneUp);
                log::info!("Extra life at {} coins", self.coins);
            }
        }
        self.cues.extend(fx.cues);
    }
}
