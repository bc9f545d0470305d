//! Stage generation
//!
//! Resolution order for a stage key: external override (rows used as-is),
//! then the hand-authored layouts of world 1, then procedural generation.
//! Everything here is a pure function of its inputs; the procedural path
//! draws from a `Pcg32` seeded with the caller's seed.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::tile::{TileGrid, TileKind};
use crate::config::GameConfig;
use crate::consts::{GRID_ROWS, STAGES_PER_WORLD, WORLDS};
use crate::error::GameError;

/// Visual/musical theme of a stage. Castles carve lava gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelType {
    Overworld,
    Underground,
    Underwater,
    Castle,
}

/// (world, stage) pair, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageKey {
    pub world: u8,
    pub stage: u8,
}

impl StageKey {
    pub fn new(world: u8, stage: u8) -> Result<Self, GameError> {
        if (1..=WORLDS).contains(&world) && (1..=STAGES_PER_WORLD).contains(&stage) {
            Ok(Self { world, stage })
        } else {
            Err(GameError::InvalidStageKey { world, stage })
        }
    }

    /// Seed for tile geometry
    pub fn level_seed(&self) -> u64 {
        self.world as u64 * 100 + self.stage as u64
    }

    /// Seed for enemy placement; independent of the geometry stream
    pub fn spawn_seed(&self) -> u64 {
        self.world as u64 * 1000 + self.stage as u64 * 37 + 13
    }

    pub fn is_last_stage_of_world(&self) -> bool {
        self.stage == STAGES_PER_WORLD
    }

    pub fn is_final(&self) -> bool {
        self.world == WORLDS && self.stage == STAGES_PER_WORLD
    }

    /// Following stage, wrapping into the next world; `None` after the final stage
    pub fn next(&self) -> Option<StageKey> {
        if self.stage < STAGES_PER_WORLD {
            Some(StageKey {
                world: self.world,
                stage: self.stage + 1,
            })
        } else if self.world < WORLDS {
            Some(StageKey {
                world: self.world + 1,
                stage: 1,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.world, self.stage)
    }
}

/// Where a stage's tiles came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageSource {
    Override,
    HandAuthored,
    Procedural,
}

/// A built stage
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStage {
    pub grid: TileGrid,
    pub width: usize,
    pub level_type: LevelType,
    pub source: StageSource,
}

/// Build the tile grid for `key`.
///
/// Identical `(key, seed, config)` always yields an identical grid. The only
/// failure is an override with zero rows.
pub fn generate(key: StageKey, seed: u64, config: &GameConfig) -> Result<GeneratedStage, GameError> {
    let level_type = config.level_type(key);

    if let Some(rows) = config.stage_override(key) {
        let grid = grid_from_codes(key, rows)?;
        let width = grid.width();
        log::info!("Stage {} loaded from override ({}x{})", key, width, grid.height());
        return Ok(GeneratedStage {
            grid,
            width,
            level_type,
            source: StageSource::Override,
        });
    }

    let (grid, source) = match hand_authored(key) {
        Some(grid) => (grid, StageSource::HandAuthored),
        None => (procedural(key, level_type, seed), StageSource::Procedural),
    };
    let width = grid.width();
    Ok(GeneratedStage {
        grid,
        width,
        level_type,
        source,
    })
}

/// Convert override tile codes into a grid.
///
/// Rows are used as-is: a height other than `GRID_ROWS` is only logged.
pub fn grid_from_codes(key: StageKey, rows: &[Vec<u8>]) -> Result<TileGrid, GameError> {
    if rows.is_empty() {
        log::error!("Stage override {} has zero rows", key);
        return Err(GameError::EmptyStage {
            world: key.world,
            stage: key.stage,
        });
    }
    if rows.len() != GRID_ROWS {
        log::warn!(
            "Stage override {} has {} rows, expected {}; using as-is",
            key,
            rows.len(),
            GRID_ROWS
        );
    }

    let mut unknown = 0usize;
    let tiles: Vec<Vec<TileKind>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|&code| {
                    TileKind::from_code(code).unwrap_or_else(|| {
                        unknown += 1;
                        TileKind::Air
                    })
                })
                .collect()
        })
        .collect();
    if unknown > 0 {
        log::warn!("Stage override {}: {} unknown tile codes loaded as air", key, unknown);
    }
    Ok(TileGrid::from_rows(&tiles))
}

/// Bounded-retry placement: propose up to `attempts` candidates and return the
/// first one `accept` likes, or `None` to skip.
pub fn place_or_skip<T, R: Rng>(
    rng: &mut R,
    attempts: u32,
    mut propose: impl FnMut(&mut R) -> T,
    mut accept: impl FnMut(&T) -> bool,
) -> Option<T> {
    for _ in 0..attempts {
        let candidate = propose(rng);
        if accept(&candidate) {
            return Some(candidate);
        }
    }
    None
}

// === Builder primitives ===

/// Double-thick ground across the width, minus `gaps` as (start column, width)
fn ground_with_gaps(width: i32, gaps: &[(i32, i32)]) -> TileGrid {
    let mut grid = TileGrid::new(width as usize, GRID_ROWS);
    let h = GRID_ROWS as i32;
    for x in 0..width {
        grid.set(x, h - 1, TileKind::Ground);
        grid.set(x, h - 2, TileKind::Ground);
    }
    for &(gx, gw) in gaps {
        for cx in gx..gx + gw {
            grid.set(cx, h - 1, TileKind::Air);
            grid.set(cx, h - 2, TileKind::Air);
        }
    }
    grid
}

fn run(grid: &mut TileGrid, row: i32, c0: i32, c1: i32, tile: TileKind) {
    for col in c0..c1 {
        grid.set(col, row, tile);
    }
}

/// 2-wide pipe standing on the ground, `height` tiles tall
fn pipe(grid: &mut TileGrid, col: i32, height: i32) {
    let base = grid.height() as i32 - 2;
    for dy in 0..height {
        grid.set(col, base - dy, TileKind::PipeBodyLeft);
        grid.set(col + 1, base - dy, TileKind::PipeBodyRight);
    }
    grid.set(col, base - height + 1, TileKind::PipeTopLeft);
    grid.set(col + 1, base - height + 1, TileKind::PipeTopRight);
}

/// Eight-step ascending staircase starting at `start`
fn stairs(grid: &mut TileGrid, start: i32) {
    let h = grid.height() as i32;
    for step in 1..=8 {
        for dy in 0..step {
            grid.set(start + step - 1, h - 2 - dy, TileKind::Ground);
        }
    }
}

/// Empty column for the flagpole, four tiles from the end
fn flag_clear(grid: &mut TileGrid) {
    let h = grid.height() as i32;
    let col = grid.width() as i32 - 4;
    for row in 0..h - 2 {
        grid.set(col, row, TileKind::Air);
    }
}

/// Open air over solid ground at the spawn columns
fn clear_start(grid: &mut TileGrid) {
    let h = grid.height() as i32;
    for row in 0..h - 2 {
        for col in 0..4 {
            grid.set(col, row, TileKind::Air);
        }
    }
    for col in 0..3 {
        grid.set(col, h - 1, TileKind::Ground);
        grid.set(col, h - 2, TileKind::Ground);
    }
}

fn finish(grid: &mut TileGrid, stairs_from_end: i32, clear_spawn: bool) {
    let w = grid.width() as i32;
    stairs(grid, w - stairs_from_end);
    flag_clear(grid);
    if clear_spawn {
        clear_start(grid);
    }
}

// === Hand-authored stages ===

fn hand_authored(key: StageKey) -> Option<TileGrid> {
    match (key.world, key.stage) {
        (1, 1) => Some(build_1_1()),
        (1, 2) => Some(build_1_2()),
        (1, 3) => Some(build_1_3()),
        (1, 4) => Some(build_1_4()),
        _ => None,
    }
}

fn build_1_1() -> TileGrid {
    use TileKind::*;
    let h = GRID_ROWS as i32;
    let mut g = ground_with_gaps(212, &[(168, 2), (178, 3)]);
    for (col, tile) in [
        (16, Question),
        (20, Question),
        (21, Brick),
        (22, CoinBlock),
        (23, Brick),
        (24, Question),
        (25, Brick),
    ] {
        g.set(col, h - 6, tile);
    }
    g.set(21, h - 10, Question);
    pipe(&mut g, 28, 2);
    pipe(&mut g, 38, 3);
    pipe(&mut g, 46, 4);
    pipe(&mut g, 57, 4);
    run(&mut g, h - 6, 64, 68, Brick);
    run(&mut g, h - 5, 78, 86, Ground);
    run(&mut g, h - 6, 80, 84, Ground);
    run(&mut g, h - 7, 81, 83, Ground);
    for (col, tile) in [
        (91, Question),
        (94, Brick),
        (95, CoinBlock),
        (96, Brick),
        (97, Question),
        (98, Brick),
    ] {
        g.set(col, h - 6, tile);
    }
    g.set(95, h - 10, StarBlock);
    pipe(&mut g, 118, 2);
    finish(&mut g, 20, true);
    g
}

fn build_1_2() -> TileGrid {
    use TileKind::*;
    let h = GRID_ROWS as i32;
    let w = 180;
    let mut g = ground_with_gaps(w, &[]);
    run(&mut g, 0, 0, w - 10, Ground);
    run(&mut g, 1, 0, w - 10, Ground);
    run(&mut g, h - 5, 6, 14, Brick);
    run(&mut g, h - 7, 16, 24, Brick);
    run(&mut g, h - 5, 26, 34, Brick);
    for (col, tile) in [(18, Question), (20, CoinBlock), (22, Question)] {
        g.set(col, h - 7, tile);
    }
    pipe(&mut g, 80, 5);
    pipe(&mut g, 92, 5);
    pipe(&mut g, 104, 5);
    run(&mut g, h - 6, 40, 50, Brick);
    g.set(44, h - 6, Question);
    g.set(46, h - 6, CoinBlock);
    finish(&mut g, 22, true);
    g
}

fn build_1_3() -> TileGrid {
    use TileKind::*;
    let h = GRID_ROWS as i32;
    let w = 160;
    let mut g = TileGrid::new(w as usize, GRID_ROWS);
    run(&mut g, h - 1, 0, 16, Ground);
    run(&mut g, h - 2, 0, 16, Ground);
    for (px, py, pw) in [
        (16, h - 6, 8),
        (28, h - 6, 6),
        (38, h - 4, 4),
        (46, h - 6, 5),
        (54, h - 8, 4),
        (62, h - 6, 6),
        (72, h - 5, 4),
        (80, h - 7, 5),
        (90, h - 5, 6),
        (100, h - 6, 4),
        (108, h - 4, 5),
        (118, h - 6, 4),
    ] {
        run(&mut g, py, px, px + pw, Ground);
    }
    g.set(18, h - 8, Question);
    g.set(30, h - 8, CoinBlock);
    g.set(50, h - 10, Question);
    run(&mut g, h - 1, w - 24, w - 2, Ground);
    run(&mut g, h - 2, w - 24, w - 2, Ground);
    // Spawn sits on the solid opening run; no start clearing
    finish(&mut g, 20, false);
    g
}

fn build_1_4() -> TileGrid {
    use TileKind::*;
    let h = GRID_ROWS as i32;
    let w = 140;
    let mut g = ground_with_gaps(w, &[(20, 3), (32, 3), (50, 4), (68, 3)]);
    run(&mut g, 2, 0, 30, Ground);
    run(&mut g, 2, 40, 70, Ground);
    for row in [h - 5, h - 4, h - 3] {
        run(&mut g, row, 10, 12, Brick);
    }
    run(&mut g, h - 5, 26, 28, Brick);
    run(&mut g, h - 6, 26, 28, Brick);
    run(&mut g, h - 1, w - 30, w - 4, Ground);
    run(&mut g, h - 2, w - 30, w - 4, Ground);
    finish(&mut g, 22, true);
    g
}

// === Procedural stages ===

/// Fill choices for elevated runs (bricks three times as likely)
const PLATFORM_FILL: [TileKind; 5] = [
    TileKind::Brick,
    TileKind::Brick,
    TileKind::Brick,
    TileKind::Question,
    TileKind::CoinBlock,
];
/// Minimum column distance between pipes
const PIPE_SPACING: i32 = 6;
const PIPE_ATTEMPTS: u32 = 30;

/// Procedural stage width for a key
pub fn procedural_width(key: StageKey) -> i32 {
    90 + key.world as i32 * 6 + key.stage as i32 * 3
}

fn procedural(key: StageKey, level_type: LevelType, seed: u64) -> TileGrid {
    let mut rng = Pcg32::seed_from_u64(seed);
    let world = key.world as i32;
    let stage = key.stage as i32;
    let h = GRID_ROWS as i32;
    let w = procedural_width(key);

    let mut grid = match level_type {
        LevelType::Underground => {
            let mut g = ground_with_gaps(w, &[]);
            run(&mut g, 0, 0, w - 8, TileKind::Ground);
            run(&mut g, 1, 0, w - 8, TileKind::Ground);
            g
        }
        LevelType::Castle => {
            // Lava pits: no floor at all
            let gaps: Vec<(i32, i32)> = (0..3 + world / 2)
                .map(|_| (rng.random_range(12..=w - 30), rng.random_range(2..=4)))
                .collect();
            ground_with_gaps(w, &gaps)
        }
        LevelType::Overworld | LevelType::Underwater => {
            let count = 2 + world / 2 + if stage >= 3 { 1 } else { 0 };
            let gaps: Vec<(i32, i32)> = (0..count)
                .map(|_| (rng.random_range(12..=w - 20), rng.random_range(2..=3)))
                .collect();
            ground_with_gaps(w, &gaps)
        }
    };

    // Elevated block runs
    for _ in 0..5 + world + stage {
        let px = rng.random_range(5..=w - 15);
        let py = h - rng.random_range(5..=8);
        let pw = rng.random_range(3..=7);
        for cx in px..px + pw {
            if cx < w - 4 && grid.get(cx, py) == TileKind::Air {
                let fill = PLATFORM_FILL[rng.random_range(0..PLATFORM_FILL.len())];
                grid.set(cx, py, fill);
            }
        }
    }

    // Pipes, spaced apart and standing on ground
    let mut placed: Vec<i32> = Vec::new();
    for _ in 0..2 + world {
        let slot = place_or_skip(
            &mut rng,
            PIPE_ATTEMPTS,
            |rng| (rng.random_range(8..=w - 15), rng.random_range(2..=3)),
            |&(px, _)| {
                grid.is_solid(px, h - 1)
                    && grid.is_solid(px + 1, h - 1)
                    && placed.iter().all(|&pp| (px - pp).abs() >= PIPE_SPACING)
            },
        );
        match slot {
            Some((px, height)) => {
                placed.push(px);
                pipe(&mut grid, px, height);
            }
            None => log::debug!("Stage {}: no pipe slot within {} attempts", key, PIPE_ATTEMPTS),
        }
    }

    finish(&mut grid, 20, true);
    log::debug!(
        "Stage {} generated procedurally: {:?}, width {}, {} pipes",
        key,
        level_type,
        w,
        placed.len()
    );
    grid
}
