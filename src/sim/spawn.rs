//! Enemy spawner
//!
//! Seeded from its own stream so placement never perturbs tile geometry.
//! Reserved stage keys use hand-placed tables; everything else samples
//! columns with bounded retry and silently skips what does not fit.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::Aabb;
use super::enemy::{BOSS_SIZE, ENEMY_SIZE, Enemy};
use super::level::{LevelType, StageKey, place_or_skip};
use super::tile::TileGrid;
use crate::config::GameConfig;
use crate::consts::TILE;

const PLACEMENT_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Goomba,
    Koopa,
    HammerBro,
}

impl Category {
    /// Minimum column distance from already placed enemies
    fn spacing(self) -> i32 {
        match self {
            Category::Goomba => 4,
            Category::Koopa => 5,
            Category::HammerBro => 6,
        }
    }

    /// Inclusive sampling range for a stage `width` columns wide
    fn columns(self, width: i32) -> (i32, i32) {
        match self {
            Category::Goomba => (10, width - 12),
            Category::Koopa => (12, width - 12),
            Category::HammerBro => (15, width - 20),
        }
    }
}

const SPAWNS_1_1: &[(Category, i32)] = &[
    (Category::Goomba, 22),
    (Category::Goomba, 40),
    (Category::Goomba, 41),
    (Category::Goomba, 80),
    (Category::Goomba, 88),
    (Category::Koopa, 94),
    (Category::Goomba, 130),
    (Category::Goomba, 131),
    (Category::Koopa, 148),
    (Category::Goomba, 170),
    (Category::Goomba, 171),
];

const SPAWNS_1_2: &[(Category, i32)] = &[
    (Category::Goomba, 10),
    (Category::Goomba, 22),
    (Category::Koopa, 35),
    (Category::Goomba, 50),
    (Category::Koopa, 70),
];

fn hand_placed(key: StageKey) -> Option<&'static [(Category, i32)]> {
    match (key.world, key.stage) {
        (1, 1) => Some(SPAWNS_1_1),
        (1, 2) => Some(SPAWNS_1_2),
        _ => None,
    }
}

/// Top edge of the surface an entity spanning `c0..=c1` would stand on:
/// the ground row, raised by anything stacked on it (pipes, stairs).
fn surface_top(grid: &TileGrid, c0: i32, c1: i32) -> f32 {
    let ground = grid.height() as i32 - 2;
    (c0..=c1)
        .map(|col| {
            let mut row = ground;
            while row > 1 && grid.is_solid(col, row - 1) {
                row -= 1;
            }
            row
        })
        .min()
        .unwrap_or(ground) as f32
        * TILE
}

/// Lift a box tile by tile until it overlaps nothing solid
fn clear_y(grid: &TileGrid, x: f32, mut y: f32, size: f32) -> f32 {
    while y > 0.0 && grid.any_solid_in(&Aabb::new(x, y, size, size)) {
        y -= TILE;
    }
    y
}

fn make(category: Category, id: u32, col: i32, grid: &TileGrid) -> Enemy {
    let x = col as f32 * TILE;
    let y = clear_y(grid, x, surface_top(grid, col, col) - ENEMY_SIZE, ENEMY_SIZE);
    match category {
        Category::Goomba => Enemy::goomba(id, x, y),
        Category::Koopa => Enemy::koopa(id, x, y),
        Category::HammerBro => Enemy::hammer_bro(id, x, y),
    }
}

/// Build the enemy list for a generated stage. Same inputs, same list.
pub fn spawn(grid: &TileGrid, key: StageKey, width: usize, config: &GameConfig) -> Vec<Enemy> {
    let mut rng = Pcg32::seed_from_u64(key.spawn_seed());
    let width = width as i32;
    let world = key.world as i32;
    let stage = key.stage as i32;
    let floor_row = grid.height() as i32 - 1;
    let mut enemies: Vec<Enemy> = Vec::new();
    let mut next_id = 0u32;
    let mut id = || {
        next_id += 1;
        next_id
    };

    if let Some(table) = hand_placed(key) {
        for &(category, col) in table {
            enemies.push(make(category, id(), col.min(width - 1), grid));
        }
    } else {
        let mut placed: Vec<i32> = Vec::new();
        let plan = [
            (Category::Goomba, 3 + world * 2 + stage),
            (Category::Koopa, world / 2 + stage / 2),
            (Category::HammerBro, world / 3),
        ];
        for (category, count) in plan {
            let (lo, hi) = category.columns(width);
            if hi < lo {
                continue;
            }
            for _ in 0..count {
                let slot = place_or_skip(
                    &mut rng,
                    PLACEMENT_ATTEMPTS,
                    |rng| rng.random_range(lo..=hi),
                    |&col| {
                        placed.iter().all(|&p| (col - p).abs() >= category.spacing())
                            && grid.is_solid(col, floor_row)
                    },
                );
                match slot {
                    Some(col) => {
                        placed.push(col);
                        enemies.push(make(category, id(), col, grid));
                    }
                    None => log::debug!("Stage {}: skipped a {:?}, no free column", key, category),
                }
            }
        }
    }

    if config.level_type(key) == LevelType::Castle {
        for i in 0..2 + world / 2 {
            let fx = rng.random_range(10..=(width - 20).max(10)) as f32 * TILE;
            let fy = rng.random_range(3..=8) as f32 * TILE;
            let radius = (2 + i % 3) as f32 * TILE;
            let speed = 1.5 + world as f32 * 0.25;
            enemies.push(Enemy::firebar(id(), Vec2::new(fx, fy), radius, i as f32 * 60.0, speed));
        }

        let col = (width - 30).max(0);
        let x = col as f32 * TILE;
        let y = clear_y(grid, x, surface_top(grid, col, col + 1) - BOSS_SIZE, BOSS_SIZE);
        let patrol = ((width - 55).max(0) as f32 * TILE, (width - 4) as f32 * TILE);
        enemies.push(Enemy::boss(id(), x, y, patrol));
    }

    enemies
}
