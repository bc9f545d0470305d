//! Read-only snapshot handed to render collaborators
//!
//! Built after the simulation pass. Holds only what a renderer or HUD needs:
//! the visible slice of the grid, entity boxes and the run totals.

use std::ops::Range;

use serde::Serialize;

use crate::consts::TILE;
use crate::sim::collision::Aabb;
use crate::sim::level::LevelType;
use crate::sim::player::PowerTier;
use crate::sim::state::{GamePhase, GameState, StageSession};
use crate::sim::tile::{TileGrid, TileKind};

/// Camera offset keeping the player centered without showing past either end
pub fn camera_for(player_x: f32, view_width: f32, stage_px: f32) -> f32 {
    (player_x - view_width * 0.5)
        .min(stage_px - view_width)
        .max(0.0)
}

/// Visible column range with one column of margin on the left and two on the right
pub fn visible_columns(camera_x: f32, view_width: f32, grid_width: usize) -> Range<usize> {
    let first = (camera_x / TILE).floor().max(0.0) as usize;
    let span = (view_width / TILE).floor() as usize;
    let start = first.saturating_sub(1).min(grid_width);
    let end = (first + span + 2).min(grid_width);
    start..end
}

/// One glyph per tile kind, for text dumps
pub fn tile_glyph(kind: TileKind) -> char {
    match kind {
        TileKind::Air => '.',
        TileKind::Ground => '#',
        TileKind::Brick => 'B',
        TileKind::Question => '?',
        TileKind::CoinBlock => 'C',
        TileKind::StarBlock => 'S',
        TileKind::HiddenOneUp => 'H',
        TileKind::Used => 'U',
        TileKind::PipeTopLeft => '[',
        TileKind::PipeTopRight => ']',
        TileKind::PipeBodyLeft | TileKind::PipeBodyRight => '|',
        TileKind::Platform => '=',
    }
}

/// Rows of `grid` restricted to `columns`, as glyph strings
pub fn ascii_rows(grid: &TileGrid, columns: Range<usize>) -> Vec<String> {
    grid.rows()
        .map(|row| {
            row[columns.start.min(row.len())..columns.end.min(row.len())]
                .iter()
                .map(|&k| tile_glyph(k))
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxView {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<Aabb> for BoxView {
    fn from(b: Aabb) -> Self {
        Self {
            x: b.pos.x,
            y: b.pos.y,
            w: b.size.x,
            h: b.size.y,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub bounds: BoxView,
    pub tier: PowerTier,
    pub facing: f32,
    pub dead: bool,
    pub starred: bool,
    /// Blink frame; skip drawing
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyView {
    pub id: u32,
    pub name: &'static str,
    pub bounds: BoxView,
    pub alive: bool,
}

/// Stage part of the snapshot, present while a stage is loaded
#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub level_type: LevelType,
    pub width: usize,
    pub camera_x: f32,
    pub columns: (usize, usize),
    pub time_left: u32,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub projectiles: Vec<BoxView>,
    pub powerups: Vec<BoxView>,
    pub coin_pops: usize,
    pub particles: usize,
    pub flag_y: f32,
    /// Visible rows, top to bottom
    pub rows: Vec<String>,
}

impl StageView {
    pub fn capture(session: &StageSession, view_width: f32) -> Self {
        let columns = session.visible_columns(view_width);
        let player = &session.player;
        Self {
            level_type: session.level_type,
            width: session.width(),
            camera_x: session.camera_x,
            columns: (columns.start, columns.end),
            time_left: session.time_left.max(0.0).ceil() as u32,
            player: PlayerView {
                bounds: player.body.bounds().into(),
                tier: player.tier,
                facing: player.facing,
                dead: player.dead,
                starred: player.is_starred(),
                hidden: player.blink_hidden(),
            },
            enemies: session
                .enemies
                .iter()
                .map(|e| EnemyView {
                    id: e.id,
                    name: e.name(),
                    bounds: e.bounds().into(),
                    alive: e.alive,
                })
                .collect(),
            projectiles: session.projectiles.iter().map(|p| p.bounds().into()).collect(),
            powerups: session.powerups.iter().map(|p| p.bounds().into()).collect(),
            coin_pops: session.coin_pops.len(),
            particles: session.particles.len(),
            flag_y: session.flagpole.flag_y,
            rows: ascii_rows(&session.grid, columns),
        }
    }
}

/// Whole-game snapshot (HUD totals plus the stage, if any)
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub phase: GamePhase,
    pub world: u8,
    pub stage: u8,
    pub world_select: u8,
    pub score: u64,
    pub coins: u32,
    pub lives: u8,
    pub ticks: u64,
    pub stage_view: Option<StageView>,
}

impl GameView {
    pub fn capture(state: &GameState) -> Self {
        Self {
            phase: state.phase,
            world: state.key.world,
            stage: state.key.stage,
            world_select: state.world_select,
            score: state.score,
            coins: state.coins,
            lives: state.lives,
            ticks: state.time_ticks,
            stage_view: state
                .session
                .as_ref()
                .map(|s| StageView::capture(s, state.config.view_width)),
        }
    }
}
