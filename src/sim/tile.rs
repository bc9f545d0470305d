//! Tile grid and the bump-from-below mutation contract

use serde::{Deserialize, Serialize};

use crate::consts::TILE;
use crate::sim::collision::Aabb;

/// Tile kinds (closed set). Codes match the external override format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Air,
    Ground,
    Brick,
    Question,
    CoinBlock,
    StarBlock,
    /// Solid block holding an extra life
    HiddenOneUp,
    /// Spent block. Terminal: never changes again.
    Used,
    PipeTopLeft,
    PipeTopRight,
    PipeBodyLeft,
    PipeBodyRight,
    Platform,
}

impl TileKind {
    pub fn is_solid(self) -> bool {
        self != TileKind::Air
    }

    /// Tiles that react to a bump from below
    pub fn is_reactive(self) -> bool {
        matches!(
            self,
            TileKind::Brick
                | TileKind::Question
                | TileKind::CoinBlock
                | TileKind::StarBlock
                | TileKind::HiddenOneUp
        )
    }

    pub fn code(self) -> u8 {
        match self {
            TileKind::Air => 0,
            TileKind::Ground => 1,
            TileKind::Brick => 2,
            TileKind::Question => 3,
            TileKind::Used => 4,
            TileKind::PipeTopLeft => 5,
            TileKind::PipeTopRight => 6,
            TileKind::PipeBodyLeft => 7,
            TileKind::PipeBodyRight => 8,
            TileKind::CoinBlock => 9,
            TileKind::StarBlock => 10,
            TileKind::HiddenOneUp => 11,
            TileKind::Platform => 12,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => TileKind::Air,
            1 => TileKind::Ground,
            2 => TileKind::Brick,
            3 => TileKind::Question,
            4 => TileKind::Used,
            5 => TileKind::PipeTopLeft,
            6 => TileKind::PipeTopRight,
            7 => TileKind::PipeBodyLeft,
            8 => TileKind::PipeBodyRight,
            9 => TileKind::CoinBlock,
            10 => TileKind::StarBlock,
            11 => TileKind::HiddenOneUp,
            12 => TileKind::Platform,
            _ => return None,
        })
    }
}

/// Grid cell address. Signed so callers can probe outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub col: i32,
    pub row: i32,
}

impl TileCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Pixel-space box of this cell
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.col as f32 * TILE, self.row as f32 * TILE, TILE, TILE)
    }
}

/// What a bump from below did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpOutcome {
    /// Nothing reactive there (ground, pipe, used block, air)
    Inert,
    /// Coin block paid out a coin
    Coin,
    /// Question block released a tier power-up (mushroom or flower)
    PowerUp,
    /// Star block released a star
    Star,
    /// Brick shattered by a big player
    BrickBroken,
    /// Brick bumped by a small player, sound only
    BrickBumped,
    /// Hidden block gave an extra life
    OneUp,
}

/// Row-major tile matrix. Out-of-range reads are `Air`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<TileKind>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![TileKind::Air; width * height],
        }
    }

    /// Build from rows; ragged rows are padded with `Air` to the widest row
    pub fn from_rows(rows: &[Vec<TileKind>]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(width, height);
        for (row, tiles) in rows.iter().enumerate() {
            for (col, &tile) in tiles.iter().enumerate() {
                grid.cells[row * width + col] = tile;
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stage width in pixels
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * TILE
    }

    /// Stage height in pixels
    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            None
        } else {
            Some(row as usize * self.width + col as usize)
        }
    }

    pub fn get(&self, col: i32, row: i32) -> TileKind {
        self.index(col, row)
            .map(|i| self.cells[i])
            .unwrap_or(TileKind::Air)
    }

    pub fn is_solid(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_solid()
    }

    /// Write a tile. Out-of-range writes and writes over `Used` are ignored.
    pub fn set(&mut self, col: i32, row: i32, kind: TileKind) -> bool {
        match self.index(col, row) {
            Some(i) if self.cells[i] != TileKind::Used => {
                self.cells[i] = kind;
                true
            }
            _ => false,
        }
    }

    pub fn row(&self, row: usize) -> &[TileKind] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[TileKind]> {
        (0..self.height).map(move |r| self.row(r))
    }

    /// Apply a bump from below at `at`. `big` is the bumper's power tier.
    ///
    /// Reactive blocks fire once: they become `Used`, which is terminal, so a
    /// second bump on the same cell is `Inert`.
    pub fn bump(&mut self, at: TileCoord, big: bool) -> BumpOutcome {
        match self.get(at.col, at.row) {
            TileKind::Question => {
                self.set(at.col, at.row, TileKind::Used);
                BumpOutcome::PowerUp
            }
            TileKind::CoinBlock => {
                self.set(at.col, at.row, TileKind::Used);
                BumpOutcome::Coin
            }
            TileKind::StarBlock => {
                self.set(at.col, at.row, TileKind::Used);
                BumpOutcome::Star
            }
            TileKind::HiddenOneUp => {
                self.set(at.col, at.row, TileKind::Used);
                BumpOutcome::OneUp
            }
            TileKind::Brick if big => {
                self.set(at.col, at.row, TileKind::Air);
                BumpOutcome::BrickBroken
            }
            TileKind::Brick => BumpOutcome::BrickBumped,
            _ => BumpOutcome::Inert,
        }
    }

    /// Any solid tile overlapping the box?
    pub fn any_solid_in(&self, bounds: &Aabb) -> bool {
        self.solid_tiles_in(bounds).next().is_some()
    }

    /// Solid tiles whose cell overlaps the box (row-major order)
    pub fn solid_tiles_in<'a>(&'a self, bounds: &'a Aabb) -> impl Iterator<Item = TileCoord> + 'a {
        let (c0, c1, r0, r1) = bounds.tile_span();
        (r0..=r1)
            .flat_map(move |row| (c0..=c1).map(move |col| TileCoord::new(col, row)))
            .filter(move |t| self.is_solid(t.col, t.row) && bounds.overlaps(&t.bounds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(kind: TileKind) -> TileGrid {
        let mut grid = TileGrid::new(4, 4);
        grid.set(1, 1, kind);
        grid
    }

    #[test]
    fn test_codes_roundtrip() {
        for code in 0..=12u8 {
            if let Some(kind) = TileKind::from_code(code) {
                assert_eq!(kind.code(), code);
            }
        }
        assert_eq!(TileKind::from_code(11), Some(TileKind::HiddenOneUp));
        assert_eq!(TileKind::from_code(13), None);
        assert_eq!(TileKind::from_code(200), None);
    }

    #[test]
    fn test_out_of_range_is_air() {
        let grid = TileGrid::new(3, 3);
        assert_eq!(grid.get(-1, 0), TileKind::Air);
        assert_eq!(grid.get(0, 3), TileKind::Air);
        assert!(!grid.is_solid(5, 5));
    }

    #[test]
    fn test_question_bump_once() {
        let mut grid = grid_with(TileKind::Question);
        let at = TileCoord::new(1, 1);
        assert_eq!(grid.bump(at, false), BumpOutcome::PowerUp);
        assert_eq!(grid.get(1, 1), TileKind::Used);
        assert_eq!(grid.bump(at, false), BumpOutcome::Inert);
        assert_eq!(grid.bump(at, true), BumpOutcome::Inert);
        assert_eq!(grid.get(1, 1), TileKind::Used);
    }

    #[test]
    fn test_coin_and_star_blocks() {
        let mut grid = grid_with(TileKind::CoinBlock);
        assert_eq!(grid.bump(TileCoord::new(1, 1), true), BumpOutcome::Coin);
        assert_eq!(grid.get(1, 1), TileKind::Used);

        let mut grid = grid_with(TileKind::StarBlock);
        assert_eq!(grid.bump(TileCoord::new(1, 1), false), BumpOutcome::Star);
        assert_eq!(grid.get(1, 1), TileKind::Used);
    }

    #[test]
    fn test_hidden_one_up_is_solid_and_fires_once() {
        let mut grid = grid_with(TileKind::HiddenOneUp);
        assert!(grid.is_solid(1, 1));
        assert_eq!(grid.bump(TileCoord::new(1, 1), false), BumpOutcome::OneUp);
        assert_eq!(grid.get(1, 1), TileKind::Used);
        assert_eq!(grid.bump(TileCoord::new(1, 1), true), BumpOutcome::Inert);
    }

    #[test]
    fn test_brick_needs_big() {
        let mut grid = grid_with(TileKind::Brick);
        let at = TileCoord::new(1, 1);
        assert_eq!(grid.bump(at, false), BumpOutcome::BrickBumped);
        assert_eq!(grid.get(1, 1), TileKind::Brick);
        assert_eq!(grid.bump(at, true), BumpOutcome::BrickBroken);
        assert_eq!(grid.get(1, 1), TileKind::Air);
    }

    #[test]
    fn test_used_is_terminal() {
        let mut grid = grid_with(TileKind::Used);
        assert!(!grid.set(1, 1, TileKind::Air));
        assert!(!grid.set(1, 1, TileKind::Question));
        assert_eq!(grid.get(1, 1), TileKind::Used);
    }

    #[test]
    fn test_from_rows_pads_ragged() {
        let rows = vec![vec![TileKind::Ground], vec![TileKind::Air, TileKind::Brick]];
        let grid = TileGrid::from_rows(&rows);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(1, 0), TileKind::Air);
        assert_eq!(grid.get(1, 1), TileKind::Brick);
    }

    #[test]
    fn test_solid_tiles_in() {
        let mut grid = TileGrid::new(4, 4);
        grid.set(0, 3, TileKind::Ground);
        grid.set(1, 3, TileKind::Ground);
        // Box straddling both ground tiles
        let b = Aabb::new(20.0, 110.0, 40.0, 20.0);
        let hits: Vec<_> = grid.solid_tiles_in(&b).collect();
        assert_eq!(hits, vec![TileCoord::new(0, 3), TileCoord::new(1, 3)]);
        // Touching the top edge exactly is not overlap
        let resting = Aabb::new(0.0, 88.0, 32.0, 32.0);
        assert!(!grid.any_solid_in(&resting));
    }
}
