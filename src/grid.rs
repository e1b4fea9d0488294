use bitflags::bitflags;

use crate::constants::{DEFAULT_LEVEL, MAP_HEIGHT, MAP_WIDTH};
use crate::error::{GridError, LevelError};
use crate::rng::Rng;
use crate::types::{Direction, Point};

bitflags! {
    /// Classification of a single grid cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TileFlags: u8 {
        const FREE       = 1 << 0;
        const WALL       = 1 << 1;
        const DOT        = 1 << 2;
        const ENERGIZER  = 1 << 3;
        const TELEPORTER = 1 << 4;
        const CAGE_DOOR  = 1 << 5;
    }
}

impl TileFlags {
    fn from_level_char(ch: char) -> Option<Self> {
        match ch {
            '#' | '▓' => Some(Self::WALL),
            '.' => Some(Self::DOT),
            '0' => Some(Self::ENERGIZER),
            ' ' => Some(Self::FREE),
            't' => Some(Self::TELEPORTER),
            'c' => Some(Self::CAGE_DOOR),
            _ => None,
        }
    }
}

/// A grid cell. Two tiles are equal when they share row and column.
#[derive(Clone, Copy, Debug)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
    pub flags: TileFlags,
    pub center: Point,
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.col == other.col
    }
}

impl Eq for Tile {}

impl Tile {
    pub fn coords(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn intersects(&self, flags: TileFlags) -> bool {
        self.flags.intersects(flags)
    }
}

/// Projects a vector onto the compass by maximum dot product.
///
/// Candidates are tested in [`Direction::COMPASS`] order and only a strictly
/// larger product replaces the current pick, so a zero vector resolves to
/// `Left`. A vector with non-finite components resolves to nothing.
pub fn nearest_cardinal(vector: Point) -> Result<Direction, GridError> {
    let mut best = None;
    let mut best_dot = f32::NEG_INFINITY;
    for dir in Direction::COMPASS {
        let t = vector.dot(dir.vector());
        if t > best_dot {
            best_dot = t;
            best = Some(dir);
        }
    }
    best.ok_or(GridError::UnresolvedDirection)
}

/// Heading used by the geometry tests: a stationary heading behaves like a
/// zero vector and resolves to the first compass entry.
fn compass_heading(dir: Direction) -> Direction {
    match dir {
        Direction::None => Direction::COMPASS[0],
        other => other,
    }
}

/// Immutable tile map plus every position/tile conversion.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: u32,
    cells: Vec<TileFlags>,
}

impl TileGrid {
    /// Parses a character grid, one character per cell and one line per row.
    pub fn parse(source: &str, tile_size: u32) -> Result<Self, LevelError> {
        let mut cells = Vec::with_capacity(MAP_WIDTH * MAP_HEIGHT);
        let mut rows = 0;
        for (row, line) in source.lines().enumerate() {
            let mut width = 0;
            for ch in line.chars().filter(|ch| *ch != '\r') {
                let flags = TileFlags::from_level_char(ch).ok_or(
                    LevelError::UnrecognizedCharacter {
                        row,
                        col: width,
                        ch,
                    },
                )?;
                cells.push(flags);
                width += 1;
            }
            if width != MAP_WIDTH {
                return Err(LevelError::RowWidth {
                    row,
                    found: width,
                    expected: MAP_WIDTH,
                });
            }
            rows += 1;
        }
        if rows != MAP_HEIGHT {
            return Err(LevelError::RowCount {
                found: rows,
                expected: MAP_HEIGHT,
            });
        }
        Ok(Self {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            tile_size: tile_size.max(2),
            cells,
        })
    }

    pub fn stock(tile_size: u32) -> Result<Self, LevelError> {
        Self::parse(DEFAULT_LEVEL, tile_size)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn world_width(&self) -> f32 {
        (self.width as u32 * self.tile_size) as f32
    }

    pub fn world_height(&self) -> f32 {
        (self.height as u32 * self.tile_size) as f32
    }

    /// Tile at `(row, col)`, clamping both coordinates into the grid.
    pub fn tile(&self, row: i64, col: i64) -> Tile {
        let row = row.clamp(0, self.height as i64 - 1) as usize;
        let col = col.clamp(0, self.width as i64 - 1) as usize;
        self.build_tile(row, col)
    }

    pub fn try_tile(&self, row: i64, col: i64) -> Result<Tile, GridError> {
        if row < 0 || col < 0 || row >= self.height as i64 || col >= self.width as i64 {
            return Err(GridError::OutOfBounds {
                row,
                col,
                height: self.height,
                width: self.width,
            });
        }
        Ok(self.build_tile(row as usize, col as usize))
    }

    pub fn tile_at(&self, position: Point) -> Tile {
        let size = self.tile_size as f32;
        let col = (position.x.abs() / size) as i64;
        let row = (position.y.abs() / size) as i64;
        self.tile(row, col)
    }

    pub fn neighbor(&self, tile: Tile, dir: Direction) -> Tile {
        self.in_direction(tile, dir, 1)
    }

    /// Walks `count` tiles from `tile`, stopping at the grid edge.
    pub fn in_direction(&self, tile: Tile, dir: Direction, count: u32) -> Tile {
        let steps = count as i64;
        let row = tile.row as i64;
        let col = tile.col as i64;
        match compass_heading(dir) {
            Direction::Left => self.tile(row, col - steps),
            Direction::Right => self.tile(row, col + steps),
            Direction::Up => self.tile(row - steps, col),
            Direction::Down => self.tile(row + steps, col),
            Direction::None => tile,
        }
    }

    /// The four neighbors of `tile` in compass order.
    pub fn around(&self, tile: Tile) -> [(Direction, Tile); 4] {
        Direction::COMPASS.map(|dir| (dir, self.neighbor(tile, dir)))
    }

    pub fn random_tile(&self, rng: &mut Rng) -> Tile {
        let row = rng.below(self.height);
        let col = rng.below(self.width);
        self.build_tile(row, col)
    }

    /// Whether `position` has reached the middle of its tile for `dir`.
    ///
    /// The test is one-sided: moving left or up is centered once the in-tile
    /// offset is at or below half a tile, moving right or down once it is at
    /// or above. Offsets come from absolute coordinates truncated to whole
    /// world units.
    pub fn is_centered(&self, position: Point, dir: Direction) -> bool {
        let size = self.tile_size as f32;
        let offset_x = (position.x.abs() % size) as i32;
        let offset_y = (position.y.abs() % size) as i32;
        let threshold = (self.tile_size / 2) as i32;
        match compass_heading(dir) {
            Direction::Up => offset_y <= threshold,
            Direction::Down => offset_y >= threshold,
            Direction::Left => offset_x <= threshold,
            Direction::Right => offset_x >= threshold,
            Direction::None => false,
        }
    }

    pub fn tiles_with(&self, flags: TileFlags) -> impl Iterator<Item = Tile> + '_ {
        (0..self.height).flat_map(move |row| {
            (0..self.width)
                .map(move |col| self.build_tile(row, col))
                .filter(move |tile| tile.intersects(flags))
        })
    }

    fn build_tile(&self, row: usize, col: usize) -> Tile {
        let size = self.tile_size as f32;
        let half = (self.tile_size / 2) as f32;
        Tile {
            row,
            col,
            flags: self.cells[row * self.width + col],
            center: Point::new(col as f32 * size + half, row as f32 * size + half),
        }
    }
}
