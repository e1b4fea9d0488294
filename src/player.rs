use crate::agent::snap_to_lane;
use crate::config::GameConfig;
use crate::grid::{TileFlags, TileGrid};
use crate::types::{Direction, PlayerView, Point};

pub const PLAYER_BLOCKING: TileFlags = TileFlags::WALL.union(TileFlags::CAGE_DOOR);

/// Player movement with a one-slot turn buffer.
#[derive(Clone, Debug)]
pub struct Player {
    position: Point,
    direction: Direction,
    desired: Direction,
    start: Point,
    speed: f32,
}

impl Player {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            position: config.player_start,
            direction: Direction::None,
            desired: Direction::None,
            start: config.player_start,
            speed: config.player_speed,
        }
    }

    pub fn reset(&mut self) {
        self.position = self.start;
        self.direction = Direction::None;
        self.desired = Direction::None;
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn desired(&self) -> Direction {
        self.desired
    }

    pub fn set_desired(&mut self, dir: Direction) {
        if dir != Direction::None {
            self.desired = dir;
        }
    }

    pub fn teleport(&mut self, position: Point) {
        self.position = position;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.position.x,
            y: self.position.y,
            dir: self.direction,
        }
    }

    pub fn update(&mut self, dt_ms: u64, grid: &TileGrid) {
        if self.desired != Direction::None && self.can_turn(grid, self.desired) {
            if self.desired.is_horizontal() != self.direction.is_horizontal() {
                self.position = snap_to_lane(grid, self.position, self.desired);
            }
            self.direction = self.desired;
            self.desired = Direction::None;
        } else if self.direction != Direction::None {
            let tile = grid.tile_at(self.position);
            let ahead = grid.neighbor(tile, self.direction);
            let centered = grid.is_centered(self.position, self.direction);
            if ahead.intersects(PLAYER_BLOCKING) && centered {
                self.position = tile.center;
                self.direction = Direction::None;
            }
        }

        let step = self.speed * (dt_ms as f32 / 1000.0);
        self.position = self.position + self.direction.vector() * step;
    }

    fn can_turn(&self, grid: &TileGrid, dir: Direction) -> bool {
        if dir == self.direction {
            return true;
        }
        let tile = grid.tile_at(self.position);
        if grid.neighbor(tile, dir).intersects(PLAYER_BLOCKING) {
            return false;
        }
        if self.direction == Direction::None || dir == self.direction.reverse() {
            return true;
        }
        grid.is_centered(self.position, self.direction)
    }
}
