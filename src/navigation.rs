//! Greedy direction selection shared by every pursuit agent.

use tracing::debug;

use crate::grid::{Tile, TileFlags, TileGrid};
use crate::types::{Direction, Point};

/// Picks the neighbor of `current` whose center is closest to `target`.
///
/// Neighbors are examined in compass order; the reverse of `heading` and any
/// tile intersecting `excluded` are skipped, and a later candidate must be
/// strictly closer to replace an earlier one.
pub fn choose_direction(
    grid: &TileGrid,
    current: Tile,
    heading: Direction,
    target: Point,
    excluded: TileFlags,
) -> Option<(Direction, Tile)> {
    let reverse = heading.reverse();
    let mut best: Option<(Direction, Tile)> = None;
    let mut best_distance = f32::INFINITY;
    for (dir, tile) in grid.around(current) {
        if dir == reverse || tile.intersects(excluded) {
            continue;
        }
        let distance = tile.center.distance(target);
        if distance < best_distance {
            best_distance = distance;
            best = Some((dir, tile));
        }
    }
    best
}

/// Per-agent navigation state: the last tile a decision was made on and
/// whether the last chosen step entered a teleporter.
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    last_tile: Option<(usize, usize)>,
    in_teleporter: bool,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `tile` as already decided so the agent keeps its heading there.
    pub fn settle_on(&mut self, tile: Tile) {
        self.last_tile = Some(tile.coords());
        self.in_teleporter = false;
    }

    /// Forces a fresh decision on the next call, centered or not.
    pub fn invalidate(&mut self) {
        self.last_tile = None;
    }

    pub fn in_teleporter(&self) -> bool {
        self.in_teleporter
    }

    pub fn last_tile(&self) -> Option<(usize, usize)> {
        self.last_tile
    }

    /// Returns the heading to move with this frame.
    ///
    /// A new heading is chosen at most once per tile, on the first frame the
    /// agent is centered on a tile it has not decided on yet. With no open
    /// forward or side neighbor the agent stops; it never turns back on its
    /// own, only a forced reversal gets it moving again.
    pub fn steer(
        &mut self,
        grid: &TileGrid,
        position: Point,
        heading: Direction,
        target: Point,
        excluded: TileFlags,
    ) -> Direction {
        let tile = grid.tile_at(position);
        let fresh = match self.last_tile {
            None => true,
            Some(coords) => coords != tile.coords() && grid.is_centered(position, heading),
        };
        if !fresh {
            return heading;
        }
        self.last_tile = Some(tile.coords());

        match choose_direction(grid, tile, heading, target, excluded) {
            Some((dir, next)) => {
                self.in_teleporter = next.intersects(TileFlags::TELEPORTER);
                debug!(row = tile.row, col = tile.col, ?dir, "navigation decision");
                dir
            }
            None => {
                self.in_teleporter = false;
                debug!(row = tile.row, col = tile.col, "dead end, stopping");
                Direction::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::LevelBuilder;

    fn corridor() -> TileGrid {
        LevelBuilder::new().row(5, 1..27, ' ').build()
    }

    fn crossroads() -> TileGrid {
        LevelBuilder::new()
            .row(5, 1..27, ' ')
            .col(10, 1..20, ' ')
            .build()
    }

    #[test]
    fn straight_corridor_keeps_going_toward_target() {
        let grid = corridor();
        let mut nav = Navigator::new();
        let target = grid.tile(5, 25).center;
        let mut position = grid.tile(5, 3).center;
        let mut heading = Direction::Right;
        for _ in 0..150 {
            heading = nav.steer(&grid, position, heading, target, TileFlags::WALL);
            assert_eq!(heading, Direction::Right);
            position = position + heading.vector() * 1.2;
        }
    }

    #[test]
    fn never_reverses_even_when_target_is_behind() {
        let grid = corridor();
        let current = grid.tile(5, 12);
        let behind = grid.tile(5, 2).center;
        let choice = choose_direction(&grid, current, Direction::Right, behind, TileFlags::WALL);
        assert_eq!(choice.map(|(dir, _)| dir), Some(Direction::Right));
    }

    #[test]
    fn equal_distances_resolve_in_compass_order() {
        let grid = crossroads();
        let current = grid.tile(5, 10);
        let below = current.center + Point::new(0.0, 30.0);
        let choice = choose_direction(&grid, current, Direction::Up, below, TileFlags::WALL);
        assert_eq!(choice.map(|(dir, _)| dir), Some(Direction::Left));
    }

    #[test]
    fn excluded_flags_are_never_entered() {
        let grid = LevelBuilder::new()
            .row(5, 1..27, ' ')
            .set(4, 10, 'c')
            .set(3, 10, ' ')
            .build();
        let current = grid.tile(5, 10);
        let above = grid.tile(3, 10).center;

        let blocked = choose_direction(
            &grid,
            current,
            Direction::Right,
            above,
            TileFlags::WALL | TileFlags::CAGE_DOOR,
        );
        assert_eq!(blocked.map(|(dir, _)| dir), Some(Direction::Right));

        let allowed = choose_direction(&grid, current, Direction::Right, above, TileFlags::WALL);
        assert_eq!(allowed.map(|(dir, _)| dir), Some(Direction::Up));
    }

    #[test]
    fn decides_only_once_per_tile() {
        let grid = crossroads();
        let mut nav = Navigator::new();
        nav.settle_on(grid.tile(5, 11));
        let center = grid.tile(5, 10).center;

        let up = grid.tile(1, 10).center;
        let first = nav.steer(&grid, center, Direction::Left, up, TileFlags::WALL);
        assert_eq!(first, Direction::Up);

        // A better option appears mid-tile but the decision is not revisited.
        let nudged = center + Point::new(0.0, -1.0);
        let down = grid.tile(19, 10).center;
        let second = nav.steer(&grid, nudged, first, down, TileFlags::WALL);
        assert_eq!(second, Direction::Up);
    }

    #[test]
    fn waits_for_centering_before_turning() {
        let grid = crossroads();
        let mut nav = Navigator::new();
        nav.settle_on(grid.tile(5, 11));
        let entering = grid.tile(5, 10).center + Point::new(3.5, 0.0);
        let up = grid.tile(1, 10).center;
        let heading = nav.steer(&grid, entering, Direction::Left, up, TileFlags::WALL);
        assert_eq!(heading, Direction::Left);
        assert_eq!(nav.last_tile(), Some((5, 11)));
    }

    #[test]
    fn invalidated_cache_decides_immediately() {
        let grid = crossroads();
        let mut nav = Navigator::new();
        let off_center = grid.tile(5, 10).center + Point::new(3.5, 0.0);
        nav.settle_on(grid.tile(5, 10));
        nav.invalidate();
        let up = grid.tile(1, 10).center;
        let heading = nav.steer(&grid, off_center, Direction::Left, up, TileFlags::WALL);
        assert_eq!(heading, Direction::Up);
    }

    #[test]
    fn dead_end_stops_instead_of_reversing() {
        let grid = LevelBuilder::new().row(5, 1..6, ' ').build();
        let mut nav = Navigator::new();
        let target = grid.tile(5, 20).center;
        let end = grid.tile(5, 5).center;
        let heading = nav.steer(&grid, end, Direction::Right, target, TileFlags::WALL);
        assert_eq!(heading, Direction::None);

        // Still the same tile: the stop holds.
        let again = nav.steer(&grid, end, heading, target, TileFlags::WALL);
        assert_eq!(again, Direction::None);

        // A forced reversal invalidates the cache; a stopped agent may then
        // pick any open neighbor.
        nav.invalidate();
        let freed = nav.steer(&grid, end, Direction::None, target, TileFlags::WALL);
        assert_eq!(freed, Direction::Left);
    }

    #[test]
    fn remembers_teleporter_entry() {
        let grid = LevelBuilder::new()
            .row(14, 0..6, 't')
            .row(14, 6..12, ' ')
            .build();
        let mut nav = Navigator::new();
        let heading = nav.steer(
            &grid,
            grid.tile(14, 6).center,
            Direction::Left,
            Point::new(0.0, 145.0),
            TileFlags::WALL,
        );
        assert_eq!(heading, Direction::Left);
        assert!(nav.in_teleporter());
    }
}
