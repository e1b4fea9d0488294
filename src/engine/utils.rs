use tracing::warn;

use crate::config::GameConfig;
use crate::error::{ConfigError, Result};
use crate::grid::{TileFlags, TileGrid};
use crate::player::PLAYER_BLOCKING;
use crate::types::Point;

pub(super) fn manhattan(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// Re-enters an entity that left the grid sideways at the opposite edge.
pub(super) fn wrap_horizontal(position: Point, world_width: f32) -> Point {
    if position.x < 0.0 {
        Point::new(position.x + world_width, position.y)
    } else if position.x >= world_width {
        Point::new(position.x - world_width, position.y)
    } else {
        position
    }
}

fn inside(grid: &TileGrid, point: Point) -> bool {
    point.x >= 0.0
        && point.y >= 0.0
        && point.x < grid.world_width()
        && point.y < grid.world_height()
}

/// Checks that the collaborators a round depends on exist on this grid.
/// Returns the number of consumables.
pub(super) fn validate_layout(grid: &TileGrid, config: &GameConfig) -> Result<usize> {
    if !inside(grid, config.player_start)
        || grid.tile_at(config.player_start).intersects(PLAYER_BLOCKING)
    {
        return Err(ConfigError::MissingCollaborator(format!(
            "player start ({}, {}) is not on an open tile",
            config.player_start.x, config.player_start.y
        )));
    }
    if grid.tiles_with(TileFlags::CAGE_DOOR).next().is_none() {
        return Err(ConfigError::MissingCollaborator(
            "level has no cage door".to_string(),
        ));
    }
    let cage_points = [("cage exit", config.cage_exit), ("cage return", config.cage_return)];
    let reset_points = config.reset_positions.iter().map(|p| ("agent reset", *p));
    for (name, point) in cage_points.into_iter().chain(reset_points) {
        if !inside(grid, point) || grid.tile_at(point).intersects(TileFlags::WALL) {
            return Err(ConfigError::MissingCollaborator(format!(
                "{name} point ({}, {}) is not inside the maze",
                point.x, point.y
            )));
        }
    }
    let consumables = grid
        .tiles_with(TileFlags::DOT | TileFlags::ENERGIZER)
        .count();
    if consumables == 0 {
        return Err(ConfigError::MissingCollaborator(
            "level has no dots or energizers".to_string(),
        ));
    }
    if grid.tiles_with(TileFlags::TELEPORTER).next().is_none() {
        warn!("level has no teleporter tiles");
    }
    Ok(consumables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::LevelBuilder;

    #[test]
    fn wrap_moves_across_the_tunnel() {
        let width = 280.0;
        assert_eq!(wrap_horizontal(Point::new(-0.5, 145.0), width), Point::new(279.5, 145.0));
        assert_eq!(wrap_horizontal(Point::new(280.0, 145.0), width), Point::new(0.0, 145.0));
        assert_eq!(wrap_horizontal(Point::new(12.0, 145.0), width), Point::new(12.0, 145.0));
    }

    #[test]
    fn manhattan_counts_tiles() {
        assert_eq!(manhattan((3, 4), (1, 9)), 7);
        assert_eq!(manhattan((0, 0), (0, 0)), 0);
    }

    #[test]
    fn stock_layout_is_valid() {
        let config = GameConfig::default();
        let grid = TileGrid::stock(config.tile_size).unwrap();
        assert_eq!(validate_layout(&grid, &config).unwrap(), 244);
    }

    #[test]
    fn missing_collaborators_abort_startup() {
        let config = GameConfig::default();

        let walls = LevelBuilder::new().build();
        let err = validate_layout(&walls, &config).unwrap_err();
        assert!(err.to_string().contains("player start"));

        let no_door = LevelBuilder::new()
            .row(23, 1..27, '.')
            .row(11, 9..19, ' ')
            .row(14, 11..17, ' ')
            .build();
        let err = validate_layout(&no_door, &config).unwrap_err();
        assert!(err.to_string().contains("cage door"));

        let no_dots = LevelBuilder::new()
            .row(23, 1..27, ' ')
            .row(11, 9..19, ' ')
            .row(12, 13..15, 'c')
            .row(14, 11..17, ' ')
            .build();
        let err = validate_layout(&no_dots, &config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCollaborator(_)));
        assert!(err.to_string().contains("no dots"));
    }

    #[test]
    fn cage_points_must_be_in_the_maze() {
        let config = GameConfig {
            cage_exit: Point::new(5.0, 5.0),
            ..GameConfig::default()
        };
        let grid = TileGrid::stock(config.tile_size).unwrap();
        let err = validate_layout(&grid, &config).unwrap_err();
        assert!(err.to_string().contains("cage exit"));
    }
}
