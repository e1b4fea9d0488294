use std::collections::VecDeque;

use super::*;

const DANGER_TILES: usize = 4;

impl GameEngine {
    /// Scripted player used by headless runs; re-plans on a jittered interval.
    pub(super) fn update_autopilot(&mut self) {
        if self.elapsed_ms < self.autopilot_think_at {
            return;
        }
        self.autopilot_think_at = self.elapsed_ms + 90 + self.rng.below(100) as u64;

        let tile = self.grid.tile_at(self.player.position());
        let here = tile.coords();
        let dir = if self.frighten_remaining_ms > 0 {
            self.choose_chase_direction(here)
        } else if self
            .distance_to_nearest_threat(here)
            .is_some_and(|dist| dist <= DANGER_TILES)
        {
            self.choose_escape_direction(here)
        } else {
            self.choose_dot_direction(here)
        };
        if let Some(dir) = dir {
            self.player.set_desired(dir);
        }
    }

    /// First step of a shortest walkable path to the nearest uneaten consumable.
    pub(super) fn choose_dot_direction(&mut self, from: (usize, usize)) -> Option<Direction> {
        let consumed = &self.consumed;
        first_step_toward(&self.grid, &mut self.rng, from, |tile| {
            tile.intersects(TileFlags::DOT | TileFlags::ENERGIZER)
                && !consumed.contains(&tile.coords())
        })
    }

    pub(super) fn choose_chase_direction(&mut self, from: (usize, usize)) -> Option<Direction> {
        let prey: Vec<(usize, usize)> = self
            .agents
            .iter()
            .filter(|agent| agent.mode() == Mode::Frightened && agent.overlay().is_none())
            .map(|agent| self.grid.tile_at(agent.position()).coords())
            .collect();
        if prey.is_empty() {
            return self.choose_dot_direction(from);
        }
        first_step_toward(&self.grid, &mut self.rng, from, |tile| {
            prey.contains(&tile.coords())
        })
    }

    pub(super) fn choose_escape_direction(&mut self, from: (usize, usize)) -> Option<Direction> {
        let tile = self.grid.tile(from.0 as i64, from.1 as i64);
        let mut best = None;
        let mut best_dist = 0;
        for (dir, next) in self.grid.around(tile) {
            if next == tile || next.intersects(PLAYER_BLOCKING) {
                continue;
            }
            let dist = self
                .distance_to_nearest_threat(next.coords())
                .unwrap_or(usize::MAX);
            if best.is_none() || dist > best_dist {
                best_dist = dist;
                best = Some(dir);
            }
        }
        best
    }

    /// Manhattan tile distance to the closest agent that can capture the player.
    pub(super) fn distance_to_nearest_threat(&self, from: (usize, usize)) -> Option<usize> {
        self.agents
            .iter()
            .filter(|agent| {
                agent.is_released() && agent.overlay().is_none() && agent.mode() != Mode::Frightened
            })
            .map(|agent| manhattan(from, self.grid.tile_at(agent.position()).coords()))
            .min()
    }
}

/// Breadth-first search over tiles the player may enter; returns the first
/// step of a shortest path to any goal tile.
fn first_step_toward(
    grid: &TileGrid,
    rng: &mut Rng,
    from: (usize, usize),
    is_goal: impl Fn(&Tile) -> bool,
) -> Option<Direction> {
    let width = grid.width();
    let mut first_step: Vec<Option<Direction>> = vec![None; width * grid.height()];
    let mut visited = vec![false; width * grid.height()];
    let mut queue = VecDeque::new();

    let start = grid.tile(from.0 as i64, from.1 as i64);
    visited[start.row * width + start.col] = true;
    queue.push_back(start);

    while let Some(tile) = queue.pop_front() {
        let step = first_step[tile.row * width + tile.col];
        if step.is_some() && is_goal(&tile) {
            return step;
        }
        // Rotate the expansion order so equal paths do not always resolve the same way.
        let offset = rng.below(4);
        let around = grid.around(tile);
        for i in 0..around.len() {
            let (dir, next) = around[(i + offset) % around.len()];
            let index = next.row * width + next.col;
            if visited[index] || next.intersects(PLAYER_BLOCKING) {
                continue;
            }
            visited[index] = true;
            first_step[index] = step.or(Some(dir));
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::engine;

    #[test]
    fn dot_direction_heads_for_nearest_uneaten_dot() {
        let mut engine = engine(3);
        let west: Vec<(usize, usize)> = engine
            .grid
            .tiles_with(TileFlags::DOT | TileFlags::ENERGIZER)
            .filter(|tile| tile.col <= 13)
            .map(|tile| tile.coords())
            .collect();
        engine.consumed.extend(west);
        let dir = engine.choose_dot_direction((23, 13));
        assert_eq!(dir, Some(Direction::Right));
    }

    #[test]
    fn escape_direction_moves_away_from_threat() {
        let mut engine = engine(3);
        let chaser = engine.grid.tile(23, 10).center;
        engine.agents[AgentId::Chaser.index()].teleport(chaser);
        let dir = engine.choose_escape_direction((23, 13));
        assert_eq!(dir, Some(Direction::Right));
    }

    #[test]
    fn frightened_agents_are_not_threats() {
        let mut engine = engine(3);
        let near = engine.grid.tile(23, 12).center;
        engine.agents[AgentId::Chaser.index()].teleport(near);
        assert_eq!(engine.distance_to_nearest_threat((23, 13)), Some(1));

        engine.report_energizer_consumed();
        assert!(engine.distance_to_nearest_threat((23, 13)).is_none());
    }
}
