use super::*;

/// Bonus fruit waiting under the cage.
#[derive(Clone, Debug)]
pub(super) struct Bonus {
    pub position: Point,
    pub remaining_ms: u64,
}

impl GameEngine {
    pub(super) fn apply_pickups(&mut self) {
        let tile = self.grid.tile_at(self.player.position());
        if !tile.intersects(TileFlags::DOT | TileFlags::ENERGIZER) {
            return;
        }
        if !self.consumed.insert(tile.coords()) {
            return;
        }

        let total = self.dots_consumed + 1;
        let energizer = tile.intersects(TileFlags::ENERGIZER);
        if energizer {
            self.score += ENERGIZER_WORTH;
            self.events.push(RuntimeEvent::EnergizerEaten {
                row: tile.row,
                col: tile.col,
                total,
            });
        } else {
            self.score += DOT_WORTH;
            self.events.push(RuntimeEvent::DotEaten {
                row: tile.row,
                col: tile.col,
                total,
            });
        }

        self.report_dot_consumed(total);
        if energizer {
            self.report_energizer_consumed();
        }

        if self.config.bonus_dot_counts.contains(&total) {
            self.spawn_bonus();
        }
        if self.consumed.len() >= self.total_consumables {
            self.end_round(RoundOverReason::Cleared);
        }
    }

    pub(super) fn update_bonus(&mut self, dt_ms: u64) {
        let Some(bonus) = self.bonus.as_mut() else {
            return;
        };
        if self.player.position().distance(bonus.position) < self.config.collision_distance {
            let position = bonus.position;
            self.bonus = None;
            self.score += BONUS_WORTH;
            self.events.push(RuntimeEvent::BonusTaken {
                worth: BONUS_WORTH,
                x: position.x,
                y: position.y,
            });
            debug!(tick = self.tick_counter, "bonus taken");
            return;
        }
        bonus.remaining_ms = bonus.remaining_ms.saturating_sub(dt_ms);
        if bonus.remaining_ms == 0 {
            self.bonus = None;
            self.events.push(RuntimeEvent::BonusExpired);
        }
    }

    fn spawn_bonus(&mut self) {
        let position = self.config.bonus_position;
        self.bonus = Some(Bonus {
            position,
            remaining_ms: self.config.bonus_lifetime_ms,
        });
        self.events.push(RuntimeEvent::BonusSpawned {
            x: position.x,
            y: position.y,
        });
        debug!(tick = self.tick_counter, "bonus spawned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;
    use crate::engine::tests::engine;

    fn first_dot(engine: &GameEngine) -> Tile {
        engine
            .grid
            .tiles_with(TileFlags::DOT)
            .next()
            .expect("stock level has dots")
    }

    #[test]
    fn eating_a_dot_scores_once() {
        let mut engine = engine(1);
        let dot = first_dot(&engine);
        engine.player.teleport(dot.center);
        engine.apply_pickups();
        engine.apply_pickups();
        assert_eq!(engine.score(), DOT_WORTH);
        assert_eq!(engine.dots_consumed(), 1);
    }

    #[test]
    fn energizer_scores_and_frightens_everyone() {
        let mut engine = engine(1);
        let energizer = engine
            .grid
            .tiles_with(TileFlags::ENERGIZER)
            .next()
            .expect("stock level has energizers");
        engine.player.teleport(energizer.center);
        engine.apply_pickups();
        assert_eq!(engine.score(), ENERGIZER_WORTH);
        assert_eq!(engine.dots_consumed(), 1);
        assert_eq!(engine.frighten_remaining_ms(), engine.config.frighten_duration_ms);
        assert!(engine
            .agents()
            .iter()
            .all(|agent| agent.mode() == Mode::Frightened));
    }

    #[test]
    fn bonus_spawns_at_seventy_and_expires() {
        let mut engine = engine(1);
        let dots: Vec<Tile> = engine.grid.tiles_with(TileFlags::DOT).take(70).collect();
        for dot in dots {
            engine.player.teleport(dot.center);
            engine.apply_pickups();
        }
        assert!(engine.bonus.is_some());

        engine.player.teleport(engine.config.player_start);
        let lifetime = engine.config.bonus_lifetime_ms;
        engine.update_bonus(lifetime - 1);
        assert!(engine.bonus.is_some());
        engine.update_bonus(1);
        assert!(engine.bonus.is_none());
        let events = engine.build_snapshot(true).events;
        assert!(matches!(events.last(), Some(RuntimeEvent::BonusExpired)));
    }

    #[test]
    fn bonus_is_collected_on_contact() {
        let mut engine = engine(1);
        engine.spawn_bonus();
        let before = engine.score();
        engine.player.teleport(engine.config.bonus_position + Point::new(1.0, 0.0));
        engine.update_bonus(TICK_MS);
        assert!(engine.bonus.is_none());
        assert_eq!(engine.score(), before + BONUS_WORTH);
    }

    #[test]
    fn clearing_every_consumable_wins_the_round() {
        let mut engine = engine(1);
        let tiles: Vec<Tile> = engine
            .grid
            .tiles_with(TileFlags::DOT | TileFlags::ENERGIZER)
            .collect();
        assert_eq!(tiles.len(), 244);
        for tile in tiles {
            assert!(!engine.is_ended());
            engine.player.teleport(tile.center);
            engine.apply_pickups();
        }
        assert!(engine.is_ended());
        assert_eq!(engine.build_summary().reason, Some(RoundOverReason::Cleared));
        assert_eq!(engine.dots_consumed(), 244);
    }
}
