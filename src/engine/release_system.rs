use super::*;

impl GameEngine {
    /// Releases the first two agents and rewinds the timeline and combo.
    pub(super) fn start_round(&mut self) {
        self.release(AgentId::Chaser, Direction::Left, false);
        self.release(AgentId::Ambusher, Direction::Up, true);
        self.timeline.restart();
        self.combo = 0;
        self.frighten_remaining_ms = 0;
        self.dots_at_round_start = self.dots_consumed;
        self.events.push(RuntimeEvent::RoundStarted);
        info!(
            tick = self.tick_counter,
            lives = self.lives,
            dots = self.dots_consumed,
            "round started"
        );
    }

    /// Staged release keyed to dots eaten since the latest round start.
    pub(super) fn release_for_dots(&mut self, total: u32) {
        let since_start = total.saturating_sub(self.dots_at_round_start);
        let schedule = [
            (AgentId::Flanker, self.config.third_agent_release_dots),
            (AgentId::Skittish, self.config.fourth_agent_release_dots),
        ];
        for (id, threshold) in schedule {
            if since_start >= threshold && !self.agents[id.index()].is_released() {
                self.release(id, Direction::Up, true);
            }
        }
    }

    pub(super) fn reset_positions(&mut self) {
        for agent in &mut self.agents {
            let home = agent.reset_position();
            agent.reset(&self.grid, home);
        }
        self.player.reset();
    }

    fn release(&mut self, id: AgentId, direction: Direction, exit_cage: bool) {
        self.agents[id.index()].unleash(direction, Mode::Chase, exit_cage);
        self.events.push(RuntimeEvent::AgentReleased { agent: id });
        info!(tick = self.tick_counter, agent = ?id, "agent released");
    }
}
