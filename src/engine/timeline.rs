use super::*;

/// Global scatter/chase schedule.
///
/// The cursor points at the next step to apply. A step with no duration holds
/// its mode for the rest of the round.
#[derive(Clone, Debug)]
pub struct Timeline {
    steps: Vec<(Mode, Option<u64>)>,
    cursor: usize,
    remaining_ms: Option<i64>,
}

impl Timeline {
    pub fn new(steps: &[(Mode, Option<u64>)]) -> Self {
        Self {
            steps: steps.to_vec(),
            cursor: 0,
            remaining_ms: Some(0),
        }
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
        self.remaining_ms = Some(0);
    }

    /// Counts down by `dt_ms` and returns the mode to broadcast when a step
    /// boundary is crossed.
    pub fn advance(&mut self, dt_ms: u64) -> Option<Mode> {
        let remaining = self.remaining_ms.as_mut()?;
        *remaining -= dt_ms as i64;
        if *remaining > 0 {
            return None;
        }
        let (mode, duration) = *self.steps.get(self.cursor)?;
        self.cursor += 1;
        self.remaining_ms = duration.map(|ms| ms as i64);
        Some(mode)
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
            .map(|(mode, _)| *mode)
    }

    pub fn step_index(&self) -> usize {
        self.cursor
    }

    pub fn is_holding(&self) -> bool {
        self.remaining_ms.is_none()
    }
}

impl GameEngine {
    /// Frighten countdown first; the timeline only runs while it is idle.
    pub(super) fn update_timers(&mut self, dt_ms: u64) {
        if self.frighten_remaining_ms > 0 {
            self.frighten_remaining_ms = self.frighten_remaining_ms.saturating_sub(dt_ms);
            if self.frighten_remaining_ms == 0 {
                self.combo = 0;
                self.events.push(RuntimeEvent::FrightenEnded);
                debug!(tick = self.tick_counter, "frighten window over");
            }
            return;
        }

        if let Some(mode) = self.timeline.advance(dt_ms) {
            for agent in &mut self.agents {
                agent.set_mode(mode, true);
            }
            self.stats.mode_changes += 1;
            self.events.push(RuntimeEvent::ModeChanged { mode });
            info!(
                tick = self.tick_counter,
                ?mode,
                step = self.timeline.step_index(),
                "timeline mode change"
            );
        }
    }
}
