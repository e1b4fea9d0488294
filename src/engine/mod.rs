use std::collections::HashSet;

use tracing::{debug, info};

use crate::agent::{Agent, ContactOutcome, FrameContext};
use crate::config::GameConfig;
use crate::constants::{
    BONUS_WORTH, DEFAULT_LEVEL, DOT_WORTH, ENERGIZER_WORTH, KILL_WORTH, MODE_TIMELINE,
};
use crate::error::Result;
use crate::grid::{Tile, TileFlags, TileGrid};
use crate::player::{Player, PLAYER_BLOCKING};
use crate::rng::Rng;
use crate::types::{
    AgentId, BonusView, Direction, Mode, Point, RoundOverReason, RoundSummary, RuntimeEvent,
    Snapshot,
};

mod autopilot;
mod pickup_system;
mod release_system;
mod timeline;
mod utils;

pub use self::timeline::Timeline;

use self::pickup_system::Bonus;
use self::utils::{manhattan, validate_layout, wrap_horizontal};

#[derive(Clone, Debug, Default)]
struct RoundStats {
    kills: u32,
    captures: u32,
    mode_changes: u32,
}

#[derive(Clone, Debug, Default)]
pub struct GameEngineOptions {
    pub seed: u32,
    pub config: GameConfig,
    /// Level source; the stock level when `None`.
    pub level: Option<String>,
    pub lives_override: Option<u32>,
    pub autopilot: bool,
}

/// Orchestrates one round: global timeline, frighten window, kill combo,
/// staged release and capture handling.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,
    pub grid: TileGrid,

    rng: Rng,
    player: Player,
    agents: Vec<Agent>,
    timeline: Timeline,
    events: Vec<RuntimeEvent>,
    stats: RoundStats,

    frighten_remaining_ms: u64,
    /// Delta of the frame in progress; zero between frames.
    frame_dt_ms: u64,
    combo: u32,
    dots_consumed: u32,
    dots_at_round_start: u32,
    consumed: HashSet<(usize, usize)>,
    total_consumables: usize,
    bonus: Option<Bonus>,
    score: u32,
    lives: u32,
    starting_lives: u32,

    autopilot: bool,
    autopilot_think_at: u64,
    elapsed_ms: u64,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<RoundOverReason>,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> Result<Self> {
        let config = options.config;
        config.validate()?;
        let level = options.level.as_deref().unwrap_or(DEFAULT_LEVEL);
        let grid = TileGrid::parse(level, config.tile_size)?;
        let total_consumables = validate_layout(&grid, &config)?;

        let agents = AgentId::ALL
            .iter()
            .map(|id| Agent::new(*id, &grid, &config))
            .collect();
        let starting_lives = options.lives_override.unwrap_or(config.starting_lives).max(1);

        let mut engine = Self {
            rng: Rng::new(options.seed),
            player: Player::new(&config),
            agents,
            timeline: Timeline::new(&MODE_TIMELINE),
            events: Vec::new(),
            stats: RoundStats::default(),
            frighten_remaining_ms: 0,
            frame_dt_ms: 0,
            combo: 0,
            dots_consumed: 0,
            dots_at_round_start: 0,
            consumed: HashSet::new(),
            total_consumables,
            bonus: None,
            score: 0,
            lives: starting_lives,
            starting_lives,
            autopilot: options.autopilot,
            autopilot_think_at: 0,
            elapsed_ms: 0,
            tick_counter: 0,
            ended: false,
            end_reason: None,
            config,
            grid,
        };
        engine.start_round();
        Ok(engine)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended {
            return;
        }
        self.frame_dt_ms = dt_ms;
        self.run_frame(dt_ms);
        self.frame_dt_ms = 0;
    }

    fn run_frame(&mut self, dt_ms: u64) {
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.update_timers(dt_ms);
        if self.autopilot {
            self.update_autopilot();
        }
        self.player.update(dt_ms, &self.grid);
        let wrapped = wrap_horizontal(self.player.position(), self.grid.world_width());
        self.player.teleport(wrapped);
        self.apply_pickups();
        self.update_bonus(dt_ms);
        if self.ended {
            return;
        }
        self.update_agents(dt_ms);
        self.resolve_contacts();
    }

    pub fn set_player_direction(&mut self, dir: Direction) {
        self.player.set_desired(dir);
    }

    /// Records the running consumable count and releases caged agents on cue.
    pub fn report_dot_consumed(&mut self, total: u32) {
        self.dots_consumed = total;
        self.release_for_dots(total);
    }

    /// Frightens every agent and (re)starts the global frighten window.
    ///
    /// Mid-frame the window already counts the current frame, as the agents
    /// count it down in their own update later in the same frame.
    pub fn report_energizer_consumed(&mut self) {
        for agent in &mut self.agents {
            agent.set_mode(Mode::Frightened, true);
        }
        self.frighten_remaining_ms = self
            .config
            .frighten_duration_ms
            .saturating_sub(self.frame_dt_ms);
        debug!(tick = self.tick_counter, "frighten window started");
    }

    /// Awards a kill. The combo only climbs inside a frighten window.
    pub fn report_kill(&mut self, id: AgentId) -> u32 {
        if self.frighten_remaining_ms > 0 {
            self.combo = (self.combo + 1).min(KILL_WORTH.len() as u32);
        }
        let worth = KILL_WORTH[self.combo.max(1) as usize - 1];
        self.score += worth;
        self.stats.kills += 1;
        let position = self.agents[id.index()].position();
        self.events.push(RuntimeEvent::AgentKilled {
            agent: id,
            worth,
            combo: self.combo,
            x: position.x,
            y: position.y,
        });
        info!(tick = self.tick_counter, agent = ?id, worth, combo = self.combo, "agent killed");
        worth
    }

    pub fn report_captured(&mut self, by: AgentId) {
        self.events.push(RuntimeEvent::PlayerCaptured {
            by,
            lives_left: self.lives.saturating_sub(1),
        });
        self.report_life_lost();
    }

    pub fn report_life_lost(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.stats.captures += 1;
        info!(tick = self.tick_counter, lives = self.lives, "life lost");
        if self.lives > 0 {
            self.reset_positions();
            self.start_round();
        } else {
            self.end_round(RoundOverReason::OutOfLives);
        }
    }

    /// Starts over from a full grid with fresh score and lives.
    pub fn report_round_start(&mut self) {
        self.score = 0;
        self.lives = self.starting_lives;
        self.dots_consumed = 0;
        self.consumed.clear();
        self.bonus = None;
        self.ended = false;
        self.end_reason = None;
        self.stats = RoundStats::default();
        self.reset_positions();
        self.start_round();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            score: self.score,
            lives: self.lives,
            dots_consumed: self.dots_consumed,
            dots_remaining: self.total_consumables.saturating_sub(self.consumed.len()),
            timeline_mode: self.timeline.current_mode(),
            frighten_remaining_ms: self.frighten_remaining_ms,
            combo: self.combo,
            player: self.player.view(),
            agents: self.agents.iter().map(Agent::view).collect(),
            bonus: self.bonus.as_ref().map(|bonus| BonusView {
                x: bonus.position.x,
                y: bonus.position.y,
                remaining_ms: bonus.remaining_ms,
            }),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> RoundSummary {
        RoundSummary {
            reason: self.end_reason,
            duration_ms: self.elapsed_ms,
            score: self.score,
            lives: self.lives,
            dots_consumed: self.dots_consumed,
            kills: self.stats.kills,
            captures: self.stats.captures,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id.index()]
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn dots_consumed(&self) -> u32 {
        self.dots_consumed
    }

    pub fn frighten_remaining_ms(&self) -> u64 {
        self.frighten_remaining_ms
    }

    pub fn timeline_mode(&self) -> Option<Mode> {
        self.timeline.current_mode()
    }

    pub fn mode_changes(&self) -> u32 {
        self.stats.mode_changes
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    fn update_agents(&mut self, dt_ms: u64) {
        let lead_position = self.agents[AgentId::Chaser.index()].position();
        let ctx = FrameContext {
            grid: &self.grid,
            player_position: self.player.position(),
            player_heading: self.player.direction(),
            lead_position,
            cage_exit: self.config.cage_exit,
            cage_return: self.config.cage_return,
        };
        let world_width = self.grid.world_width();
        for agent in &mut self.agents {
            agent.update(dt_ms, &ctx, &mut self.rng);
            agent.teleport(wrap_horizontal(agent.position(), world_width));
        }
    }

    fn resolve_contacts(&mut self) {
        let player = self.player.position();
        for idx in 0..self.agents.len() {
            if self.agents[idx].position().distance(player) >= self.config.collision_distance {
                continue;
            }
            let id = self.agents[idx].id();
            match self.agents[idx].on_player_contact() {
                ContactOutcome::Ignored => {}
                ContactOutcome::Killed => {
                    self.report_kill(id);
                }
                ContactOutcome::CapturedPlayer => {
                    self.report_captured(id);
                    // Agents were reset or the round is over.
                    return;
                }
            }
        }
    }

    fn end_round(&mut self, reason: RoundOverReason) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.end_reason = Some(reason);
        self.events.push(RuntimeEvent::RoundOver { reason });
        info!(
            tick = self.tick_counter,
            ?reason,
            score = self.score,
            "round over"
        );
    }
}
