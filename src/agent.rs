//! Per-agent mode machine: cage traffic, scatter/chase/frightened targeting
//! and the capture protocol.

use tracing::debug;

use crate::config::GameConfig;
use crate::constants::{
    EXIT_ARRIVAL_DISTANCE, FRIGHTENED_SPEED_MULTIPLIER, RETURNING_SPEED_MULTIPLIER,
    RETURN_ARRIVAL_DISTANCE, TELEPORTER_SPEED_MULTIPLIER,
};
use crate::grid::{TileFlags, TileGrid};
use crate::navigation::Navigator;
use crate::rng::Rng;
use crate::targeting::{strategy_for, PursuitContext, TargetingStrategy};
use crate::types::{AgentId, AgentView, Direction, Mode, Overlay, Point};

/// Read-only view of the world an agent needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    pub grid: &'a TileGrid,
    pub player_position: Point,
    pub player_heading: Direction,
    pub lead_position: Point,
    pub cage_exit: Point,
    pub cage_return: Point,
}

/// Result of the player touching an agent, handed back to the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactOutcome {
    Ignored,
    Killed,
    CapturedPlayer,
}

#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    position: Point,
    direction: Direction,
    mode: Mode,
    previous_mode: Mode,
    overlay: Option<Overlay>,
    released: bool,
    frighten_remaining_ms: u64,
    frighten_duration_ms: u64,
    base_speed: f32,
    home_corner: Point,
    reset_position: Point,
    strategy: &'static dyn TargetingStrategy,
    navigator: Navigator,
}

impl Agent {
    pub fn new(id: AgentId, grid: &TileGrid, config: &GameConfig) -> Self {
        let reset_position = config.reset_positions[id.index()];
        let mut agent = Self {
            id,
            position: reset_position,
            direction: Direction::None,
            mode: Mode::Caged,
            previous_mode: Mode::Caged,
            overlay: None,
            released: false,
            frighten_remaining_ms: 0,
            frighten_duration_ms: config.frighten_duration_ms,
            base_speed: config.agent_speed,
            home_corner: config.home_corners[id.index()],
            reset_position,
            strategy: strategy_for(id),
            navigator: Navigator::new(),
        };
        agent.reset(grid, reset_position);
        agent
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn previous_mode(&self) -> Mode {
        self.previous_mode
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_returning(&self) -> bool {
        self.overlay == Some(Overlay::ReturningToBase)
    }

    pub fn frighten_remaining_ms(&self) -> u64 {
        self.frighten_remaining_ms
    }

    pub fn reset_position(&self) -> Point {
        self.reset_position
    }

    pub fn home_corner(&self) -> Point {
        self.home_corner
    }

    /// Moves the agent without touching its heading or navigation cache.
    pub fn teleport(&mut self, position: Point) {
        self.position = position;
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            dir: self.direction,
            mode: self.mode,
            overlay: self.overlay,
        }
    }

    /// Puts the agent back in the cage at `position`, heading nowhere.
    pub fn reset(&mut self, grid: &TileGrid, position: Point) {
        self.direction = Direction::None;
        self.set_mode(Mode::Caged, false);
        self.position = position;
        self.navigator.settle_on(grid.tile_at(position));
        self.overlay = None;
        self.released = false;
        self.frighten_remaining_ms = 0;
    }

    pub fn unleash(&mut self, direction: Direction, mode: Mode, exit_cage: bool) {
        self.direction = direction;
        self.released = true;
        if exit_cage {
            self.overlay = Some(Overlay::LeavingCage);
        }
        self.set_mode(mode, false);
        debug!(agent = ?self.id, ?direction, ?mode, exit_cage, "agent unleashed");
    }

    /// Switches mode. The stored previous mode only changes when the mode does,
    /// so a repeated frighten still reverts to the pre-frighten mode.
    pub fn set_mode(&mut self, mode: Mode, force_reversal: bool) {
        if mode != self.mode {
            self.previous_mode = self.mode;
            self.mode = mode;
            debug!(agent = ?self.id, from = ?self.previous_mode, to = ?mode, "mode change");
        }
        if force_reversal && !self.is_returning() {
            self.direction = self.direction.reverse();
            self.navigator.invalidate();
        }
        self.frighten_remaining_ms = if mode == Mode::Frightened {
            self.frighten_duration_ms
        } else {
            0
        };
    }

    pub fn on_player_contact(&mut self) -> ContactOutcome {
        if self.is_returning() {
            return ContactOutcome::Ignored;
        }
        if self.mode == Mode::Frightened {
            self.overlay = Some(Overlay::ReturningToBase);
            self.frighten_remaining_ms = 0;
            debug!(agent = ?self.id, "agent caught, returning to base");
            return ContactOutcome::Killed;
        }
        ContactOutcome::CapturedPlayer
    }

    pub fn update(&mut self, dt_ms: u64, ctx: &FrameContext<'_>, rng: &mut Rng) {
        if self.frighten_remaining_ms > 0 {
            self.frighten_remaining_ms = self.frighten_remaining_ms.saturating_sub(dt_ms);
            if self.frighten_remaining_ms == 0 {
                self.set_mode(self.previous_mode, false);
            }
        }

        match self.overlay {
            Some(Overlay::ReturningToBase)
                if self.position.distance(ctx.cage_return) < RETURN_ARRIVAL_DISTANCE =>
            {
                // Lands inside the cage heading up; the cage exit is not resumed.
                self.overlay = None;
                self.direction = Direction::Up;
                debug!(agent = ?self.id, "agent back at base");
            }
            Some(Overlay::LeavingCage)
                if self.position.distance(ctx.cage_exit) < EXIT_ARRIVAL_DISTANCE =>
            {
                self.overlay = None;
                debug!(agent = ?self.id, "agent left the cage");
            }
            _ => {}
        }

        let Some((target, multiplier)) = self.resolve_target(ctx, rng) else {
            return;
        };

        let mut excluded = TileFlags::WALL;
        if self.overlay.is_none() {
            excluded |= TileFlags::CAGE_DOOR;
        }
        let heading = self
            .navigator
            .steer(ctx.grid, self.position, self.direction, target, excluded);
        if heading != self.direction {
            if heading.is_horizontal() != self.direction.is_horizontal() {
                self.position = snap_to_lane(ctx.grid, self.position, heading);
            }
            self.direction = heading;
        }

        let multiplier = if self.navigator.in_teleporter() {
            TELEPORTER_SPEED_MULTIPLIER
        } else {
            multiplier
        };
        let step = self.base_speed * multiplier * (dt_ms as f32 / 1000.0);
        self.position = self.position + self.direction.vector() * step;
    }

    /// Target and speed multiplier for this frame; `None` holds the agent.
    fn resolve_target(&self, ctx: &FrameContext<'_>, rng: &mut Rng) -> Option<(Point, f32)> {
        match self.overlay {
            Some(Overlay::LeavingCage) => return Some((ctx.cage_exit, 1.0)),
            Some(Overlay::ReturningToBase) => {
                return Some((ctx.cage_return, RETURNING_SPEED_MULTIPLIER))
            }
            None => {}
        }
        if !self.released {
            return None;
        }
        match self.mode {
            Mode::Caged => None,
            Mode::Scatter => Some((self.home_corner, 1.0)),
            Mode::Chase => {
                let pursuit = PursuitContext {
                    grid: ctx.grid,
                    player_position: ctx.player_position,
                    player_heading: ctx.player_heading,
                    lead_position: ctx.lead_position,
                    own_position: self.position,
                    home_corner: self.home_corner,
                };
                Some((self.strategy.target(&pursuit), 1.0))
            }
            Mode::Frightened => Some((
                ctx.grid.random_tile(rng).center,
                FRIGHTENED_SPEED_MULTIPLIER,
            )),
        }
    }
}

/// Centers the cross axis on the current tile when turning onto a new axis.
pub(crate) fn snap_to_lane(grid: &TileGrid, position: Point, heading: Direction) -> Point {
    let center = grid.tile_at(position).center;
    if heading.is_horizontal() {
        Point::new(position.x, center.y)
    } else if heading.is_vertical() {
        Point::new(center.x, position.y)
    } else {
        position
    }
}
