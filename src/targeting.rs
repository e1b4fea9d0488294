use std::fmt;

use crate::constants::{AMBUSH_TILE_OFFSET, FLANK_TILE_OFFSET, THRESHOLD_PURSUIT_TILES};
use crate::grid::TileGrid;
use crate::types::{AgentId, Direction, Point};

/// Everything a chase strategy may look at when picking a target.
#[derive(Clone, Copy, Debug)]
pub struct PursuitContext<'a> {
    pub grid: &'a TileGrid,
    pub player_position: Point,
    pub player_heading: Direction,
    /// Position of the direct pursuer, used by the flanker.
    pub lead_position: Point,
    pub own_position: Point,
    pub home_corner: Point,
}

pub trait TargetingStrategy: fmt::Debug + Send + Sync {
    fn target(&self, ctx: &PursuitContext<'_>) -> Point;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DirectPursuer;

#[derive(Clone, Copy, Debug, Default)]
pub struct AmbushPursuer;

#[derive(Clone, Copy, Debug, Default)]
pub struct FlankingPursuer;

#[derive(Clone, Copy, Debug, Default)]
pub struct ThresholdPursuer;

impl TargetingStrategy for DirectPursuer {
    fn target(&self, ctx: &PursuitContext<'_>) -> Point {
        ctx.player_position
    }
}

impl TargetingStrategy for AmbushPursuer {
    fn target(&self, ctx: &PursuitContext<'_>) -> Point {
        let player_tile = ctx.grid.tile_at(ctx.player_position);
        ctx.grid
            .in_direction(player_tile, ctx.player_heading, AMBUSH_TILE_OFFSET)
            .center
    }
}

impl TargetingStrategy for FlankingPursuer {
    fn target(&self, ctx: &PursuitContext<'_>) -> Point {
        let player_tile = ctx.grid.tile_at(ctx.player_position);
        let ahead = ctx
            .grid
            .in_direction(player_tile, ctx.player_heading, FLANK_TILE_OFFSET)
            .center;
        let lead = ctx.grid.tile_at(ctx.lead_position).center;
        lead + (ahead - lead) * 2.0
    }
}

impl TargetingStrategy for ThresholdPursuer {
    fn target(&self, ctx: &PursuitContext<'_>) -> Point {
        let tiles_away =
            ctx.own_position.distance(ctx.player_position) / ctx.grid.tile_size() as f32;
        if tiles_away >= THRESHOLD_PURSUIT_TILES {
            ctx.player_position
        } else {
            ctx.home_corner
        }
    }
}

static DIRECT: DirectPursuer = DirectPursuer;
static AMBUSH: AmbushPursuer = AmbushPursuer;
static FLANKING: FlankingPursuer = FlankingPursuer;
static THRESHOLD: ThresholdPursuer = ThresholdPursuer;

pub fn strategy_for(id: AgentId) -> &'static dyn TargetingStrategy {
    match id {
        AgentId::Chaser => &DIRECT,
        AgentId::Ambusher => &AMBUSH,
        AgentId::Flanker => &FLANKING,
        AgentId::Skittish => &THRESHOLD,
    }
}
