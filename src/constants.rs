use crate::types::Mode;

pub const TICK_RATE: u32 = 50;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const MAP_WIDTH: usize = 28;
pub const MAP_HEIGHT: usize = 31;
pub const TILE_SIZE: u32 = 10;

pub const AGENT_COUNT: usize = 4;
pub const AGENT_BASE_SPEED: f32 = 60.0;
pub const PLAYER_BASE_SPEED: f32 = 65.0;

pub const FRIGHTENED_SPEED_MULTIPLIER: f32 = 0.5;
pub const TELEPORTER_SPEED_MULTIPLIER: f32 = 0.6;
pub const RETURNING_SPEED_MULTIPLIER: f32 = 1.5;

pub const FRIGHTEN_DURATION_MS: u64 = 6_000;

/// World-unit distance below which a returning agent counts as home.
pub const RETURN_ARRIVAL_DISTANCE: f32 = 8.0;
/// World-unit distance below which a leaving agent counts as outside.
pub const EXIT_ARRIVAL_DISTANCE: f32 = 5.0;
pub const COLLISION_DISTANCE: f32 = 5.0;

pub const AMBUSH_TILE_OFFSET: u32 = 4;
pub const FLANK_TILE_OFFSET: u32 = 2;
pub const THRESHOLD_PURSUIT_TILES: f32 = 8.0;

pub const KILL_WORTH: [u32; AGENT_COUNT] = [200, 400, 800, 1600];

pub const THIRD_AGENT_RELEASE_DOTS: u32 = 30;
pub const FOURTH_AGENT_RELEASE_DOTS: u32 = 60;

pub const STARTING_LIVES: u32 = 3;
pub const DOT_WORTH: u32 = 10;
pub const ENERGIZER_WORTH: u32 = 50;
pub const BONUS_WORTH: u32 = 100;
pub const BONUS_DOT_COUNTS: [u32; 2] = [70, 170];
pub const BONUS_LIFETIME_MS: u64 = 10_000;

/// Global scatter/chase schedule. `None` holds the mode for the rest of the round.
pub const MODE_TIMELINE: [(Mode, Option<u64>); 8] = [
    (Mode::Scatter, Some(7_000)),
    (Mode::Chase, Some(20_000)),
    (Mode::Scatter, Some(7_000)),
    (Mode::Chase, Some(20_000)),
    (Mode::Scatter, Some(5_000)),
    (Mode::Chase, Some(20_000)),
    (Mode::Scatter, Some(5_000)),
    (Mode::Chase, None),
];

// World anchors for the stock level, in world units (x right, y down).
pub const CAGE_EXIT_POINT: (f32, f32) = (140.0, 115.0);
pub const CAGE_RETURN_POINT: (f32, f32) = (140.0, 145.0);
pub const PLAYER_START: (f32, f32) = (140.0, 235.0);
pub const BONUS_POSITION: (f32, f32) = (140.0, 175.0);
pub const AGENT_RESET_POSITIONS: [(f32, f32); AGENT_COUNT] = [
    (140.0, 115.0),
    (140.0, 145.0),
    (120.0, 145.0),
    (160.0, 145.0),
];
pub const AGENT_HOME_CORNERS: [(f32, f32); AGENT_COUNT] = [
    (255.0, 5.0),
    (25.0, 5.0),
    (275.0, 305.0),
    (5.0, 305.0),
];

pub const DEFAULT_LEVEL: &str = include_str!("../assets/default_level.txt");
