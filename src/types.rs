use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Movement heading on the grid plane. `Up` runs toward row 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Fixed enumeration order used for every tie-break on the grid.
    pub const COMPASS: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn vector(self) -> Point {
        match self {
            Self::Up => Point::new(0.0, -1.0),
            Self::Down => Point::new(0.0, 1.0),
            Self::Left => Point::new(-1.0, 0.0),
            Self::Right => Point::new(1.0, 0.0),
            Self::None => Point::ZERO,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Caged,
    Scatter,
    Chase,
    Frightened,
}

/// Cage traffic that takes priority over the agent's [`Mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    LeavingCage,
    ReturningToBase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Chaser,
    Ambusher,
    Flanker,
    Skittish,
}

impl AgentId {
    pub const ALL: [AgentId; 4] = [
        AgentId::Chaser,
        AgentId::Ambusher,
        AgentId::Flanker,
        AgentId::Skittish,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Chaser => 0,
            Self::Ambusher => 1,
            Self::Flanker => 2,
            Self::Skittish => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOverReason {
    Cleared,
    OutOfLives,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<Overlay>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BonusView {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "remainingMs")]
    pub remaining_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    RoundStarted,
    ModeChanged {
        mode: Mode,
    },
    AgentReleased {
        agent: AgentId,
    },
    DotEaten {
        row: usize,
        col: usize,
        total: u32,
    },
    EnergizerEaten {
        row: usize,
        col: usize,
        total: u32,
    },
    FrightenEnded,
    AgentKilled {
        agent: AgentId,
        worth: u32,
        combo: u32,
        x: f32,
        y: f32,
    },
    PlayerCaptured {
        by: AgentId,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    BonusSpawned {
        x: f32,
        y: f32,
    },
    BonusTaken {
        worth: u32,
        x: f32,
        y: f32,
    },
    BonusExpired,
    RoundOver {
        reason: RoundOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "dotsConsumed")]
    pub dots_consumed: u32,
    #[serde(rename = "dotsRemaining")]
    pub dots_remaining: usize,
    #[serde(rename = "timelineMode")]
    pub timeline_mode: Option<Mode>,
    #[serde(rename = "frightenRemainingMs")]
    pub frighten_remaining_ms: u64,
    pub combo: u32,
    pub player: PlayerView,
    pub agents: Vec<AgentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<BonusView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundSummary {
    pub reason: Option<RoundOverReason>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "dotsConsumed")]
    pub dots_consumed: u32,
    pub kills: u32,
    pub captures: u32,
}
