// Arena API Types
// Wire shapes for the per-tick arena snapshot and the per-tick command batch

use serde::{Deserialize, Serialize};

/// Grid cell coordinate, serialized as `[x, y]`
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn manhattan(&self, other: &Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn euclidean(&self, other: &Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// The four axis neighbours, in `Direction::all()` order
    pub fn neighbors(&self) -> [Position; 4] {
        Direction::all().map(|dir| dir.apply(self))
    }

    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.manhattan(other) == 1
    }
}

impl From<[i32; 2]> for Position {
    fn from(raw: [i32; 2]) -> Self {
        Position { x: raw[0], y: raw[1] }
    }
}

impl From<Position> for [i32; 2] {
    fn from(pos: Position) -> Self {
        [pos.x, pos.y]
    }
}

/// The four axis directions a unit can step in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    /// Returns all directions in neighbour-expansion order
    pub fn all() -> [Direction; 4] {
        [Direction::Right, Direction::Left, Direction::Down, Direction::Up]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Left => "left",
            Direction::Down => "down",
            Direction::Up => "up",
        }
    }

    /// Calculates the next position when stepping in this direction.
    /// Arena rows grow downwards.
    pub fn apply(&self, pos: &Position) -> Position {
        match self {
            Direction::Right => Position { x: pos.x + 1, y: pos.y },
            Direction::Left => Position { x: pos.x - 1, y: pos.y },
            Direction::Down => Position { x: pos.x, y: pos.y + 1 },
            Direction::Up => Position { x: pos.x, y: pos.y - 1 },
        }
    }
}

/// Raw arena geometry block. Every field is optional on the wire so that
/// absence can be reported as a structured error instead of a parse failure.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RawArena {
    #[serde(default)]
    pub obstacles: Option<Vec<Position>>,
    #[serde(default)]
    pub walls: Option<Vec<Position>>,
    #[serde(default)]
    pub bombs: Option<Vec<RawBomb>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RawBomb {
    #[serde(default)]
    pub pos: Option<Position>,
    #[serde(default)]
    pub timer: Option<f64>,
    #[serde(default)]
    pub range: Option<i32>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RawBomber {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default)]
    pub pos: Option<Position>,
    #[serde(default)]
    pub armor: Option<i32>,
    #[serde(default)]
    pub bombs_available: Option<i32>,
    #[serde(default)]
    pub can_move: Option<bool>,
    #[serde(default)]
    pub safe_time: Option<i32>,
    #[serde(default)]
    pub can_pass_bombs: Option<bool>,
    #[serde(default)]
    pub can_pass_obstacles: Option<bool>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub bomb_range: Option<i32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RawEnemy {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pos: Option<Position>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RawMob {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pos: Option<Position>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Complete per-tick snapshot received from the arena
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ArenaState {
    #[serde(default)]
    pub map_size: Option<[i32; 2]>,
    #[serde(default)]
    pub arena: Option<RawArena>,
    #[serde(default)]
    pub bombers: Option<Vec<RawBomber>>,
    #[serde(default)]
    pub enemies: Option<Vec<RawEnemy>>,
    #[serde(default)]
    pub mobs: Option<Vec<RawMob>>,
}

/// Command for a single unit for one tick
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BomberCommand {
    pub id: String,
    pub path: Vec<Position>,
    pub bombs: Vec<Position>,
}

impl BomberCommand {
    /// Holding position: a single-cell path and no bombs
    pub fn idle(id: &str, pos: Position) -> Self {
        BomberCommand {
            id: id.to_string(),
            path: vec![pos],
            bombs: vec![],
        }
    }
}

/// Response body for one tick, one entry per live movable unit
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandBatch {
    pub bombers: Vec<BomberCommand>,
}
