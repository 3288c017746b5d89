// Grid model: a typed, immutable per-tick snapshot of the arena
//
// Normalizes the raw wire snapshot into sets and lists the planner can query.
// Required fields that are absent produce a GridError; optional ones are
// defaulted here, once, from configuration.

use log::warn;
use std::collections::HashSet;

use crate::config::Config;
use crate::error::GridError;
use crate::types::{ArenaState, Direction, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct Bomb {
    pub pos: Position,
    pub timer: f64,
    pub radius: i32,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobKind {
    /// Dangerous only on its own cell
    Patrol,
    /// Dangerous in a wide disk with decaying intensity
    Ghost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    pub id: Option<String>,
    pub pos: Position,
    pub kind: MobKind,
}

/// Movement capabilities granted by upgrades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_pass_obstacles: bool,
    pub can_pass_bombs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: String,
    pub alive: bool,
    pub pos: Position,
    pub armor: i32,
    pub bombs_available: u32,
    pub can_move: bool,
    /// Remaining invulnerability after a respawn
    pub safe_time: i32,
    pub speed: f64,
    pub bomb_range: i32,
    pub capabilities: Capabilities,
}

impl Unit {
    /// Only alive, movable units receive commands
    pub fn is_active(&self) -> bool {
        self.alive && self.can_move
    }
}

/// Cells covered by a single blast
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blast {
    /// Covered cells excluding the bomb's own cell
    pub cells: Vec<Position>,
    /// Obstacles the blast stops on (and destroys)
    pub obstacles: Vec<Position>,
}

impl Blast {
    pub fn covers(&self, origin: Position, pos: &Position) -> bool {
        *pos == origin || self.cells.contains(pos)
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    pub walls: HashSet<Position>,
    pub obstacles: HashSet<Position>,
    pub bombs: Vec<Bomb>,
    bomb_cells: HashSet<Position>,
    pub mobs: Vec<Mob>,
    pub units: Vec<Unit>,
    pub enemies: Vec<Position>,
}

fn missing(entity: &'static str, index: Option<usize>, field: &'static str) -> GridError {
    GridError::MissingField {
        entity,
        index,
        field,
    }
}

impl Grid {
    /// Decodes a JSON snapshot and builds the grid from it
    pub fn from_json(body: &str, config: &Config) -> Result<Self, GridError> {
        let state: ArenaState = serde_json::from_str(body)?;
        Self::from_state(&state, config)
    }

    /// Builds the typed grid from a raw snapshot
    pub fn from_state(state: &ArenaState, config: &Config) -> Result<Self, GridError> {
        let [width, height] = state.map_size.ok_or_else(|| missing("state", None, "map_size"))?;
        let side = config.grid.max_map_side;
        if width <= 0 || height <= 0 || width > side || height > side {
            return Err(GridError::InvalidMapSize { width, height });
        }

        let arena = state
            .arena
            .as_ref()
            .ok_or_else(|| missing("state", None, "arena"))?;

        let mut grid = Grid {
            width,
            height,
            walls: HashSet::new(),
            obstacles: HashSet::new(),
            bombs: Vec::new(),
            bomb_cells: HashSet::new(),
            mobs: Vec::new(),
            units: Vec::new(),
            enemies: Vec::new(),
        };

        let walls = arena
            .walls
            .as_ref()
            .ok_or_else(|| missing("arena", None, "walls"))?;
        for (index, &pos) in walls.iter().enumerate() {
            grid.check_bounds("walls", index, pos)?;
            grid.walls.insert(pos);
        }

        let obstacles = arena
            .obstacles
            .as_ref()
            .ok_or_else(|| missing("arena", None, "obstacles"))?;
        for (index, &pos) in obstacles.iter().enumerate() {
            grid.check_bounds("obstacles", index, pos)?;
            if grid.walls.contains(&pos) {
                warn!("Obstacle at ({}, {}) overlaps a wall, keeping the wall", pos.x, pos.y);
                continue;
            }
            grid.obstacles.insert(pos);
        }

        for (index, raw) in arena.bombs.iter().flatten().enumerate() {
            let pos = raw.pos.ok_or_else(|| missing("bombs", Some(index), "pos"))?;
            grid.check_bounds("bombs", index, pos)?;
            grid.bombs.push(Bomb {
                pos,
                timer: raw.timer.unwrap_or(config.grid.default_bomb_timer),
                radius: raw.range.unwrap_or(config.grid.default_bomb_range).max(0),
                owner: raw.owner.clone(),
            });
            grid.bomb_cells.insert(pos);
        }

        let bombers = state
            .bombers
            .as_ref()
            .ok_or_else(|| missing("state", None, "bombers"))?;
        for (index, raw) in bombers.iter().enumerate() {
            let id = raw
                .id
                .clone()
                .ok_or_else(|| missing("bombers", Some(index), "id"))?;
            let alive = raw.alive.ok_or_else(|| missing("bombers", Some(index), "alive"))?;
            let pos = raw.pos.ok_or_else(|| missing("bombers", Some(index), "pos"))?;
            let armor = raw.armor.ok_or_else(|| missing("bombers", Some(index), "armor"))?;
            let bombs_available = raw
                .bombs_available
                .ok_or_else(|| missing("bombers", Some(index), "bombs_available"))?;
            let can_move = raw
                .can_move
                .ok_or_else(|| missing("bombers", Some(index), "can_move"))?;
            grid.check_bounds("bombers", index, pos)?;

            grid.units.push(Unit {
                id,
                alive,
                pos,
                armor,
                bombs_available: bombs_available.max(0) as u32,
                can_move,
                safe_time: raw.safe_time.unwrap_or(0),
                speed: raw.speed.unwrap_or(config.movement.default_speed),
                bomb_range: raw.bomb_range.unwrap_or(config.targeting.blast_radius).max(0),
                capabilities: Capabilities {
                    can_pass_obstacles: raw.can_pass_obstacles.unwrap_or(false),
                    can_pass_bombs: raw.can_pass_bombs.unwrap_or(false),
                },
            });
        }

        for (index, raw) in state.enemies.iter().flatten().enumerate() {
            let pos = raw.pos.ok_or_else(|| missing("enemies", Some(index), "pos"))?;
            grid.check_bounds("enemies", index, pos)?;
            grid.enemies.push(pos);
        }

        for (index, raw) in state.mobs.iter().flatten().enumerate() {
            let pos = raw.pos.ok_or_else(|| missing("mobs", Some(index), "pos"))?;
            let kind = match raw.kind.as_deref() {
                Some("patrol") => MobKind::Patrol,
                Some("ghost") => MobKind::Ghost,
                Some(other) => {
                    return Err(GridError::UnknownMobType {
                        index,
                        kind: other.to_string(),
                    })
                }
                None => return Err(missing("mobs", Some(index), "type")),
            };
            grid.check_bounds("mobs", index, pos)?;
            grid.mobs.push(Mob {
                id: raw.id.clone(),
                pos,
                kind,
            });
        }

        Ok(grid)
    }

    fn check_bounds(&self, entity: &'static str, index: usize, pos: Position) -> Result<(), GridError> {
        if self.in_bounds(&pos) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds { entity, index, pos })
        }
    }

    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn is_wall(&self, pos: &Position) -> bool {
        self.walls.contains(pos)
    }

    pub fn is_obstacle(&self, pos: &Position) -> bool {
        self.obstacles.contains(pos)
    }

    pub fn has_bomb(&self, pos: &Position) -> bool {
        self.bomb_cells.contains(pos)
    }

    /// In bounds and holding nothing that blocks a unit without upgrades
    pub fn is_free(&self, pos: &Position) -> bool {
        self.in_bounds(pos) && !self.is_wall(pos) && !self.is_obstacle(pos) && !self.has_bomb(pos)
    }

    pub fn is_next_to_obstacle(&self, pos: &Position) -> bool {
        pos.neighbors().iter().any(|n| self.is_obstacle(n))
    }

    /// All cells in column-major scan order (x outer, y inner)
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Position::new(x, y)))
    }

    pub fn corners(&self) -> Vec<Position> {
        let mut corners = vec![
            Position::new(0, 0),
            Position::new(self.width - 1, 0),
            Position::new(0, self.height - 1),
            Position::new(self.width - 1, self.height - 1),
        ];
        // Degenerate maps (single row or column) repeat corners
        let mut seen = HashSet::new();
        corners.retain(|c| seen.insert(*c));
        corners
    }

    /// Propagates a blast from `origin` along the four axes up to `radius` cells.
    /// A ray stops on the first wall or obstacle, which is still covered.
    pub fn blast(&self, origin: Position, radius: i32) -> Blast {
        let mut blast = Blast::default();
        for dir in Direction::all() {
            let mut cell = origin;
            for _ in 0..radius {
                cell = dir.apply(&cell);
                if !self.in_bounds(&cell) {
                    break;
                }
                blast.cells.push(cell);
                if self.is_obstacle(&cell) {
                    blast.obstacles.push(cell);
                    break;
                }
                if self.is_wall(&cell) {
                    break;
                }
            }
        }
        blast
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: serde_json::Value) -> Result<Grid, GridError> {
        Grid::from_json(&value.to_string(), &Config::default_hardcoded())
    }

    fn minimal() -> serde_json::Value {
        json!({
            "map_size": [5, 5],
            "arena": {"obstacles": [[2, 2]], "walls": [[0, 4]], "bombs": []},
            "bombers": [{
                "id": "a", "alive": true, "pos": [1, 1], "armor": 0,
                "bombs_available": 1, "can_move": true, "safe_time": 0
            }],
            "enemies": [],
            "mobs": []
        })
    }

    #[test]
    fn test_minimal_state_builds() {
        let grid = build(minimal()).unwrap();
        assert_eq!((grid.width, grid.height), (5, 5));
        assert!(grid.is_obstacle(&Position::new(2, 2)));
        assert!(grid.is_wall(&Position::new(0, 4)));
        let unit = &grid.units[0];
        assert_eq!(unit.speed, 2.0);
        assert_eq!(unit.bomb_range, 1);
        assert_eq!(unit.capabilities, Capabilities::default());
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let mut state = minimal();
        state["map_size"] = json!([100000, 5]);
        assert_eq!(
            build(state).unwrap_err(),
            GridError::InvalidMapSize {
                width: 100000,
                height: 5
            }
        );

        let mut state = minimal();
        state["map_size"] = json!([256, 256]);
        assert!(build(state).is_ok());
    }

    #[test]
    fn test_missing_map_size_is_reported() {
        let mut state = minimal();
        state.as_object_mut().unwrap().remove("map_size");
        assert_eq!(
            build(state).unwrap_err(),
            GridError::MissingField {
                entity: "state",
                index: None,
                field: "map_size"
            }
        );
    }

    #[test]
    fn test_missing_bomber_position_is_reported() {
        let mut state = minimal();
        state["bombers"][0].as_object_mut().unwrap().remove("pos");
        assert_eq!(
            build(state).unwrap_err(),
            GridError::MissingField {
                entity: "bombers",
                index: Some(0),
                field: "pos"
            }
        );
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let mut state = minimal();
        state["map_size"] = json!("big");
        assert!(matches!(build(state), Err(GridError::Malformed(_))));
    }

    #[test]
    fn test_bomb_defaults() {
        let mut state = minimal();
        state["arena"]["bombs"] = json!([{"pos": [3, 3]}]);
        let grid = build(state).unwrap();
        assert_eq!(grid.bombs[0].radius, 1);
        assert_eq!(grid.bombs[0].timer, 999.0);
        assert!(grid.has_bomb(&Position::new(3, 3)));
    }

    #[test]
    fn test_unknown_mob_type_rejected() {
        let mut state = minimal();
        state["mobs"] = json!([{"pos": [3, 3], "type": "dragon"}]);
        assert!(matches!(build(state), Err(GridError::UnknownMobType { index: 0, .. })));
    }

    #[test]
    fn test_out_of_bounds_unit_rejected() {
        let mut state = minimal();
        state["bombers"][0]["pos"] = json!([9, 0]);
        assert!(matches!(build(state), Err(GridError::OutOfBounds { entity: "bombers", .. })));
    }

    #[test]
    fn test_obstacle_on_wall_keeps_wall() {
        let mut state = minimal();
        state["arena"]["obstacles"] = json!([[0, 4]]);
        let grid = build(state).unwrap();
        assert!(grid.is_wall(&Position::new(0, 4)));
        assert!(!grid.is_obstacle(&Position::new(0, 4)));
    }

    #[test]
    fn test_blast_stops_on_first_obstacle_and_wall() {
        let mut state = minimal();
        state["arena"]["obstacles"] = json!([[3, 1], [4, 1]]);
        state["arena"]["walls"] = json!([[1, 3]]);
        let grid = build(state).unwrap();

        let blast = grid.blast(Position::new(1, 1), 3);
        assert!(blast.cells.contains(&Position::new(2, 1)));
        assert!(blast.cells.contains(&Position::new(3, 1)));
        assert!(!blast.cells.contains(&Position::new(4, 1)));
        assert_eq!(blast.obstacles, vec![Position::new(3, 1)]);

        assert!(blast.cells.contains(&Position::new(1, 2)));
        assert!(blast.cells.contains(&Position::new(1, 3)));
        assert!(!blast.cells.contains(&Position::new(1, 4)));

        assert!(blast.cells.contains(&Position::new(0, 1)));
        assert!(blast.cells.contains(&Position::new(1, 0)));
    }
}
