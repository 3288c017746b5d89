// Command synthesis: one decision per unit per tick
//
// Branches are tried from most to least ambitious:
//   Retreat -> Attack -> Explore -> Reposition -> Idle
// A branch that cannot produce a path yields to the next one. Idle is a
// single-cell path on the current position and cannot fail.
//
// Every emitted path starts on the unit's current cell, and every bomb cell
// lies on the emitted path.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::Config;
use crate::grid::{Grid, Unit};
use crate::memory::ExplorationMemory;
use crate::passability::{passable_cells, safe_subset};
use crate::pathfinding::{find_lowest, find_nearest, find_path, find_toward};
use crate::targeting::{Assignment, Candidate};
use crate::threat::DangerMap;
use crate::types::{BomberCommand, Direction, Position};

/// Which branch produced a unit's command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Retreat,
    Attack,
    Explore,
    Reposition,
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitPlan {
    pub command: BomberCommand,
    pub branch: Branch,
}

/// Cells a unit may walk through this tick, its own cell always included
struct Reach {
    passable: HashSet<Position>,
    safe: HashSet<Position>,
}

pub struct Synthesizer<'a> {
    grid: &'a Grid,
    danger: &'a DangerMap,
    config: &'a Config,
}

impl<'a> Synthesizer<'a> {
    pub fn new(grid: &'a Grid, danger: &'a DangerMap, config: &'a Config) -> Self {
        Synthesizer {
            grid,
            danger,
            config,
        }
    }

    pub fn plan_unit<R: Rng>(
        &self,
        unit: &Unit,
        assignment: &Assignment,
        memory: &ExplorationMemory,
        rng: &mut R,
    ) -> UnitPlan {
        let reach = self.reach(unit);
        let here = self.danger.get_danger_level(&unit.pos);

        if here > self.config.safety.retreat_danger || *assignment == Assignment::Retreat {
            if let Some(path) = self.retreat(unit, &reach) {
                return self.emit(unit, Branch::Retreat, path, vec![]);
            }
            debug!("Unit {}: no shelter within reach", unit.id);
        }

        if let Assignment::Attack(candidate) = assignment {
            if let Some((path, bombs)) = self.attack(unit, candidate, &reach) {
                return self.emit(unit, Branch::Attack, path, bombs);
            }
            debug!("Unit {}: attack on ({}, {}) not reachable", unit.id, candidate.pos.x, candidate.pos.y);
        }

        if let Assignment::Explore(goal) = assignment {
            if let Some(path) = self.explore(unit, *goal, &reach, memory, rng) {
                return self.emit(unit, Branch::Explore, path, vec![]);
            }
        }

        if let Some(path) = self.reposition(unit, &reach) {
            return self.emit(unit, Branch::Reposition, path, vec![]);
        }

        self.emit(unit, Branch::Idle, vec![unit.pos], vec![])
    }

    fn reach(&self, unit: &Unit) -> Reach {
        let mut passable = passable_cells(unit, self.grid);
        let mut safe = safe_subset(&passable, self.danger, self.config.safety.safe_danger);
        // A unit may always leave the cell it stands on, bomb or not
        passable.insert(unit.pos);
        safe.insert(unit.pos);
        Reach { passable, safe }
    }

    fn emit(&self, unit: &Unit, branch: Branch, mut path: Vec<Position>, bombs: Vec<Position>) -> UnitPlan {
        path.truncate(self.config.paths.max_path_len.max(1));
        debug!("Unit {}: {:?} with {} cells, {} bombs", unit.id, branch, path.len(), bombs.len());
        UnitPlan {
            command: BomberCommand {
                id: unit.id.clone(),
                path,
                bombs,
            },
            branch,
        }
    }

    /// Nearest low-danger cell, through dangerous cells if need be. When no
    /// shelter lies within the retreat cap, heads for the least dangerous
    /// cell it can reach, as long as that beats staying put.
    fn retreat(&self, unit: &Unit, reach: &Reach) -> Option<Vec<Position>> {
        let safe_danger = self.config.safety.safe_danger;
        let radius = self.config.safety.retreat_search_radius;
        let cap = self.config.paths.retreat_max_len;
        find_nearest(unit.pos, &reach.passable, cap, |cell| {
            self.danger.get_danger_level(cell) < safe_danger && cell.manhattan(&unit.pos) <= radius
        })
        .filter(|path| path.len() > 1)
        .or_else(|| self.descend(unit, &reach.passable, cap))
    }

    /// Path to the lowest-danger cell within `cap`, only if strictly lower
    /// than the unit's current cell
    fn descend(&self, unit: &Unit, ground: &HashSet<Position>, cap: usize) -> Option<Vec<Position>> {
        let here = self.danger.get_danger_level(&unit.pos);
        let path = find_lowest(unit.pos, ground, cap, |cell| self.danger.get_danger_level(cell))?;
        match path.last() {
            Some(last) if self.danger.get_danger_level(last) < here => {
                debug!("Unit {}: no shelter, descending from {} to {}", unit.id, here, self.danger.get_danger_level(last));
                Some(path)
            }
            _ => None,
        }
    }

    /// Approach the placement cell over safe ground, then bomb and escape if
    /// the whole route fits in one command. Without bombs or without an escape
    /// route the unit only approaches.
    fn attack(&self, unit: &Unit, candidate: &Candidate, reach: &Reach) -> Option<(Vec<Position>, Vec<Position>)> {
        let cap = self.config.paths.max_path_len;
        let placement = candidate.pos;
        let approach = find_path(self.config.paths.strategy, unit.pos, placement, &reach.safe, cap)?;

        if unit.bombs_available > 0 && self.config.movement.max_bombs_per_command > 0 {
            if let Some(escape) = self.escape_from(unit, placement, reach) {
                let mut route = approach.clone();
                route.extend(escape.into_iter().skip(1));
                if route.len() <= cap {
                    return Some((route, vec![placement]));
                }
            }
        }

        if approach.len() > 1 {
            Some((approach, vec![]))
        } else {
            None
        }
    }

    /// Shortest walk from a freshly placed bomb to a safe cell outside its blast.
    /// The bomb cell is only ever the start, so it is never re-entered.
    fn escape_from(&self, unit: &Unit, placement: Position, reach: &Reach) -> Option<Vec<Position>> {
        let blast = self.grid.blast(placement, unit.bomb_range);
        let mut ground = reach.safe.clone();
        ground.insert(placement);
        find_nearest(placement, &ground, self.config.paths.escape_max_len, |cell| {
            !blast.covers(placement, cell)
        })
    }

    /// A few steps toward the exploration goal, or a straight walk in a
    /// shuffled direction when no step toward it is possible
    fn explore<R: Rng>(
        &self,
        unit: &Unit,
        goal: Position,
        reach: &Reach,
        memory: &ExplorationMemory,
        rng: &mut R,
    ) -> Option<Vec<Position>> {
        let steps = self.config.movement.exploration_steps(unit.speed);

        if let Some(mut path) = find_toward(unit.pos, goal, &reach.safe, self.config.paths.max_path_len) {
            if path.len() > 1 {
                path.truncate(steps + 1);
                return Some(path);
            }
        }

        let mut directions = Direction::all();
        directions.shuffle(rng);
        // Stable: unseen directions first, shuffle order otherwise
        directions.sort_by_key(|dir| memory.recently_at(&unit.id, &dir.apply(&unit.pos)));

        for dir in directions.iter() {
            let mut path = vec![unit.pos];
            let mut cursor = unit.pos;
            for _ in 0..steps {
                let next = dir.apply(&cursor);
                if !reach.safe.contains(&next) {
                    break;
                }
                path.push(next);
                cursor = next;
            }
            if path.len() > 1 {
                debug!("Unit {}: no way toward goal, walking {}", unit.id, dir.as_str());
                return Some(path);
            }
        }
        None
    }

    /// Nearest safe cell next to an obstacle, else nearest safe cell. A unit
    /// already standing on unsafe ground has no safe neighbours, so it crosses
    /// unsafe cells to the nearest safe one, or at least to lower danger.
    fn reposition(&self, unit: &Unit, reach: &Reach) -> Option<Vec<Position>> {
        let cap = self.config.paths.max_path_len;
        let safe_danger = self.config.safety.safe_danger;

        if !self.danger.is_safe(&unit.pos, safe_danger) {
            return find_nearest(unit.pos, &reach.passable, cap, |cell| self.danger.is_safe(cell, safe_danger))
                .filter(|path| path.len() > 1)
                .or_else(|| self.descend(unit, &reach.passable, cap));
        }

        find_nearest(unit.pos, &reach.safe, cap, |cell| {
            self.grid.is_next_to_obstacle(cell) && self.danger.is_safe(cell, safe_danger)
        })
        .or_else(|| find_nearest(unit.pos, &reach.safe, cap, |cell| self.danger.is_safe(cell, safe_danger)))
        .filter(|path| path.len() > 1)
    }
}
