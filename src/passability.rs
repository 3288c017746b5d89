// Passability: which cells a given unit may occupy
//
// Walls never pass. Obstacles and bomb cells pass only with the matching
// upgrade. Danger is not considered here; callers filter with the danger map.

use std::collections::HashSet;

use crate::grid::{Grid, Unit};
use crate::threat::DangerMap;
use crate::types::Position;

pub fn passable_cells(unit: &Unit, grid: &Grid) -> HashSet<Position> {
    grid.cells()
        .filter(|cell| is_passable(unit, grid, cell))
        .collect()
}

pub fn is_passable(unit: &Unit, grid: &Grid, cell: &Position) -> bool {
    if !grid.in_bounds(cell) || grid.is_wall(cell) {
        return false;
    }
    if grid.is_obstacle(cell) && !unit.capabilities.can_pass_obstacles {
        return false;
    }
    if grid.has_bomb(cell) && !unit.capabilities.can_pass_bombs {
        return false;
    }
    true
}

/// Subset of `passable` whose danger is strictly below `safe_danger`
pub fn safe_subset(passable: &HashSet<Position>, danger: &DangerMap, safe_danger: u8) -> HashSet<Position> {
    passable
        .iter()
        .filter(|cell| danger.is_safe(cell, safe_danger))
        .copied()
        .collect()
}
