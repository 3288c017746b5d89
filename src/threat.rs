// Threat analysis: per-cell danger scores (0-100) for the current tick
//
// The danger map is rebuilt from scratch every tick. A cell touched by several
// hazards keeps the maximum contribution, never the sum, so the result does not
// depend on the order bombs and mobs are listed in.

use std::collections::HashMap;

use crate::config::ThreatConfig;
use crate::grid::{Bomb, Grid, Mob, MobKind};
use crate::types::Position;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DangerMap {
    levels: HashMap<Position, u8>,
}

impl DangerMap {
    pub fn new() -> Self {
        DangerMap::default()
    }

    /// Raises the danger of `pos` to `value` if it is currently lower
    pub fn mark(&mut self, pos: Position, value: u8) {
        let level = self.levels.entry(pos).or_insert(0);
        *level = (*level).max(value.min(100));
    }

    /// Danger of a cell, 0 for cells no hazard touches
    pub fn get_danger_level(&self, pos: &Position) -> u8 {
        self.levels.get(pos).copied().unwrap_or(0)
    }

    pub fn is_safe(&self, pos: &Position, safe_danger: u8) -> bool {
        self.get_danger_level(pos) < safe_danger
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &u8)> {
        self.levels.iter()
    }
}

pub struct ThreatAnalyzer<'a> {
    config: &'a ThreatConfig,
}

impl<'a> ThreatAnalyzer<'a> {
    pub fn new(config: &'a ThreatConfig) -> Self {
        ThreatAnalyzer { config }
    }

    pub fn analyze(&self, grid: &Grid) -> DangerMap {
        let mut danger = DangerMap::new();

        for bomb in &grid.bombs {
            self.mark_bomb(grid, bomb, &mut danger);
        }

        for mob in &grid.mobs {
            self.mark_mob(grid, mob, &mut danger);
        }

        danger
    }

    pub fn is_imminent(&self, bomb: &Bomb) -> bool {
        bomb.timer <= self.config.imminent_timer
    }

    fn mark_bomb(&self, grid: &Grid, bomb: &Bomb, danger: &mut DangerMap) {
        // Far-future bombs are ignored until they become imminent
        if !self.is_imminent(bomb) {
            return;
        }

        danger.mark(bomb.pos, self.config.bomb_center_danger);
        for cell in grid.blast(bomb.pos, bomb.radius).cells {
            danger.mark(cell, self.config.blast_danger);
        }
    }

    fn mark_mob(&self, grid: &Grid, mob: &Mob, danger: &mut DangerMap) {
        match mob.kind {
            MobKind::Patrol => danger.mark(mob.pos, self.config.patrol_danger),
            MobKind::Ghost => {
                let reach = self.config.ghost_radius.floor() as i32;
                for dx in -reach..=reach {
                    for dy in -reach..=reach {
                        let cell = Position::new(mob.pos.x + dx, mob.pos.y + dy);
                        if !grid.in_bounds(&cell) {
                            continue;
                        }
                        let distance = mob.pos.euclidean(&cell);
                        if distance <= self.config.ghost_radius {
                            danger.mark(cell, self.ghost_danger(distance));
                        }
                    }
                }
            }
        }
    }

    /// max(floor, peak - falloff * distance), truncated to an integer level
    pub fn ghost_danger(&self, distance: f64) -> u8 {
        let raw = self.config.ghost_peak - self.config.ghost_falloff * distance;
        let level = raw.max(self.config.ghost_floor as f64).clamp(0.0, 100.0);
        level as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn grid_with(arena: serde_json::Value, mobs: serde_json::Value) -> Grid {
        let state = json!({
            "map_size": [11, 11],
            "arena": arena,
            "bombers": [],
            "enemies": [],
            "mobs": mobs
        });
        Grid::from_json(&state.to_string(), &Config::default_hardcoded()).unwrap()
    }

    #[test]
    fn test_imminent_bomb_marks_center_and_cross() {
        let config = Config::default_hardcoded();
        let grid = grid_with(
            json!({"obstacles": [], "walls": [], "bombs": [{"pos": [5, 5], "timer": 1.0, "range": 2}]}),
            json!([]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);

        assert_eq!(danger.get_danger_level(&Position::new(5, 5)), 100);
        for cell in [(6, 5), (7, 5), (4, 5), (3, 5), (5, 6), (5, 7), (5, 4), (5, 3)] {
            assert_eq!(danger.get_danger_level(&Position::new(cell.0, cell.1)), 80);
        }
        assert_eq!(danger.get_danger_level(&Position::new(8, 5)), 0);
        assert_eq!(danger.get_danger_level(&Position::new(6, 6)), 0);
    }

    #[test]
    fn test_distant_bomb_is_ignored() {
        let config = Config::default_hardcoded();
        let grid = grid_with(
            json!({"obstacles": [], "walls": [], "bombs": [{"pos": [5, 5], "timer": 6.0, "range": 2}]}),
            json!([]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);
        assert!(danger.is_empty());
    }

    #[test]
    fn test_blast_stops_at_obstacle_but_marks_it() {
        let config = Config::default_hardcoded();
        let grid = grid_with(
            json!({"obstacles": [[6, 5]], "walls": [[5, 6]], "bombs": [{"pos": [5, 5], "timer": 0.5, "range": 3}]}),
            json!([]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);

        assert_eq!(danger.get_danger_level(&Position::new(6, 5)), 80);
        assert_eq!(danger.get_danger_level(&Position::new(7, 5)), 0);
        assert_eq!(danger.get_danger_level(&Position::new(5, 6)), 80);
        assert_eq!(danger.get_danger_level(&Position::new(5, 7)), 0);
    }

    #[test]
    fn test_patrol_marks_only_its_cell() {
        let config = Config::default_hardcoded();
        let grid = grid_with(
            json!({"obstacles": [], "walls": []}),
            json!([{"pos": [2, 2], "type": "patrol"}]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);
        assert_eq!(danger.get_danger_level(&Position::new(2, 2)), 60);
        assert_eq!(danger.len(), 1);
    }

    #[test]
    fn test_ghost_danger_decays_with_floor() {
        let config = Config::default_hardcoded();
        let analyzer = ThreatAnalyzer::new(&config.threat);
        assert_eq!(analyzer.ghost_danger(0.0), 70);
        assert_eq!(analyzer.ghost_danger(1.0), 67);
        assert_eq!(analyzer.ghost_danger(10.0), 40);
        assert_eq!(analyzer.ghost_danger(25.0), 10);

        let grid = grid_with(
            json!({"obstacles": [], "walls": []}),
            json!([{"pos": [0, 0], "type": "ghost"}]),
        );
        let danger = analyzer.analyze(&grid);
        assert_eq!(danger.get_danger_level(&Position::new(0, 0)), 70);
        assert_eq!(danger.get_danger_level(&Position::new(10, 0)), 40);
        // sqrt(200) > 10
        assert_eq!(danger.get_danger_level(&Position::new(10, 10)), 0);
    }

    #[test]
    fn test_overlapping_hazards_take_maximum() {
        let config = Config::default_hardcoded();
        let grid = grid_with(
            json!({"obstacles": [], "walls": [], "bombs": [
                {"pos": [5, 5], "timer": 1.0, "range": 1},
                {"pos": [7, 5], "timer": 1.0, "range": 1}
            ]}),
            json!([{"pos": [6, 5], "type": "patrol"}]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);
        assert_eq!(danger.get_danger_level(&Position::new(6, 5)), 80);
    }
}
