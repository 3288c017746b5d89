// Target selection: where to place bombs and who goes where
//
// Candidates are free cells from which a bomb would hit at least one obstacle
// or hostile unit. Assignment is greedy and nearest-first in unit-id order, so
// the first unit to claim a cell wins it for this tick. Re-planning every tick
// makes the lack of a global matching acceptable.

use log::debug;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::Config;
use crate::grid::{Grid, Unit};
use crate::memory::ExplorationMemory;
use crate::threat::DangerMap;
use crate::types::Position;

/// A bomb placement cell and what a blast from it would hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub pos: Position,
    pub obstacles: BTreeSet<Position>,
    pub enemies: BTreeSet<Position>,
    pub score: u32,
}

/// What a unit has been told to pursue this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Standing in danger: skip targeting and get out
    Retreat,
    Attack(Candidate),
    Explore(Position),
    /// Nothing left to claim
    Unassigned,
}

/// 1 + 2 + ... + n for the first `cap` obstacles, rewarding multi-kills
pub fn obstacle_score(destroyed: usize, cap: usize) -> u32 {
    let n = destroyed.min(cap) as u32;
    n * (n + 1) / 2
}

/// Scores a single placement cell, `None` if the blast would hit nothing
pub fn evaluate_placement(grid: &Grid, pos: Position, radius: i32, config: &Config) -> Option<Candidate> {
    let blast = grid.blast(pos, radius);
    let obstacles: BTreeSet<Position> = blast.obstacles.iter().copied().collect();
    let enemies: BTreeSet<Position> = grid
        .enemies
        .iter()
        .filter(|enemy| blast.covers(pos, enemy))
        .copied()
        .collect();

    if obstacles.is_empty() && enemies.is_empty() {
        return None;
    }

    let score = obstacle_score(obstacles.len(), config.targeting.max_scored_obstacles)
        + enemies.len() as u32 * config.targeting.enemy_hit_score;

    Some(Candidate {
        pos,
        obstacles,
        enemies,
        score,
    })
}

/// Enumerates safe placement cells, keeping one representative per distinct
/// hit set, sorted by descending score (scan order breaks ties)
pub fn find_candidates(grid: &Grid, danger: &DangerMap, radius: i32, config: &Config) -> Vec<Candidate> {
    let mut seen: HashSet<(BTreeSet<Position>, BTreeSet<Position>)> = HashSet::new();
    let mut candidates = Vec::new();

    for cell in grid.cells() {
        if !grid.is_free(&cell) || !danger.is_safe(&cell, config.safety.safe_danger) {
            continue;
        }
        let candidate = match evaluate_placement(grid, cell, radius, config) {
            Some(candidate) => candidate,
            None => continue,
        };
        let key = (candidate.obstacles.clone(), candidate.enemies.clone());
        if seen.insert(key) {
            candidates.push(candidate);
        }
    }

    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Greedy nearest-first assignment in unit-id order. No cell is handed to
/// two units; units left over get a unique exploration goal.
pub fn assign_targets<R: Rng>(
    grid: &Grid,
    danger: &DangerMap,
    candidates: &[Candidate],
    memory: &ExplorationMemory,
    config: &Config,
    rng: &mut R,
) -> BTreeMap<String, Assignment> {
    let mut units: Vec<&Unit> = grid.units.iter().filter(|u| u.is_active()).collect();
    units.sort_by(|a, b| a.id.cmp(&b.id));

    let mut claimed: HashSet<Position> = HashSet::new();
    let mut assignments = BTreeMap::new();
    let mut leftover = Vec::new();

    for unit in units {
        if danger.get_danger_level(&unit.pos) > config.safety.retreat_danger {
            assignments.insert(unit.id.clone(), Assignment::Retreat);
            continue;
        }

        let nearest = candidates
            .iter()
            .filter(|c| !claimed.contains(&c.pos))
            .min_by_key(|c| c.pos.manhattan(&unit.pos));

        match nearest {
            Some(candidate) => {
                claimed.insert(candidate.pos);
                debug!(
                    "Unit {} -> bomb at ({}, {}) score {}",
                    unit.id, candidate.pos.x, candidate.pos.y, candidate.score
                );
                assignments.insert(unit.id.clone(), Assignment::Attack(candidate.clone()));
            }
            None => leftover.push(unit),
        }
    }

    for unit in leftover {
        let assignment = match exploration_goal(unit, grid, danger, memory, &claimed, config, rng) {
            Some(goal) => {
                claimed.insert(goal);
                Assignment::Explore(goal)
            }
            None => Assignment::Unassigned,
        };
        assignments.insert(unit.id.clone(), assignment);
    }

    assignments
}

/// Picks a far, quiet corner: far from obstacles, not too far from the unit,
/// and preferably not yet visited. Falls back to a random free cell.
pub fn exploration_goal<R: Rng>(
    unit: &Unit,
    grid: &Grid,
    danger: &DangerMap,
    memory: &ExplorationMemory,
    claimed: &HashSet<Position>,
    config: &Config,
    rng: &mut R,
) -> Option<Position> {
    let eligible = |cell: &Position| {
        *cell != unit.pos
            && grid.is_free(cell)
            && !claimed.contains(cell)
            && danger.is_safe(cell, config.safety.safe_danger)
    };

    let mut best: Option<(Position, f64)> = None;
    for corner in grid.corners() {
        if !eligible(&corner) {
            continue;
        }
        let clearance = grid
            .obstacles
            .iter()
            .map(|o| o.manhattan(&corner))
            .min()
            .unwrap_or(grid.width + grid.height) as f64;
        let mut score = clearance - config.targeting.corner_distance_weight * corner.manhattan(&unit.pos) as f64;
        if memory.is_visited(&corner) {
            score -= config.targeting.visited_corner_penalty;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((corner, score));
        }
    }
    if let Some((corner, _)) = best {
        return Some(corner);
    }

    for _ in 0..config.targeting.random_goal_attempts {
        let cell = Position::new(rng.random_range(0..grid.width), rng.random_range(0..grid.height));
        if eligible(&cell) {
            return Some(cell);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::ThreatAnalyzer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn build_grid(size: [i32; 2], obstacles: serde_json::Value, walls: serde_json::Value, bombers: serde_json::Value) -> Grid {
        let state = json!({
            "map_size": size,
            "arena": {"obstacles": obstacles, "walls": walls, "bombs": []},
            "bombers": bombers
        });
        Grid::from_json(&state.to_string(), &Config::default_hardcoded()).unwrap()
    }

    fn bomber(id: &str, pos: [i32; 2]) -> serde_json::Value {
        json!({
            "id": id, "alive": true, "pos": pos, "armor": 0,
            "bombs_available": 1, "can_move": true, "safe_time": 0
        })
    }

    #[test]
    fn test_score_is_triangular_and_capped() {
        assert_eq!(obstacle_score(0, 4), 0);
        assert_eq!(obstacle_score(1, 4), 1);
        assert_eq!(obstacle_score(2, 4), 3);
        assert_eq!(obstacle_score(4, 4), 10);
        assert_eq!(obstacle_score(6, 4), 10);
    }

    #[test]
    fn test_single_obstacle_next_to_wall() {
        let config = Config::default_hardcoded();
        let grid = build_grid([11, 11], json!([[5, 6]]), json!([[6, 5]]), json!([bomber("a", [5, 5])]));
        let candidate = evaluate_placement(&grid, Position::new(5, 5), 1, &config).unwrap();
        assert_eq!(candidate.obstacles.len(), 1);
        assert_eq!(candidate.score, 1);
    }

    #[test]
    fn test_chained_obstacles_score_superlinearly() {
        let config = Config::default_hardcoded();
        let grid = build_grid([11, 11], json!([[5, 5], [5, 3]]), json!([]), json!([]));
        let candidate = evaluate_placement(&grid, Position::new(5, 4), 1, &config).unwrap();
        assert_eq!(candidate.obstacles.len(), 2);
        assert_eq!(candidate.score, 3);
    }

    #[test]
    fn test_enemy_on_blast_line_counts() {
        let config = Config::default_hardcoded();
        let state = json!({
            "map_size": [7, 7],
            "arena": {"obstacles": [], "walls": []},
            "bombers": [],
            "enemies": [{"pos": [3, 2]}]
        });
        let grid = Grid::from_json(&state.to_string(), &config).unwrap();
        let candidate = evaluate_placement(&grid, Position::new(3, 3), 1, &config).unwrap();
        assert_eq!(candidate.enemies.len(), 1);
        assert_eq!(candidate.score, config.targeting.enemy_hit_score);
    }

    #[test]
    fn test_candidates_deduplicate_identical_hit_sets() {
        let config = Config::default_hardcoded();
        // Radius 2 on a single row: (1,0) and (2,0) both only hit the obstacle at (3,0)
        let grid = build_grid([4, 1], json!([[3, 0]]), json!([]), json!([]));
        let candidates = find_candidates(&grid, &DangerMap::new(), 2, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pos, Position::new(1, 0));
    }

    #[test]
    fn test_candidates_sorted_by_score() {
        let config = Config::default_hardcoded();
        let grid = build_grid([7, 7], json!([[1, 0], [3, 3], [3, 5], [2, 4]]), json!([]), json!([]));
        let candidates = find_candidates(&grid, &DangerMap::new(), 1, &config);
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(candidates[0].pos, Position::new(3, 4));
        assert_eq!(candidates[0].score, 6);
    }

    #[test]
    fn test_dangerous_candidates_rejected() {
        let config = Config::default_hardcoded();
        let grid = build_grid([4, 1], json!([[3, 0]]), json!([]), json!([]));
        let mut danger = DangerMap::new();
        danger.mark(Position::new(2, 0), 80);
        assert!(find_candidates(&grid, &danger, 1, &config).is_empty());
    }

    #[test]
    fn test_assignment_is_unique_and_nearest_first() {
        let config = Config::default_hardcoded();
        let grid = build_grid(
            [9, 9],
            json!([[0, 4], [8, 4]]),
            json!([]),
            json!([bomber("b", [7, 4]), bomber("a", [1, 1]), bomber("c", [4, 4])]),
        );
        let danger = ThreatAnalyzer::new(&config.threat).analyze(&grid);
        let candidates = find_candidates(&grid, &danger, 1, &config);
        let mut rng = StdRng::seed_from_u64(1);
        let assignments = assign_targets(&grid, &danger, &candidates, &ExplorationMemory::new(), &config, &mut rng);

        assert_eq!(assignments.len(), 3);
        let mut cells = HashSet::new();
        for assignment in assignments.values() {
            let cell = match assignment {
                Assignment::Attack(c) => c.pos,
                Assignment::Explore(goal) => *goal,
                other => panic!("unexpected assignment {:?}", other),
            };
            assert!(cells.insert(cell), "cell {:?} assigned twice", cell);
        }
        // "a" is planned first and takes the candidate nearest to it
        match &assignments["a"] {
            Assignment::Attack(c) => assert_eq!(c.obstacles.iter().next(), Some(&Position::new(0, 4))),
            other => panic!("unexpected assignment {:?}", other),
        }
    }

    #[test]
    fn test_unit_in_danger_is_sent_to_retreat() {
        let config = Config::default_hardcoded();
        let grid = build_grid([5, 5], json!([[4, 4]]), json!([]), json!([bomber("a", [0, 0])]));
        let mut danger = DangerMap::new();
        danger.mark(Position::new(0, 0), 100);
        let candidates = find_candidates(&grid, &danger, 1, &config);
        let mut rng = StdRng::seed_from_u64(1);
        let assignments = assign_targets(&grid, &danger, &candidates, &ExplorationMemory::new(), &config, &mut rng);
        assert_eq!(assignments["a"], Assignment::Retreat);
    }

    #[test]
    fn test_exploration_prefers_unvisited_corner() {
        let config = Config::default_hardcoded();
        let grid = build_grid([10, 10], json!([]), json!([]), json!([bomber("a", [0, 0])]));
        let unit = grid.units[0].clone();
        let mut rng = StdRng::seed_from_u64(1);
        let danger = DangerMap::new();

        let goal = exploration_goal(&unit, &grid, &danger, &ExplorationMemory::new(), &HashSet::new(), &config, &mut rng);
        assert_eq!(goal, Some(Position::new(9, 0)));

        let mut memory = ExplorationMemory::new();
        memory.visited.insert(Position::new(9, 0));
        let goal = exploration_goal(&unit, &grid, &danger, &memory, &HashSet::new(), &config, &mut rng);
        assert_eq!(goal, Some(Position::new(0, 9)));
    }
}
