// Tick planner: snapshot in, command batch out
//
// Runs the full pipeline for one tick:
//   grid -> danger map -> candidates -> assignment -> per-unit synthesis
// The planner itself is stateless; exploration memory and the RNG are owned
// by the caller so that a logged tick can be replayed exactly.

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::GridError;
use crate::grid::Grid;
use crate::memory::ExplorationMemory;
use crate::synthesizer::{Branch, Synthesizer};
use crate::targeting::{assign_targets, find_candidates, Assignment};
use crate::threat::ThreatAnalyzer;
use crate::types::{ArenaState, BomberCommand, CommandBatch};

/// Branch taken by one unit, kept alongside the batch for logs and replays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub branch: Branch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickPlan {
    pub commands: CommandBatch,
    pub decisions: Vec<Decision>,
}

#[derive(Debug, Clone)]
pub struct Planner {
    config: Config,
}

impl Planner {
    pub fn new(config: Config) -> Self {
        Planner { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plans one tick. Fails only when the snapshot cannot be normalized.
    pub fn plan<R: Rng>(
        &self,
        state: &ArenaState,
        memory: &ExplorationMemory,
        rng: &mut R,
    ) -> Result<TickPlan, GridError> {
        let grid = Grid::from_state(state, &self.config)?;
        Ok(self.plan_grid(&grid, memory, rng))
    }

    pub fn plan_grid<R: Rng>(&self, grid: &Grid, memory: &ExplorationMemory, rng: &mut R) -> TickPlan {
        let danger = ThreatAnalyzer::new(&self.config.threat).analyze(grid);

        // Candidates are scored with the widest blast among our units
        let radius = grid
            .units
            .iter()
            .filter(|u| u.is_active())
            .map(|u| u.bomb_range)
            .max()
            .unwrap_or(self.config.targeting.blast_radius);
        let candidates = find_candidates(grid, &danger, radius, &self.config);
        let assignments = assign_targets(grid, &danger, &candidates, memory, &self.config, rng);

        let unsafe_cells = danger
            .iter()
            .filter(|&(_, &level)| level >= self.config.safety.safe_danger)
            .count();
        debug!(
            "Planning {} units: {} danger cells ({} unsafe), {} candidates",
            assignments.len(),
            danger.len(),
            unsafe_cells,
            candidates.len()
        );

        let synthesizer = Synthesizer::new(grid, &danger, &self.config);
        let mut commands = CommandBatch::default();
        let mut decisions = Vec::new();

        // BTreeMap iteration keeps the unit-id order used during assignment
        for (id, assignment) in assignments.iter() {
            let unit = match grid.unit(id) {
                Some(unit) => unit,
                None => continue,
            };
            let plan = synthesizer.plan_unit(unit, assignment, memory, rng);

            let violations = check_command(grid, &plan.command, &self.config);
            if !violations.is_empty() {
                // Never ship an invalid command; standing still is always legal
                warn!("Unit {}: discarding {:?} command: {}", id, plan.branch, violations.join("; "));
                commands.bombers.push(BomberCommand::idle(id, unit.pos));
                decisions.push(Decision {
                    id: id.clone(),
                    branch: Branch::Idle,
                });
                continue;
            }

            if let Assignment::Attack(candidate) = assignment {
                if !plan.command.bombs.is_empty() {
                    info!(
                        "Unit {}: bomb at ({}, {}) for score {}",
                        id, candidate.pos.x, candidate.pos.y, candidate.score
                    );
                }
            }

            commands.bombers.push(plan.command);
            decisions.push(Decision {
                id: id.clone(),
                branch: plan.branch,
            });
        }

        TickPlan { commands, decisions }
    }
}

/// Lists everything wrong with a command; empty means the command is valid
pub fn check_command(grid: &Grid, command: &BomberCommand, config: &Config) -> Vec<String> {
    let mut problems = Vec::new();

    let unit = match grid.unit(&command.id) {
        Some(unit) => unit,
        None => {
            problems.push(format!("unknown unit '{}'", command.id));
            return problems;
        }
    };

    match command.path.first() {
        None => problems.push("empty path".to_string()),
        Some(first) if *first != unit.pos => problems.push(format!(
            "path starts at ({}, {}) instead of ({}, {})",
            first.x, first.y, unit.pos.x, unit.pos.y
        )),
        Some(_) => {}
    }

    if command.path.len() > config.paths.max_path_len {
        problems.push(format!(
            "path has {} cells, limit is {}",
            command.path.len(),
            config.paths.max_path_len
        ));
    }

    for pair in command.path.windows(2) {
        if !pair[0].is_adjacent(&pair[1]) {
            problems.push(format!(
                "({}, {}) -> ({}, {}) is not a single step",
                pair[0].x, pair[0].y, pair[1].x, pair[1].y
            ));
        }
    }

    for cell in &command.path {
        if !grid.in_bounds(cell) {
            problems.push(format!("({}, {}) is off the map", cell.x, cell.y));
        }
    }

    if command.bombs.len() > config.movement.max_bombs_per_command {
        problems.push(format!("{} bombs in one command", command.bombs.len()));
    }
    for bomb in &command.bombs {
        if !command.path.contains(bomb) {
            problems.push(format!("bomb at ({}, {}) is not on the path", bomb.x, bomb.y));
        }
    }

    problems
}
