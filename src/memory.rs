// Exploration memory carried between ticks
//
// The only planner state that survives a tick: cells our units have walked
// through and a short per-unit trail. Both only bias exploration; they never
// affect safety decisions.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::{CommandBatch, Position};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExplorationMemory {
    #[serde(default)]
    pub visited: HashSet<Position>,
    #[serde(default)]
    pub history: HashMap<String, VecDeque<Position>>,
}

impl ExplorationMemory {
    pub fn new() -> Self {
        ExplorationMemory::default()
    }

    pub fn clear(&mut self) {
        self.visited.clear();
        self.history.clear();
    }

    pub fn is_visited(&self, pos: &Position) -> bool {
        self.visited.contains(pos)
    }

    /// Whether `pos` is in the unit's recent trail
    pub fn recently_at(&self, unit_id: &str, pos: &Position) -> bool {
        self.history
            .get(unit_id)
            .map_or(false, |trail| trail.contains(pos))
    }

    /// Records every cell of every emitted path, keeping at most
    /// `history_len` cells per unit trail
    pub fn record(&mut self, batch: &CommandBatch, history_len: usize) {
        for command in &batch.bombers {
            let trail = self.history.entry(command.id.clone()).or_default();
            for cell in &command.path {
                self.visited.insert(*cell);
                if trail.back() != Some(cell) {
                    trail.push_back(*cell);
                }
            }
            while trail.len() > history_len {
                trail.pop_front();
            }
        }
    }
}
