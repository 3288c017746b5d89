// Replay module for re-running logged ticks and auditing decisions
//
// This module provides functionality to:
// 1. Parse JSONL tick logs
// 2. Re-plan each tick with its logged seed and memory
// 3. Compare logged vs replayed command batches
// 4. Check logged commands against the command invariants
// 5. Generate summary reports

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::grid::Grid;
use crate::memory::ExplorationMemory;
use crate::planner::{check_command, Decision, Planner};
use crate::types::{ArenaState, CommandBatch};

/// Represents a single log entry from the tick JSONL file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogEntry {
    pub tick: u64,
    pub seed: u64,
    pub state: ArenaState,
    #[serde(default)]
    pub memory: ExplorationMemory,
    pub commands: CommandBatch,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub timestamp: String,
}

/// Result of replaying a single tick
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub tick: u64,
    pub original: CommandBatch,
    pub replayed: CommandBatch,
    pub matches: bool,
    pub decisions: Vec<Decision>,
    pub computation_time_us: u128,
}

/// Invariant violations found in one logged tick
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub tick: u64,
    pub violations: Vec<String>,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_ticks: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing tick logs
pub struct ReplayEngine {
    planner: Planner,
    verbose: bool,
}

impl ReplayEngine {
    /// Creates a new replay engine with the given configuration
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine {
            planner: Planner::new(config),
            verbose,
        }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file = File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Re-plans a logged tick with its own seed and memory
    pub fn replay_entry(&self, entry: &LogEntry) -> Result<ReplayResult, String> {
        let start_time = Instant::now();
        let mut rng = StdRng::seed_from_u64(entry.seed);
        let plan = self
            .planner
            .plan(&entry.state, &entry.memory, &mut rng)
            .map_err(|e| format!("Tick {}: {}", entry.tick, e))?;
        let computation_time_us = start_time.elapsed().as_micros();

        let matches = plan.commands == entry.commands;
        if self.verbose {
            if matches {
                info!("Tick {}: MATCH ({} commands, {}us)", entry.tick, plan.commands.bombers.len(), computation_time_us);
            } else {
                warn!("Tick {}: MISMATCH", entry.tick);
            }
        }

        Ok(ReplayResult {
            tick: entry.tick,
            original: entry.commands.clone(),
            replayed: plan.commands,
            matches,
            decisions: plan.decisions,
            computation_time_us,
        })
    }

    /// Replays all entries in parallel; ticks that fail to plan are skipped
    pub fn replay_all(&self, entries: &[LogEntry]) -> Vec<ReplayResult> {
        let mut results: Vec<ReplayResult> = entries
            .par_iter()
            .filter_map(|entry| match self.replay_entry(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Failed to replay: {}", e);
                    None
                }
            })
            .collect();
        results.sort_by_key(|r| r.tick);
        results
    }

    /// Replays specific ticks from a log file
    pub fn replay_ticks(&self, entries: &[LogEntry], ticks: &[u64]) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for tick in ticks {
            let entry = entries
                .iter()
                .find(|e| e.tick == *tick)
                .ok_or_else(|| format!("Tick {} not found in log file", tick))?;

            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Failed to replay: {}", e),
            }
        }

        Ok(results)
    }

    /// Checks every logged command against its tick's snapshot
    pub fn check_entry(&self, entry: &LogEntry) -> CheckResult {
        let config = self.planner.config();
        let violations = match Grid::from_state(&entry.state, config) {
            Ok(grid) => entry
                .commands
                .bombers
                .iter()
                .flat_map(|command| {
                    check_command(&grid, command, config)
                        .into_iter()
                        .map(move |problem| format!("{}: {}", command.id, problem))
                })
                .collect(),
            Err(e) => vec![format!("snapshot rejected: {}", e)],
        };
        CheckResult {
            tick: entry.tick,
            violations,
        }
    }

    /// Checks all entries in parallel, returning only ticks with violations
    pub fn check_all(&self, entries: &[LogEntry]) -> Vec<CheckResult> {
        let mut failures: Vec<CheckResult> = entries
            .par_iter()
            .map(|entry| self.check_entry(entry))
            .filter(|result| !result.violations.is_empty())
            .collect();
        failures.sort_by_key(|r| r.tick);
        failures
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_ticks = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_ticks - matches;
        let match_rate = if total_ticks > 0 {
            (matches as f64 / total_ticks as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_ticks,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Ticks:    {}", stats.total_ticks);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 =
                results.iter().map(|r| r.computation_time_us as f64).sum::<f64>() / results.len() as f64;
            println!("Average Planning Time:   {:.1}us\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!("Tick {}:", result.tick);
                for replayed in &result.replayed.bombers {
                    let original = result.original.bombers.iter().find(|c| c.id == replayed.id);
                    match original {
                        Some(original) if original == replayed => continue,
                        Some(original) => println!(
                            "  {}: {:?} bombs {:?} → {:?} bombs {:?}",
                            replayed.id, original.path, original.bombs, replayed.path, replayed.bombs
                        ),
                        None => println!("  {}: (not logged) → {:?}", replayed.id, replayed.path),
                    }
                }
                let decisions: Vec<String> = result
                    .decisions
                    .iter()
                    .map(|d| format!("{}={:?}", d.id, d.branch))
                    .collect();
                println!("  branches: {}", decisions.join(", "));
            }
            println!();
        }
    }
}
