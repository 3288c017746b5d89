// Configuration module for reading Arena.toml
// Every tunable threshold, cap and empirical constant of the planner lives here

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pathfinding::PathStrategy;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub threat: ThreatConfig,
    pub safety: SafetyConfig,
    pub paths: PathsConfig,
    pub targeting: TargetingConfig,
    pub movement: MovementConfig,
    pub grid: GridDefaultsConfig,
    pub timing: TimingConfig,
    pub debug: DebugConfig,
}

/// Danger levels and hazard shapes
#[derive(Debug, Deserialize, Clone)]
pub struct ThreatConfig {
    /// Bombs whose timer is at or below this are considered about to detonate
    pub imminent_timer: f64,
    pub bomb_center_danger: u8,
    pub blast_danger: u8,
    pub patrol_danger: u8,
    // Ghost: max(floor, peak - falloff * distance) within radius
    pub ghost_radius: f64,
    pub ghost_peak: f64,
    pub ghost_falloff: f64,
    pub ghost_floor: u8,
}

/// Danger thresholds driving the decision chain
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    /// Standing on a cell above this danger forces a retreat
    pub retreat_danger: u8,
    /// Cells strictly below this danger count as safe
    pub safe_danger: u8,
    /// Manhattan bound on how far a retreat may look for shelter
    pub retreat_search_radius: i32,
}

/// Path length caps (in cells, start included)
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    pub max_path_len: usize,
    pub retreat_max_len: usize,
    pub escape_max_len: usize,
    pub strategy: PathStrategy,
}

/// Target enumeration, scoring and exploration goal constants
#[derive(Debug, Deserialize, Clone)]
pub struct TargetingConfig {
    /// Blast radius assumed for units that do not report their own
    pub blast_radius: i32,
    /// Obstacles beyond this count add nothing to a candidate's score
    pub max_scored_obstacles: usize,
    pub enemy_hit_score: u32,
    pub corner_distance_weight: f64,
    pub visited_corner_penalty: f64,
    pub random_goal_attempts: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MovementConfig {
    /// Seconds of movement an exploration step budget covers
    pub dt_seconds: f64,
    pub default_speed: f64,
    pub max_bombs_per_command: usize,
    pub history_len: usize,
}

impl MovementConfig {
    /// Steps a unit may take while exploring this tick: max(1, floor(speed * dt))
    pub fn exploration_steps(&self, speed: f64) -> usize {
        let steps = (speed * self.dt_seconds).floor();
        if steps.is_finite() && steps >= 1.0 {
            steps as usize
        } else {
            1
        }
    }
}

/// Defaults for optional snapshot fields
#[derive(Debug, Deserialize, Clone)]
pub struct GridDefaultsConfig {
    pub default_bomb_range: i32,
    /// Timer given to bombs that report none: far enough out to never be imminent
    pub default_bomb_timer: f64,
    /// Largest accepted map side; bigger snapshots are rejected as malformed
    pub max_map_side: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub tick_budget_ms: u64,
    pub reuse_previous_on_timeout: bool,
    pub rng_seed: u64,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Arena.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Arena.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Arena.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Arena.toml
    pub fn default_hardcoded() -> Self {
        Config {
            threat: ThreatConfig {
                imminent_timer: 2.0,
                bomb_center_danger: 100,
                blast_danger: 80,
                patrol_danger: 60,
                ghost_radius: 10.0,
                ghost_peak: 70.0,
                ghost_falloff: 3.0,
                ghost_floor: 10,
            },
            safety: SafetyConfig {
                retreat_danger: 50,
                safe_danger: 30,
                retreat_search_radius: 8,
            },
            paths: PathsConfig {
                max_path_len: 30,
                retreat_max_len: 10,
                escape_max_len: 15,
                strategy: PathStrategy::AStar,
            },
            targeting: TargetingConfig {
                blast_radius: 1,
                max_scored_obstacles: 4,
                enemy_hit_score: 10,
                corner_distance_weight: 0.1,
                visited_corner_penalty: 5.0,
                random_goal_attempts: 64,
            },
            movement: MovementConfig {
                dt_seconds: 0.5,
                default_speed: 2.0,
                max_bombs_per_command: 1,
                history_len: 16,
            },
            grid: GridDefaultsConfig {
                default_bomb_range: 1,
                default_bomb_timer: 999.0,
                max_map_side: 256,
            },
            timing: TimingConfig {
                tick_budget_ms: 400,
                reuse_previous_on_timeout: false,
                rng_seed: 0x5eed,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "arena_ticks.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Arena.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
