// Library exports for the bomber arena bot
// This allows the replay tool and integration tests to use the core planner

pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod grid;
pub mod memory;
pub mod passability;
pub mod pathfinding;
pub mod planner;
pub mod replay;
pub mod synthesizer;
pub mod targeting;
pub mod threat;
pub mod types;
