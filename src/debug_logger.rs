// Debug logging module for asynchronous tick logging
//
// Fire-and-forget async logging so the request/response cycle never waits on
// disk. Each tick's snapshot, seed, memory and commands are written to a JSONL
// file that the replay tool can re-run exactly.

use log::error;
use serde::Serialize;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::memory::ExplorationMemory;
use crate::planner::Decision;
use crate::types::{ArenaState, CommandBatch};

/// Represents a single debug log entry
#[derive(Debug, Serialize)]
struct DebugLogEntry {
    tick: u64,
    seed: u64,
    state: ArenaState,
    memory: ExplorationMemory,
    commands: CommandBatch,
    decisions: Vec<Decision>,
    timestamp: String,
}

/// Everything needed to reproduce one tick
pub struct TickRecord {
    pub tick: u64,
    pub seed: u64,
    pub state: ArenaState,
    /// Memory as it was before the tick was planned
    pub memory: ExplorationMemory,
    pub commands: CommandBatch,
    pub decisions: Vec<Decision>,
}

/// Shared debug logger state
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return DebugLogger::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                DebugLogger::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a planned tick asynchronously (fire-and-forget)
    pub fn log_tick(&self, record: TickRecord) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        tokio::spawn(async move {
            Self::write_entry(file_handle, record).await;
        });
    }

    /// Logs a planned tick and waits for the write to land
    pub async fn log_tick_now(&self, record: TickRecord) {
        if !self.enabled {
            return;
        }
        Self::write_entry(self.file.clone(), record).await;
    }

    async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, record: TickRecord) {
        let mut file_guard = file_handle.lock().await;

        if let Some(file) = file_guard.as_mut() {
            let entry = DebugLogEntry {
                tick: record.tick,
                seed: record.seed,
                state: record.state,
                memory: record.memory,
                commands: record.commands,
                decisions: record.decisions,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };

            match serde_json::to_string(&entry) {
                Ok(json_line) => {
                    let line_with_newline = format!("{}\n", json_line);
                    if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                        error!("Failed to write debug log entry: {}", e);
                    } else if let Err(e) = file.flush().await {
                        error!("Failed to flush debug log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize debug log entry: {}", e);
                }
            }
        }
    }
}
