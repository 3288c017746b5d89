// Bomber arena bot
//
// Owns everything that lives longer than one tick: configuration, exploration
// memory, the RNG that seeds each tick, and the last batch sent. Each tick is
// planned on the blocking pool under a wall-clock budget so a slow plan can
// never stall the server.

use log::{error, info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::debug_logger::{DebugLogger, TickRecord};
use crate::error::GridError;
use crate::memory::ExplorationMemory;
use crate::planner::{Planner, TickPlan};
use crate::types::{ArenaState, CommandBatch};

/// Bomber arena bot with one method per endpoint
pub struct Bot {
    config: Config,
    planner: Planner,
    memory: Mutex<ExplorationMemory>,
    rng: Mutex<StdRng>,
    previous: Mutex<Option<CommandBatch>>,
    tick: AtomicU64,
    logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `logger` - Tick logger, `DebugLogger::disabled()` when not needed
    pub fn new(config: Config, logger: DebugLogger) -> Self {
        info!("Seeding tick RNG with {}", config.timing.rng_seed);
        Bot {
            planner: Planner::new(config.clone()),
            rng: Mutex::new(StdRng::seed_from_u64(config.timing.rng_seed)),
            memory: Mutex::new(ExplorationMemory::new()),
            previous: Mutex::new(None),
            tick: AtomicU64::new(0),
            logger,
            config,
        }
    }

    /// Returns bot metadata
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "strategy": self.config.paths.strategy,
        })
    }

    /// Called when a round starts; forgets everything from the last round
    /// Corresponds to POST /start endpoint
    pub fn start(&self) {
        info!("ROUND START");
        self.memory.lock().clear();
        *self.previous.lock() = None;
        self.tick.store(0, Ordering::SeqCst);
    }

    /// Called when a round ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self) {
        let ticks = self.tick.load(Ordering::SeqCst);
        let visited = self.memory.lock().visited.len();
        info!("ROUND OVER after {} ticks, {} cells visited", ticks, visited);
    }

    pub fn memory_snapshot(&self) -> ExplorationMemory {
        self.memory.lock().clone()
    }

    /// Plans one tick within the configured time budget
    /// Corresponds to POST /plan endpoint
    ///
    /// 1. Draws a fresh seed for this tick and snapshots exploration memory
    /// 2. Runs the planner on the blocking pool under `tick_budget_ms`
    /// 3. On success records the batch into memory and the tick log
    ///
    /// A timed-out tick answers with an empty batch, or with the previous
    /// batch when `reuse_previous_on_timeout` is set.
    pub async fn plan_tick(&self, state: ArenaState) -> Result<CommandBatch, GridError> {
        let start_time = Instant::now();
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let seed: u64 = self.rng.lock().random();
        let memory = self.memory_snapshot();

        let planner = self.planner.clone();
        let task_state = state.clone();
        let task_memory = memory.clone();
        let budget = Duration::from_millis(self.config.timing.tick_budget_ms);

        let handle = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            planner.plan(&task_state, &task_memory, &mut rng)
        });

        let plan: TickPlan = match tokio::time::timeout(budget, handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                error!("Tick {}: planner task failed: {}", tick, join_error);
                return Ok(self.fallback_batch());
            }
            Err(_) => {
                warn!(
                    "Tick {}: planning exceeded {}ms budget",
                    tick, self.config.timing.tick_budget_ms
                );
                return Ok(self.fallback_batch());
            }
        };

        self.memory
            .lock()
            .record(&plan.commands, self.config.movement.history_len);
        *self.previous.lock() = Some(plan.commands.clone());

        info!(
            "Tick {}: {} commands in {}ms",
            tick,
            plan.commands.bombers.len(),
            start_time.elapsed().as_millis()
        );

        self.logger.log_tick(TickRecord {
            tick,
            seed,
            state,
            memory,
            commands: plan.commands.clone(),
            decisions: plan.decisions,
        });

        Ok(plan.commands)
    }

    fn fallback_batch(&self) -> CommandBatch {
        if self.config.timing.reuse_previous_on_timeout {
            if let Some(previous) = self.previous.lock().clone() {
                return previous;
            }
        }
        CommandBatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use serde_json::json;

    fn open_map_state() -> ArenaState {
        serde_json::from_value(json!({
            "map_size": [10, 10],
            "arena": {"obstacles": [], "walls": [], "bombs": []},
            "bombers": [{
                "id": "a", "alive": true, "pos": [0, 0], "armor": 0,
                "bombs_available": 1, "can_move": true, "safe_time": 0
            }],
            "enemies": [],
            "mobs": []
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_plan_tick_records_memory() {
        let bot = Bot::new(Config::default_hardcoded(), DebugLogger::disabled());
        let batch = bot.plan_tick(open_map_state()).await.unwrap();
        assert_eq!(batch.bombers.len(), 1);
        assert_eq!(batch.bombers[0].path[0], Position::new(0, 0));

        let memory = bot.memory_snapshot();
        for cell in &batch.bombers[0].path {
            assert!(memory.is_visited(cell));
        }

        bot.start();
        assert!(bot.memory_snapshot().visited.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_an_error() {
        let bot = Bot::new(Config::default_hardcoded(), DebugLogger::disabled());
        let mut state = open_map_state();
        state.map_size = None;
        assert!(bot.plan_tick(state).await.is_err());
    }

    #[tokio::test]
    async fn test_same_seed_same_plans() {
        let first = Bot::new(Config::default_hardcoded(), DebugLogger::disabled());
        let second = Bot::new(Config::default_hardcoded(), DebugLogger::disabled());
        for _ in 0..3 {
            let a = first.plan_tick(open_map_state()).await.unwrap();
            let b = second.plan_tick(open_map_state()).await.unwrap();
            assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn test_zero_budget_falls_back() {
        let mut config = Config::default_hardcoded();
        config.timing.tick_budget_ms = 0;
        let bot = Bot::new(config, DebugLogger::disabled());
        // With no budget the planner may or may not win the race; either
        // answer must be well formed
        let batch = bot.plan_tick(open_map_state()).await.unwrap();
        assert!(batch.bombers.len() <= 1);
    }
}
