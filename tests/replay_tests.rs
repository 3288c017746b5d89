// Integration tests for the replay module
//
// Tests the replay engine against a small fixture log:
// - Loading JSONL tick logs
// - Re-planning logged ticks with their seeds
// - Checking logged commands for invariant violations
// - Generating statistics

use bomber_arena_bot::config::Config;
use bomber_arena_bot::replay::ReplayEngine;
use bomber_arena_bot::synthesizer::Branch;
use bomber_arena_bot::types::Position;
use std::path::PathBuf;

/// Helper function to get the path to test fixtures
fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(filename)
}

fn engine() -> ReplayEngine {
    ReplayEngine::new(Config::default_hardcoded(), false)
}

#[test]
fn test_load_log_file() {
    let entries = engine()
        .load_log_file(fixture_path("ticks.jsonl"))
        .expect("Failed to load ticks.jsonl");

    assert_eq!(entries.len(), 4, "Expected 4 log entries");
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.tick, i as u64, "Tick number should match index");
        assert_eq!(entry.commands.bombers.len(), 1);
    }
    assert_eq!(entries[1].commands.bombers[0].bombs, vec![Position::new(3, 0)]);
}

#[test]
fn test_load_missing_file_is_error() {
    assert!(engine().load_log_file(fixture_path("does_not_exist.jsonl")).is_err());
}

#[test]
fn test_retreat_tick_replays_exactly() {
    let engine = engine();
    let entries = engine.load_log_file(fixture_path("ticks.jsonl")).unwrap();

    let result = engine.replay_entry(&entries[0]).unwrap();
    assert!(result.matches, "replayed {:?}", result.replayed);
    assert_eq!(result.decisions[0].branch, Branch::Retreat);
}

#[test]
fn test_attack_tick_replays_exactly() {
    let engine = engine();
    let entries = engine.load_log_file(fixture_path("ticks.jsonl")).unwrap();

    let result = engine.replay_entry(&entries[1]).unwrap();
    assert!(result.matches, "replayed {:?}", result.replayed);
    assert_eq!(result.decisions[0].branch, Branch::Attack);
}

#[test]
fn test_replay_all_reports_the_tampered_tick() {
    let engine = engine();
    let entries = engine.load_log_file(fixture_path("ticks.jsonl")).unwrap();

    let results = engine.replay_all(&entries);
    assert_eq!(results.len(), 4);
    let ticks: Vec<u64> = results.iter().map(|r| r.tick).collect();
    assert_eq!(ticks, vec![0, 1, 2, 3], "results should come back in tick order");

    let stats = engine.generate_stats(&results);
    assert_eq!(stats.total_ticks, 4);
    assert_eq!(stats.matches, 3);
    assert_eq!(stats.mismatches, 1);
    assert!(!results[3].matches);
}

#[test]
fn test_replay_specific_ticks() {
    let engine = engine();
    let entries = engine.load_log_file(fixture_path("ticks.jsonl")).unwrap();

    let results = engine.replay_ticks(&entries, &[2]).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].matches);

    assert!(engine.replay_ticks(&entries, &[40]).is_err());
}

#[test]
fn test_check_all_finds_only_invalid_commands() {
    let engine = engine();
    let entries = engine.load_log_file(fixture_path("ticks.jsonl")).unwrap();

    let failures = engine.check_all(&entries);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].tick, 3);
    // A jump of two cells and a bomb off the path
    assert_eq!(failures[0].violations.len(), 2);
}

#[test]
fn test_empty_stats() {
    let stats = engine().generate_stats(&[]);
    assert_eq!(stats.total_ticks, 0);
    assert_eq!(stats.match_rate, 0.0);
}
