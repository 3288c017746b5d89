// Grid pathfinding restricted to a passable-cell set
//
// Paths are returned start-inclusive, so a path of `n` cells takes `n - 1`
// steps and `max_len` bounds the cell count. Both strategies keep a closed
// set and break ties by insertion order, which keeps results deterministic.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::types::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    Bfs,
    AStar,
}

/// Finds a path from `start` to `goal` with the chosen strategy
pub fn find_path(
    strategy: PathStrategy,
    start: Position,
    goal: Position,
    passable: &HashSet<Position>,
    max_len: usize,
) -> Option<Vec<Position>> {
    match strategy {
        PathStrategy::Bfs => bfs(start, goal, passable, max_len),
        PathStrategy::AStar => a_star(start, goal, passable, max_len),
    }
}

/// Breadth-first search; shortest in steps on a unit-cost grid
pub fn bfs(
    start: Position,
    goal: Position,
    passable: &HashSet<Position>,
    max_len: usize,
) -> Option<Vec<Position>> {
    if !passable.contains(&goal) {
        return None;
    }
    find_nearest(start, passable, max_len, |cell| *cell == goal)
}

/// Breadth-first search for the closest cell satisfying `is_goal`.
/// `start` itself qualifies if it satisfies the predicate.
pub fn find_nearest<F>(
    start: Position,
    passable: &HashSet<Position>,
    max_len: usize,
    is_goal: F,
) -> Option<Vec<Position>>
where
    F: Fn(&Position) -> bool,
{
    if max_len == 0 || !passable.contains(&start) {
        return None;
    }
    if is_goal(&start) {
        return Some(vec![start]);
    }

    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut length: HashMap<Position, usize> = HashMap::new();
    let mut queue = VecDeque::new();

    length.insert(start, 1);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let cells = length[&current];
        if cells >= max_len {
            continue;
        }

        for next in current.neighbors().iter() {
            if !passable.contains(next) || length.contains_key(next) {
                continue;
            }
            length.insert(*next, cells + 1);
            came_from.insert(*next, current);

            if is_goal(next) {
                return Some(reconstruct(&came_from, *next));
            }
            queue.push_back(*next);
        }
    }

    None
}

/// Path to the reachable cell closest (Manhattan) to `goal`, for goals that
/// may lie beyond `max_len`. Ties go to the cell discovered first.
pub fn find_toward(
    start: Position,
    goal: Position,
    passable: &HashSet<Position>,
    max_len: usize,
) -> Option<Vec<Position>> {
    find_lowest(start, passable, max_len, |cell| cell.manhattan(&goal))
}

/// Breadth-first flood within `max_len` cells, returning the path to the
/// reachable cell with the smallest `key` (`start` included). Ties go to the
/// cell discovered first, so nearer cells win.
pub fn find_lowest<F, K>(
    start: Position,
    passable: &HashSet<Position>,
    max_len: usize,
    key: F,
) -> Option<Vec<Position>>
where
    F: Fn(&Position) -> K,
    K: Ord,
{
    if max_len == 0 || !passable.contains(&start) {
        return None;
    }

    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut length: HashMap<Position, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut best = (key(&start), start);

    length.insert(start, 1);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let cells = length[&current];
        if cells >= max_len {
            continue;
        }
        for next in current.neighbors().iter() {
            if !passable.contains(next) || length.contains_key(next) {
                continue;
            }
            length.insert(*next, cells + 1);
            came_from.insert(*next, current);
            let value = key(next);
            if value < best.0 {
                best = (value, *next);
            }
            queue.push_back(*next);
        }
    }

    Some(reconstruct(&came_from, best.1))
}

/// A* with a Manhattan heuristic, ordered by f = g + h then insertion order
pub fn a_star(
    start: Position,
    goal: Position,
    passable: &HashSet<Position>,
    max_len: usize,
) -> Option<Vec<Position>> {
    if max_len == 0 || !passable.contains(&start) || !passable.contains(&goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut g_score: HashMap<Position, usize> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open.push(Reverse((start.manhattan(&goal) as usize, seq, start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if !closed.insert(current) {
            continue;
        }
        if current == goal {
            return Some(reconstruct(&came_from, current));
        }

        let g = g_score[&current];
        // A neighbour would make the path g + 2 cells long
        if g + 2 > max_len {
            continue;
        }

        for next in current.neighbors().iter() {
            if !passable.contains(next) || closed.contains(next) {
                continue;
            }
            let tentative = g + 1;
            if g_score.get(next).map_or(true, |&known| tentative < known) {
                g_score.insert(*next, tentative);
                came_from.insert(*next, current);
                seq += 1;
                let f = tentative + next.manhattan(&goal) as usize;
                open.push(Reverse((f, seq, *next)));
            }
        }
    }

    None
}

fn reconstruct(came_from: &HashMap<Position, Position>, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
