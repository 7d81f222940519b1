//! Resumable A* over an abstract search graph.
//!
//! The open set, scores and parent links live in the search object, so
//! the search can stop after a fixed number of node expansions and pick
//! up exactly where it left off on the next call.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::map::GameMap;

/// Outcome of one bounded search increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    /// Budget for this call spent; call again.
    Pending,
    /// Goal reached; the path can be reconstructed.
    Completed,
    /// Open set exhausted or tries used up. Final.
    PathNotFound,
}

/// Work bounds shared by every search back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Node expansions per call.
    pub iterations_per_call: u32,
    /// Calls allowed before the search gives up.
    pub max_tries: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            iterations_per_call: 10_000,
            max_tries: 20,
        }
    }
}

/// Graph adapter consumed by [`ResumableAStar`].
pub(crate) trait SearchGraph: Send {
    /// Node identifier. `Ord` provides deterministic tie-breaking.
    type Node: Copy + Eq + Hash + Ord + Send + std::fmt::Debug;

    /// Append the neighbours of `node` to `out`.
    fn neighbors(&self, map: &dyn GameMap, node: Self::Node, out: &mut Vec<Self::Node>);

    /// Cost of entering `node`, `None` if impassable.
    fn entry_cost(&self, map: &dyn GameMap, node: Self::Node) -> Option<u32>;

    /// Admissible estimate of the remaining cost.
    fn heuristic(&self, map: &dyn GameMap, from: Self::Node, to: Self::Node) -> u32;
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode<N> {
    /// f_score = g_score + heuristic
    f_score: u32,
    node: N,
}

impl<N: Ord> Ord for OpenNode<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            // Deterministic tie-breaking: prefer the lower node
            Ordering::Equal => other.node.cmp(&self.node),
            ord => ord,
        }
    }
}

impl<N: Ord> PartialOrd for OpenNode<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search that can be advanced a bounded amount at a time.
pub(crate) struct ResumableAStar<G: SearchGraph> {
    graph: G,
    start: G::Node,
    goal: G::Node,
    open_set: BinaryHeap<OpenNode<G::Node>>,
    came_from: HashMap<G::Node, G::Node>,
    g_score: HashMap<G::Node, u32>,
    closed: HashSet<G::Node>,
    limits: SearchLimits,
    tries_used: u32,
    status: SearchStatus,
    scratch: Vec<G::Node>,
}

impl<G: SearchGraph> ResumableAStar<G> {
    pub(crate) fn new(
        graph: G,
        map: &dyn GameMap,
        start: G::Node,
        goal: G::Node,
        limits: SearchLimits,
    ) -> Self {
        let mut open_set = BinaryHeap::new();
        let mut g_score = HashMap::new();
        g_score.insert(start, 0);
        open_set.push(OpenNode {
            f_score: graph.heuristic(map, start, goal),
            node: start,
        });

        Self {
            graph,
            start,
            goal,
            open_set,
            came_from: HashMap::new(),
            g_score,
            closed: HashSet::new(),
            limits,
            tries_used: 0,
            status: SearchStatus::Pending,
            scratch: Vec::with_capacity(8),
        }
    }

    pub(crate) fn graph(&self) -> &G {
        &self.graph
    }

    /// Expand up to `iterations_per_call` nodes.
    pub(crate) fn step(&mut self, map: &dyn GameMap) -> SearchStatus {
        if self.status != SearchStatus::Pending {
            return self.status;
        }
        if self.tries_used >= self.limits.max_tries {
            self.status = SearchStatus::PathNotFound;
            return self.status;
        }
        self.tries_used += 1;

        for _ in 0..self.limits.iterations_per_call {
            let Some(current) = self.open_set.pop() else {
                self.status = SearchStatus::PathNotFound;
                return self.status;
            };

            if current.node == self.goal {
                self.status = SearchStatus::Completed;
                return self.status;
            }

            // Stale heap entries for already-expanded nodes
            if !self.closed.insert(current.node) {
                continue;
            }

            self.expand(map, current.node);
        }

        if self.tries_used >= self.limits.max_tries {
            self.status = SearchStatus::PathNotFound;
        }
        self.status
    }

    fn expand(&mut self, map: &dyn GameMap, node: G::Node) {
        let current_g = self.g_score.get(&node).copied().unwrap_or(u32::MAX);

        self.scratch.clear();
        self.graph.neighbors(map, node, &mut self.scratch);

        for i in 0..self.scratch.len() {
            let neighbor = self.scratch[i];
            if self.closed.contains(&neighbor) {
                continue;
            }

            // Start and goal are always admissible: a ship may path onto
            // the shore tile it is landing on.
            let cost = match self.graph.entry_cost(map, neighbor) {
                Some(cost) => cost,
                None if neighbor == self.goal => 1,
                None => continue,
            };

            let tentative_g = current_g.saturating_add(cost);
            let neighbor_g = self.g_score.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                self.came_from.insert(neighbor, node);
                self.g_score.insert(neighbor, tentative_g);
                let h = self.graph.heuristic(map, neighbor, self.goal);
                self.open_set.push(OpenNode {
                    f_score: tentative_g.saturating_add(h),
                    node: neighbor,
                });
            }
        }
    }

    /// Nodes from start to goal inclusive. Empty unless completed.
    pub(crate) fn reconstruct_path(&self) -> Vec<G::Node> {
        if self.status != SearchStatus::Completed {
            return Vec::new();
        }

        let mut path = vec![self.goal];
        let mut current = self.goal;
        while let Some(&prev) = self.came_from.get(&current) {
            path.push(prev);
            current = prev;
        }
        debug_assert_eq!(current, self.start);

        path.reverse();
        path
    }
}
