//! registry::graph
//!
//! Dependency graph over module indices.
//!
//! # Architecture
//!
//! The graph is an adjacency list over arena indices (the registry owns the
//! modules; the graph only stores `usize` ids). It is populated during
//! registration, frozen after `validate()`, and read-only thereafter.
//!
//! # Invariants
//!
//! - The graph must be acyclic; `find_cycle` reports the offending path.
//! - Traversals and topological orders are deterministic: ties are broken
//!   by ascending node index (registration order).

use std::collections::BTreeSet;

/// Directed dependency graph: an edge `a -> b` means "a depends on b".
#[derive(Debug, Default)]
pub struct DepGraph {
    /// Direct dependencies of each node.
    deps: Vec<Vec<usize>>,
    /// Direct dependents of each node (reverse edges).
    dependents: Vec<Vec<usize>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self) -> usize {
        self.deps.push(Vec::new());
        self.dependents.push(Vec::new());
        self.deps.len() - 1
    }

    /// Record that `dependent` depends on `dependency`.
    pub fn add_edge(&mut self, dependent: usize, dependency: usize) {
        self.deps[dependent].push(dependency);
        self.dependents[dependency].push(dependent);
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// The transitive dependencies of `seeds`, including the seeds.
    pub fn dependencies_closure(&self, seeds: &[usize]) -> BTreeSet<usize> {
        self.closure(seeds, &self.deps)
    }

    /// The transitive dependents of `seeds`, including the seeds.
    pub fn dependents_closure(&self, seeds: &[usize]) -> BTreeSet<usize> {
        self.closure(seeds, &self.dependents)
    }

    fn closure(&self, seeds: &[usize], edges: &[Vec<usize>]) -> BTreeSet<usize> {
        let mut result: BTreeSet<usize> = seeds.iter().copied().collect();
        let mut queue: Vec<usize> = seeds.to_vec();
        while let Some(node) = queue.pop() {
            for &next in &edges[node] {
                if result.insert(next) {
                    queue.push(next);
                }
            }
        }
        result
    }

    /// Detect a dependency cycle, returning one offending path.
    ///
    /// The returned vector lists the nodes of the cycle in dependency order;
    /// the first node depends (transitively) on the last, which depends back
    /// on the first.
    pub fn find_cycle(&self) -> Option<Vec<usize>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        fn visit(
            node: usize,
            deps: &[Vec<usize>],
            marks: &mut [Mark],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            marks[node] = Mark::Grey;
            path.push(node);
            for &next in &deps[node] {
                match marks[next] {
                    Mark::Grey => {
                        let start = path.iter().position(|&n| n == next).unwrap_or(0);
                        return Some(path[start..].to_vec());
                    }
                    Mark::White => {
                        if let Some(cycle) = visit(next, deps, marks, path) {
                            return Some(cycle);
                        }
                    }
                    Mark::Black => {}
                }
            }
            path.pop();
            marks[node] = Mark::Black;
            None
        }

        let mut marks = vec![Mark::White; self.len()];
        let mut path = Vec::new();
        for node in 0..self.len() {
            if marks[node] == Mark::White {
                if let Some(cycle) = visit(node, &self.deps, &mut marks, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Topologically order `nodes` with dependencies first.
    ///
    /// Only edges between members of `nodes` are considered. Returns `None`
    /// when the induced subgraph contains a cycle.
    pub fn topo_dependencies_first(&self, nodes: &BTreeSet<usize>) -> Option<Vec<usize>> {
        self.topo(nodes, &self.deps, &self.dependents)
    }

    /// Topologically order `nodes` with dependents first.
    pub fn topo_dependents_first(&self, nodes: &BTreeSet<usize>) -> Option<Vec<usize>> {
        self.topo(nodes, &self.dependents, &self.deps)
    }

    /// Kahn's algorithm over the subgraph induced by `nodes`: a node is
    /// ready once all of its `blockers` inside the set are emitted.
    fn topo(
        &self,
        nodes: &BTreeSet<usize>,
        blockers: &[Vec<usize>],
        unblocks: &[Vec<usize>],
    ) -> Option<Vec<usize>> {
        let mut blocked_by: std::collections::BTreeMap<usize, usize> = nodes
            .iter()
            .map(|&n| {
                let count = blockers[n].iter().filter(|b| nodes.contains(b)).count();
                (n, count)
            })
            .collect();

        let mut ready: BTreeSet<usize> = blocked_by
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&n, _)| n)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(&node) = ready.iter().next() {
            ready.remove(&node);
            order.push(node);
            for &next in &unblocks[node] {
                if let Some(count) = blocked_by.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        (order.len() == nodes.len()).then_some(order)
    }
}
