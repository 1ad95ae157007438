use crate::error::{Result, TaskError};
use crate::task::types::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// A directed edge `from -> to`: `to` cannot start until `from` completes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub from: TaskId,
    pub to: TaskId,
}

/// Dependency graph over task ids.
///
/// Stores only ids; the task records live in the store. Every node carries a
/// rank (insertion order by default) and nodes are visited by rank, so
/// topological sorting is deterministic and a re-inserted node can take back
/// its original place.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<u64, TaskId>,
    ranks: HashMap<TaskId, u64>,
    adjacency: HashMap<TaskId, Vec<TaskId>>,
    in_degree: HashMap<TaskId, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node ranked after every existing node
    pub fn add_task(&mut self, id: &TaskId) {
        let rank = self.nodes.keys().next_back().map_or(0, |last| last + 1);
        self.add_task_with_rank(id, rank);
    }

    /// Add a node at an explicit rank; ranks must be unique
    pub fn add_task_with_rank(&mut self, id: &TaskId, rank: u64) {
        if self.adjacency.contains_key(id) {
            return;
        }
        debug_assert!(!self.nodes.contains_key(&rank), "duplicate graph rank {rank}");
        self.nodes.insert(rank, id.clone());
        self.ranks.insert(id.clone(), rank);
        self.adjacency.insert(id.clone(), Vec::new());
        self.in_degree.insert(id.clone(), 0);
    }

    /// Drop a node and every edge touching it; returns the removed edges
    pub fn remove_task(&mut self, id: &TaskId) -> Vec<DependencyEdge> {
        let Some(outgoing) = self.adjacency.remove(id) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for to in outgoing {
            if let Some(degree) = self.in_degree.get_mut(&to) {
                *degree -= 1;
            }
            removed.push(DependencyEdge {
                from: id.clone(),
                to,
            });
        }

        for (from, targets) in self.adjacency.iter_mut() {
            let before = targets.len();
            targets.retain(|to| to != id);
            for _ in targets.len()..before {
                removed.push(DependencyEdge {
                    from: from.clone(),
                    to: id.clone(),
                });
            }
        }

        self.in_degree.remove(id);
        if let Some(rank) = self.ranks.remove(id) {
            self.nodes.remove(&rank);
        }
        removed.sort();
        removed
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Append `from -> to` without any cycle check.
    ///
    /// Callers must check [`has_cycle`](Self::has_cycle) afterwards and roll
    /// back with [`remove_dependency`](Self::remove_dependency) on failure.
    pub fn add_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        if !self.contains(to) {
            return Err(TaskError::NotFound(to.clone()));
        }
        let targets = self
            .adjacency
            .get_mut(from)
            .ok_or_else(|| TaskError::NotFound(from.clone()))?;
        if targets.contains(to) {
            return Ok(());
        }
        targets.push(to.clone());
        *self.in_degree.entry(to.clone()).or_insert(0) += 1;
        Ok(())
    }

    pub fn remove_dependency(&mut self, from: &TaskId, to: &TaskId) -> bool {
        let Some(targets) = self.adjacency.get_mut(from) else {
            return false;
        };
        let Some(position) = targets.iter().position(|t| t == to) else {
            return false;
        };
        targets.remove(position);
        if let Some(degree) = self.in_degree.get_mut(to) {
            *degree -= 1;
        }
        true
    }

    pub fn has_edge(&self, from: &TaskId, to: &TaskId) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    pub fn in_degree(&self, id: &TaskId) -> Option<usize> {
        self.in_degree.get(id).copied()
    }

    pub fn successors(&self, id: &TaskId) -> &[TaskId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kahn's algorithm over a copy of the in-degree counters
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<&TaskId> = self
            .nodes
            .values()
            .filter(|id| in_degree.get(*id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            for next in self.successors(id) {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            debug!(
                "Topological sort stopped after {} of {} nodes",
                order.len(),
                self.nodes.len()
            );
            return Err(TaskError::CycleDetected);
        }
        Ok(order)
    }

    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_err()
    }

    /// Nodes without incoming edges, in rank order
    pub fn zero_in_degree(&self) -> Vec<TaskId> {
        self.nodes
            .values()
            .filter(|id| self.in_degree.get(*id) == Some(&0))
            .cloned()
            .collect()
    }

    /// Every edge, ordered by source rank then target rank
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .nodes
            .values()
            .flat_map(|from| {
                self.successors(from).iter().map(move |to| DependencyEdge {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect();
        edges.sort_by_key(|edge| (self.ranks.get(&edge.from), self.ranks.get(&edge.to)));
        edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(ids: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in ids {
            graph.add_task(&TaskId::from(*id));
        }
        graph
    }

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut g = graph(&["a", "b", "c", "d"]);
        g.add_dependency(&id("c"), &id("a")).unwrap();
        g.add_dependency(&id("a"), &id("b")).unwrap();
        g.add_dependency(&id("d"), &id("b")).unwrap();

        let order = g.topological_order().unwrap();
        assert_eq!(order, vec![id("c"), id("d"), id("a"), id("b")]);
    }

    #[test]
    fn test_in_degree_tracks_edges() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_dependency(&id("a"), &id("c")).unwrap();
        g.add_dependency(&id("b"), &id("c")).unwrap();
        g.add_dependency(&id("b"), &id("c")).unwrap();
        assert_eq!(g.in_degree(&id("c")), Some(2));
        assert_eq!(g.zero_in_degree(), vec![id("a"), id("b")]);

        assert!(g.remove_dependency(&id("a"), &id("c")));
        assert!(!g.remove_dependency(&id("a"), &id("c")));
        assert_eq!(g.in_degree(&id("c")), Some(1));
    }

    #[test]
    fn test_cycle_detected_without_mutating_graph() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_dependency(&id("a"), &id("b")).unwrap();
        g.add_dependency(&id("b"), &id("c")).unwrap();
        g.add_dependency(&id("c"), &id("a")).unwrap();

        assert!(g.has_cycle());
        assert!(matches!(g.topological_order(), Err(TaskError::CycleDetected)));
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.in_degree(&id("a")), Some(1));

        assert!(g.remove_dependency(&id("c"), &id("a")));
        assert!(!g.has_cycle());
        assert_eq!(g.topological_order().unwrap().len(), 3);
    }

    #[test]
    fn test_remove_task_drops_incident_edges() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_dependency(&id("a"), &id("b")).unwrap();
        g.add_dependency(&id("b"), &id("c")).unwrap();

        let removed = g.remove_task(&id("b"));
        assert_eq!(
            removed,
            vec![
                DependencyEdge { from: id("a"), to: id("b") },
                DependencyEdge { from: id("b"), to: id("c") },
            ]
        );
        assert_eq!(g.in_degree(&id("c")), Some(0));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_reinserted_node_keeps_rank() {
        let mut g = DependencyGraph::new();
        for (rank, name) in ["a", "b", "c"].iter().enumerate() {
            g.add_task_with_rank(&id(name), rank as u64);
        }
        g.remove_task(&id("a"));
        g.add_task_with_rank(&id("a"), 0);

        assert_eq!(g.topological_order().unwrap(), vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn test_unknown_nodes_rejected() {
        let mut g = graph(&["a"]);
        assert!(matches!(
            g.add_dependency(&id("a"), &id("zz")),
            Err(TaskError::NotFound(_))
        ));
        assert!(matches!(
            g.add_dependency(&id("zz"), &id("a")),
            Err(TaskError::NotFound(_))
        ));
    }
}
