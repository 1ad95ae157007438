use crate::config::EngineConfig;
use crate::error::{Result, TaskError};
use crate::task::graph::{DependencyEdge, DependencyGraph};
use crate::task::search::{SearchIndex, index_words};
use crate::task::store::TaskStore;
use crate::task::types::{Task, TaskId};
use std::collections::BTreeSet;
use tracing::debug;

/// The three structures every command mutates.
///
/// The store owns task records; the index and the graph refer to tasks by id
/// only. Helpers here keep the inverse `dependencies`/`dependents` sets of
/// the store in step with the graph edges.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub store: TaskStore,
    pub index: SearchIndex,
    pub graph: DependencyGraph,
    min_word_len: usize,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            store: TaskStore::with_capacity(config.initial_buckets, config.load_factor),
            index: SearchIndex::new(),
            graph: DependencyGraph::new(),
            min_word_len: config.min_word_len,
        }
    }

    pub fn task(&self, id: &TaskId) -> Result<&Task> {
        self.store
            .get(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    /// Distinct indexable words of a task
    pub fn words_of(&self, task: &Task) -> BTreeSet<String> {
        task.searchable_text()
            .flat_map(|text| index_words(text, self.min_word_len))
            .collect()
    }

    pub fn index_task(&mut self, task: &Task) {
        for word in self.words_of(task) {
            self.index.insert(&word, &task.id);
        }
    }

    pub fn deindex_task(&mut self, task: &Task) {
        for word in self.words_of(task) {
            self.index.delete(&word, &task.id);
        }
    }

    /// Insert a task without edges: store, then index, then graph
    pub fn insert_detached(&mut self, task: Task) {
        let id = task.id.clone();
        let rank = task.sequence;
        let words = self.words_of(&task);

        self.store.put(id.clone(), task);
        for word in words {
            self.index.insert(&word, &id);
        }
        self.graph.add_task_with_rank(&id, rank);
    }

    /// Remove a task and every edge touching it: graph, then index, then store.
    ///
    /// Returns the task as it was before removal (its dependency sets intact)
    /// together with the edges that were dropped.
    pub fn remove_with_edges(&mut self, id: &TaskId) -> Result<(Task, Vec<DependencyEdge>)> {
        let task = self.task(id)?.clone();

        let edges = self.graph.remove_task(id);
        self.deindex_task(&task);
        self.store.remove(id);

        for dep in &task.dependencies {
            if let Some(other) = self.store.get_mut(dep) {
                other.dependents.remove(id);
            }
        }
        for dependent in &task.dependents {
            if let Some(other) = self.store.get_mut(dependent) {
                other.dependencies.remove(id);
            }
        }

        debug!("Removed task {} with {} edges", id, edges.len());
        Ok((task, edges))
    }

    /// Re-insert a task removed by [`remove_with_edges`](Self::remove_with_edges)
    pub fn restore_with_edges(&mut self, task: Task, edges: &[DependencyEdge]) -> Result<()> {
        let id = task.id.clone();
        for edge in edges {
            let other = if edge.from == id { &edge.to } else { &edge.from };
            if !self.store.contains(other) {
                return Err(TaskError::NotFound(other.clone()));
            }
        }

        self.insert_detached(task);
        for edge in edges {
            self.store_link(&edge.from, &edge.to);
            self.graph.add_dependency(&edge.from, &edge.to)?;
        }
        Ok(())
    }

    /// Add `from -> to`, rolling everything back if it closes a cycle
    pub fn link(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        if from == to {
            return Err(TaskError::SelfDependency(from.clone()));
        }
        self.task(from)?;
        self.task(to)?;

        self.store_link(from, to);
        if let Err(e) = self.graph.add_dependency(from, to) {
            self.store_unlink(from, to);
            return Err(e);
        }

        if self.graph.has_cycle() {
            self.graph.remove_dependency(from, to);
            self.store_unlink(from, to);
            return Err(TaskError::Cycle {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }

    /// Remove `from -> to`; false when the edge did not exist
    pub fn unlink(&mut self, from: &TaskId, to: &TaskId) -> bool {
        if !self.graph.has_edge(from, to) {
            return false;
        }
        self.store_unlink(from, to);
        self.graph.remove_dependency(from, to)
    }

    fn store_link(&mut self, from: &TaskId, to: &TaskId) {
        if let Some(task) = self.store.get_mut(from) {
            task.dependents.insert(to.clone());
        }
        if let Some(task) = self.store.get_mut(to) {
            task.dependencies.insert(from.clone());
        }
    }

    fn store_unlink(&mut self, from: &TaskId, to: &TaskId) {
        if let Some(task) = self.store.get_mut(from) {
            task.dependents.remove(to);
        }
        if let Some(task) = self.store.get_mut(to) {
            task.dependencies.remove(from);
        }
    }

    /// Check every cross-structure invariant; returns a description of each violation
    pub fn integrity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for task in self.store.values() {
            if !self.graph.contains(&task.id) {
                issues.push(format!("Task {} missing from dependency graph", task.id));
            }
            for dep in &task.dependencies {
                match self.store.get(dep) {
                    Some(other) if other.dependents.contains(&task.id) => {}
                    Some(_) => issues.push(format!(
                        "Task {} depends on {} but is not listed as its dependent",
                        task.id, dep
                    )),
                    None => issues.push(format!(
                        "Task {} depends on missing task {}",
                        task.id, dep
                    )),
                }
                if !self.graph.has_edge(dep, &task.id) {
                    issues.push(format!("Edge {} -> {} missing from graph", dep, task.id));
                }
            }
            if self.graph.in_degree(&task.id) != Some(task.dependencies.len()) {
                issues.push(format!(
                    "In-degree of {} is {:?}, expected {}",
                    task.id,
                    self.graph.in_degree(&task.id),
                    task.dependencies.len()
                ));
            }
            for word in self.words_of(task) {
                if !self.index.search(&word).contains(&task.id) {
                    issues.push(format!("Word '{}' of task {} not indexed", word, task.id));
                }
            }
        }

        if self.graph.node_count() != self.store.len() {
            issues.push(format!(
                "Graph has {} nodes but store has {} tasks",
                self.graph.node_count(),
                self.store.len()
            ));
        }
        if self.graph.has_cycle() {
            issues.push("Dependency graph contains a cycle".to_string());
        }

        issues
    }
}
