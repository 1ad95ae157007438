use crate::task::types::{Task, TaskId};
use tracing::debug;

const HASH_BASE: u64 = 31;

/// Chained hash table owning every task record.
///
/// Buckets are plain vectors of `(id, task)` pairs. The bucket array doubles
/// whenever the entry count exceeds `load_factor * bucket_count`.
#[derive(Debug, Clone)]
pub struct TaskStore {
    buckets: Vec<Vec<(TaskId, Task)>>,
    count: usize,
    load_factor: f64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_capacity(16, 0.75)
    }

    pub fn with_capacity(bucket_count: usize, load_factor: f64) -> Self {
        let bucket_count = bucket_count.max(1);
        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            count: 0,
            load_factor,
        }
    }

    /// Polynomial rolling hash of the id, reduced to a bucket index
    fn bucket_index(id: &TaskId, bucket_count: usize) -> usize {
        let hash = id
            .as_str()
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(HASH_BASE).wrapping_add(b as u64));
        (hash % bucket_count as u64) as usize
    }

    /// Insert or replace the task stored under `id`
    pub fn put(&mut self, id: TaskId, task: Task) {
        let index = Self::bucket_index(&id, self.buckets.len());
        let bucket = &mut self.buckets[index];

        if let Some(entry) = bucket.iter_mut().find(|(key, _)| *key == id) {
            entry.1 = task;
            return;
        }

        bucket.push((id, task));
        self.count += 1;

        if self.count as f64 > self.load_factor * self.buckets.len() as f64 {
            self.resize();
        }
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        let index = Self::bucket_index(id, self.buckets.len());
        self.buckets[index]
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, task)| task)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        let index = Self::bucket_index(id, self.buckets.len());
        self.buckets[index]
            .iter_mut()
            .find(|(key, _)| key == id)
            .map(|(_, task)| task)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Remove and return the task stored under `id`
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = Self::bucket_index(id, self.buckets.len());
        let bucket = &mut self.buckets[index];
        let position = bucket.iter().position(|(key, _)| key == id)?;
        self.count -= 1;
        Some(bucket.swap_remove(position).1)
    }

    pub fn delete(&mut self, id: &TaskId) -> bool {
        self.remove(id).is_some()
    }

    pub fn values(&self) -> impl Iterator<Item = &Task> {
        self.buckets.iter().flatten().map(|(_, task)| task)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn resize(&mut self) {
        let new_count = self.buckets.len() * 2;
        let mut buckets: Vec<Vec<(TaskId, Task)>> = (0..new_count).map(|_| Vec::new()).collect();

        for (id, task) in self.buckets.drain(..).flatten() {
            let index = Self::bucket_index(&id, new_count);
            buckets[index].push((id, task));
        }

        self.buckets = buckets;
        debug!(
            "Task store resized to {} buckets ({} entries)",
            new_count, self.count
        );
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
