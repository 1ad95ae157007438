use crate::task::types::Task;
use std::cmp::Ordering;

/// Binary max-heap of tasks.
///
/// Higher priority is served first; equal priorities are served in creation
/// order (lower `sequence` first).
#[derive(Debug, Clone, Default)]
pub struct PriorityScheduler {
    heap: Vec<Task>,
}

/// `Greater` when `a` should be dequeued before `b`
fn precedence(a: &Task, b: &Task) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.sequence.cmp(&a.sequence))
}

impl PriorityScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks<I: IntoIterator<Item = Task>>(tasks: I) -> Self {
        let mut scheduler = Self::new();
        for task in tasks {
            scheduler.enqueue(task);
        }
        scheduler
    }

    pub fn enqueue(&mut self, task: Task) {
        self.heap.push(task);
        self.sift_up(self.heap.len() - 1);
    }

    pub fn dequeue(&mut self) -> Option<Task> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let top = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        top
    }

    pub fn peek(&self) -> Option<&Task> {
        self.heap.first()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain every task in dequeue order
    pub fn into_sorted_vec(mut self) -> Vec<Task> {
        let mut sorted = Vec::with_capacity(self.heap.len());
        while let Some(task) = self.dequeue() {
            sorted.push(task);
        }
        sorted
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if precedence(&self.heap[index], &self.heap[parent]) != Ordering::Greater {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;

            if left < len && precedence(&self.heap[left], &self.heap[best]) == Ordering::Greater {
                best = left;
            }
            if right < len && precedence(&self.heap[right], &self.heap[best]) == Ordering::Greater
            {
                best = right;
            }
            if best == index {
                break;
            }
            self.heap.swap(index, best);
            index = best;
        }
    }
}
