//! Execution planning over pending tasks.
//!
//! Two independent planners:
//!
//! - [`Optimizer::schedule_greedy`] packs ready tasks into an hour budget by
//!   priority per hour. It is a single pass with no backtracking, so it does
//!   not always maximize the total priority packed (it is not a 0/1 knapsack
//!   solve).
//! - [`Optimizer::optimize_order`] finds a dependency-respecting order with
//!   minimum cumulative time using a DP over subsets. Cost is `O(2^n * n)`, so
//!   the task count is capped.

use crate::config::OPTIMIZER_HARD_LIMIT;
use crate::error::{Result, TaskError};
use crate::task::types::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Result of the greedy time-boxed packer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreedySchedule {
    pub schedule: Vec<Task>,
    pub total_time: f64,
    pub remaining_time: f64,
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    max_exact_tasks: usize,
}

impl Optimizer {
    pub fn new(max_exact_tasks: usize) -> Self {
        Self {
            max_exact_tasks: max_exact_tasks.min(OPTIMIZER_HARD_LIMIT),
        }
    }

    pub fn max_exact_tasks(&self) -> usize {
        self.max_exact_tasks
    }

    /// Pack `ready` tasks into `budget_hours`, best priority-per-hour first
    pub fn schedule_greedy(&self, ready: &[Task], budget_hours: f64) -> Result<GreedySchedule> {
        if !(budget_hours >= 0.0 && budget_hours.is_finite()) {
            return Err(TaskError::InvalidInput(format!(
                "available hours must be a non-negative number, got {}",
                budget_hours
            )));
        }

        let mut candidates: Vec<&Task> = ready.iter().collect();
        candidates.sort_by(|a, b| {
            b.value_density()
                .total_cmp(&a.value_density())
                .then_with(|| a.sequence.cmp(&b.sequence))
        });

        let mut schedule = Vec::new();
        let mut total_time = 0.0;
        let mut remaining_time = budget_hours;

        for task in candidates {
            if task.estimated_time <= remaining_time {
                remaining_time -= task.estimated_time;
                total_time += task.estimated_time;
                schedule.push(task.clone());
            } else {
                debug!(
                    "Skipping task {} ({}h) with {}h remaining",
                    task.id, task.estimated_time, remaining_time
                );
            }
        }

        info!(
            "Greedy schedule packed {} of {} ready tasks into {:.2}h",
            schedule.len(),
            ready.len(),
            total_time
        );

        Ok(GreedySchedule {
            schedule,
            total_time,
            remaining_time,
        })
    }

    /// Minimum-total-time order of `tasks` honouring dependencies among them.
    ///
    /// Dependencies on tasks outside `tasks` are ignored. Ties go to the
    /// order in which `tasks` is given.
    pub fn optimize_order(&self, tasks: &[Task]) -> Result<Vec<Task>> {
        let n = tasks.len();
        if n > self.max_exact_tasks {
            return Err(TaskError::TooManyTasks {
                count: n,
                limit: self.max_exact_tasks,
            });
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let index: HashMap<&TaskId, usize> =
            tasks.iter().enumerate().map(|(i, t)| (&t.id, i)).collect();
        let prerequisites: Vec<usize> = tasks
            .iter()
            .map(|task| {
                task.dependencies
                    .iter()
                    .filter_map(|dep| index.get(dep))
                    .fold(0usize, |mask, &i| mask | (1 << i))
            })
            .collect();

        let full = (1usize << n) - 1;
        let mut cost = vec![f64::INFINITY; full + 1];
        let mut last_task: Vec<Option<u8>> = vec![None; full + 1];
        cost[0] = 0.0;

        for mask in 0..full {
            if cost[mask].is_infinite() {
                continue;
            }
            for (i, task) in tasks.iter().enumerate() {
                let bit = 1 << i;
                if mask & bit != 0 || prerequisites[i] & mask != prerequisites[i] {
                    continue;
                }
                let next = mask | bit;
                let candidate = cost[mask] + task.estimated_time;
                if candidate < cost[next] {
                    cost[next] = candidate;
                    last_task[next] = Some(i as u8);
                }
            }
        }

        if cost[full].is_infinite() {
            return Err(TaskError::CycleDetected);
        }

        let mut order = Vec::with_capacity(n);
        let mut mask = full;
        while mask != 0 {
            let i = last_task[mask].ok_or(TaskError::CycleDetected)? as usize;
            order.push(tasks[i].clone());
            mask &= !(1 << i);
        }
        order.reverse();

        info!(
            "Optimized order over {} tasks, total {:.2}h",
            n, cost[full]
        );
        Ok(order)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::TaskSpec;

    fn task(title: &str, priority: u8, hours: f64, sequence: u64) -> Task {
        Task::new(TaskSpec::new(title, "", priority, hours), sequence)
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_greedy_picks_best_ratio_that_fits() {
        let ready = vec![
            task("X", 4, 3.0, 0),
            task("Y", 5, 2.0, 1),
            task("Z", 2, 5.0, 2),
        ];
        let result = Optimizer::default().schedule_greedy(&ready, 4.0).unwrap();

        assert_eq!(titles(&result.schedule), vec!["Y"]);
        assert_eq!(result.total_time, 2.0);
        assert_eq!(result.remaining_time, 2.0);
    }

    #[test]
    fn test_greedy_skips_and_continues() {
        let ready = vec![
            task("big", 5, 4.0, 0),
            task("small", 1, 1.0, 1),
            task("medium", 3, 2.0, 2),
        ];
        // ratios: big 1.25, medium 1.5, small 1.0
        let result = Optimizer::default().schedule_greedy(&ready, 3.0).unwrap();
        assert_eq!(titles(&result.schedule), vec!["medium", "small"]);
        assert_eq!(result.remaining_time, 0.0);
    }

    #[test]
    fn test_greedy_is_not_optimal() {
        // Greedy takes A first and then nothing else fits; B + C would pack 8.
        let ready = vec![
            task("A", 5, 2.1, 0),
            task("B", 4, 2.0, 1),
            task("C", 4, 2.0, 2),
        ];
        let result = Optimizer::default().schedule_greedy(&ready, 4.0).unwrap();
        let packed: u32 = result.schedule.iter().map(|t| t.priority as u32).sum();
        assert_eq!(titles(&result.schedule), vec!["A"]);
        assert_eq!(packed, 5);
        assert!(result.total_time <= 4.0);
    }

    #[test]
    fn test_greedy_rejects_bad_budget() {
        let optimizer = Optimizer::default();
        assert!(optimizer.schedule_greedy(&[], -1.0).is_err());
        assert!(optimizer.schedule_greedy(&[], f64::NAN).is_err());
        assert!(optimizer.schedule_greedy(&[], 0.0).unwrap().schedule.is_empty());
    }

    #[test]
    fn test_optimize_order_respects_dependencies() {
        let mut a = task("A", 3, 2.0, 0);
        let mut b = task("B", 3, 1.0, 1);
        let mut c = task("C", 3, 4.0, 2);
        // C -> A -> B
        a.dependencies.insert(c.id.clone());
        b.dependencies.insert(a.id.clone());
        c.dependents.insert(a.id.clone());
        a.dependents.insert(b.id.clone());

        let order = Optimizer::default()
            .optimize_order(&[a, b, c])
            .unwrap();
        assert_eq!(titles(&order), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_optimize_order_ignores_outside_dependencies() {
        let outside = task("done", 3, 1.0, 0);
        let mut a = task("A", 3, 1.0, 1);
        a.dependencies.insert(outside.id.clone());

        let order = Optimizer::default().optimize_order(&[a]).unwrap();
        assert_eq!(titles(&order), vec!["A"]);
    }

    #[test]
    fn test_optimize_order_rejects_large_input() {
        let tasks: Vec<Task> = (0..5).map(|i| task("t", 3, 1.0, i)).collect();
        let result = Optimizer::new(4).optimize_order(&tasks);
        assert!(matches!(
            result,
            Err(TaskError::TooManyTasks { count: 5, limit: 4 })
        ));
    }

    #[test]
    fn test_optimize_order_detects_cycle() {
        let mut a = task("A", 3, 1.0, 0);
        let mut b = task("B", 3, 1.0, 1);
        a.dependencies.insert(b.id.clone());
        b.dependencies.insert(a.id.clone());
        assert!(matches!(
            Optimizer::default().optimize_order(&[a, b]),
            Err(TaskError::CycleDetected)
        ));
    }

    #[test]
    fn test_hard_limit_caps_configuration() {
        assert_eq!(Optimizer::new(100).max_exact_tasks(), OPTIMIZER_HARD_LIMIT);
    }
}
