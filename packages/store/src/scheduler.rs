//! Background social updates keyed by report id.
//!
//! Each report has at most one pending update. Scheduling again for the same
//! report replaces (and aborts) the earlier task. Finished tasks remove
//! themselves; the generation counter keeps a finishing task from removing
//! a newer task registered under the same id.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Scheduled {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Tasks {
    next_generation: u64,
    by_report: BTreeMap<String, Scheduled>,
}

/// Tracks delayed per-report tasks so they can be cancelled.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<Tasks>,
}

impl Scheduler {
    fn lock(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `make_task(generation)` after `delay`. The produced future must
    /// call [`Self::finish`] with the same generation when it is done.
    pub fn schedule<F, Fut>(&self, report_id: &str, delay: Duration, make_task: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Held while spawning so the task can't finish before it is
        // registered.
        let mut tasks = self.lock();
        let generation = tasks.next_generation;
        tasks.next_generation += 1;

        let task = make_task(generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        if let Some(previous) = tasks
            .by_report
            .insert(report_id.to_string(), Scheduled { generation, handle })
        {
            log::debug!("Replacing pending social update for report {report_id}");
            previous.handle.abort();
        }
    }

    /// Removes the entry for `report_id` if it still belongs to
    /// `generation`.
    pub fn finish(&self, report_id: &str, generation: u64) {
        let mut tasks = self.lock();
        if tasks
            .by_report
            .get(report_id)
            .is_some_and(|s| s.generation == generation)
        {
            tasks.by_report.remove(report_id);
        }
    }

    /// Aborts the pending task for `report_id`. Returns whether one was
    /// pending.
    pub fn cancel(&self, report_id: &str) -> bool {
        self.lock().by_report.remove(report_id).is_some_and(|s| {
            let pending = !s.handle.is_finished();
            s.handle.abort();
            pending
        })
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.lock()
            .by_report
            .values()
            .filter(|s| !s.handle.is_finished())
            .count()
    }

    /// Aborts every pending task.
    pub fn cancel_all(&self) {
        let mut tasks = self.lock();
        let count = tasks.by_report.len();
        for (_, scheduled) in std::mem::take(&mut tasks.by_report) {
            scheduled.handle.abort();
        }
        if count > 0 {
            log::debug!("Cancelled {count} pending social update(s)");
        }
    }
}
