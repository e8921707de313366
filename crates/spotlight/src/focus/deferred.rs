#![forbid(unsafe_code)]

//! Explicit deferred-task queue.
//!
//! Work that must not run inside the turn that triggered it (attaching
//! disappearance observation after a commit, ending pointer mode after the
//! hide debounce) is queued here with a due time and drained by the host at
//! a well-defined point via `FocusManager::tick`.
//!
//! Tasks with equal due times drain in scheduling order.

use std::collections::BTreeMap;

use web_time::Instant;

use super::tree::FocusId;

/// A unit of deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Start observing lifecycle changes of `id` and its ancestors.
    Observe(FocusId),
    /// The pointer-hide debounce window ended.
    PointerHideElapsed,
}

/// Time-ordered queue of [`DeferredTask`]s.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    entries: BTreeMap<(Instant, u64), DeferredTask>,
    next_seq: u64,
}

impl DeferredQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run once `due` has passed.
    pub fn schedule(&mut self, task: DeferredTask, due: Instant) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.insert((due, seq), task);
    }

    /// Drop every queued task matching `pred`. Returns how many were dropped.
    pub fn cancel(&mut self, mut pred: impl FnMut(&DeferredTask) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, task| !pred(task));
        before - self.entries.len()
    }

    /// Remove and return every task due at or before `now`, in order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<DeferredTask> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    /// Earliest due time, if any task is queued.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn drains_in_due_then_schedule_order() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(DeferredTask::PointerHideElapsed, t0 + Duration::from_millis(30));
        q.schedule(DeferredTask::Observe(1), t0);
        q.schedule(DeferredTask::Observe(2), t0);
        assert_eq!(q.len(), 3);
        assert_eq!(q.next_due(), Some(t0));

        assert_eq!(
            q.drain_due(t0),
            vec![DeferredTask::Observe(1), DeferredTask::Observe(2)]
        );
        assert!(q.drain_due(t0 + Duration::from_millis(10)).is_empty());
        assert_eq!(
            q.drain_due(t0 + Duration::from_millis(30)),
            vec![DeferredTask::PointerHideElapsed]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_by_predicate() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(DeferredTask::Observe(1), t0);
        q.schedule(DeferredTask::PointerHideElapsed, t0);
        q.schedule(DeferredTask::PointerHideElapsed, t0);
        assert_eq!(
            q.cancel(|t| *t == DeferredTask::PointerHideElapsed),
            2
        );
        assert_eq!(q.drain_due(t0), vec![DeferredTask::Observe(1)]);
    }
}
