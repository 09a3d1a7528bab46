//! Cancellable delayed tasks.
//!
//! The round machine never holds closures. It asks a `Scheduler` to deliver a
//! small `Copy` task value after a delay and keeps the returned `TaskId`.
//! Whoever drives the scheduler hands fired `(TaskId, task)` pairs back to the
//! machine, which drops any id it is no longer holding.

use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

pub trait Scheduler<T> {
    /// Deliver `task` once, `after_ms` from now.
    fn schedule(&mut self, after_ms: u32, task: T) -> TaskId;
    /// Prevent a scheduled task from firing. Unknown ids are ignored.
    fn cancel(&mut self, id: TaskId);
    /// Release bookkeeping for a task that has just fired.
    fn retire(&mut self, _id: TaskId) {}
}

// --- Deterministic virtual-time scheduler -----------------------------------

struct Pending<T> {
    id: TaskId,
    due_ms: u64,
    task: T,
}

/// Virtual clock used by tests and anything that wants to step time by hand.
pub struct ManualScheduler<T> {
    now_ms: u64,
    next_id: u64,
    queue: Vec<Pending<T>>,
}

impl<T> Default for ManualScheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            queue: Vec::new(),
        }
    }
}

impl<T: Copy> ManualScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.queue.iter().any(|p| p.id == id)
    }

    /// Pop the earliest task due at or before `until_ms`, moving the clock to
    /// its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TaskId, T)> {
        let idx = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due_ms <= until_ms)
            .min_by_key(|(_, p)| (p.due_ms, p.id))
            .map(|(i, _)| i)?;
        let p = self.queue.remove(idx);
        self.now_ms = self.now_ms.max(p.due_ms);
        Some((p.id, p.task))
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}

impl<T: Copy> Scheduler<T> for ManualScheduler<T> {
    fn schedule(&mut self, after_ms: u32, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push(Pending {
            id,
            due_ms: self.now_ms + after_ms as u64,
            task,
        });
        id
    }

    fn cancel(&mut self, id: TaskId) {
        self.queue.retain(|p| p.id != id);
    }
}

// --- Browser timers ----------------------------------------------------------

pub type Dispatch<T> = Rc<dyn Fn(TaskId, T)>;

/// `setTimeout`-backed scheduler. Dropping a gloo `Timeout` clears it, so
/// cancelling is just removing it from the map.
pub struct WebScheduler<T> {
    next_id: u64,
    timers: HashMap<TaskId, Timeout>,
    dispatch: Dispatch<T>,
}

impl<T: Copy + 'static> WebScheduler<T> {
    pub fn new(dispatch: Dispatch<T>) -> Self {
        Self {
            next_id: 0,
            timers: HashMap::new(),
            dispatch,
        }
    }

    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }
}

impl<T: Copy + 'static> Scheduler<T> for WebScheduler<T> {
    fn schedule(&mut self, after_ms: u32, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let dispatch = self.dispatch.clone();
        let timer = Timeout::new(after_ms, move || dispatch(id, task));
        self.timers.insert(id, timer);
        id
    }

    fn cancel(&mut self, id: TaskId) {
        // drop => clearTimeout
        self.timers.remove(&id);
    }

    fn retire(&mut self, id: TaskId) {
        // Clearing an already-fired timeout is a no-op; this only frees the closure.
        self.timers.remove(&id);
    }
}
