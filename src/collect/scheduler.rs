//! Idle-task queue driven by a host-supplied millisecond clock.
//!
//! A task becomes runnable once `now >= not_before` (its debounce window has
//! elapsed). Its `deadline` is the idle timeout: runnable tasks are drained in
//! deadline order, and a debounce can never push `not_before` past it.

pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct ScheduledTask<T> {
    id: TaskId,
    task: T,
    not_before: Millis,
    deadline: Millis,
}

#[derive(Debug)]
pub struct IdleScheduler<T> {
    next_id: u64,
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for IdleScheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> IdleScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runnable at the next idle slot, guaranteed to run by `now + timeout`.
    pub fn request_idle_callback(&mut self, task: T, now: Millis, timeout: Millis) -> TaskId {
        self.push(task, now, now + timeout)
    }

    /// Runnable `debounce` ms from now; later `debounce` calls may push that
    /// back, but never past `now + max_wait`.
    pub fn request_debounced(&mut self, task: T, now: Millis, debounce: Millis, max_wait: Millis) -> TaskId {
        let deadline = now + max_wait;
        self.push(task, (now + debounce).min(deadline), deadline)
    }

    /// Restarts the debounce window of a pending task. Returns false when the task is gone.
    pub fn debounce(&mut self, id: TaskId, now: Millis, debounce: Millis) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(scheduled) => {
                scheduled.not_before = (now + debounce).min(scheduled.deadline);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Removes and returns the runnable task with the earliest deadline.
    pub fn next_ready(&mut self, now: Millis) -> Option<(TaskId, T)> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.not_before <= now)
            .min_by_key(|(_, t)| (t.deadline, t.id))
            .map(|(index, _)| index)?;
        let scheduled = self.tasks.remove(index);
        Some((scheduled.id, scheduled.task))
    }

    /// Earliest time at which some task becomes runnable.
    pub fn next_wake(&self) -> Option<Millis> {
        self.tasks.iter().map(|t| t.not_before).min()
    }

    fn push(&mut self, task: T, not_before: Millis, deadline: Millis) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            id,
            task,
            not_before,
            deadline,
        });
        id
    }
}
