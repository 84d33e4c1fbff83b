use std::{collections::VecDeque, time::Duration};

/// Upper bound on how long an idle task may wait before running anyway
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TaskHandle(u64);

/// Deferred work requested from the host runtime.
///
/// The scheduler only hands out handles. When a task is due, the host passes
/// its handle back to whoever scheduled it.
pub trait Scheduler {
    /// Runs when the host has nothing better to do, or after `timeout`
    fn schedule_idle(&mut self, timeout: Option<Duration>) -> TaskHandle;

    /// Runs right after the next frame is painted
    fn schedule_frame(&mut self) -> TaskHandle;

    /// Cancelling a task that already ran or was already cancelled is a no-op
    fn cancel(&mut self, task: TaskHandle);
}

/// Cooperative event loop: pending frame tasks always run before idle tasks,
/// each kind in the order it was scheduled
#[derive(Debug, Default)]
pub struct LocalScheduler {
    next_handle: u64,
    frames: VecDeque<TaskHandle>,
    idle: VecDeque<TaskHandle>,
}

impl LocalScheduler {
    pub fn new() -> LocalScheduler {
        LocalScheduler::default()
    }

    fn handle(&mut self) -> TaskHandle {
        let res = TaskHandle(self.next_handle);
        self.next_handle += 1;
        res
    }

    pub fn pop_ready(&mut self) -> Option<TaskHandle> {
        self.frames.pop_front().or_else(|| self.idle.pop_front())
    }

    pub fn pending(&self) -> usize {
        self.frames.len() + self.idle.len()
    }
}

impl Scheduler for LocalScheduler {
    fn schedule_idle(&mut self, timeout: Option<Duration>) -> TaskHandle {
        let task = self.handle();
        tracing::trace!(?task, ?timeout, "scheduling idle task");
        self.idle.push_back(task);
        task
    }

    fn schedule_frame(&mut self) -> TaskHandle {
        let task = self.handle();
        tracing::trace!(?task, "scheduling frame task");
        self.frames.push_back(task);
        task
    }

    fn cancel(&mut self, task: TaskHandle) {
        self.frames.retain(|t| *t != task);
        self.idle.retain(|t| *t != task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_run_before_idle_tasks() {
        let mut sched = LocalScheduler::new();
        let i1 = sched.schedule_idle(None);
        let f1 = sched.schedule_frame();
        let i2 = sched.schedule_idle(Some(IDLE_TIMEOUT));
        let f2 = sched.schedule_frame();
        assert_eq!(sched.pending(), 4);

        let order = std::iter::from_fn(|| sched.pop_ready()).collect::<Vec<_>>();
        assert_eq!(order, vec![f1, f2, i1, i2]);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn cancelled_tasks_never_run() {
        let mut sched = LocalScheduler::new();
        let i1 = sched.schedule_idle(None);
        let f1 = sched.schedule_frame();
        sched.cancel(f1);
        sched.cancel(f1);
        assert_eq!(sched.pop_ready(), Some(i1));
        assert_eq!(sched.pop_ready(), None);
    }
}
