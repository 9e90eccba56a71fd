//! The execution context handed to a thread's action.
//!
//! Instead of a process-wide "current thread", each dispatch passes the
//! running thread explicitly. An action reaches its own scheduling state
//! through [`ThreadContext::thread`] and the rest of the registry through
//! [`ThreadContext::scheduler`].

use crate::common::Phase;
use crate::components::thread::ThreadHandle;
use crate::engine::FrameScheduler;
use crate::time::FrameTime;

/// The per-tick callback of a thread.
pub type Action = Box<dyn FnMut(&ThreadContext)>;

/// What an action knows about the tick it runs in.
pub struct ThreadContext {
    thread: ThreadHandle,
    scheduler: FrameScheduler,
    time: FrameTime,
    phase: Phase,
}

impl ThreadContext {
    pub(crate) fn new(
        thread: ThreadHandle,
        scheduler: FrameScheduler,
        time: FrameTime,
        phase: Phase,
    ) -> Self {
        Self {
            thread,
            scheduler,
            time,
            phase,
        }
    }

    /// The thread being dispatched.
    pub fn thread(&self) -> &ThreadHandle {
        &self.thread
    }

    /// The scheduler running the dispatch. Threads created through it during
    /// a pass are first dispatched on the next pass.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn now(&self) -> f64 {
        self.time.now
    }

    /// The delta this thread's phase counts with.
    pub fn delta(&self) -> f64 {
        self.time.delta_for(self.phase.uses_fixed_step())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}
