//! The thread state machine.
//!
//! A thread is a timed callback bound to one [`Phase`]. Its active window is
//! stored as absolute clock timestamps; the public accessors expose views
//! relative to the scheduler's current time. States run
//! `NotStarted -> Running -> Ended`, with `paused` and `waiting` as flags
//! layered over `Running`.

use crate::common::{ListenerId, Phase};
use crate::components::properties::{Properties, Property};
use crate::context::{Action, ThreadContext};
use crate::error::{Result, ThreadError};
use crate::events::{panic_message, Hooks, ThreadEvent};
use crate::time::Clock;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, error};

#[derive(Debug, Clone)]
struct ThreadState {
    start_at: f64,
    end_at: f64,
    started: bool,
    ended: bool,
    paused: bool,
    wait_remaining: f64,
    destroy_when_ended: bool,
}

struct Thread {
    name: String,
    phase: Phase,
    clock: Clock,
    state: RefCell<ThreadState>,
    properties: RefCell<Properties>,
    action: RefCell<Option<Action>>,
    hooks: Hooks,
}

/// A shared handle to a registered thread.
///
/// Handles are cheap to clone and all clones refer to the same thread. A
/// handle stays usable after its thread leaves the registry, but the
/// scheduler no longer dispatches it.
#[derive(Clone)]
pub struct ThreadHandle(Rc<Thread>);

impl ThreadHandle {
    /// Creates a thread whose window opens `start_offset` seconds after the
    /// clock's current time and stays open for `duration` seconds.
    ///
    /// Threads are created through the scheduler, which also registers them.
    pub(crate) fn new(
        name: impl Into<String>,
        phase: Phase,
        clock: Clock,
        start_offset: f64,
        duration: f64,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Self {
        let start_at = clock.now() + start_offset;
        let state = ThreadState {
            start_at,
            end_at: start_at + duration,
            started: false,
            ended: false,
            paused: false,
            wait_remaining: 0.0,
            destroy_when_ended: true,
        };
        Self(Rc::new(Thread {
            name: name.into(),
            phase,
            clock,
            state: RefCell::new(state),
            properties: RefCell::new(Properties::new()),
            action: RefCell::new(Some(Box::new(action))),
            hooks: Hooks::default(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn phase(&self) -> Phase {
        self.0.phase
    }

    /// Whether both handles refer to the same thread.
    pub fn ptr_eq(&self, other: &ThreadHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // --- Time window ---

    /// Seconds until the window opens. Zero or negative once it has.
    pub fn start_offset(&self) -> f64 {
        self.0.state.borrow().start_at - self.0.clock.now()
    }

    /// Moves the start to `offset` seconds from now. The end stays put.
    pub fn set_start_offset(&self, offset: f64) {
        self.0.state.borrow_mut().start_at = self.0.clock.now() + offset;
    }

    pub fn duration(&self) -> f64 {
        let state = self.0.state.borrow();
        state.end_at - state.start_at
    }

    /// Moves the end to `duration` seconds after the start (not after now).
    pub fn set_duration(&self, duration: f64) {
        let mut state = self.0.state.borrow_mut();
        state.end_at = state.start_at + duration;
    }

    /// Seconds until the window closes.
    pub fn time_until_end(&self) -> f64 {
        self.0.state.borrow().end_at - self.0.clock.now()
    }

    /// Moves the end to `remaining` seconds from now.
    pub fn set_time_until_end(&self, remaining: f64) {
        self.0.state.borrow_mut().end_at = self.0.clock.now() + remaining;
    }

    // --- Flags ---

    pub fn is_started(&self) -> bool {
        self.0.state.borrow().started
    }

    pub fn is_ended(&self) -> bool {
        self.0.state.borrow().ended
    }

    pub fn is_paused(&self) -> bool {
        self.0.state.borrow().paused
    }

    /// Routes through [`pause`](Self::pause) / [`resume`](Self::resume), so the
    /// edge notifications still fire.
    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.0.state.borrow().wait_remaining > 0.0
    }

    /// Seconds left on the wait countdown.
    pub fn wait_remaining(&self) -> f64 {
        self.0.state.borrow().wait_remaining
    }

    pub fn destroy_when_ended(&self) -> bool {
        self.0.state.borrow().destroy_when_ended
    }

    pub fn set_destroy_when_ended(&self, destroy: bool) {
        self.0.state.borrow_mut().destroy_when_ended = destroy;
    }

    /// Whether the next prune removes this thread.
    pub fn is_destroyable(&self) -> bool {
        let state = self.0.state.borrow();
        state.destroy_when_ended && state.ended
    }

    // --- Controls ---

    pub fn pause(&self) {
        {
            let mut state = self.0.state.borrow_mut();
            if state.paused {
                return;
            }
            state.paused = true;
        }
        debug!(thread = %self.name(), "Thread paused.");
        self.fire(ThreadEvent::Pause);
    }

    pub fn resume(&self) {
        {
            let mut state = self.0.state.borrow_mut();
            if !state.paused {
                return;
            }
            state.paused = false;
        }
        debug!(thread = %self.name(), "Thread resumed.");
        self.fire(ThreadEvent::Resume);
    }

    /// Suspends dispatch for `seconds` of the thread's own phase delta.
    /// Consecutive waits add up.
    pub fn wait(&self, seconds: f64) -> Result<()> {
        if !(seconds >= 0.0) {
            return Err(ThreadError::InvalidArgument(format!(
                "wait must be >= 0 seconds, got {seconds}"
            )));
        }
        let begins = {
            let mut state = self.0.state.borrow_mut();
            let begins = state.wait_remaining <= 0.0 && seconds > 0.0;
            state.wait_remaining += seconds;
            begins
        };
        if begins {
            debug!(thread = %self.name(), seconds, "Thread waiting.");
            self.fire(ThreadEvent::WaitStart);
        }
        Ok(())
    }

    /// Ends the thread. Only the first call notifies.
    pub fn end(&self) {
        {
            let mut state = self.0.state.borrow_mut();
            if state.ended {
                return;
            }
            state.ended = true;
        }
        debug!(thread = %self.name(), "Thread ended.");
        self.fire(ThreadEvent::End);
    }

    /// Ends the thread and marks it for removal at the next prune.
    pub fn destroy(&self) {
        self.set_destroy_when_ended(true);
        self.end();
    }

    /// Re-anchors the window so it opens now, keeping its duration.
    /// The start notification fires again on the next dispatch.
    pub fn start_immediately(&self) {
        let now = self.0.clock.now();
        let mut state = self.0.state.borrow_mut();
        state.end_at += now - state.start_at;
        state.start_at = now;
        state.started = false;
    }

    /// Clears `ended`, `paused` and any pending wait, then starts immediately.
    pub fn restart(&self) {
        {
            let mut state = self.0.state.borrow_mut();
            state.ended = false;
            state.paused = false;
            state.wait_remaining = 0.0;
        }
        self.start_immediately();
        debug!(thread = %self.name(), "Thread restarted.");
    }

    /// Clears the scratch properties, then restarts.
    pub fn restart_completely(&self) {
        self.0.properties.borrow_mut().clear();
        self.restart();
    }

    // --- Scratch properties ---

    /// The stored value for `key`, or [`Property::None`].
    pub fn property(&self, key: &str) -> Property {
        self.0.properties.borrow().get(key).clone()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Property>) {
        self.0.properties.borrow_mut().set(key, value);
    }

    /// Returns `false` when `key` was not present.
    pub fn remove_property(&self, key: &str) -> bool {
        self.0.properties.borrow_mut().remove(key)
    }

    /// Runs `f` with the scratch store borrowed. `f` must not call the
    /// property methods of this same handle.
    pub fn with_properties<R>(&self, f: impl FnOnce(&Properties) -> R) -> R {
        f(&self.0.properties.borrow())
    }

    /// Like [`with_properties`](Self::with_properties), mutably.
    pub fn with_properties_mut<R>(&self, f: impl FnOnce(&mut Properties) -> R) -> R {
        f(&mut self.0.properties.borrow_mut())
    }

    // --- Notifications ---

    pub fn on(&self, event: ThreadEvent, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.0.hooks.get(event).subscribe(listener)
    }

    /// Unsubscribes a listener. Returns `true` if it was subscribed to `event`.
    pub fn off(&self, event: ThreadEvent, id: ListenerId) -> bool {
        self.0.hooks.get(event).unsubscribe(id)
    }

    pub fn on_start(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::Start, listener)
    }

    pub fn on_pause(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::Pause, listener)
    }

    pub fn on_resume(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::Resume, listener)
    }

    pub fn on_wait_start(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::WaitStart, listener)
    }

    pub fn on_wait_end(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::WaitEnd, listener)
    }

    pub fn on_end(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        self.on(ThreadEvent::End, listener)
    }

    fn fire(&self, event: ThreadEvent) {
        self.0.hooks.get(event).fire(event, self);
    }

    // --- Driven by the scheduler ---

    /// Runs one dispatch of this thread. Returns `true` if the action ran.
    ///
    /// Ended threads are skipped. The first dispatch inside the window fires
    /// the start notification; a dispatch at or past the end ends the thread
    /// instead of running the action.
    pub(crate) fn next_frame(&self, ctx: &ThreadContext) -> bool {
        let now = self.0.clock.now();
        let starting = {
            let mut state = self.0.state.borrow_mut();
            if state.ended || state.start_at - now > 0.0 {
                return false;
            }
            let starting = !state.started;
            state.started = true;
            starting
        };
        if starting {
            debug!(thread = %self.name(), phase = %self.phase(), now, "Thread started.");
            self.fire(ThreadEvent::Start);
        }

        let (ending, runnable) = {
            let state = self.0.state.borrow();
            if state.ended {
                return false;
            }
            (
                state.end_at - now <= 0.0,
                !state.paused && state.wait_remaining <= 0.0,
            )
        };
        if ending {
            self.end();
            return false;
        }
        if !runnable {
            return false;
        }
        self.invoke(ctx)
    }

    fn invoke(&self, ctx: &ThreadContext) -> bool {
        let Some(mut action) = self.0.action.borrow_mut().take() else {
            return false;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(ctx)));
        *self.0.action.borrow_mut() = Some(action);
        if let Err(payload) = outcome {
            error!(
                thread = %self.name(),
                "Thread action panicked: {}",
                panic_message(payload.as_ref())
            );
        }
        true
    }

    /// Counts a pending wait down by `delta`. Paused threads do not count.
    pub(crate) fn advance(&self, delta: f64) {
        let finished = {
            let mut state = self.0.state.borrow_mut();
            if state.paused || state.wait_remaining <= 0.0 {
                return;
            }
            state.wait_remaining -= delta;
            if state.wait_remaining <= 0.0 {
                state.wait_remaining = 0.0;
                true
            } else {
                false
            }
        };
        if finished {
            debug!(thread = %self.name(), "Thread wait finished.");
            self.fire(ThreadEvent::WaitEnd);
        }
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("ThreadHandle")
            .field("name", &self.0.name)
            .field("phase", &self.0.phase)
            .field("start_at", &state.start_at)
            .field("end_at", &state.end_at)
            .field("started", &state.started)
            .field("ended", &state.ended)
            .field("paused", &state.paused)
            .field("wait_remaining", &state.wait_remaining)
            .field("destroy_when_ended", &state.destroy_when_ended)
            .finish()
    }
}
