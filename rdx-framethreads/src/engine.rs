//! The scheduler that owns the thread registry and drives dispatch.

use crate::common::Phase;
use crate::components::registry::Registry;
use crate::components::thread::ThreadHandle;
use crate::config::ClockConfig;
use crate::context::ThreadContext;
use crate::error::{Result, ThreadError};
use crate::time::{Clock, FrameClock, FrameStep, FrameTime};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

struct Shared {
    clock: Clock,
    registry: RefCell<Registry>,
    current: RefCell<Option<ThreadHandle>>,
}

/// The frame-driven thread scheduler.
///
/// This struct is the central point of control. It holds the registry of
/// named threads and dispatches them when the host fires a phase. The
/// scheduler is a cheap, clonable handle; every clone drives the same
/// registry. It is single-threaded by construction: every thread runs
/// synchronously on the tick that dispatches it.
///
/// A closure stored in a thread that captures a clone of its scheduler keeps
/// both alive until the thread leaves the registry.
#[derive(Clone)]
pub struct FrameScheduler {
    shared: Rc<Shared>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// Core implementation block for dispatch.
impl FrameScheduler {
    /// Creates an empty scheduler whose clock reads zero.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                clock: Clock::default(),
                registry: RefCell::new(Registry::new()),
                current: RefCell::new(None),
            }),
        }
    }

    /// Runs one pass of `phase` at `time`.
    ///
    /// Every thread bound to `phase` is dispatched from a snapshot taken when
    /// the pass begins. Threads registered during the pass wait for the next
    /// one; threads removed from the registry during the pass are skipped.
    /// `LateUpdate` and `FixedUpdate` passes then count pending waits down
    /// with their delta and prune ended threads marked for destruction.
    pub fn tick(&self, phase: Phase, time: FrameTime) {
        self.shared.clock.set(time);
        let snapshot = self.shared.registry.borrow().snapshot(Some(phase));
        trace!(%phase, now = time.now, threads = snapshot.len(), "Dispatching phase.");

        for (id, thread) in snapshot {
            if !self.shared.registry.borrow().holds(id, &thread) {
                continue;
            }
            *self.shared.current.borrow_mut() = Some(thread.clone());
            let ctx = ThreadContext::new(thread.clone(), self.clone(), time, phase);
            thread.next_frame(&ctx);
        }

        if phase.owns_prune() {
            self.advance_waits(phase.uses_fixed_step(), time);
            self.prune();
        }
    }

    fn advance_waits(&self, fixed_step: bool, time: FrameTime) {
        let delta = time.delta_for(fixed_step);
        let snapshot = self.shared.registry.borrow().snapshot(None);
        for (id, thread) in snapshot {
            if thread.phase().uses_fixed_step() != fixed_step {
                continue;
            }
            if self.shared.registry.borrow().holds(id, &thread) {
                thread.advance(delta);
            }
        }
    }

    fn prune(&self) {
        let pruned = self.shared.registry.borrow_mut().prune();
        for thread in &pruned {
            debug!(thread = %thread.name(), "Thread pruned.");
        }
        self.release_current(&pruned);
    }

    /// Forgets the current thread if it is among `evicted`.
    fn release_current(&self, evicted: &[ThreadHandle]) {
        let released = {
            let mut current = self.shared.current.borrow_mut();
            let evict = current
                .as_ref()
                .is_some_and(|held| evicted.iter().any(|t| t.ptr_eq(held)));
            if evict {
                current.take()
            } else {
                None
            }
        };
        drop(released);
    }

    /// Runs the per-frame phases in order: `Update`, `LateUpdate`, `Gui`.
    pub fn run_frame(&self, time: FrameTime) {
        self.tick(Phase::Update, time);
        self.tick(Phase::LateUpdate, time);
        self.tick(Phase::Gui, time);
    }

    /// Runs one `FixedUpdate` pass.
    pub fn run_fixed_step(&self, time: FrameTime) {
        self.tick(Phase::FixedUpdate, time);
    }

    /// Runs a frame produced by a [`FrameClock`]: its fixed steps first, then the frame.
    pub fn run_step(&self, step: &FrameStep) {
        for fixed in &step.fixed_steps {
            self.run_fixed_step(*fixed);
        }
        self.run_frame(step.frame);
    }

    /// Drives the scheduler from a wall-clock ticker until Ctrl+C.
    pub async fn run(&self, config: &ClockConfig) -> anyhow::Result<()> {
        self.run_until(config, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for the shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Drives the scheduler from a wall-clock ticker until `shutdown` completes.
    ///
    /// Each tick of the ticker advances a [`FrameClock`] by the wall time
    /// elapsed since the previous tick and runs the resulting frame.
    pub async fn run_until<F>(&self, config: &ClockConfig, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        config.validate()?;
        info!(
            "FrameScheduler running at {:?} with {} threads registered.",
            config.resolution,
            self.len()
        );

        let mut clock = FrameClock::new(config);
        let mut ticker = tokio::time::interval(config.resolution.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut last: Option<Instant> = None;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                instant = ticker.tick() => {
                    let elapsed = last.map_or(0.0, |prev| instant.duration_since(prev).as_secs_f64());
                    last = Some(instant);
                    let step = clock.advance(elapsed);
                    self.run_step(&step);
                }
            }
        }

        info!(
            "FrameScheduler stopped after {} frames ({:.2}s).",
            clock.frame_count(),
            clock.time()
        );
        Ok(())
    }
}

// Public API implementation block.
impl FrameScheduler {
    /// Registers a thread under `name`.
    ///
    /// The window opens `start_offset` seconds after the current time and
    /// lasts `duration` seconds (`f64::INFINITY` for no end).
    ///
    /// # Errors
    /// [`ThreadError::DuplicateName`] if `name` is already registered.
    pub fn create_thread(
        &self,
        name: impl Into<String>,
        phase: Phase,
        start_offset: f64,
        duration: f64,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Result<ThreadHandle> {
        let thread = ThreadHandle::new(
            name,
            phase,
            self.shared.clock.clone(),
            start_offset,
            duration,
            action,
        );
        if let Err(e) = self.shared.registry.borrow_mut().insert(thread.clone()) {
            warn!(thread = %thread.name(), "Rejected thread registration: {}", e);
            return Err(e);
        }
        info!(
            thread = %thread.name(),
            %phase,
            start_offset,
            duration,
            "Thread registered."
        );
        Ok(thread)
    }

    /// An `Update` thread that starts now and never ends on its own.
    pub fn update_thread(
        &self,
        name: impl Into<String>,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Result<ThreadHandle> {
        self.create_thread(name, Phase::Update, 0.0, f64::INFINITY, action)
    }

    /// A `LateUpdate` thread that starts now and never ends on its own.
    pub fn late_update_thread(
        &self,
        name: impl Into<String>,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Result<ThreadHandle> {
        self.create_thread(name, Phase::LateUpdate, 0.0, f64::INFINITY, action)
    }

    /// A `FixedUpdate` thread that starts now and never ends on its own.
    pub fn fixed_update_thread(
        &self,
        name: impl Into<String>,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Result<ThreadHandle> {
        self.create_thread(name, Phase::FixedUpdate, 0.0, f64::INFINITY, action)
    }

    /// A `Gui` thread that starts now and never ends on its own.
    pub fn gui_thread(
        &self,
        name: impl Into<String>,
        action: impl FnMut(&ThreadContext) + 'static,
    ) -> Result<ThreadHandle> {
        self.create_thread(name, Phase::Gui, 0.0, f64::INFINITY, action)
    }

    /// # Errors
    /// [`ThreadError::NotFound`] if no thread is registered under `name`.
    pub fn get(&self, name: &str) -> Result<ThreadHandle> {
        self.try_get(name)
            .ok_or_else(|| ThreadError::NotFound(name.to_string()))
    }

    pub fn try_get(&self, name: &str) -> Option<ThreadHandle> {
        self.shared.registry.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shared.registry.borrow().contains(name)
    }

    /// Removes a thread without ending it.
    ///
    /// Returns `true` if the thread was found and removed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.shared.registry.borrow_mut().remove(name);
        match removed {
            Some(thread) => {
                info!(thread = %name, "Thread removed.");
                self.release_current(std::slice::from_ref(&thread));
                true
            }
            None => false,
        }
    }

    /// Drops every registered thread. No end notifications fire.
    ///
    /// A pass already in progress skips the dropped threads it has not
    /// reached yet.
    pub fn clear_all(&self) {
        let dropped = self.shared.registry.borrow_mut().take_all();
        info!("Cleared {} threads.", dropped.len());
        self.release_current(&dropped);
    }

    pub fn len(&self) -> usize {
        self.shared.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.registry.borrow().is_empty()
    }

    /// Names of all registered threads, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .registry
            .borrow()
            .names()
            .map(str::to_string)
            .collect();
        names.sort_unstable();
        names
    }

    /// Handles of all registered threads, in no particular order.
    pub fn threads(&self) -> Vec<ThreadHandle> {
        self.shared
            .registry
            .borrow()
            .iter()
            .map(|(_, thread)| thread.clone())
            .collect()
    }

    /// The thread being dispatched, or the one dispatched most recently.
    ///
    /// `None` once that thread has left the registry.
    pub fn current(&self) -> Option<ThreadHandle> {
        self.shared.current.borrow().clone()
    }

    /// The clock shared with every thread of this scheduler.
    pub fn clock(&self) -> Clock {
        self.shared.clock.clone()
    }

    /// The time of the latest tick.
    pub fn time(&self) -> FrameTime {
        self.shared.clock.get()
    }

    /// Sets the current time without dispatching. Threads created afterwards
    /// anchor their windows to it.
    pub fn set_time(&self, time: FrameTime) {
        self.shared.clock.set(time);
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("time", &self.time())
            .field("threads", &self.names())
            .finish()
    }
}
