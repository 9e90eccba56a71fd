//! Time inputs consumed by the scheduler.
//!
//! The scheduler does not own a clock of its own. The host hands it a
//! [`FrameTime`] every tick; the scheduler stores the latest sample in a shared
//! [`Clock`] so thread handles can answer relative questions ("how long until
//! I end?") between ticks. [`FrameClock`] is the fixed-step accumulator used by
//! the built-in runner and the shell to turn wall-clock elapsed time into frames.

use crate::config::ClockConfig;
use std::cell::Cell;
use std::rc::Rc;
use tracing::warn;

/// A single time sample, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Current clock time. Advances monotonically.
    pub now: f64,
    /// Variable delta of the current frame.
    pub delta: f64,
    /// Fixed-step delta.
    pub fixed_delta: f64,
}

impl FrameTime {
    pub fn new(now: f64, delta: f64, fixed_delta: f64) -> Self {
        Self {
            now,
            delta,
            fixed_delta,
        }
    }

    /// The delta a thread of the given kind counts its wait down with.
    pub fn delta_for(&self, fixed_step: bool) -> f64 {
        if fixed_step {
            self.fixed_delta
        } else {
            self.delta
        }
    }
}

/// The latest [`FrameTime`] seen by a scheduler, shared with its threads.
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<FrameTime>>);

impl Clock {
    pub fn new(time: FrameTime) -> Self {
        Self(Rc::new(Cell::new(time)))
    }

    pub fn get(&self) -> FrameTime {
        self.0.get()
    }

    pub fn now(&self) -> f64 {
        self.0.get().now
    }

    pub fn set(&self, time: FrameTime) {
        self.0.set(time);
    }
}

/// The work for one frame: the fixed steps to run first, then the frame itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStep {
    pub frame: FrameTime,
    pub fixed_steps: Vec<FrameTime>,
}

/// Turns elapsed wall time into frames and fixed steps.
///
/// Fixed steps are produced from an accumulator: every `fixed_timestep`
/// seconds of elapsed time yields one step, up to `max_fixed_steps` per
/// frame. A backlog beyond the cap is dropped and fixed time skips ahead so it
/// never falls permanently behind frame time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_timestep: f64,
    max_fixed_steps: u32,
    time: f64,
    fixed_time: f64,
    accumulator: f64,
    frame_count: u64,
}

impl FrameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            fixed_timestep: config.fixed_timestep,
            max_fixed_steps: config.max_fixed_steps,
            time: 0.0,
            fixed_time: 0.0,
            accumulator: 0.0,
            frame_count: 0,
        }
    }

    /// Current frame time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time of the last fixed step.
    pub fn fixed_time(&self) -> f64 {
        self.fixed_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advances the clock by `elapsed` seconds and returns the frame to run.
    ///
    /// Negative or non-finite elapsed values are treated as zero.
    pub fn advance(&mut self, elapsed: f64) -> FrameStep {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        self.time += elapsed;
        self.accumulator += elapsed;
        self.frame_count += 1;

        let mut fixed_steps = Vec::new();
        while self.accumulator >= self.fixed_timestep
            && (fixed_steps.len() as u32) < self.max_fixed_steps
        {
            self.accumulator -= self.fixed_timestep;
            self.fixed_time += self.fixed_timestep;
            fixed_steps.push(FrameTime::new(
                self.fixed_time,
                elapsed,
                self.fixed_timestep,
            ));
        }

        if self.accumulator >= self.fixed_timestep {
            let dropped = (self.accumulator / self.fixed_timestep).floor();
            warn!(
                "Frame {} fell behind by {} fixed steps; dropping the backlog.",
                self.frame_count, dropped
            );
            self.accumulator -= dropped * self.fixed_timestep;
            self.fixed_time += dropped * self.fixed_timestep;
        }

        FrameStep {
            frame: FrameTime::new(self.time, elapsed, self.fixed_timestep),
            fixed_steps,
        }
    }
}
