//! # Framethreads
//!
//! Cooperative, frame-driven pseudo-threads for Rust game loops.
//!
//! A "thread" here is a named, resumable timed callback. The host registers it
//! with a [`FrameScheduler`](engine::FrameScheduler), then fires the phases of
//! every frame; each thread runs once per tick of its phase for a bounded or
//! unbounded window, and can be paused, resumed, put to wait, ended or
//! restarted. Nothing runs in parallel: every thread executes synchronously on
//! the tick that dispatches it.
//!
//! ## Core Concepts
//!
//! - **Phases**: `Update`, `LateUpdate`, `FixedUpdate` and `Gui`. A thread is
//!   bound to one phase for life. `LateUpdate` and `FixedUpdate` passes also
//!   count waits down and prune ended threads.
//! - **Time window**: a thread starts on the first tick at or past its start
//!   time and ends on the first tick at or past its end time. Pausing does not
//!   move the end.
//! - **Lifecycle hooks**: start, pause, resume, wait-start, wait-end and end
//!   notifications, each fired once per transition.
//! - **Scratch properties**: a per-thread map of dynamically-typed values that
//!   survives restarts until a complete restart clears it.
//!
//! ## Example Usage
//!
//! ```rust
//! use framethreads::prelude::*;
//!
//! let scheduler = FrameScheduler::new();
//! let thread = scheduler
//!     .create_thread("blink", Phase::Update, 0.0, 10.0, |ctx| {
//!         let count = ctx.thread().property("count").as_int();
//!         ctx.thread().set_property("count", count + 1);
//!     })
//!     .unwrap();
//! thread.on_end(|t| println!("{} finished", t.name()));
//!
//! for frame in 0..=10 {
//!     scheduler.run_frame(FrameTime::new(frame as f64, 1.0, 0.02));
//! }
//! assert_eq!(thread.property("count").as_int(), 10);
//! assert!(!scheduler.contains("blink"));
//! ```

pub const ENGINE_NAME: &str = "Framethreads";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod time;

/// A prelude module for easy importing of the most common Framethreads types.
pub mod prelude {
    pub use crate::common::{ListenerId, Phase, ThreadId};
    pub use crate::components::properties::{Color, Properties, Property, Quat, Vec2, Vec3};
    pub use crate::components::thread::ThreadHandle;
    pub use crate::config::{ClockConfig, ClockResolution};
    pub use crate::context::ThreadContext;
    pub use crate::engine::FrameScheduler;
    pub use crate::error::ThreadError;
    pub use crate::events::ThreadEvent;
    pub use crate::time::{FrameClock, FrameStep, FrameTime};
}
