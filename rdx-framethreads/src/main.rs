use anyhow::Result;
use colored::Colorize;
use framethreads::prelude::*;
use framethreads::{ENGINE_NAME, VERSION};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    // 2. Load the runner configuration, or fall back to ten frames per second.
    let config = match std::env::args().nth(1) {
        Some(path) => ClockConfig::from_file(&path)?,
        None => ClockConfig {
            resolution: ClockResolution::Custom {
                ticks_per_second: 10,
            },
            ..Default::default()
        },
    };

    // 3. Create the scheduler and register the two demo threads.
    let scheduler = FrameScheduler::new();
    register_demo_threads(&scheduler)?;

    println!(
        "{} v{} running. Press Ctrl+C to stop.",
        ENGINE_NAME.cyan().bold(),
        VERSION
    );

    // 4. Run until Ctrl+C.
    scheduler.run(&config).await?;

    Ok(())
}

/// Two threads that pause, resume and restart each other.
///
/// `thread1` lasts 10 seconds and pauses itself once with 5 seconds left.
/// `thread2` lasts 15 seconds and keeps resuming `thread1` during its own
/// last 5 seconds. When `thread2` ends it restarts itself and fully
/// restarts `thread1`, so the cycle repeats.
fn register_demo_threads(scheduler: &FrameScheduler) -> Result<()> {
    let thread1 = scheduler.create_thread("thread1", Phase::Update, 0.0, 10.0, |ctx| {
        let me = ctx.thread();
        if me.time_until_end() < 5.0 && !me.property("PausedOnce").as_bool() {
            me.set_property("PausedOnce", true);
            me.pause();
        }
    })?;
    thread1.on_pause(|t| info!("{} {}", t.name().yellow(), "paused".dimmed()));
    thread1.on_resume(|t| info!("{} {}", t.name().yellow(), "resumed".green()));
    thread1.on_end(|t| info!("{} {}", t.name().yellow(), "ended".red()));
    // Keep thread1 registered after it ends so it can be restarted.
    thread1.set_destroy_when_ended(false);

    let thread2 = scheduler.create_thread("thread2", Phase::Update, 0.0, 15.0, |ctx| {
        if ctx.thread().time_until_end() < 5.0 {
            if let Some(other) = ctx.scheduler().try_get("thread1") {
                other.resume();
            }
        }
    })?;
    let registry = scheduler.clone();
    thread2.on_end(move |me| {
        info!("{}", "Restarting both threads".cyan());
        me.restart();
        if let Ok(other) = registry.get("thread1") {
            other.restart_completely();
        }
    });

    Ok(())
}
