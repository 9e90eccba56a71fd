use framethreads::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn at(now: f64) -> FrameTime {
    FrameTime::new(now, 1.0, 0.5)
}

fn count_event(thread: &ThreadHandle, event: ThreadEvent) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    thread.on(event, move |_| inner.set(inner.get() + 1));
    count
}

fn counting_thread(
    scheduler: &FrameScheduler,
    name: &str,
    start: f64,
    duration: f64,
) -> (ThreadHandle, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let inner = calls.clone();
    let thread = scheduler
        .create_thread(name, Phase::Update, start, duration, move |_| {
            inner.set(inner.get() + 1)
        })
        .unwrap();
    (thread, calls)
}

#[test]
fn bounded_thread_starts_then_ends_without_running_on_the_last_tick() {
    let scheduler = FrameScheduler::new();
    let (thread, calls) = counting_thread(&scheduler, "T", 0.0, 10.0);
    let starts = count_event(&thread, ThreadEvent::Start);
    let ends = count_event(&thread, ThreadEvent::End);

    scheduler.run_frame(at(0.0));
    assert_eq!(calls.get(), 1);
    assert_eq!(starts.get(), 1);
    assert!(thread.is_started());

    scheduler.run_frame(at(10.0));
    assert_eq!(calls.get(), 1);
    assert_eq!(ends.get(), 1);
    assert!(thread.is_ended());
}

#[test]
fn destroyable_thread_leaves_at_the_prune_step() {
    let scheduler = FrameScheduler::new();
    let (doomed, _) = counting_thread(&scheduler, "doomed", 0.0, 2.0);
    let (kept, _) = counting_thread(&scheduler, "kept", 0.0, 2.0);
    kept.set_destroy_when_ended(false);

    scheduler.run_frame(at(0.0));
    scheduler.tick(Phase::Update, at(2.0));
    assert!(doomed.is_ended());
    assert!(scheduler.contains("doomed"));

    scheduler.tick(Phase::LateUpdate, at(2.0));
    assert!(!scheduler.contains("doomed"));
    assert!(scheduler.get("kept").unwrap().is_ended());
}

#[test]
fn pause_skips_the_callback_but_not_the_deadline() {
    let scheduler = FrameScheduler::new();
    let (thread, calls) = counting_thread(&scheduler, "T", 0.0, 10.0);
    thread.set_destroy_when_ended(false);
    let ends = count_event(&thread, ThreadEvent::End);

    for now in 0..5 {
        scheduler.run_frame(at(now as f64));
    }
    thread.wait(2.0).unwrap();
    scheduler.tick(Phase::Update, at(5.0));
    thread.pause();
    scheduler.tick(Phase::LateUpdate, at(5.0));
    assert_eq!(thread.wait_remaining(), 2.0);
    assert_eq!(calls.get(), 5);

    for now in 6..10 {
        scheduler.run_frame(at(now as f64));
    }
    assert_eq!(calls.get(), 5);
    assert_eq!(thread.wait_remaining(), 2.0);

    scheduler.run_frame(at(10.0));
    assert_eq!(ends.get(), 1);
    assert!(thread.is_paused());

    thread.resume();
    scheduler.run_frame(at(11.0));
    assert_eq!(calls.get(), 5);
}

#[test]
fn wait_counts_down_over_frames() {
    let scheduler = FrameScheduler::new();
    let (thread, calls) = counting_thread(&scheduler, "W", 0.0, f64::INFINITY);
    let wait_starts = count_event(&thread, ThreadEvent::WaitStart);
    let wait_ends = count_event(&thread, ThreadEvent::WaitEnd);

    thread.wait(5.0).unwrap();
    assert_eq!(wait_starts.get(), 1);

    for now in 1..=4 {
        scheduler.run_frame(at(now as f64));
        assert_eq!(wait_ends.get(), 0);
    }
    assert_eq!(thread.wait_remaining(), 1.0);
    assert_eq!(calls.get(), 0);

    scheduler.run_frame(at(5.0));
    assert_eq!(wait_ends.get(), 1);
    assert!(!thread.is_waiting());

    scheduler.run_frame(at(6.0));
    assert_eq!(calls.get(), 1);
    assert_eq!(wait_ends.get(), 1);
}

#[test]
fn stacked_waits_end_once() {
    let scheduler = FrameScheduler::new();
    let (thread, _) = counting_thread(&scheduler, "W", 0.0, f64::INFINITY);
    let wait_starts = count_event(&thread, ThreadEvent::WaitStart);
    let wait_ends = count_event(&thread, ThreadEvent::WaitEnd);

    thread.wait(3.0).unwrap();
    thread.wait(2.0).unwrap();
    assert_eq!(thread.wait_remaining(), 5.0);
    for now in 1..=10 {
        scheduler.run_frame(at(now as f64));
    }
    assert_eq!(wait_starts.get(), 1);
    assert_eq!(wait_ends.get(), 1);
}

#[test]
fn fixed_threads_count_down_with_the_fixed_delta() {
    let scheduler = FrameScheduler::new();
    let calls = Rc::new(Cell::new(0));
    let inner = calls.clone();
    let thread = scheduler
        .fixed_update_thread("physics", move |_| inner.set(inner.get() + 1))
        .unwrap();
    thread.wait(1.0).unwrap();

    let config = ClockConfig {
        fixed_timestep: 0.5,
        ..Default::default()
    };
    let mut clock = FrameClock::new(&config);

    // One second of wall time is two fixed steps.
    scheduler.run_step(&clock.advance(1.0));
    assert!(!thread.is_waiting());
    assert_eq!(calls.get(), 0);

    scheduler.run_step(&clock.advance(1.0));
    assert_eq!(calls.get(), 2);
}

#[test]
fn restart_completely_resets_everything() {
    let scheduler = FrameScheduler::new();
    let (thread, _) = counting_thread(&scheduler, "R", 0.0, 10.0);
    thread.set_destroy_when_ended(false);
    thread.set_property("PausedOnce", true);
    thread.set_property("name", "runner");

    scheduler.run_frame(at(0.0));
    thread.pause();
    thread.wait(3.0).unwrap();
    thread.end();

    scheduler.set_time(at(4.0));
    thread.restart_completely();
    assert!(!thread.is_started());
    assert!(!thread.is_ended());
    assert!(!thread.is_paused());
    assert_eq!(thread.wait_remaining(), 0.0);
    assert!(thread.property("PausedOnce").is_none());
    assert_eq!(thread.property("name").as_str(), None);
    assert_eq!(thread.start_offset(), 0.0);
    assert_eq!(thread.time_until_end(), 10.0);

    thread.restart_completely();
    assert!(thread.with_properties(|props| props.is_empty()));
}

#[test]
fn missing_property_reads_as_zero_values() {
    let scheduler = FrameScheduler::new();
    let thread = scheduler.update_thread("P", |_| {}).unwrap();
    let value = thread.property("missing");
    assert!(!value.as_bool());
    assert_eq!(value.as_int(), 0);
    assert_eq!(value.as_str(), None);
    assert!(!thread.remove_property("missing"));
}

#[test]
fn threads_created_during_a_pass_wait_for_the_next_pass() {
    let scheduler = FrameScheduler::new();
    let child_calls = Rc::new(Cell::new(0));
    let counter = child_calls.clone();
    scheduler
        .update_thread("parent", move |ctx| {
            if ctx.scheduler().contains("child") {
                return;
            }
            let counter = counter.clone();
            ctx.scheduler()
                .update_thread("child", move |_| counter.set(counter.get() + 1))
                .unwrap();
        })
        .unwrap();

    scheduler.tick(Phase::Update, at(0.0));
    assert!(scheduler.contains("child"));
    assert_eq!(child_calls.get(), 0);

    scheduler.tick(Phase::Update, at(1.0));
    assert_eq!(child_calls.get(), 1);
}

#[test]
fn a_thread_can_destroy_itself_mid_pass() {
    let scheduler = FrameScheduler::new();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let thread = scheduler
        .update_thread("once", move |ctx| {
            counter.set(counter.get() + 1);
            ctx.thread().destroy();
        })
        .unwrap();
    thread.set_destroy_when_ended(false);
    let ends = count_event(&thread, ThreadEvent::End);

    scheduler.tick(Phase::Update, at(0.0));
    assert!(scheduler.contains("once"));
    scheduler.tick(Phase::Update, at(0.5));
    assert_eq!(calls.get(), 1);

    scheduler.tick(Phase::LateUpdate, at(0.5));
    assert!(!scheduler.contains("once"));
    assert_eq!(ends.get(), 1);
}

// Slots are visited in insertion order on a fresh scheduler, so each of the
// next two tests pins one side of the removal.

#[test]
fn a_thread_removed_before_its_turn_is_skipped() {
    let scheduler = FrameScheduler::new();
    scheduler
        .update_thread("reaper", |ctx| {
            ctx.scheduler().remove("victim");
        })
        .unwrap();
    let (_, victim_calls) = counting_thread(&scheduler, "victim", 0.0, f64::INFINITY);

    scheduler.tick(Phase::Update, at(0.0));
    assert_eq!(victim_calls.get(), 0);
    assert!(!scheduler.contains("victim"));

    scheduler.run_frame(at(1.0));
    assert_eq!(victim_calls.get(), 0);
}

#[test]
fn a_thread_removed_after_its_turn_is_not_dispatched_again() {
    let scheduler = FrameScheduler::new();
    let (_, victim_calls) = counting_thread(&scheduler, "victim", 0.0, f64::INFINITY);
    scheduler
        .update_thread("reaper", |ctx| {
            ctx.scheduler().remove("victim");
        })
        .unwrap();

    scheduler.tick(Phase::Update, at(0.0));
    assert_eq!(victim_calls.get(), 1);
    assert!(!scheduler.contains("victim"));

    scheduler.run_frame(at(1.0));
    scheduler.run_frame(at(2.0));
    assert_eq!(victim_calls.get(), 1);
}

#[test]
fn clear_all_mid_pass_skips_the_rest_of_the_snapshot() {
    let scheduler = FrameScheduler::new();
    let spawned = Rc::new(Cell::new(0));
    let spawn_calls = spawned.clone();
    scheduler
        .update_thread("a", move |ctx| {
            let scheduler = ctx.scheduler();
            scheduler.clear_all();
            for name in ["c", "d"] {
                let calls = spawn_calls.clone();
                scheduler
                    .update_thread(name, move |_| calls.set(calls.get() + 1))
                    .unwrap();
            }
        })
        .unwrap();
    let (_, b_calls) = counting_thread(&scheduler, "b", 0.0, f64::INFINITY);

    scheduler.tick(Phase::Update, at(0.0));
    assert!(!scheduler.contains("b"));
    assert_eq!(b_calls.get(), 0);
    assert_eq!(spawned.get(), 0);
    assert_eq!(scheduler.names(), vec!["c".to_string(), "d".to_string()]);

    scheduler.tick(Phase::Update, at(1.0));
    assert_eq!(b_calls.get(), 0);
    assert_eq!(spawned.get(), 2);
}

#[test]
fn a_pause_edge_raised_inside_a_pause_listener_is_announced() {
    let scheduler = FrameScheduler::new();
    let thread = scheduler.update_thread("bouncy", |_| {}).unwrap();
    let resumes = count_event(&thread, ThreadEvent::Resume);
    let pauses = Rc::new(Cell::new(0));
    let counter = pauses.clone();
    thread.on_pause(move |me| {
        counter.set(counter.get() + 1);
        if counter.get() == 1 {
            me.resume();
            me.pause();
        }
    });

    thread.pause();
    assert_eq!(pauses.get(), 2);
    assert_eq!(resumes.get(), 1);
    assert!(thread.is_paused());

    thread.pause();
    assert_eq!(pauses.get(), 2);
}

#[test]
fn a_panicking_thread_does_not_stop_the_pass() {
    let scheduler = FrameScheduler::new();
    scheduler
        .update_thread("faulty", |_| panic!("thread failure"))
        .unwrap();
    let (_, calls) = counting_thread(&scheduler, "healthy", 0.0, f64::INFINITY);
    let end_calls = Rc::new(Cell::new(0));
    let counter = end_calls.clone();
    let ender = scheduler.update_thread("ender", |ctx| ctx.thread().end()).unwrap();
    ender.on_end(|_| panic!("listener failure"));
    ender.on_end(move |_| counter.set(counter.get() + 1));

    scheduler.run_frame(at(0.0));
    scheduler.run_frame(at(1.0));
    assert_eq!(calls.get(), 2);
    assert_eq!(end_calls.get(), 1);
    assert!(scheduler.contains("faulty"));
    assert!(!scheduler.contains("ender"));
}

#[test]
fn two_threads_pause_resume_and_restart_each_other() {
    let scheduler = FrameScheduler::new();
    let thread1 = scheduler
        .create_thread("thread1", Phase::Update, 0.0, 10.0, |ctx| {
            let me = ctx.thread();
            if me.time_until_end() < 5.0 && !me.property("PausedOnce").as_bool() {
                me.set_property("PausedOnce", true);
                me.pause();
            }
        })
        .unwrap();
    thread1.set_destroy_when_ended(false);
    let pauses = count_event(&thread1, ThreadEvent::Pause);
    let resumes = count_event(&thread1, ThreadEvent::Resume);
    let thread1_ends = count_event(&thread1, ThreadEvent::End);
    let thread1_starts = count_event(&thread1, ThreadEvent::Start);

    let thread2 = scheduler
        .create_thread("thread2", Phase::Update, 0.0, 15.0, |ctx| {
            if ctx.thread().time_until_end() < 5.0 {
                ctx.scheduler().get("thread1").unwrap().resume();
            }
        })
        .unwrap();
    let restarts = Rc::new(RefCell::new(Vec::new()));
    let log = restarts.clone();
    let registry = scheduler.clone();
    thread2.on_end(move |me| {
        log.borrow_mut().push(me.name().to_string());
        me.restart();
        registry.get("thread1").unwrap().restart_completely();
    });

    for now in 0..=9 {
        scheduler.run_frame(at(now as f64));
    }
    assert!(thread1.is_paused());
    assert!(thread1.property("PausedOnce").as_bool());
    assert_eq!(pauses.get(), 1);

    scheduler.run_frame(at(10.0));
    assert!(thread1.is_ended());
    assert!(scheduler.contains("thread1"));

    for now in 11..=14 {
        scheduler.run_frame(at(now as f64));
    }
    assert_eq!(resumes.get(), 1);
    assert!(!thread1.is_paused());

    scheduler.run_frame(at(15.0));
    assert_eq!(*restarts.borrow(), vec!["thread2".to_string()]);
    assert!(scheduler.contains("thread2"));
    assert!(!thread1.is_ended());
    assert!(thread1.property("PausedOnce").is_none());

    scheduler.run_frame(at(16.0));
    assert!(thread1.is_started());
    assert!(thread2.is_started());
    assert_eq!(thread1_starts.get(), 2);
    assert_eq!(thread1_ends.get(), 1);
    assert_eq!(thread1.time_until_end(), 9.0);
    assert_eq!(thread2.time_until_end(), 14.0);
}
