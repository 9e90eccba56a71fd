//! Lifecycle notifications fired by threads.
//!
//! Every thread owns one [`Notifier`] per [`ThreadEvent`]. A notifier is an
//! ordered list of listeners; firing calls them in registration order and
//! isolates each call, so a panicking listener is logged and the rest still run.

use crate::common::ListenerId;
use crate::components::thread::ThreadHandle;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// A listener for a lifecycle notification. Receives the thread that fired it.
pub type Listener = Box<dyn FnMut(&ThreadHandle)>;

/// The lifecycle transitions a thread announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadEvent {
    /// The first dispatch at or after the start time.
    Start,
    /// `paused` went from false to true.
    Pause,
    /// `paused` went from true to false.
    Resume,
    /// A wait began while the thread was not already waiting.
    WaitStart,
    /// The wait countdown reached zero.
    WaitEnd,
    /// The thread ended, by time or by request.
    End,
}

impl ThreadEvent {
    pub const ALL: [ThreadEvent; 6] = [
        ThreadEvent::Start,
        ThreadEvent::Pause,
        ThreadEvent::Resume,
        ThreadEvent::WaitStart,
        ThreadEvent::WaitEnd,
        ThreadEvent::End,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ThreadEvent::Start => "start",
            ThreadEvent::Pause => "pause",
            ThreadEvent::Resume => "resume",
            ThreadEvent::WaitStart => "wait-start",
            ThreadEvent::WaitEnd => "wait-end",
            ThreadEvent::End => "end",
        }
    }
}

/// An ordered, multicast listener list.
///
/// Listeners may subscribe or unsubscribe (themselves included) while the
/// notifier is firing. Listeners added during a firing are not called by that
/// firing. A listener that fires the same notifier again queues a second
/// round, which runs once the current round is over.
#[derive(Default)]
pub struct Notifier {
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    in_flight: RefCell<Vec<ListenerId>>,
    unsubscribed: RefCell<Vec<ListenerId>>,
    firing: Cell<bool>,
    queued: Cell<usize>,
    next_id: Cell<u64>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(&ThreadHandle) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `true` if it was subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(index) = listeners.iter().position(|(lid, _)| *lid == id) {
            listeners.remove(index);
            return true;
        }
        drop(listeners);
        // Listeners being fired are out of the list until the firing ends.
        if self.in_flight.borrow().contains(&id) {
            let mut unsubscribed = self.unsubscribed.borrow_mut();
            if !unsubscribed.contains(&id) {
                unsubscribed.push(id);
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Calls every listener in registration order.
    ///
    /// Called from inside one of this notifier's own listeners, the call is
    /// queued and the outer firing runs one more round for it.
    pub fn fire(&self, event: ThreadEvent, thread: &ThreadHandle) {
        if self.firing.get() {
            self.queued.set(self.queued.get() + 1);
            return;
        }
        self.firing.set(true);
        loop {
            self.fire_round(event, thread);
            match self.queued.get() {
                0 => break,
                n => self.queued.set(n - 1),
            }
        }
        self.firing.set(false);
    }

    fn fire_round(&self, event: ThreadEvent, thread: &ThreadHandle) {
        let mut firing = std::mem::take(&mut *self.listeners.borrow_mut());
        let ids: Vec<ListenerId> = firing.iter().map(|(id, _)| *id).collect();
        *self.in_flight.borrow_mut() = ids;
        for (id, listener) in firing.iter_mut() {
            if self.unsubscribed.borrow().contains(id) {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(thread)));
            if let Err(payload) = outcome {
                error!(
                    thread = %thread.name(),
                    event = event.label(),
                    "Listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        self.in_flight.borrow_mut().clear();
        let unsubscribed = std::mem::take(&mut *self.unsubscribed.borrow_mut());
        firing.retain(|(id, _)| !unsubscribed.contains(id));

        let mut listeners = self.listeners.borrow_mut();
        let added = std::mem::take(&mut *listeners);
        *listeners = firing;
        listeners.extend(added);
    }
}

/// The six notifiers of one thread.
#[derive(Default)]
pub struct Hooks {
    pub on_start: Notifier,
    pub on_pause: Notifier,
    pub on_resume: Notifier,
    pub on_wait_start: Notifier,
    pub on_wait_end: Notifier,
    pub on_end: Notifier,
}

impl Hooks {
    pub fn get(&self, event: ThreadEvent) -> &Notifier {
        match event {
            ThreadEvent::Start => &self.on_start,
            ThreadEvent::Pause => &self.on_pause,
            ThreadEvent::Resume => &self.on_resume,
            ThreadEvent::WaitStart => &self.on_wait_start,
            ThreadEvent::WaitEnd => &self.on_wait_end,
            ThreadEvent::End => &self.on_end,
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
