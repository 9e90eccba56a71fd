//! The named collection of threads.
//!
//! Threads live in a [`SlotMap`] so a dispatch pass can hold on to slot keys
//! while callbacks add and remove entries; a name index maps unique names to
//! slots.

use crate::common::{Phase, ThreadId};
use crate::components::thread::ThreadHandle;
use crate::error::{Result, ThreadError};
use slotmap::SlotMap;
use std::collections::HashMap;

#[derive(Default)]
pub struct Registry {
    slots: SlotMap<ThreadId, ThreadHandle>,
    names: HashMap<String, ThreadId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `thread` under its name. Fails if the name is taken.
    pub fn insert(&mut self, thread: ThreadHandle) -> Result<ThreadId> {
        if self.names.contains_key(thread.name()) {
            return Err(ThreadError::DuplicateName(thread.name().to_string()));
        }
        let name = thread.name().to_string();
        let id = self.slots.insert(thread);
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<&ThreadHandle> {
        self.names.get(name).and_then(|id| self.slots.get(*id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Whether the slot still holds the thread it was issued for.
    pub fn contains_id(&self, id: ThreadId) -> bool {
        self.slots.contains_key(id)
    }

    /// Whether `id` still resolves to this very `thread`.
    pub fn holds(&self, id: ThreadId, thread: &ThreadHandle) -> bool {
        self.slots.get(id).is_some_and(|held| held.ptr_eq(thread))
    }

    pub fn remove(&mut self, name: &str) -> Option<ThreadHandle> {
        let id = self.names.remove(name)?;
        self.slots.remove(id)
    }

    /// Empties the registry and hands back every thread it held.
    ///
    /// Slots are drained rather than replaced, so keys issued before the call
    /// never resolve to threads inserted after it.
    pub fn take_all(&mut self) -> Vec<ThreadHandle> {
        self.names.clear();
        self.slots.drain().map(|(_, thread)| thread).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadId, &ThreadHandle)> {
        self.slots.iter()
    }

    /// Keys and handles of every thread bound to `phase`, or of every thread
    /// when `phase` is `None`.
    pub fn snapshot(&self, phase: Option<Phase>) -> Vec<(ThreadId, ThreadHandle)> {
        self.slots
            .iter()
            .filter(|(_, thread)| phase.map_or(true, |phase| thread.phase() == phase))
            .map(|(id, thread)| (id, thread.clone()))
            .collect()
    }

    /// Removes every ended thread marked for destruction and returns them.
    pub fn prune(&mut self) -> Vec<ThreadHandle> {
        let doomed: Vec<ThreadId> = self
            .slots
            .iter()
            .filter(|(_, thread)| thread.is_destroyable())
            .map(|(id, _)| id)
            .collect();
        let mut pruned = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(thread) = self.slots.remove(id) {
                self.names.remove(thread.name());
                pruned.push(thread);
            }
        }
        pruned
    }
}
