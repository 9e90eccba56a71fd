//! Contains common, primitive types shared across the scheduler.
//!
//! This module defines the identifiers used for registry slots and listener
//! subscriptions, and the [`Phase`] a thread is bound to. Using distinct types
//! keeps the registry and the notification lists from mixing up their keys.

use crate::error::ThreadError;
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;

new_key_type! {
    /// Uniquely and safely identifies a registry slot.
    ///
    /// Slot keys carry a generation, so a key held across a removal never
    /// resolves to a thread registered later under the same slot.
    pub struct ThreadId;
}

/// Identifies a listener subscribed to one of a thread's lifecycle notifications.
///
/// Returned by the `on_*` subscription methods and accepted by `off` to
/// unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// The kind of tick a thread is bound to.
///
/// The phase is fixed when the thread is created. A host usually fires the
/// phases in the order `FixedUpdate` (zero or more times), `Update`,
/// `LateUpdate`, `Gui` on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The ordinary per-frame phase.
    Update,
    /// Runs after every `Update` of the frame. Owns the frame-delta countdown and prune.
    LateUpdate,
    /// The fixed-step phase. Owns the fixed-delta countdown and prune.
    FixedUpdate,
    /// The render/UI phase. Dispatches callbacks only.
    Gui,
}

impl Phase {
    /// All phases, in the order a frame fires them.
    pub const ALL: [Phase; 4] = [
        Phase::FixedUpdate,
        Phase::Update,
        Phase::LateUpdate,
        Phase::Gui,
    ];

    /// Whether threads of this phase count their waits down with the fixed-step delta.
    pub fn uses_fixed_step(self) -> bool {
        matches!(self, Phase::FixedUpdate)
    }

    /// Whether a pass of this phase is followed by a countdown and prune step.
    pub fn owns_prune(self) -> bool {
        matches!(self, Phase::LateUpdate | Phase::FixedUpdate)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Update => "update",
            Phase::LateUpdate => "late",
            Phase::FixedUpdate => "fixed",
            Phase::Gui => "gui",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Phase {
    type Err = ThreadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "update" => Ok(Phase::Update),
            "late" | "lateupdate" | "late_update" => Ok(Phase::LateUpdate),
            "fixed" | "fixedupdate" | "fixed_update" => Ok(Phase::FixedUpdate),
            "gui" | "ongui" | "ui" => Ok(Phase::Gui),
            other => Err(ThreadError::InvalidArgument(format!(
                "unknown phase '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse_aliases() {
        assert_eq!("update".parse::<Phase>().unwrap(), Phase::Update);
        assert_eq!("LateUpdate".parse::<Phase>().unwrap(), Phase::LateUpdate);
        assert_eq!("fixed_update".parse::<Phase>().unwrap(), Phase::FixedUpdate);
        assert_eq!("ui".parse::<Phase>().unwrap(), Phase::Gui);
        assert!("render".parse::<Phase>().is_err());
    }

    #[test]
    fn test_phase_roles() {
        assert!(Phase::FixedUpdate.uses_fixed_step());
        assert!(!Phase::Gui.uses_fixed_step());
        assert!(Phase::LateUpdate.owns_prune());
        assert!(Phase::FixedUpdate.owns_prune());
        assert!(!Phase::Update.owns_prune());
        assert!(!Phase::Gui.owns_prune());
        assert_eq!(Phase::LateUpdate.to_string(), "late");
    }
}
