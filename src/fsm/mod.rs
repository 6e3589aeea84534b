//! Orchestrator state machine: table of states and legal transitions.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  StateTable                                  │
//! │  ┌───────────┬───────────┬───────────────┐   │
//! │  │ StateId   │ name      │ next          │   │
//! │  ├───────────┼───────────┼───────────────┤   │
//! │  │ Idle      │ "IDLE"    │ Triggered     │   │
//! │  │ Triggered │ "ALERT"   │ Cooldown      │   │
//! │  │ Cooldown  │ "COOLDOWN"│ Idle          │   │
//! │  └───────────┴───────────┴───────────────┘   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The orchestrator runs the work for each state as async code; this engine
//! only owns *which* state is current, rejects transitions the table does not
//! list, and tracks when the current state was entered.

use core::fmt;
use core::time::Duration;

use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Triggered = 1,
    Cooldown = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `StateId`.  Out-of-range falls back to
    /// `Idle` in release builds.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Triggered,
            2 => Self::Cooldown,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    /// The single state this one may move to.
    pub next: StateId,
}

/// Build the fixed transition table.  Indexed by `StateId as usize`.
pub const fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "IDLE",
            next: StateId::Triggered,
        },
        StateDescriptor {
            id: StateId::Triggered,
            name: "ALERT",
            next: StateId::Cooldown,
        },
        StateDescriptor {
            id: StateId::Cooldown,
            name: "COOLDOWN",
            next: StateId::Idle,
        },
    ]
}

/// A transition the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: StateId,
    pub to: StateId,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {:?} -> {:?}", self.from, self.to)
    }
}

impl core::error::Error for InvalidTransition {}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    /// Clock time the current state was entered.
    entered_at: Duration,
    /// Completed transitions, per target state.
    entries: [u32; StateId::COUNT],
}

impl Fsm {
    pub fn new(initial: StateId, now: Duration) -> Self {
        Self {
            table: build_state_table(),
            current: initial as usize,
            entered_at: now,
            entries: [0; StateId::COUNT],
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self, now: Duration) -> Duration {
        now.saturating_sub(self.entered_at)
    }

    /// Number of times `state` has been entered through a transition.
    pub fn entries(&self, state: StateId) -> u32 {
        self.entries[state as usize]
    }

    /// Move to `next` if the table lists it as the successor of the current
    /// state.  The current state is unchanged on error.
    pub fn transition(&mut self, next: StateId, now: Duration) -> Result<StateId, InvalidTransition> {
        let from = self.current_state();
        if self.table[self.current].next != next {
            return Err(InvalidTransition { from, to: next });
        }

        let next_idx = next as usize;
        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;
        self.entered_at = now;
        self.entries[next_idx] = self.entries[next_idx].wrapping_add(1);
        Ok(from)
    }
}
