//! Motion trigger gate.
//!
//! The PIR output is taken as-is from the sensor port; this gate turns the
//! raw per-poll samples into a single trigger decision.
//!
//! | State     | Input         | Next               | Output  |
//! |-----------|---------------|--------------------|---------|
//! | Armed     | motion, n < N | Counting(n + 1)    | -       |
//! | Counting  | motion, n = N | Armed / Disarmed   | trigger |
//! | any       | clear         | Armed              | -       |
//! | Disarmed  | motion        | Disarmed           | -       |
//!
//! `N` is `debounce_polls`.  The gate is only `Disarmed` after
//! [`TriggerGate::rearm`] when release-to-rearm is configured.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Armed,
    Counting { streak: u8 },
    Disarmed,
}

#[derive(Debug, Clone)]
pub struct TriggerGate {
    required: u8,
    rearm_on_release: bool,
    state: GateState,
}

impl TriggerGate {
    pub fn new(debounce_polls: u8, rearm_on_release: bool) -> Self {
        Self {
            required: debounce_polls.max(1),
            rearm_on_release,
            state: GateState::Armed,
        }
    }

    /// Feed one sensor sample.  Returns `true` exactly once per qualifying
    /// run of positive samples.
    pub fn feed(&mut self, motion: bool) -> bool {
        if !motion {
            self.state = GateState::Armed;
            return false;
        }

        let streak = match self.state {
            GateState::Disarmed => return false,
            GateState::Armed => 1,
            GateState::Counting { streak } => streak.saturating_add(1),
        };

        if streak >= self.required {
            self.state = if self.rearm_on_release {
                GateState::Disarmed
            } else {
                GateState::Armed
            };
            true
        } else {
            self.state = GateState::Counting { streak };
            false
        }
    }

    /// Reset after an alert.  With release-to-rearm the gate ignores motion
    /// until it has seen one clear sample.
    pub fn rearm(&mut self) {
        self.state = if self.rearm_on_release {
            GateState::Disarmed
        } else {
            GateState::Armed
        };
    }

    pub fn is_armed(&self) -> bool {
        self.state != GateState::Disarmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_poll_gate_fires_immediately() {
        let mut g = TriggerGate::new(1, false);
        assert!(g.feed(true));
    }

    #[test]
    fn needs_consecutive_positives() {
        let mut g = TriggerGate::new(2, false);
        assert!(!g.feed(true));
        assert!(!g.feed(false));
        assert!(!g.feed(true));
        assert!(g.feed(true));
    }

    #[test]
    fn continuous_motion_retriggers_without_release_rule() {
        let mut g = TriggerGate::new(2, false);
        g.feed(true);
        assert!(g.feed(true));
        g.rearm();
        assert!(!g.feed(true));
        assert!(g.feed(true));
    }

    #[test]
    fn release_rule_waits_for_clear_sample() {
        let mut g = TriggerGate::new(1, true);
        assert!(g.feed(true));
        g.rearm();
        assert!(!g.is_armed());
        for _ in 0..20 {
            assert!(!g.feed(true));
        }
        assert!(!g.feed(false));
        assert!(g.is_armed());
        assert!(g.feed(true));
    }

    #[test]
    fn zero_debounce_treated_as_one() {
        let mut g = TriggerGate::new(0, false);
        assert!(g.feed(true));
    }
}
