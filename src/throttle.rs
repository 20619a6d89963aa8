//! Per-identity cooldown gates.
//!
//! Two independent timers per identity:
//! - greeting gate: suppresses repeated user-facing greetings;
//! - report gate: suppresses repeated access-log dispatches.
//!
//! The gates are decoupled so a person can be greeted every few seconds
//! while being reported only every few minutes. All state is owned by the
//! consume loop; nothing here needs synchronization.
//!
//! The report window is consumed when the gate authorizes a dispatch,
//! whether or not the dispatch ultimately succeeds. A failed report does
//! not earn a cooldown-free retry; the next opportunity is the next match
//! after the window elapses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    pub greeting_cooldown: Duration,
    pub report_cooldown: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            greeting_cooldown: Duration::from_secs(5),
            report_cooldown: Duration::from_secs(300),
        }
    }
}

/// Cooldown timestamps for one identity. Created lazily on first match.
#[derive(Clone, Copy, Debug, Default)]
struct CooldownState {
    last_greeted_at: Option<Instant>,
    last_reported_at: Option<Instant>,
}

/// What the throttle authorizes for one recognized match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decision {
    pub greet: bool,
    pub report: bool,
}

pub struct ThrottleController {
    config: ThrottleConfig,
    states: HashMap<u64, CooldownState>,
}

impl ThrottleController {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Evaluate both gates for a recognized identity at `now`, updating the
    /// timestamps of whichever gates fire.
    pub fn evaluate(&mut self, identity_id: u64, now: Instant) -> Decision {
        let state = self.states.entry(identity_id).or_default();
        let mut decision = Decision::default();

        if gate_open(state.last_greeted_at, now, self.config.greeting_cooldown) {
            state.last_greeted_at = Some(now);
            decision.greet = true;
        }
        if gate_open(state.last_reported_at, now, self.config.report_cooldown) {
            state.last_reported_at = Some(now);
            decision.report = true;
        }
        decision
    }

    /// Forget all cooldown state. Called after every successful model
    /// reload: a reloaded identity set must not silently suppress
    /// legitimate first-time reports.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn tracked_identities(&self) -> usize {
        self.states.len()
    }
}

fn gate_open(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        Some(at) => now.duration_since(at) >= cooldown,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn controller() -> ThrottleController {
        ThrottleController::new(ThrottleConfig {
            greeting_cooldown: secs(5),
            report_cooldown: secs(300),
        })
    }

    #[test]
    fn first_match_opens_both_gates() {
        let mut throttle = controller();
        let decision = throttle.evaluate(1, Instant::now());
        assert!(decision.greet);
        assert!(decision.report);
    }

    #[test]
    fn greeting_within_cooldown_is_suppressed() {
        let mut throttle = controller();
        let t0 = Instant::now();
        assert!(throttle.evaluate(1, t0).greet);
        // 3 seconds later: still inside the 5s window.
        assert!(!throttle.evaluate(1, t0 + secs(3)).greet);
    }

    #[test]
    fn greeting_after_cooldown_fires_again() {
        let mut throttle = controller();
        let t0 = Instant::now();
        assert!(throttle.evaluate(1, t0).greet);
        assert!(throttle.evaluate(1, t0 + secs(6)).greet);
    }

    #[test]
    fn ten_matches_in_a_minute_yield_one_report() {
        let mut throttle = controller();
        let t0 = Instant::now();
        let reports = (0..10)
            .map(|i| throttle.evaluate(1, t0 + secs(i * 6)))
            .filter(|d| d.report)
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn gates_are_independent() {
        let mut throttle = controller();
        let t0 = Instant::now();
        throttle.evaluate(1, t0);
        // After 10s the greeting window has elapsed but not the report one.
        let decision = throttle.evaluate(1, t0 + secs(10));
        assert!(decision.greet);
        assert!(!decision.report);
    }

    #[test]
    fn identities_are_tracked_separately() {
        let mut throttle = controller();
        let t0 = Instant::now();
        throttle.evaluate(1, t0);
        let decision = throttle.evaluate(2, t0 + secs(1));
        assert!(decision.greet);
        assert!(decision.report);
        assert_eq!(throttle.tracked_identities(), 2);
    }

    #[test]
    fn reset_clears_cooldowns() {
        let mut throttle = controller();
        let t0 = Instant::now();
        assert!(throttle.evaluate(1, t0).report);
        assert!(!throttle.evaluate(1, t0 + secs(1)).report);

        throttle.reset();

        // Same identity immediately after reset passes the report gate.
        assert!(throttle.evaluate(1, t0 + secs(2)).report);
        assert_eq!(throttle.tracked_identities(), 1);
    }
}
