//! Debounced threshold controller.
//!
//! Turns a noisy stream of CPU readings into at most one transition request
//! per qualifying streak. The controller never talks to Cloudflare itself: it
//! emits a [`TransitionRequest`] and the caller reports back how the remote
//! call went through [`DefenseController::resolve`].

use std::fmt;
use tracing::debug;

/// Local belief about the remote protective mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenseMode {
    Normal,
    Defensive,
}

impl fmt::Display for DefenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Defensive => "defensive",
        })
    }
}

/// Direction of a requested mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToDefensive,
    ToNormal,
}

impl Direction {
    /// Mode committed once the remote call succeeds.
    #[must_use]
    pub const fn target(self) -> DefenseMode {
        match self {
            Self::ToDefensive => DefenseMode::Defensive,
            Self::ToNormal => DefenseMode::Normal,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToDefensive => "to_defensive",
            Self::ToNormal => "to_normal",
        })
    }
}

/// Emitted when a streak reaches its required length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRequest {
    pub direction: Direction,
    /// Streak length at the moment the request fired.
    pub streak: u32,
    /// Reading that completed the streak.
    pub sample: f64,
}

/// How the actuator call for a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationOutcome {
    Applied,
    Failed,
}

/// Per-direction edge trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The next qualifying streak fires a request.
    Armed,
    /// A request fired and is awaiting resolution; no re-fire.
    Fired,
}

/// Hysteresis state machine over consecutive high/low readings.
///
/// Invariant: at most one of the two counters is non-zero.
#[derive(Debug, Clone)]
pub struct DefenseController {
    mode: DefenseMode,
    consecutive_high: u32,
    consecutive_low: u32,
    threshold: f64,
    required_high: u32,
    required_low: u32,
    escalation: Trigger,
    deescalation: Trigger,
}

impl DefenseController {
    /// Creates a controller in `Normal` mode with empty streaks.
    ///
    /// Streak lengths below 1 are raised to 1.
    #[must_use]
    pub fn new(threshold: u8, required_high: u32, required_low: u32) -> Self {
        Self {
            mode: DefenseMode::Normal,
            consecutive_high: 0,
            consecutive_low: 0,
            threshold: f64::from(threshold),
            required_high: required_high.max(1),
            required_low: required_low.max(1),
            escalation: Trigger::Armed,
            deescalation: Trigger::Armed,
        }
    }

    /// Feeds one reading and returns a transition request when a streak completes.
    ///
    /// Out-of-range readings are compared against the threshold as given.
    pub fn observe(&mut self, sample: f64) -> Option<TransitionRequest> {
        if sample >= self.threshold {
            self.consecutive_high = self.consecutive_high.saturating_add(1);
            self.consecutive_low = 0;
            self.deescalation = Trigger::Armed;
        } else {
            self.consecutive_low = self.consecutive_low.saturating_add(1);
            self.consecutive_high = 0;
            self.escalation = Trigger::Armed;
        }

        debug!(
            sample,
            consecutive_high = self.consecutive_high,
            consecutive_low = self.consecutive_low,
            mode = %self.mode,
            "Reading observed"
        );

        match self.mode {
            DefenseMode::Normal
                if self.escalation == Trigger::Armed
                    && self.consecutive_high >= self.required_high =>
            {
                self.escalation = Trigger::Fired;
                Some(TransitionRequest {
                    direction: Direction::ToDefensive,
                    streak: self.consecutive_high,
                    sample,
                })
            }
            DefenseMode::Defensive
                if self.deescalation == Trigger::Armed
                    && self.consecutive_low >= self.required_low =>
            {
                self.deescalation = Trigger::Fired;
                Some(TransitionRequest {
                    direction: Direction::ToNormal,
                    streak: self.consecutive_low,
                    sample,
                })
            }
            _ => None,
        }
    }

    /// Records the result of acting on `request`.
    ///
    /// Either way the triggering streak restarts from zero and the direction
    /// re-arms, so a failed call is retried only after a full new streak.
    /// The mode is committed only on [`ActuationOutcome::Applied`].
    pub fn resolve(&mut self, request: &TransitionRequest, outcome: ActuationOutcome) {
        match request.direction {
            Direction::ToDefensive => {
                self.consecutive_high = 0;
                self.escalation = Trigger::Armed;
            }
            Direction::ToNormal => {
                self.consecutive_low = 0;
                self.deescalation = Trigger::Armed;
            }
        }

        if outcome == ActuationOutcome::Applied {
            self.mode = request.direction.target();
        }
    }

    /// Commits `Normal` after the remote side was restored outside a streak,
    /// clearing both streaks and re-arming both directions.
    pub fn restore_normal(&mut self) {
        self.mode = DefenseMode::Normal;
        self.consecutive_high = 0;
        self.consecutive_low = 0;
        self.escalation = Trigger::Armed;
        self.deescalation = Trigger::Armed;
    }

    #[must_use]
    pub const fn mode(&self) -> DefenseMode {
        self.mode
    }

    #[must_use]
    pub const fn consecutive_high(&self) -> u32 {
        self.consecutive_high
    }

    #[must_use]
    pub const fn consecutive_low(&self) -> u32 {
        self.consecutive_low
    }

    #[must_use]
    pub const fn escalation_trigger(&self) -> Trigger {
        self.escalation
    }

    #[must_use]
    pub const fn deescalation_trigger(&self) -> Trigger {
        self.deescalation
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }
}
