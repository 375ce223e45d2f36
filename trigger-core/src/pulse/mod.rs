//! Pulse train timing state machine.
//!
//! The scheduler converts a free-running millisecond counter into strictly
//! periodic HIGH/LOW transitions. The phase reference advances by exactly one
//! period per pulse, never to the sampled `now`, so polling jitter never
//! accumulates into period error. Every timestamp comparison goes through
//! [`elapsed_ms`] and therefore survives the 2^32 counter wrap.
//!
//! Callers sample the clock, call [`PulseTrainState::tick`] and hand the
//! returned [`Notifications`] to an [`OutputDriver`].

use crate::clock::elapsed_ms;
use crate::config::TrainConfig;

mod events;

pub use events::{MAX_NOTIFICATIONS, Notifications, OutputDriver, PulseEvent, StatusColor};

/// HIGH time of every pulse.
pub const PULSE_WIDTH_MS: u32 = 5;

/// Shortest accepted period. Must stay above [`PULSE_WIDTH_MS`].
pub const MIN_PERIOD_MS: u32 = 10;

/// Shortest accepted train duration.
pub const MIN_DURATION_MS: u32 = 10;

/// Period applied at power-on.
pub const DEFAULT_PERIOD_MS: u32 = 1_000;

/// Train duration applied at power-on on boards with a train limit (8 hours).
pub const DEFAULT_DURATION_MS: u32 = 8 * 3_600 * 1_000;

const _: () = assert!(PULSE_WIDTH_MS < MIN_PERIOD_MS);

/// Maximum length of a pulse train.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrainLimit {
    /// Runs until stopped by the operator.
    Unbounded,
    /// Stops automatically once this many milliseconds have elapsed.
    Bounded(u32),
}

impl TrainLimit {
    /// Returns the bound in milliseconds, if any.
    #[must_use]
    pub const fn duration_ms(self) -> Option<u32> {
        match self {
            TrainLimit::Unbounded => None,
            TrainLimit::Bounded(ms) => Some(ms),
        }
    }
}

/// Clamps a requested period into the supported range.
#[must_use]
pub const fn clamp_period(value: u32) -> u32 {
    if value < MIN_PERIOD_MS {
        MIN_PERIOD_MS
    } else {
        value
    }
}

/// Clamps a requested train duration into the supported range.
#[must_use]
pub const fn clamp_duration(value: u32) -> u32 {
    if value < MIN_DURATION_MS {
        MIN_DURATION_MS
    } else {
        value
    }
}

/// Read-only view used by the `?` command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrainSettings {
    pub period_ms: u32,
    pub limit: TrainLimit,
    pub running: bool,
    pub pulse_index: u32,
}

/// Complete timing state of the trigger outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseTrainState {
    period_ms: u32,
    limit: TrainLimit,
    running: bool,
    train_start_ms: u32,
    high_phase_start_ms: u32,
    pulse_index: u32,
    asserted: bool,
}

impl PulseTrainState {
    /// Creates an idle train from the supplied configuration.
    #[must_use]
    pub const fn new(config: TrainConfig) -> Self {
        let limit = match config.limit {
            TrainLimit::Unbounded => TrainLimit::Unbounded,
            TrainLimit::Bounded(ms) => TrainLimit::Bounded(clamp_duration(ms)),
        };

        Self {
            period_ms: clamp_period(config.period_ms),
            limit,
            running: false,
            train_start_ms: 0,
            high_phase_start_ms: 0,
            pulse_index: 0,
            asserted: false,
        }
    }

    /// Starts (or restarts) a train at `now`; pulse #1 is emitted immediately.
    pub fn start(&mut self, now: u32) -> Notifications {
        let mut notes = Notifications::new();
        if self.asserted {
            self.asserted = false;
            notes.push(PulseEvent::Deasserted);
        }

        self.running = true;
        self.train_start_ms = now;
        self.high_phase_start_ms = now;
        self.pulse_index = 0;

        notes.push(self.emit_assertion(now));
        notes.push(PulseEvent::RunStateChanged { running: true });
        notes
    }

    /// Stops the train and forces the outputs LOW. Safe to call when idle.
    pub fn stop(&mut self) -> Notifications {
        let mut notes = Notifications::new();
        self.asserted = false;
        self.running = false;
        notes.push(PulseEvent::Deasserted);
        notes.push(PulseEvent::RunStateChanged { running: false });
        notes
    }

    /// Stores a new period, clamped to at least [`MIN_PERIOD_MS`].
    ///
    /// The phase reference is left untouched; the new period applies from the
    /// next boundary computed against it.
    pub fn set_period(&mut self, value: u32) -> u32 {
        self.period_ms = clamp_period(value);
        self.period_ms
    }

    /// Stores a bounded train duration, clamped to at least [`MIN_DURATION_MS`].
    pub fn set_duration(&mut self, value: u32) -> u32 {
        let duration = clamp_duration(value);
        self.limit = TrainLimit::Bounded(duration);
        duration
    }

    /// Removes the train duration bound.
    pub fn clear_duration(&mut self) {
        self.limit = TrainLimit::Unbounded;
    }

    /// Advances the state machine to `now`.
    ///
    /// Must be called more often than [`PULSE_WIDTH_MS`] to keep the pulse
    /// width exact.
    pub fn tick(&mut self, now: u32) -> Notifications {
        if !self.running {
            return Notifications::new();
        }

        if let TrainLimit::Bounded(duration) = self.limit
            && elapsed_ms(now, self.train_start_ms) >= duration
        {
            return self.stop();
        }

        let mut notes = Notifications::new();
        let since_phase = elapsed_ms(now, self.high_phase_start_ms);

        if self.asserted && since_phase >= PULSE_WIDTH_MS {
            self.asserted = false;
            notes.push(PulseEvent::Deasserted);
        }

        if since_phase >= self.period_ms {
            self.high_phase_start_ms = self.high_phase_start_ms.wrapping_add(self.period_ms);
            notes.push(self.emit_assertion(now));
        }

        notes
    }

    fn emit_assertion(&mut self, now: u32) -> PulseEvent {
        self.asserted = true;
        self.pulse_index = self.pulse_index.wrapping_add(1);
        PulseEvent::Asserted {
            pulse_index: self.pulse_index,
            elapsed_ms: elapsed_ms(now, self.train_start_ms),
            scheduled_ms: elapsed_ms(self.high_phase_start_ms, self.train_start_ms),
            latency_ms: elapsed_ms(now, self.high_phase_start_ms),
        }
    }

    /// Snapshot for display.
    #[must_use]
    pub const fn settings(&self) -> TrainSettings {
        TrainSettings {
            period_ms: self.period_ms,
            limit: self.limit,
            running: self.running,
            pulse_index: self.pulse_index,
        }
    }

    #[must_use]
    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    #[must_use]
    pub const fn limit(&self) -> TrainLimit {
        self.limit
    }

    #[must_use]
    pub const fn pulse_width_ms(&self) -> u32 {
        PULSE_WIDTH_MS
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn is_asserted(&self) -> bool {
        self.asserted
    }

    #[must_use]
    pub const fn pulse_index(&self) -> u32 {
        self.pulse_index
    }

    #[must_use]
    pub const fn train_start_ms(&self) -> u32 {
        self.train_start_ms
    }

    #[must_use]
    pub const fn high_phase_start_ms(&self) -> u32 {
        self.high_phase_start_ms
    }
}

impl Default for PulseTrainState {
    fn default() -> Self {
        Self::new(TrainConfig::default())
    }
}
