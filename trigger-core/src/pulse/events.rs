//! Notifications emitted by the pulse scheduler and the output seam that
//! renders them.

use heapless::Vec;

/// Upper bound on notifications produced by a single scheduler call.
pub const MAX_NOTIFICATIONS: usize = 4;

/// Edge or run-state change produced by the scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PulseEvent {
    /// Output driven HIGH for pulse `pulse_index`.
    Asserted {
        pulse_index: u32,
        /// Time since the train start at which the edge was driven.
        elapsed_ms: u32,
        /// Start of this pulse on the period grid, relative to the train start.
        scheduled_ms: u32,
        /// How far `now` trailed the scheduled start when the edge was emitted.
        latency_ms: u32,
    },
    /// Output driven LOW.
    Deasserted,
    /// Train started or stopped.
    RunStateChanged { running: bool },
}

/// Ordered notifications from one scheduler call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Notifications {
    events: Vec<PulseEvent, MAX_NOTIFICATIONS>,
}

impl Notifications {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn push(&mut self, event: PulseEvent) {
        // Capacity covers the longest call path (restart mid-pulse).
        let pushed = self.events.push(event);
        debug_assert!(pushed.is_ok(), "notification list overflow");
    }

    /// Returns the events in emission order.
    #[must_use]
    pub fn as_slice(&self) -> &[PulseEvent] {
        &self.events
    }

    /// Returns `true` when the call produced nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Iterates over the events in emission order.
    pub fn iter(&self) -> core::slice::Iter<'_, PulseEvent> {
        self.events.iter()
    }

    /// Returns the first assertion in the list, if any.
    #[must_use]
    pub fn assertion(&self) -> Option<PulseEvent> {
        self.events
            .iter()
            .copied()
            .find(|event| matches!(event, PulseEvent::Asserted { .. }))
    }

    /// Replays every event into `driver`, preserving order.
    pub fn deliver<D: OutputDriver + ?Sized>(&self, driver: &mut D) {
        for event in &self.events {
            match *event {
                PulseEvent::Asserted {
                    pulse_index,
                    elapsed_ms,
                    ..
                } => driver.on_assert(pulse_index, elapsed_ms),
                PulseEvent::Deasserted => driver.on_deassert(),
                PulseEvent::RunStateChanged { running } => driver.on_run_state_changed(running),
            }
        }
    }
}

impl<'a> IntoIterator for &'a Notifications {
    type Item = &'a PulseEvent;
    type IntoIter = core::slice::Iter<'a, PulseEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Abstraction over the physical trigger outputs and status indicator.
///
/// Implementations must not block: they run inside the polling loop.
pub trait OutputDriver {
    /// Drives the trigger lines HIGH for pulse `pulse_index`.
    fn on_assert(&mut self, pulse_index: u32, elapsed_ms: u32);

    /// Drives the trigger lines LOW.
    fn on_deassert(&mut self);

    /// Renders the running/idle indicator.
    fn on_run_state_changed(&mut self, running: bool);
}

/// Colour shown on the RGB status LED.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusColor {
    /// Idle.
    Blue,
    /// Pulse train running.
    Green,
}

impl StatusColor {
    /// Maps the run flag onto the indicator colour.
    #[must_use]
    pub const fn for_run_state(running: bool) -> Self {
        if running {
            StatusColor::Green
        } else {
            StatusColor::Blue
        }
    }

    /// RGB triple for the LED, full scale.
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            StatusColor::Blue => (0, 0, 255),
            StatusColor::Green => (0, 255, 0),
        }
    }

    /// Lowercase colour name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingDriver {
        calls: Vec<&'static str, 8>,
        last_index: Option<u32>,
    }

    impl OutputDriver for RecordingDriver {
        fn on_assert(&mut self, pulse_index: u32, _elapsed_ms: u32) {
            self.last_index = Some(pulse_index);
            let _ = self.calls.push("assert");
        }

        fn on_deassert(&mut self) {
            let _ = self.calls.push("deassert");
        }

        fn on_run_state_changed(&mut self, running: bool) {
            let _ = self.calls.push(if running { "running" } else { "idle" });
        }
    }

    #[test]
    fn deliver_preserves_emission_order() {
        let mut notes = Notifications::new();
        notes.push(PulseEvent::Deasserted);
        notes.push(PulseEvent::Asserted {
            pulse_index: 4,
            elapsed_ms: 3_000,
            scheduled_ms: 3_000,
            latency_ms: 0,
        });
        notes.push(PulseEvent::RunStateChanged { running: true });

        let mut driver = RecordingDriver::default();
        notes.deliver(&mut driver);

        assert_eq!(driver.calls.as_slice(), &["deassert", "assert", "running"]);
        assert_eq!(driver.last_index, Some(4));
    }

    #[test]
    fn status_color_tracks_run_state() {
        assert_eq!(StatusColor::for_run_state(true), StatusColor::Green);
        assert_eq!(StatusColor::for_run_state(false), StatusColor::Blue);
        assert_eq!(StatusColor::Blue.rgb(), (0, 0, 255));
    }
}
