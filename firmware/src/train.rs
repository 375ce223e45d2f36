//! Shared pulse train state for the firmware tasks.
//!
//! The console task configures the train and the pulse task ticks it. Both go
//! through a blocking mutex so every tick observes a complete configuration.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
#[cfg(target_os = "none")]
use embassy_time::Instant;
#[cfg(target_os = "none")]
use trigger_core::clock::ClockSource;
use trigger_core::pulse::{Notifications, PulseTrainState, TrainSettings};
use trigger_core::repl::commands::PulseControl;

use crate::config::NOTIFY_QUEUE_DEPTH;

#[cfg(target_os = "none")]
pub type TrainMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub type TrainMutex = NoopRawMutex;

/// Mutex-guarded scheduler state.
pub type TrainCell = Mutex<TrainMutex, RefCell<PulseTrainState>>;

/// Notifications produced by console commands, rendered by the pulse task.
pub type NotifyQueue = Channel<TrainMutex, Notifications, NOTIFY_QUEUE_DEPTH>;

/// Builds the power-on train cell for `const` statics.
pub const fn new_train_cell(state: PulseTrainState) -> TrainCell {
    Mutex::new(RefCell::new(state))
}

/// Millisecond view of the embassy monotonic timer.
#[cfg(target_os = "none")]
#[derive(Clone, Copy, Debug, Default)]
pub struct FirmwareClock;

#[cfg(target_os = "none")]
impl ClockSource for FirmwareClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u32 {
        // Truncation reproduces the 2^32 wrap of a 32-bit millisecond counter.
        Instant::now().as_millis() as u32
    }
}

/// [`PulseControl`] handle over the shared train cell.
#[derive(Clone, Copy)]
pub struct SharedTrain<'a> {
    cell: &'a TrainCell,
}

impl<'a> SharedTrain<'a> {
    pub const fn new(cell: &'a TrainCell) -> Self {
        Self { cell }
    }

    /// Advances the scheduler to `now`.
    pub fn tick(&self, now: u32) -> Notifications {
        self.cell.lock(|train| train.borrow_mut().tick(now))
    }

    pub fn is_asserted(&self) -> bool {
        self.cell.lock(|train| train.borrow().is_asserted())
    }
}

impl PulseControl for SharedTrain<'_> {
    fn start(&mut self, now: u32) -> Notifications {
        self.cell.lock(|train| train.borrow_mut().start(now))
    }

    fn stop(&mut self) -> Notifications {
        self.cell.lock(|train| train.borrow_mut().stop())
    }

    fn is_running(&self) -> bool {
        self.cell.lock(|train| train.borrow().is_running())
    }

    fn set_period(&mut self, value: u32) -> u32 {
        self.cell.lock(|train| train.borrow_mut().set_period(value))
    }

    fn set_duration(&mut self, value: u32) -> u32 {
        self.cell.lock(|train| train.borrow_mut().set_duration(value))
    }

    fn settings(&self) -> TrainSettings {
        self.cell.lock(|train| train.borrow().settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_core::config::BoardVariant;
    use trigger_core::pulse::PulseEvent;
    use trigger_core::repl::commands::{CommandExecutor, CommandOutcome};

    fn cell() -> TrainCell {
        new_train_cell(PulseTrainState::new(BoardVariant::FeatherM4.default_config()))
    }

    #[test]
    fn console_commands_reach_the_ticking_state() {
        let cell = cell();
        let ticker = SharedTrain::new(&cell);
        let mut executor = CommandExecutor::new(SharedTrain::new(&cell), BoardVariant::FeatherM4);

        executor.execute("DT20", 0).expect("period accepted");
        let outcome = executor.execute("s", 100).expect("toggle accepted");
        assert!(matches!(outcome, CommandOutcome::Started(_)));
        assert!(ticker.is_asserted());

        assert_eq!(ticker.tick(105).as_slice(), &[PulseEvent::Deasserted]);
        assert_eq!(
            ticker.tick(120).assertion(),
            Some(PulseEvent::Asserted {
                pulse_index: 2,
                elapsed_ms: 20,
                scheduled_ms: 20,
                latency_ms: 0,
            })
        );
    }

    #[test]
    fn stop_through_handle_halts_ticks() {
        let cell = cell();
        let mut handle = SharedTrain::new(&cell);
        let _ = handle.start(0);
        let _ = handle.stop();
        assert!(!handle.is_running());
        assert!(handle.tick(1_000).is_empty());
    }
}
