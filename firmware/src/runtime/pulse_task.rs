use embassy_time::Ticker;
use trigger_core::clock::ClockSource;
use trigger_core::pulse::Notifications;
use trigger_core::repl::console::ConsoleFormatter;

use super::{NOTIFY_QUEUE, OUTPUT_QUEUE, TRAIN};
use crate::config::{BOARD_VARIANT, POLL_INTERVAL};
use crate::console::{self, QueueSink};
use crate::hw::HardwareOutputs;
use crate::telemetry::TelemetryRecorder;
use crate::train::{FirmwareClock, SharedTrain};

#[embassy_executor::task]
pub async fn run(mut outputs: HardwareOutputs<'static>, mut telemetry: TelemetryRecorder) -> ! {
    let clock = FirmwareClock;
    let train = SharedTrain::new(&TRAIN);
    let notices = NOTIFY_QUEUE.receiver();
    let formatter = ConsoleFormatter::new(BOARD_VARIANT);
    let mut sink = QueueSink::new(OUTPUT_QUEUE.sender());
    let mut ticker = Ticker::every(POLL_INTERVAL);

    loop {
        // Edges from console start/stop are rendered before the next tick so
        // the outputs never skip a transition.
        while let Ok(notes) = notices.try_receive() {
            render(&notes, clock.now_ms(), &mut outputs, &mut telemetry);
        }

        let now = clock.now_ms();
        let notes = train.tick(now);
        if !notes.is_empty() {
            render(&notes, now, &mut outputs, &mut telemetry);
            if formatter.write_notifications(&notes, &mut sink).is_err() {
                defmt::warn!("pulse: console line too long");
            }
        }

        let dropped = console::take_dropped_lines();
        if dropped > 0 {
            defmt::warn!("pulse: dropped {} console lines", dropped);
        }

        ticker.next().await;
    }
}

fn render(
    notes: &Notifications,
    now: u32,
    outputs: &mut HardwareOutputs<'static>,
    telemetry: &mut TelemetryRecorder,
) {
    notes.deliver(outputs);
    telemetry.record(notes, now);
}
