use trigger_core::clock::ClockSource;
use trigger_core::repl::commands::CommandExecutor;
use trigger_core::repl::console::ConsoleFormatter;

use super::{INPUT_QUEUE, NOTIFY_QUEUE, OUTPUT_QUEUE, TRAIN};
use crate::config::BOARD_VARIANT;
use crate::console::{ConsoleError, LineBuffer, QueueSink};
use crate::train::{FirmwareClock, SharedTrain};

#[embassy_executor::task]
pub async fn run() -> ! {
    let clock = FirmwareClock;
    let input = INPUT_QUEUE.receiver();
    let notify = NOTIFY_QUEUE.sender();
    let formatter = ConsoleFormatter::new(BOARD_VARIANT);
    let mut sink = QueueSink::new(OUTPUT_QUEUE.sender());
    let mut executor = CommandExecutor::new(SharedTrain::new(&TRAIN), BOARD_VARIANT);
    let mut line = LineBuffer::new();

    loop {
        let frame = input.receive().await;
        for &byte in &frame {
            let command = match line.push(byte) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(ConsoleError::LineOverflow) => {
                    defmt::warn!("console: line overflow, discarding input");
                    continue;
                }
                Err(ConsoleError::InvalidUtf8) => {
                    defmt::warn!("console: dropping non UTF-8 line");
                    let _ = formatter.write_usage(&mut sink);
                    continue;
                }
            };

            let rendered = match executor.execute(command, clock.now_ms()) {
                Ok(outcome) => {
                    let rendered = formatter.write_outcome(&outcome, &mut sink);
                    if let Some(notes) = outcome.notifications() {
                        notify.send(notes.clone()).await;
                    }
                    rendered
                }
                Err(error) => {
                    defmt::debug!("console: rejected `{}`", command);
                    formatter.write_error(&error, &mut sink)
                }
            };

            if rendered.is_err() {
                defmt::warn!("console: reply truncated");
            }
        }
    }
}
