//! Compile-time configuration for the trigger box firmware.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_time::Duration;
use trigger_core::config::BoardVariant;

/// Capability preset for this image.
///
/// The image always runs on the STM32G0 pin map in `runtime`; `FeatherM4` only
/// selects the feature set (train limit and RGB status LED). Switch to
/// `BoardVariant::Uno` for a build without either.
pub const BOARD_VARIANT: BoardVariant = BoardVariant::FeatherM4;

/// Scheduler poll period. Must stay below the 5 ms pulse width.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Longest command line accepted from the console (excluding terminator).
pub const MAX_LINE_LEN: usize = 64;

/// Capacity of a single rendered console line, terminator included.
pub const OUTPUT_LINE_LEN: usize = 128;

/// Console lines buffered toward USB. Sized to hold the full usage text.
pub const OUTPUT_QUEUE_DEPTH: usize = 48;

/// USB packets buffered toward the console task.
pub const INPUT_QUEUE_DEPTH: usize = 4;

/// Command notifications buffered toward the pulse task.
pub const NOTIFY_QUEUE_DEPTH: usize = 4;

/// Pulse records retained by the telemetry ring.
pub const TELEMETRY_RING_CAPACITY: usize = 64;
