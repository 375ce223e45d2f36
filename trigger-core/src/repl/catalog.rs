//! Static usage text and command table shown by the console.
//!
//! Every line carries a [`Gate`] so boards without a train limit or RGB
//! status LED never advertise features they lack.

use crate::config::BoardVariant;

/// Board capability a piece of help text depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    Always,
    TrainLimit,
    StatusLed,
}

impl Gate {
    #[must_use]
    pub const fn allows(self, variant: BoardVariant) -> bool {
        match self {
            Gate::Always => true,
            Gate::TrainLimit => variant.supports_train_limit(),
            Gate::StatusLed => variant.has_status_led(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsageLine {
    pub text: &'static str,
    pub gate: Gate,
}

const fn always(text: &'static str) -> UsageLine {
    UsageLine {
        text,
        gate: Gate::Always,
    }
}

const fn gated(gate: Gate, text: &'static str) -> UsageLine {
    UsageLine { text, gate }
}

const RULE: &str = "-------------------------------------------------------------------";

/// Banner, waveform diagram and feature notes.
pub const USAGE: &[UsageLine] = &[
    always(RULE),
    always("  Trigger box"),
    always(""),
    always("  A configurable TTL pulse train generator on the two camera"),
    always("  trigger outputs. Can be used to e.g. trigger cameras to acquire"),
    always("  pictures in sync with each other using the camera's trigger-in"),
    always("  port."),
    always(RULE),
    always(""),
    always("  <5ms>"),
    always("  ┌───┐      ┌───┐      ┌───┐"),
    always("  │   │      │   │      │   │"),
    always("  │   │      │   │      │   │"),
    always("  ┘   └──────┘   └──────┘   └────── --> T_meas"),
    always("  <    DT    >"),
    always(""),
    always("  * The pulse period `DT` can be set from 10 msec upwards to hours"),
    always("    with a resolution of 1 msec."),
    gated(Gate::TrainLimit, ""),
    gated(
        Gate::TrainLimit,
        "  * The duration of the pulse train `T_meas`, i.e. the measurement",
    ),
    gated(
        Gate::TrainLimit,
        "    time, can be set up to a maximum of 49.7 days.",
    ),
    gated(Gate::StatusLed, ""),
    gated(Gate::StatusLed, "  * The RGB LED indicates the status."),
    gated(Gate::StatusLed, "    Blue : Idle"),
    gated(Gate::StatusLed, "    Green: Running pulse train"),
    always(""),
    always("  * The pulse LED flashes with each pulse."),
    always(""),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub gate: Gate,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "?",
        summary: "Show current settings",
        gate: Gate::Always,
    },
    CommandSpec {
        name: "DT...",
        summary: "Set the pulse interval `DT` to ... msecs",
        gate: Gate::Always,
    },
    CommandSpec {
        name: "T...",
        summary: "Set the measurement time `T_meas` to ... msecs",
        gate: Gate::TrainLimit,
    },
    CommandSpec {
        name: "s",
        summary: "Start / stop",
        gate: Gate::Always,
    },
];

/// Usage lines applicable to `variant`, in display order.
pub fn usage_lines(variant: BoardVariant) -> impl Iterator<Item = &'static str> {
    USAGE
        .iter()
        .filter(move |line| line.gate.allows(variant))
        .map(|line| line.text)
}

/// Commands accepted on `variant`.
pub fn commands(variant: BoardVariant) -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS
        .iter()
        .filter(move |spec| spec.gate.allows(variant))
}
