//! Board variants and the initial pulse train configuration.
//!
//! Two hardware flavours exist. The Feather M4 build has an RGB status LED and
//! enforces a maximum train duration; the Uno build has neither. Rather than a
//! compile-time switch, the variant is a value so one scheduler and one
//! command dispatcher serve both.

use crate::pulse::{DEFAULT_DURATION_MS, DEFAULT_PERIOD_MS, TrainLimit};

/// Hardware flavour the controller runs on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoardVariant {
    /// Feather M4 Express with TermBlock wing and level shifter.
    FeatherM4,
    /// Arduino Uno with native 5 V outputs.
    Uno,
}

impl BoardVariant {
    /// Returns `true` when the board accepts a maximum train duration.
    #[must_use]
    pub const fn supports_train_limit(self) -> bool {
        matches!(self, BoardVariant::FeatherM4)
    }

    /// Returns `true` when the board carries the RGB status LED.
    #[must_use]
    pub const fn has_status_led(self) -> bool {
        matches!(self, BoardVariant::FeatherM4)
    }

    /// Power-on configuration for this board.
    #[must_use]
    pub const fn default_config(self) -> TrainConfig {
        let limit = if self.supports_train_limit() {
            TrainLimit::Bounded(DEFAULT_DURATION_MS)
        } else {
            TrainLimit::Unbounded
        };

        TrainConfig {
            period_ms: DEFAULT_PERIOD_MS,
            limit,
        }
    }

    /// Short lowercase tag used on command lines and in transcripts.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            BoardVariant::FeatherM4 => "feather",
            BoardVariant::Uno => "uno",
        }
    }

    /// Parses a variant tag (case insensitive).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("feather") || tag.eq_ignore_ascii_case("feather-m4") {
            Some(BoardVariant::FeatherM4)
        } else if tag.eq_ignore_ascii_case("uno") {
            Some(BoardVariant::Uno)
        } else {
            None
        }
    }
}

/// Initial timing configuration handed to the scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrainConfig {
    pub period_ms: u32,
    pub limit: TrainLimit,
}

impl Default for TrainConfig {
    fn default() -> Self {
        BoardVariant::FeatherM4.default_config()
    }
}
