//! Console text shared by the firmware and emulator front-ends.
//!
//! Output is produced one line at a time through [`ConsoleSink`] so the
//! firmware can queue bounded USB packets while the host prints directly.
//! Line terminators are left to the sink.

use core::fmt;

use crate::config::BoardVariant;
use crate::pulse::{Notifications, PulseEvent, TrainSettings};

use super::catalog;
use super::commands::{CommandError, CommandOutcome};

pub const STARTED_LINE: &str = "Pulse train started.";
pub const STOPPED_LINE: &str = "Pulse train stopped.";

/// Receives rendered console lines without terminators.
pub trait ConsoleSink {
    fn write_line(&mut self, line: fmt::Arguments<'_>) -> fmt::Result;
}

impl<T: ConsoleSink + ?Sized> ConsoleSink for &mut T {
    fn write_line(&mut self, line: fmt::Arguments<'_>) -> fmt::Result {
        (**self).write_line(line)
    }
}

/// Millisecond count rendered as `HH:MM:SS.mmm`.
///
/// Hours are not wrapped at 24, so the full counter range (about 1193 hours)
/// stays readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MillisFormatter(pub u32);

impl fmt::Display for MillisFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.0 / 1_000;
        let hours = total_secs / 3_600;
        let minutes = (total_secs % 3_600) / 60;
        let seconds = total_secs % 60;
        let millis = self.0 % 1_000;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    }
}

/// Renders command outcomes, pulse edges and the usage text for one board.
#[derive(Clone, Copy, Debug)]
pub struct ConsoleFormatter {
    variant: BoardVariant,
}

impl ConsoleFormatter {
    #[must_use]
    pub const fn new(variant: BoardVariant) -> Self {
        Self { variant }
    }

    /// Writes the reply to a successfully executed command.
    pub fn write_outcome<S: ConsoleSink + ?Sized>(
        &self,
        outcome: &CommandOutcome,
        sink: &mut S,
    ) -> fmt::Result {
        match outcome {
            CommandOutcome::Settings(settings) => self.write_settings(settings, sink),
            CommandOutcome::PeriodSet(period) => write_period(*period, sink),
            CommandOutcome::DurationSet(duration) => write_duration(*duration, sink),
            CommandOutcome::Started(notes) => {
                sink.write_line(format_args!("{STARTED_LINE}"))?;
                write_assertions(notes, sink)
            }
            CommandOutcome::Stopped(_) => sink.write_line(format_args!("{STOPPED_LINE}")),
        }
    }

    /// Any rejected command answers with the usage text.
    pub fn write_error<S: ConsoleSink + ?Sized>(
        &self,
        _error: &CommandError<'_>,
        sink: &mut S,
    ) -> fmt::Result {
        self.write_usage(sink)
    }

    /// Writes the lines for notifications produced by a scheduler tick.
    ///
    /// Train starts are announced by [`Self::write_outcome`], so only
    /// assertions and stops are rendered here.
    pub fn write_notifications<S: ConsoleSink + ?Sized>(
        &self,
        notes: &Notifications,
        sink: &mut S,
    ) -> fmt::Result {
        for event in notes {
            match *event {
                PulseEvent::Asserted {
                    pulse_index,
                    elapsed_ms,
                    ..
                } => write_pulse(pulse_index, elapsed_ms, sink)?,
                PulseEvent::RunStateChanged { running: false } => {
                    sink.write_line(format_args!("{STOPPED_LINE}"))?;
                }
                PulseEvent::RunStateChanged { running: true } | PulseEvent::Deasserted => {}
            }
        }
        Ok(())
    }

    pub fn write_settings<S: ConsoleSink + ?Sized>(
        &self,
        settings: &TrainSettings,
        sink: &mut S,
    ) -> fmt::Result {
        sink.write_line(format_args!("Current settings:"))?;
        write_period(settings.period_ms, sink)?;
        if self.variant.supports_train_limit() {
            write_duration(settings.limit.duration_ms().unwrap_or(u32::MAX), sink)?;
        }
        Ok(())
    }

    pub fn write_usage<S: ConsoleSink + ?Sized>(&self, sink: &mut S) -> fmt::Result {
        for line in catalog::usage_lines(self.variant) {
            sink.write_line(format_args!("{line}"))?;
        }
        sink.write_line(format_args!("Commands:"))?;
        for spec in catalog::commands(self.variant) {
            sink.write_line(format_args!("  {:<5} : {}", spec.name, spec.summary))?;
        }
        sink.write_line(format_args!(""))
    }
}

fn write_period<S: ConsoleSink + ?Sized>(period_ms: u32, sink: &mut S) -> fmt::Result {
    sink.write_line(format_args!("  DT     = {}", MillisFormatter(period_ms)))
}

fn write_duration<S: ConsoleSink + ?Sized>(duration_ms: u32, sink: &mut S) -> fmt::Result {
    sink.write_line(format_args!("  T_meas = {}", MillisFormatter(duration_ms)))
}

fn write_pulse<S: ConsoleSink + ?Sized>(
    pulse_index: u32,
    elapsed_ms: u32,
    sink: &mut S,
) -> fmt::Result {
    sink.write_line(format_args!(
        "# {pulse_index} @ t = {}",
        MillisFormatter(elapsed_ms)
    ))
}

fn write_assertions<S: ConsoleSink + ?Sized>(notes: &Notifications, sink: &mut S) -> fmt::Result {
    for event in notes {
        if let PulseEvent::Asserted {
            pulse_index,
            elapsed_ms,
            ..
        } = *event
        {
            write_pulse(pulse_index, elapsed_ms, sink)?;
        }
    }
    Ok(())
}

#[cfg(feature = "alloc")]
pub use self::collector::LineCollector;

#[cfg(feature = "alloc")]
mod collector {
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::fmt::{self, Write as _};

    use super::ConsoleSink;

    /// Sink that keeps every rendered line in memory.
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct LineCollector {
        lines: Vec<String>,
    }

    impl LineCollector {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn lines(&self) -> &[String] {
            &self.lines
        }

        /// Removes and returns the collected lines.
        pub fn take(&mut self) -> Vec<String> {
            core::mem::take(&mut self.lines)
        }
    }

    impl ConsoleSink for LineCollector {
        fn write_line(&mut self, line: fmt::Arguments<'_>) -> fmt::Result {
            let mut rendered = String::new();
            rendered.write_fmt(line)?;
            self.lines.push(rendered);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write as _;

    use super::*;
    use crate::pulse::{PulseTrainState, TrainLimit};

    type Line = heapless::String<160>;

    #[derive(Default)]
    struct Capture {
        lines: heapless::Vec<Line, 64>,
    }

    impl ConsoleSink for Capture {
        fn write_line(&mut self, line: fmt::Arguments<'_>) -> fmt::Result {
            let mut rendered = Line::new();
            rendered.write_fmt(line)?;
            self.lines.push(rendered).map_err(|_| fmt::Error)
        }
    }

    impl Capture {
        fn texts(&self) -> heapless::Vec<&str, 64> {
            self.lines.iter().map(Line::as_str).collect()
        }
    }

    fn render(value: u32) -> heapless::String<24> {
        let mut out = heapless::String::new();
        write!(out, "{}", MillisFormatter(value)).expect("buffer is large enough");
        out
    }

    #[test]
    fn formats_milliseconds() {
        assert_eq!(render(0).as_str(), "00:00:00.000");
        assert_eq!(render(1_000).as_str(), "00:00:01.000");
        assert_eq!(render(3_723_004).as_str(), "01:02:03.004");
        assert_eq!(render(28_800_000).as_str(), "08:00:00.000");
        assert_eq!(render(u32::MAX).as_str(), "1193:02:47.295");
    }

    #[test]
    fn settings_include_duration_only_on_feather() {
        let settings = TrainSettings {
            period_ms: 250,
            limit: TrainLimit::Bounded(60_000),
            running: false,
            pulse_index: 0,
        };

        let mut feather = Capture::default();
        ConsoleFormatter::new(BoardVariant::FeatherM4)
            .write_settings(&settings, &mut feather)
            .expect("capture has room");
        assert_eq!(
            feather.texts().as_slice(),
            &[
                "Current settings:",
                "  DT     = 00:00:00.250",
                "  T_meas = 00:01:00.000",
            ]
        );

        let mut uno = Capture::default();
        ConsoleFormatter::new(BoardVariant::Uno)
            .write_settings(&settings, &mut uno)
            .expect("capture has room");
        assert_eq!(
            uno.texts().as_slice(),
            &["Current settings:", "  DT     = 00:00:00.250"]
        );
    }

    #[test]
    fn start_announces_before_first_pulse() {
        let mut state = PulseTrainState::default();
        let outcome = CommandOutcome::Started(state.start(500));
        let mut capture = Capture::default();
        ConsoleFormatter::new(BoardVariant::FeatherM4)
            .write_outcome(&outcome, &mut capture)
            .expect("capture has room");
        assert_eq!(
            capture.texts().as_slice(),
            &["Pulse train started.", "# 1 @ t = 00:00:00.000"]
        );
    }

    #[test]
    fn tick_notifications_render_pulses_and_stops() {
        let mut state = PulseTrainState::default();
        let _ = state.start(0);
        let formatter = ConsoleFormatter::new(BoardVariant::FeatherM4);
        let mut capture = Capture::default();

        formatter
            .write_notifications(&state.tick(5), &mut capture)
            .expect("capture has room");
        assert!(capture.lines.is_empty());

        formatter
            .write_notifications(&state.tick(1_000), &mut capture)
            .expect("capture has room");
        formatter
            .write_notifications(&state.stop(), &mut capture)
            .expect("capture has room");
        assert_eq!(
            capture.texts().as_slice(),
            &["# 2 @ t = 00:00:01.000", "Pulse train stopped."]
        );
    }

    #[test]
    fn usage_table_matches_board() {
        let mut feather = Capture::default();
        ConsoleFormatter::new(BoardVariant::FeatherM4)
            .write_usage(&mut feather)
            .expect("capture has room");
        let texts = feather.texts();
        assert!(texts.contains(&"Commands:"));
        assert!(texts.contains(&"  ?     : Show current settings"));
        assert!(texts.contains(&"  DT... : Set the pulse interval `DT` to ... msecs"));
        assert!(texts.contains(&"  T...  : Set the measurement time `T_meas` to ... msecs"));
        assert!(texts.contains(&"  s     : Start / stop"));

        let mut uno = Capture::default();
        ConsoleFormatter::new(BoardVariant::Uno)
            .write_usage(&mut uno)
            .expect("capture has room");
        assert!(uno.texts().iter().all(|line| !line.starts_with("  T...")));
    }
}
