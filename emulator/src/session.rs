use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant as HostInstant;

use trigger_core::clock::{ClockSource, ManualClock, elapsed_ms};
use trigger_core::config::BoardVariant;
use trigger_core::pulse::{Notifications, OutputDriver, PulseTrainState, StatusColor};
use trigger_core::repl::commands::CommandExecutor;
use trigger_core::repl::console::{ConsoleFormatter, LineCollector};

/// Scripted sessions recorded by the transcript capture binary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Normal,
    AutoStop,
    UnoUnsupported,
    Wraparound,
}

impl TranscriptProfile {
    pub const ALL: [TranscriptProfile; 4] = [
        TranscriptProfile::Normal,
        TranscriptProfile::AutoStop,
        TranscriptProfile::UnoUnsupported,
        TranscriptProfile::Wraparound,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            TranscriptProfile::Normal => "normal",
            TranscriptProfile::AutoStop => "auto-stop",
            TranscriptProfile::UnoUnsupported => "uno-unsupported",
            TranscriptProfile::Wraparound => "wraparound",
        }
    }

    pub fn log_path(self) -> String {
        format!("transcripts/emulator-{}.log", self.tag())
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Normal => "Trigger box emulator pulse train transcript",
            TranscriptProfile::AutoStop => "Trigger box emulator duration auto-stop transcript",
            TranscriptProfile::UnoUnsupported => {
                "Trigger box emulator Uno command surface transcript"
            }
            TranscriptProfile::Wraparound => "Trigger box emulator counter wraparound transcript",
        }
    }

    pub fn variant(self) -> BoardVariant {
        match self {
            TranscriptProfile::UnoUnsupported => BoardVariant::Uno,
            _ => BoardVariant::FeatherM4,
        }
    }

    /// Simulated counter value at session start.
    pub fn clock_offset(self) -> u32 {
        match self {
            TranscriptProfile::Wraparound => u32::MAX - 1_500,
            _ => 0,
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| format!("Unknown transcript profile `{tag}`"))
    }
}

/// Host wall clock presented as a wrapping millisecond counter.
pub struct HostClock {
    origin: HostInstant,
    offset: u32,
}

impl HostClock {
    /// Starts counting at `offset`, e.g. just below the wrap point.
    pub fn with_offset(offset: u32) -> Self {
        Self {
            origin: HostInstant::now(),
            offset,
        }
    }
}

impl ClockSource for HostClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u32 {
        // Truncation reproduces the 2^32 wrap of the hardware counter.
        self.offset
            .wrapping_add(self.origin.elapsed().as_millis() as u32)
    }
}

/// Output produced by the session for the terminal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionLine {
    /// Console text, exactly as the firmware would print it.
    Text(String),
    /// Status LED changed colour.
    Status(StatusColor),
}

impl fmt::Display for SessionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionLine::Text(text) => f.write_str(text),
            SessionLine::Status(color) => write!(f, "[status LED: {}]", color.label()),
        }
    }
}

/// Simulated trigger outputs and status LED.
#[derive(Debug)]
pub struct SimulatedOutputs {
    has_status_led: bool,
    level_high: bool,
    rising_edges: u64,
    status: Option<StatusColor>,
    status_changes: Vec<StatusColor>,
}

impl SimulatedOutputs {
    fn new(variant: BoardVariant) -> Self {
        let has_status_led = variant.has_status_led();
        Self {
            has_status_led,
            level_high: false,
            rising_edges: 0,
            status: has_status_led.then_some(StatusColor::Blue),
            status_changes: Vec::new(),
        }
    }

    pub fn is_high(&self) -> bool {
        self.level_high
    }

    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }

    pub fn status(&self) -> Option<StatusColor> {
        self.status
    }
}

impl OutputDriver for SimulatedOutputs {
    fn on_assert(&mut self, _pulse_index: u32, _elapsed_ms: u32) {
        self.level_high = true;
        self.rising_edges += 1;
    }

    fn on_deassert(&mut self) {
        self.level_high = false;
    }

    fn on_run_state_changed(&mut self, running: bool) {
        if !self.has_status_led {
            return;
        }
        let color = StatusColor::for_run_state(running);
        if self.status != Some(color) {
            self.status = Some(color);
            self.status_changes.push(color);
        }
    }
}

/// One emulated trigger box: scheduler, console and simulated outputs.
pub struct Session<C> {
    executor: CommandExecutor<PulseTrainState>,
    formatter: ConsoleFormatter,
    outputs: SimulatedOutputs,
    clock: C,
    started_at: u32,
    collector: LineCollector,
    transcript: Option<TranscriptLogger>,
}

impl<C: ClockSource> Session<C> {
    pub fn new(variant: BoardVariant, clock: C) -> Self {
        let started_at = clock.now_ms();
        Self {
            executor: CommandExecutor::new(PulseTrainState::new(variant.default_config()), variant),
            formatter: ConsoleFormatter::new(variant),
            outputs: SimulatedOutputs::new(variant),
            clock,
            started_at,
            collector: LineCollector::new(),
            transcript: None,
        }
    }

    /// Mirrors all traffic into a transcript file at `path`.
    pub fn with_transcript(mut self, path: &Path, header: &str) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::new(path, header, self.executor.variant())?);
        Ok(self)
    }

    pub fn variant(&self) -> BoardVariant {
        self.executor.variant()
    }

    pub fn outputs(&self) -> &SimulatedOutputs {
        &self.outputs
    }

    pub fn train(&self) -> &PulseTrainState {
        self.executor.control()
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Executes one console line and returns the reply.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Vec<SessionLine>> {
        let now = self.clock.now_ms();
        self.record(now, TranscriptRole::Host, line)?;

        let rendered = match self.executor.execute(line, now) {
            Ok(outcome) => {
                if let Some(notes) = outcome.notifications() {
                    notes.deliver(&mut self.outputs);
                }
                self.formatter.write_outcome(&outcome, &mut self.collector)
            }
            Err(error) => self.formatter.write_error(&error, &mut self.collector),
        };
        rendered.map_err(|_| io::Error::other("console formatting failed"))?;

        self.drain(now)
    }

    /// Advances the scheduler to the current clock reading.
    pub fn poll(&mut self) -> io::Result<Vec<SessionLine>> {
        let now = self.clock.now_ms();
        let notes = self.executor.control_mut().tick(now);
        if notes.is_empty() {
            return Ok(Vec::new());
        }
        self.render_tick(&notes)?;
        self.drain(now)
    }

    fn render_tick(&mut self, notes: &Notifications) -> io::Result<()> {
        notes.deliver(&mut self.outputs);
        self.formatter
            .write_notifications(notes, &mut self.collector)
            .map_err(|_| io::Error::other("console formatting failed"))
    }

    fn drain(&mut self, now: u32) -> io::Result<Vec<SessionLine>> {
        let mut lines: Vec<SessionLine> = self
            .collector
            .take()
            .into_iter()
            .map(SessionLine::Text)
            .collect();
        lines.extend(
            self.outputs
                .status_changes
                .drain(..)
                .map(SessionLine::Status),
        );

        for line in &lines {
            self.record(now, TranscriptRole::Emulator, &line.to_string())?;
        }
        Ok(lines)
    }

    fn record(&mut self, now: u32, role: TranscriptRole, line: &str) -> io::Result<()> {
        let since_start = elapsed_ms(now, self.started_at);
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(since_start, role, line),
            None => Ok(()),
        }
    }
}

impl Session<ManualClock> {
    /// Polls once per simulated millisecond for `millis` milliseconds.
    pub fn run_for(&mut self, millis: u32) -> io::Result<Vec<SessionLine>> {
        let mut lines = Vec::new();
        for _ in 0..millis {
            self.clock.advance(1);
            lines.extend(self.poll()?);
        }
        Ok(lines)
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, header: &str, variant: BoardVariant) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(header, variant)?;
        Ok(logger)
    }

    fn write_header(&mut self, header: &str, variant: BoardVariant) -> io::Result<()> {
        writeln!(self.writer, "# {header}")?;
        writeln!(self.writer, "# Board variant: {}", variant.tag())?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, elapsed_ms: u32, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed_ms,
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[SessionLine]) -> Vec<String> {
        lines
            .iter()
            .filter_map(|line| match line {
                SessionLine::Text(text) => Some(text.clone()),
                SessionLine::Status(_) => None,
            })
            .collect()
    }

    #[test]
    fn start_reports_text_and_status() {
        let mut session = Session::new(BoardVariant::FeatherM4, ManualClock::starting_at(0));
        let reply = session.handle_line("s").expect("session runs in memory");
        assert_eq!(
            reply,
            vec![
                SessionLine::Text("Pulse train started.".to_string()),
                SessionLine::Text("# 1 @ t = 00:00:00.000".to_string()),
                SessionLine::Status(StatusColor::Green),
            ]
        );
        assert!(session.outputs().is_high());

        let lines = session.run_for(5).expect("session runs in memory");
        assert!(lines.is_empty());
        assert!(!session.outputs().is_high());
    }

    #[test]
    fn auto_stop_returns_indicator_to_idle() {
        let mut session = Session::new(BoardVariant::FeatherM4, ManualClock::starting_at(10));
        let _ = session.handle_line("DT100").expect("session runs in memory");
        let _ = session.handle_line("T250").expect("session runs in memory");
        let _ = session.handle_line("s").expect("session runs in memory");

        let lines = session.run_for(400).expect("session runs in memory");
        assert_eq!(
            texts(&lines),
            vec![
                "# 2 @ t = 00:00:00.100",
                "# 3 @ t = 00:00:00.200",
                "Pulse train stopped.",
            ]
        );
        assert_eq!(lines.last(), Some(&SessionLine::Status(StatusColor::Blue)));
        assert_eq!(session.outputs().rising_edges(), 3);
        assert!(!session.train().is_running());
    }

    #[test]
    fn late_poll_logs_actual_edge_time() {
        let mut session = Session::new(BoardVariant::FeatherM4, ManualClock::starting_at(0));
        let _ = session.handle_line("s").expect("session runs in memory");
        let _ = session.run_for(5).expect("session runs in memory");

        session.clock_mut().set(1_013);
        let lines = session.poll().expect("session runs in memory");
        assert_eq!(texts(&lines), vec!["# 2 @ t = 00:00:01.013"]);
        assert!(session.outputs().is_high());
        assert_eq!(session.train().high_phase_start_ms(), 1_000);
    }

    #[test]
    fn uno_has_no_status_led_and_rejects_duration() {
        let mut session = Session::new(BoardVariant::Uno, ManualClock::default());
        assert_eq!(session.outputs().status(), None);

        let reply = session.handle_line("T500").expect("session runs in memory");
        assert!(texts(&reply).iter().any(|line| line == "Commands:"));

        let reply = session.handle_line("s").expect("session runs in memory");
        assert!(reply.iter().all(|line| !matches!(line, SessionLine::Status(_))));
    }

    #[test]
    fn wraparound_keeps_pulse_grid() {
        let mut session = Session::new(
            BoardVariant::FeatherM4,
            ManualClock::starting_at(TranscriptProfile::Wraparound.clock_offset()),
        );
        let _ = session.handle_line("DT500").expect("session runs in memory");
        let _ = session.handle_line("s").expect("session runs in memory");
        let lines = session.run_for(2_000).expect("session runs in memory");
        assert_eq!(
            texts(&lines),
            vec![
                "# 2 @ t = 00:00:00.500",
                "# 3 @ t = 00:00:01.000",
                "# 4 @ t = 00:00:01.500",
                "# 5 @ t = 00:00:02.000",
            ]
        );
    }

    #[test]
    fn profiles_round_trip_through_tags() {
        for profile in TranscriptProfile::ALL {
            assert_eq!(TranscriptProfile::from_tag(profile.tag()), Ok(profile));
        }
        assert!(TranscriptProfile::from_tag("bogus").is_err());
    }
}
