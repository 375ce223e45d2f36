//! High-level REPL command dispatcher.
//!
//! This module glues parsed console commands to the pulse scheduler through
//! the [`PulseControl`] seam. It stays `no_std` friendly so the firmware and
//! emulator crates can share the same implementation.

use core::fmt;

use crate::config::BoardVariant;
use crate::pulse::{Notifications, PulseTrainState, TrainSettings};

use super::grammar::{self, Command};

/// Command execution successes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// `?` answered with a settings snapshot.
    Settings(TrainSettings),
    /// Period stored after clamping.
    PeriodSet(u32),
    /// Train duration stored after clamping.
    DurationSet(u32),
    /// Train started; the notifications still need to reach the outputs.
    Started(Notifications),
    /// Train stopped; the notifications still need to reach the outputs.
    Stopped(Notifications),
}

impl CommandOutcome {
    /// Notifications the caller must forward to its output driver, if any.
    #[must_use]
    pub fn notifications(&self) -> Option<&Notifications> {
        match self {
            CommandOutcome::Started(notes) | CommandOutcome::Stopped(notes) => Some(notes),
            _ => None,
        }
    }
}

/// Errors surfaced while executing a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    Unsupported(&'static str),
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => err.fmt(f),
            CommandError::Unsupported(what) => write!(f, "{what} is not supported on this board"),
        }
    }
}

/// Control surface of the pulse scheduler used by the dispatcher.
pub trait PulseControl {
    fn start(&mut self, now: u32) -> Notifications;

    fn stop(&mut self) -> Notifications;

    fn is_running(&self) -> bool;

    /// Stores a clamped period and returns the stored value.
    fn set_period(&mut self, value: u32) -> u32;

    /// Stores a clamped train duration and returns the stored value.
    fn set_duration(&mut self, value: u32) -> u32;

    fn settings(&self) -> TrainSettings;
}

impl PulseControl for PulseTrainState {
    fn start(&mut self, now: u32) -> Notifications {
        PulseTrainState::start(self, now)
    }

    fn stop(&mut self) -> Notifications {
        PulseTrainState::stop(self)
    }

    fn is_running(&self) -> bool {
        PulseTrainState::is_running(self)
    }

    fn set_period(&mut self, value: u32) -> u32 {
        PulseTrainState::set_period(self, value)
    }

    fn set_duration(&mut self, value: u32) -> u32 {
        PulseTrainState::set_duration(self, value)
    }

    fn settings(&self) -> TrainSettings {
        PulseTrainState::settings(self)
    }
}

impl<T: PulseControl + ?Sized> PulseControl for &mut T {
    fn start(&mut self, now: u32) -> Notifications {
        (**self).start(now)
    }

    fn stop(&mut self) -> Notifications {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn set_period(&mut self, value: u32) -> u32 {
        (**self).set_period(value)
    }

    fn set_duration(&mut self, value: u32) -> u32 {
        (**self).set_duration(value)
    }

    fn settings(&self) -> TrainSettings {
        (**self).settings()
    }
}

/// Dispatches console commands into the pulse scheduler.
pub struct CommandExecutor<S> {
    control: S,
    variant: BoardVariant,
}

impl<S> CommandExecutor<S> {
    /// Creates a new executor around the provided scheduler handle.
    pub const fn new(control: S, variant: BoardVariant) -> Self {
        Self { control, variant }
    }

    pub const fn variant(&self) -> BoardVariant {
        self.variant
    }

    /// Returns an immutable reference to the underlying scheduler.
    pub fn control(&self) -> &S {
        &self.control
    }

    /// Returns a mutable reference to the underlying scheduler.
    pub fn control_mut(&mut self) -> &mut S {
        &mut self.control
    }
}

impl<S> CommandExecutor<S>
where
    S: PulseControl,
{
    /// Parses and executes a console command.
    pub fn execute<'a>(
        &mut self,
        line: &'a str,
        now: u32,
    ) -> Result<CommandOutcome, CommandError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command, now)
    }

    /// Executes an already parsed command.
    pub fn dispatch<'a>(
        &mut self,
        command: Command,
        now: u32,
    ) -> Result<CommandOutcome, CommandError<'a>> {
        match command {
            Command::Query => Ok(CommandOutcome::Settings(self.control.settings())),
            Command::SetPeriod(value) => Ok(CommandOutcome::PeriodSet(
                self.control.set_period(value),
            )),
            Command::SetDuration(value) => {
                if !self.variant.supports_train_limit() {
                    return Err(CommandError::Unsupported("T"));
                }
                Ok(CommandOutcome::DurationSet(self.control.set_duration(value)))
            }
            Command::Toggle => {
                if self.control.is_running() {
                    Ok(CommandOutcome::Stopped(self.control.stop()))
                } else {
                    Ok(CommandOutcome::Started(self.control.start(now)))
                }
            }
        }
    }
}
