//! REPL tooling shared between firmware and emulator targets.
//!
//! The console grammar lives in [`grammar`] and is implemented with a
//! token/parse pipeline that stays compatible with `no_std`. [`commands`]
//! applies parsed commands to the scheduler and [`console`] renders the
//! replies operators see.

pub mod catalog;
pub mod commands;
pub mod console;
pub mod grammar;
