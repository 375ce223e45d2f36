#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the trigger box feature set.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing abstractions the other crates can adopt.

pub mod clock;
pub mod config;
pub mod pulse;
pub mod repl;
