//! Source operation dependency updater.
//!
//! This crate provides the two halves of an automated dependency update:
//! - `autoupdate`: finds dependency manifests, runs their updaters and
//!   commits changed lock files
//! - `trigger`: prepares a dedicated update environment through the hosting
//!   platform CLI, runs the update as a source operation, then restores the
//!   environment's previous state

pub mod autoupdate;
pub mod command;
pub mod config;
pub mod constants;
pub mod discover;
pub mod git;
pub mod output;
pub mod platform;
pub mod trigger;
pub mod updaters;
