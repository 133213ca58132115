//! Shared wire definitions for the `Taskdeck` task API.

pub mod envelope;
pub mod task;
