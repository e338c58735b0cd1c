//! members-sweep library - retention cleanup of event messages

pub mod sweeper;

pub use sweeper::{cutoff, SweepReport, Sweeper};
