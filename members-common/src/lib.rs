//! # Members Common Library
//!
//! Shared code for the members service and its administrative tools:
//! - Database initialization, schema and migrations
//! - Record models (subscribers, providers, event messages)
//! - Configuration loading and root folder resolution
//! - Error types
//! - Time utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
