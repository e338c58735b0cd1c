//! Database access layer for members-api
//!
//! Subscriber and provider queries over the shared schema created by
//! `members_common::db::init_database`.

pub mod providers;
pub mod subscribers;
