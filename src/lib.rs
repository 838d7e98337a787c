//! Synchronize a calibre e-book library to an e-reader cloud.
//!
//! The [`catalog`] module flattens calibre's `metadata.db` into [`catalog::Book`]
//! records, [`cloud`] wraps the remote client in a login/registration bracket,
//! and [`sync`] diffs the two and drives the uploads.

pub mod catalog;
pub mod cloud;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod shell;
pub mod sync;
