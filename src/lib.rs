//! tagshelf: a bookmark library organized by folders and tags, with
//! pluggable record stores and LLM-based quality scoring.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod store;
pub mod types;
