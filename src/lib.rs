//! Ripvault - optical disc ripping and archiving service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod app;
pub mod cache;
pub mod config;
pub mod drive;
pub mod ingest;
pub mod jsonfile;
pub mod metadata;
pub mod migrate;
pub mod processor;
pub mod workflow;
