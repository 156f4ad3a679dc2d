//! Sera daemon library - exposes modules for testing.

pub mod agents;
pub mod coherence;
pub mod config;
pub mod engine;
pub mod persistence;
pub mod session;
pub mod synthesis;
