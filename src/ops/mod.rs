//! Orchestration of backup, prune and restore runs.

pub mod backup;
pub mod prune;
pub mod restore;
