//! Polling worker.
//!
//! - `matcher` — ordered, case-insensitive keyword matching
//! - `state` — loop state machine (Idle → FetchingMail → … → Sleeping)
//! - `poller` — the fetch / match / download / archive cycle and its loop

pub mod matcher;
pub mod poller;
pub mod state;

pub use matcher::{KeywordMatch, KeywordMatcher};
pub use poller::{CycleReport, DownloadRecord, Poller, PollerConfig, spawn_harvester};
pub use state::WorkerState;
