//! Activity logging: typed events over an append-only JSONL writer with
//! graceful degradation.

pub mod activity;
pub mod jsonl;

pub use activity::{ActivityEvent, ActivityLog};
