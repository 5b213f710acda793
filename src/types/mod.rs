//! Value types shared between the ingest loop and its callers.
//!
//! - [`DecoderState`]: latest timestamp and device state from encoder records
//! - [`RecordCounters`]: per-kind record counts for diagnostics
//! - [`UpdateRate`]: sampling rate for state subscriptions

mod state;
mod update_rate;

pub use state::{DecoderState, RecordCounters};
pub use update_rate::UpdateRate;
