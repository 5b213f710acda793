//! Stream combinators for state subscriptions

pub mod sample;

pub use sample::{Sample, SampleExt};
