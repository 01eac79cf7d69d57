//! Timeline analysis.
//!
//! Aggregation, the shared interruption primitive and the speaking-time
//! analyzer. Everything here is pure and operates on in-memory data.

pub mod aggregator;
pub mod interruptions;
pub mod speaking_time;

pub use aggregator::*;
pub use interruptions::{detect_interruptions, InterruptionEvent, InterruptionTally};
pub use speaking_time::SpeakingTimeAnalyzer;
