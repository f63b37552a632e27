//! Plan orchestration.
//!
//! Drives budget sizing, splits the producible rows into a Learn and a
//! Scale rail, generates each rail independently and runs a final
//! cross-segment rank-and-filter pass over the merged result.

mod config;
mod rails;
mod runner;

pub use config::PlanRequest;
pub use rails::{sanitize_learn_ratio, split_rails, RailSplit, DEFAULT_LEARN_RATIO};
pub use runner::{PlanResult, PlanRunner};
