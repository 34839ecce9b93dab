//! Admission control over a runtime-tunable token bucket.

mod bucket;
mod facade;

pub use facade::{Limiter, LimiterSnapshot};
