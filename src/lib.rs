//! Floodgate - Adaptive Admission Control
//!
//! This crate implements a single-process admission-control core: a token
//! bucket limiter that decides which requests proceed now, which wait, and
//! which are rejected, plus a background controller that retunes the
//! admission rate at runtime on a schedule or in response to observed
//! latency.

pub mod config;
pub mod controller;
pub mod error;
pub mod limiter;
