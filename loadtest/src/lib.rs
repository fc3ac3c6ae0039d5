//! A load generator that drives phased workloads against a Leaf
//! function-execution scheduler over gRPC.
//!
//! A workload is an ordered set of [`TestPhase`](config::TestPhase)s per
//! function image. A phase is either *constant* (a fixed request rate) or
//! *variable* (a rate ramping between two bounds), and workloads can be
//! written out explicitly in the config file or synthesized from seeded
//! [`PhasePattern`](config::PhasePattern)s.
//!
//! While the workload runs, each call's measured latency and the scheduler's
//! own timing breakdown (echoed through response trailers) are appended to a
//! CSV log for offline analysis.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod client;
pub mod collector;
pub mod config;
pub mod controller;
pub mod executor;
pub mod generator;
pub mod payload;

pub use crate::config::{Config, Workload};
pub use crate::controller::Controller;
