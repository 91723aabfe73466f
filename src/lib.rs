#![deny(warnings)]
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # windowgate
//!
//! Fixed-window admission control for multi-threaded callers, plus a rate-limited
//! document submission client built on top of it.
//!
//! ## Features
//!
//! - **Admission gate**: at most `limit` permits per `period`, excess callers block in
//!   FIFO order until a later window has room or their acquire timeout runs out
//! - **Injectable clocks** so tests advance virtual time instead of sleeping
//! - **Tower middleware** admitting each request through a shared gate
//! - **Document client** that takes one permit per submission (`http` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use windowgate::{AdmissionGate, GateConfig};
//! use std::time::Duration;
//!
//! let gate = AdmissionGate::new(
//!     GateConfig::new(10, Duration::from_secs(1), Duration::from_secs(5)).unwrap(),
//! );
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let gate = gate.clone();
//!         std::thread::spawn(move || gate.acquire().is_ok())
//!     })
//!     .collect();
//!
//! for worker in workers {
//!     assert!(worker.join().unwrap());
//! }
//! ```
//!
//! ## Window semantics
//!
//! Windows are contiguous and anchored to the first caller arriving after the previous
//! window ran out, so up to `2 × limit` permits can be granted in quick succession around
//! a boundary.

pub mod client;
pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod prelude;
mod sync;

// Re-exports
pub use client::{DocumentClient, SubmitError, SubmitRequest, Transport, TransportError};
#[cfg(feature = "http")]
pub use client::HttpTransport;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{GateConfig, GateConfigError};
pub use document::{Document, DocumentFormat, DocumentType, ProductGroup};
pub use error::{AcquireTimeout, ResilienceError};
pub use gate::{AdmissionGate, GateSnapshot, Permit};
pub use middleware::{AdmissionLayer, AdmissionService};
