//! Convenient re-exports for common windowgate types.
pub use crate::{
    clock::{Clock, ManualClock, MonotonicClock},
    config::{GateConfig, GateConfigError, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_LIMIT, DEFAULT_PERIOD},
    middleware::{AdmissionLayer, AdmissionService},
    AcquireTimeout, AdmissionGate, Permit, ResilienceError,
};
