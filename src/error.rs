//! Error types for admission and gated services
use std::fmt;
use std::time::Duration;

/// The caller waited out its acquire budget without being granted a permit.
///
/// `waited` is zero when the gate could tell up front that no permit would free up
/// within the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("admission timed out after {waited:?} (limit: {timeout:?})")]
pub struct AcquireTimeout {
    /// Time spent inside the gate.
    pub waited: Duration,
    /// The acquire budget that applied to the call.
    pub timeout: Duration,
}

/// Unified error type for services wrapped in an admission gate
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// No permit was granted within the acquire timeout
    AdmissionTimeout(AcquireTimeout),
    /// The underlying operation failed
    Inner(E),
}
impl<E: fmt::Display> fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdmissionTimeout(timeout) => write!(f, "{}", timeout),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}
impl<E: std::error::Error + 'static> std::error::Error for ResilienceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::AdmissionTimeout(_) => None,
        }
    }
}
impl<E> From<AcquireTimeout> for ResilienceError<E> {
    fn from(timeout: AcquireTimeout) -> Self {
        Self::AdmissionTimeout(timeout)
    }
}
impl<E> ResilienceError<E> {
    /// Check if this error is due to the gate refusing admission
    pub fn is_admission_timeout(&self) -> bool {
        matches!(self, Self::AdmissionTimeout(_))
    }
    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Access admission timeout details as (waited, timeout).
    pub fn admission_details(&self) -> Option<(Duration, Duration)> {
        match self {
            Self::AdmissionTimeout(t) => Some((t.waited, t.timeout)),
            _ => None,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);
    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for DummyError {}
    #[test]
    fn acquire_timeout_display() {
        let err = AcquireTimeout { waited: Duration::from_millis(5100), timeout: Duration::from_secs(5) };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("5.1"));
    }
    #[test]
    fn admission_timeout_converts_and_displays() {
        let err: ResilienceError<io::Error> =
            AcquireTimeout { waited: Duration::ZERO, timeout: Duration::ZERO }.into();
        assert!(err.is_admission_timeout());
        assert!(!err.is_inner());
        assert!(format!("{}", err).contains("admission"));
        assert!(err.source().is_none());
    }
    #[test]
    fn into_inner_extracts_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err = ResilienceError::Inner(io_err);
        assert!(err.source().is_some());
        let extracted = err.into_inner().unwrap();
        assert_eq!(extracted.to_string(), "test");
    }
    #[test]
    fn accessor_methods_return_expected_data() {
        let timeout = ResilienceError::<DummyError>::AdmissionTimeout(AcquireTimeout {
            waited: Duration::from_millis(10),
            timeout: Duration::from_millis(20),
        });
        assert_eq!(
            timeout.admission_details(),
            Some((Duration::from_millis(10), Duration::from_millis(20)))
        );
        assert!(timeout.as_inner().is_none());
        let inner = ResilienceError::Inner(DummyError("x"));
        assert_eq!(inner.as_inner(), Some(&DummyError("x")));
        assert!(inner.admission_details().is_none());
    }
}
