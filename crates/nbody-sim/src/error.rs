use std::fmt;

use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// Machine-readable status of a compute-side failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComputeStatus {
    /// The kernel could not be dispatched.
    DispatchFailed,
    /// Waiting for queue completion failed.
    WaitFailed,
    /// The bounded queue wait expired.
    Timeout,
    /// The device or its context was lost; not recoverable.
    DeviceLost,
    /// A kernel argument slot was never bound.
    UnboundArgument,
    /// A bound argument is incompatible with the kernel (e.g. buffer too small).
    InvalidArgument,
}

impl ComputeStatus {
    /// Stable numeric code. Negative, in the manner of compute-API status codes.
    pub const fn code(self) -> i32 {
        match self {
            ComputeStatus::DispatchFailed => -1,
            ComputeStatus::WaitFailed => -2,
            ComputeStatus::Timeout => -3,
            ComputeStatus::DeviceLost => -4,
            ComputeStatus::UnboundArgument => -5,
            ComputeStatus::InvalidArgument => -6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ComputeStatus::DispatchFailed => "dispatch failed",
            ComputeStatus::WaitFailed => "queue wait failed",
            ComputeStatus::Timeout => "queue wait timed out",
            ComputeStatus::DeviceLost => "device lost",
            ComputeStatus::UnboundArgument => "unbound kernel argument",
            ComputeStatus::InvalidArgument => "invalid kernel argument",
        }
    }
}

impl fmt::Display for ComputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// Why setup stopped before the frame loop.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SetupFailure {
    /// No adapter offers compute that can share buffers with the display.
    NoInteropDevice,
    /// Configuration values are out of range or malformed.
    InvalidConfig,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("setup failed ({kind:?}): {message}")]
    Setup { kind: SetupFailure, message: String },

    #[error("compute error {status}: {message}")]
    Compute { status: ComputeStatus, message: String },

    #[error("display error: {message}")]
    Display { message: String },

    #[error("failed to create {what}: {message}")]
    Resource { what: &'static str, message: String },

    /// A previous frame failed; the simulation refuses to continue on stale buffers.
    #[error("simulation halted after {completed_frames} completed frames")]
    Halted { completed_frames: u64 },
}

impl SimError {
    pub fn setup(kind: SetupFailure, message: impl Into<String>) -> Self {
        SimError::Setup {
            kind,
            message: message.into(),
        }
    }

    pub fn compute(status: ComputeStatus, message: impl Into<String>) -> Self {
        SimError::Compute {
            status,
            message: message.into(),
        }
    }

    pub fn display(message: impl Into<String>) -> Self {
        SimError::Display {
            message: message.into(),
        }
    }

    pub fn resource(what: &'static str, message: impl Into<String>) -> Self {
        SimError::Resource {
            what,
            message: message.into(),
        }
    }

    /// The compute status, for compute errors only.
    pub fn status(&self) -> Option<ComputeStatus> {
        match self {
            SimError::Compute { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_compute(&self) -> bool {
        self.status().is_some()
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::Setup { .. } => 2,
            SimError::Resource { .. } => 3,
            SimError::Compute { .. } => 4,
            SimError::Display { .. } => 5,
            SimError::Halted { .. } => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_codes_are_distinct() {
        let all = [
            ComputeStatus::DispatchFailed,
            ComputeStatus::WaitFailed,
            ComputeStatus::Timeout,
            ComputeStatus::DeviceLost,
            ComputeStatus::UnboundArgument,
            ComputeStatus::InvalidArgument,
        ];
        let mut codes: Vec<i32> = all.iter().map(|s| s.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(codes.iter().all(|c| *c < 0));
    }

    #[test]
    fn compute_error_exposes_status() {
        let err = SimError::compute(ComputeStatus::Timeout, "2s elapsed");
        assert!(err.is_compute());
        assert_eq!(err.status(), Some(ComputeStatus::Timeout));
        assert_eq!(err.to_string(), "compute error queue wait timed out (-3): 2s elapsed");
    }

    #[test]
    fn non_compute_errors_have_no_status() {
        let err = SimError::display("surface out of memory");
        assert!(!err.is_compute());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn exit_codes_are_nonzero_and_distinct() {
        let errors = [
            SimError::setup(SetupFailure::NoInteropDevice, "none"),
            SimError::resource("buffer", "oom"),
            SimError::compute(ComputeStatus::DeviceLost, "gone"),
            SimError::display("lost"),
            SimError::Halted { completed_frames: 4 },
        ];
        let mut codes: Vec<u8> = errors.iter().map(SimError::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
