//! Graphics error types.
//!
//! Only recoverable conditions travel through [`GraphicsError`]. Contract
//! violations (unsupported enum values, recording into a buffer that is not
//! recording, mixing resources of two devices) panic instead.

use thiserror::Error;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A native call failed with a backend error code.
    #[error("{call} failed with native code {code:#x}")]
    NativeCallFailed {
        /// Name of the failing native entry point.
        call: &'static str,
        /// The native error code.
        code: i64,
    },
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The GPU device (or its GL context) was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An object was used in a lifecycle state that forbids the request.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The GL context is current on another thread.
    #[error("context is current on another thread")]
    ContextBusy,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The results of a query are not available yet.
    #[error("query results not ready")]
    NotReady,
    /// A wait timed out.
    #[error("timed out")]
    Timeout,
    /// The swap chain no longer matches its surface and must be recreated.
    #[error("swap chain out of date")]
    OutOfDate,
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GraphicsError {
    /// Whether this error marks the device as unusable.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceLost)
    }
}

/// Result alias used throughout the crate.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");
    }

    #[test]
    fn test_native_call_display() {
        let err = GraphicsError::NativeCallFailed {
            call: "vkCreateBuffer",
            code: -2,
        };
        assert!(err.to_string().starts_with("vkCreateBuffer failed"));
        assert!(!err.is_device_lost());
        assert!(GraphicsError::DeviceLost.is_device_lost());
    }
}
