//! Runtime error taxonomy
//!
//! Every fallible runtime call returns [`RuntimeResult`]. Only
//! [`RuntimeError::SurfaceStale`] is recoverable; the driver handles it
//! internally and it never reaches the application.

use ash::vk;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the frame runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Device creation failed, the device was lost, or a Vulkan call failed
    #[error("Device error during {context}: {result:?}")]
    Device {
        /// What the runtime was doing when the call failed
        context: &'static str,
        /// Raw Vulkan result code
        result: vk::Result,
    },

    /// Device selection or initialization could not be completed
    #[error("Device initialization failed: {0}")]
    DeviceUnavailable(String),

    /// Memory allocation failed
    #[error("Out of memory: {requested} bytes")]
    OutOfMemory {
        /// Number of bytes that were requested
        requested: u64,
    },

    /// The presentable surface no longer matches the window
    #[error("Surface is out of date")]
    SurfaceStale,

    /// A fence wait expired; treated the same as a lost device
    #[error("Timed out waiting for {what}")]
    Timeout {
        /// The object being waited on
        what: &'static str,
    },

    /// Error returned from an application callback
    #[error("Application error: {0}")]
    Application(Box<dyn std::error::Error + Send + Sync>),

    /// Windowing or surface creation failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// A runtime object was used in a state that does not allow the call
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Classify a raw Vulkan result code
    pub fn from_vk(context: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::SUBOPTIMAL_KHR => Self::SurfaceStale,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::OutOfMemory { requested: 0 }
            }
            vk::Result::TIMEOUT => Self::Timeout { what: context },
            result => Self::Device { context, result },
        }
    }

    /// Returns a closure for `map_err` that tags a Vulkan failure with `context`
    pub fn vk(context: &'static str) -> impl Fn(vk::Result) -> Self {
        move |result| Self::from_vk(context, result)
    }

    /// Wrap any application error
    pub fn application<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Application(error.into())
    }

    /// Shorthand for [`RuntimeError::InvalidOperation`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation { reason: reason.into() }
    }

    /// Whether the driver can recover from this error without tearing down
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SurfaceStale)
    }
}

impl From<glfw::InitError> for RuntimeError {
    fn from(error: glfw::InitError) -> Self {
        Self::Platform(format!("GLFW initialization failed: {error:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_date_is_recoverable() {
        let error = RuntimeError::from_vk("acquire", vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert!(matches!(error, RuntimeError::SurfaceStale));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_memory_and_timeout_classification() {
        assert!(matches!(
            RuntimeError::from_vk("alloc", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            RuntimeError::OutOfMemory { .. }
        ));
        let timeout = RuntimeError::from_vk("frame fence", vk::Result::TIMEOUT);
        assert!(matches!(timeout, RuntimeError::Timeout { what: "frame fence" }));
        assert!(!timeout.is_recoverable());
    }

    /// Device loss stays fatal and keeps its context
    #[test]
    fn test_device_lost_is_fatal() {
        let error = RuntimeError::from_vk("submit", vk::Result::ERROR_DEVICE_LOST);
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("submit"));
    }

    #[test]
    fn test_application_error_wraps_message() {
        let error = RuntimeError::application("mesh upload failed");
        assert_eq!(error.to_string(), "Application error: mesh upload failed");
    }
}
