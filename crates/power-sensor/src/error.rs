use thiserror::Error;

pub type Result<T, E = DeviceError> = core::result::Result<T, E>;

/// Errno-style codes reported alongside device failures.
pub mod errno {
    pub const EIO: i32 = 5;
    pub const EAGAIN: i32 = 11;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOTSUP: i32 = 95;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(String),
    #[error("operation not supported on this backend: {0}")]
    Unsupported(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("driver returned code {0}")]
    Code(i32),
}

impl DeviceError {
    /// Negative errno-style code for diagnostics, matching what a kernel driver would report.
    pub fn code(&self) -> i32 {
        match self {
            DeviceError::NotFound(_) => -errno::ENODEV,
            DeviceError::Unsupported(_) => -errno::ENOTSUP,
            DeviceError::InvalidArgument(_) => -errno::EINVAL,
            DeviceError::Io(_) => -errno::EIO,
            DeviceError::Code(c) if *c > 0 => -c,
            DeviceError::Code(c) => *c,
        }
    }
}
