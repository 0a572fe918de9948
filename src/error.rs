// Errors returned across the driver
//
// Austin Shafer - 2020
use ash::vk;
use thiserror::Error;

/// Everything that can go wrong inside the driver.
///
/// At the driver boundary these are turned into the result codes
/// the host expects with `as_vk_result`.
#[allow(non_camel_case_types)]
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Could not connect to the compositor")]
    NO_DISPLAY,
    #[error("The compositor does not advertise {0}")]
    NO_GLOBAL(&'static str),
    #[error("The seat has no pointer")]
    NO_POINTER,
    #[error("EGL call failed: {0}")]
    EGL(String),
    #[error("Native vulkan call failed: {0:?}")]
    VULKAN(vk::Result),
    #[error("Presentation is only supported for top-level windows")]
    INCOMPATIBLE_WINDOW,
    #[error("No presentation surface exists")]
    NO_SURFACE,
    #[error("Out of host memory")]
    OUT_OF_HOST_MEMORY,
    #[error("Unknown surface handle")]
    INVALID_HANDLE,
    #[error("Compositor connection error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;

impl DriverError {
    /// The vulkan result code reported to the application for this error
    pub fn as_vk_result(&self) -> vk::Result {
        match self {
            DriverError::INCOMPATIBLE_WINDOW => vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            DriverError::OUT_OF_HOST_MEMORY => vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            DriverError::INVALID_HANDLE => vk::Result::ERROR_SURFACE_LOST_KHR,
            DriverError::VULKAN(r) => *r,
            _ => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

impl From<vk::Result> for DriverError {
    fn from(res: vk::Result) -> Self {
        DriverError::VULKAN(res)
    }
}
