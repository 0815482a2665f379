use ash::vk;

/// Errors reported by the RHI.
///
/// Every driver call is checked where it is made and the first failure is
/// returned to the caller. Nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RhiError {
    #[error("the operation is not ready yet")]
    NotReady,
    #[error("the operation timed out")]
    Timeout,
    #[error("out of host or device memory")]
    OutOfMemory,
    /// The device was lost. All objects created from it must be rebuilt.
    #[error("the device was removed")]
    DeviceRemoved,
    #[error("the requested feature is not supported")]
    NotSupported,
    #[error("too many objects of this type have been created")]
    OutOfResource,
    #[error("the swapchain is out of date")]
    SwapChainOutOfDate,
    #[error("platform call failed: {0:?}")]
    BadPlatformCall(vk::Result),
    /// The operation was called in a state where it is not allowed.
    #[error("the operation cannot be called at this time")]
    BadCallingTime,
}

pub type RhiResult<T> = Result<T, RhiError>;

impl From<vk::Result> for RhiError {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::NOT_READY | vk::Result::INCOMPLETE => Self::NotReady,
            vk::Result::TIMEOUT => Self::Timeout,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::OutOfMemory
            }
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceRemoved,
            vk::Result::ERROR_LAYER_NOT_PRESENT
            | vk::Result::ERROR_EXTENSION_NOT_PRESENT
            | vk::Result::ERROR_FEATURE_NOT_PRESENT
            | vk::Result::ERROR_INCOMPATIBLE_DRIVER
            | vk::Result::ERROR_FORMAT_NOT_SUPPORTED => Self::NotSupported,
            vk::Result::ERROR_TOO_MANY_OBJECTS => Self::OutOfResource,
            vk::Result::ERROR_OUT_OF_DATE_KHR => Self::SwapChainOutOfDate,
            other => Self::BadPlatformCall(other),
        }
    }
}

/// Non-error outcome of a driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VkStatus {
    Success,
    /// The call succeeded but the swapchain no longer matches the surface.
    Suboptimal,
}

/// Classifies a raw driver result.
///
/// `SUBOPTIMAL_KHR` is the only non-`SUCCESS` code treated as success.
pub fn check(result: vk::Result) -> RhiResult<VkStatus> {
    match result {
        vk::Result::SUCCESS => Ok(VkStatus::Success),
        vk::Result::SUBOPTIMAL_KHR => {
            log::warn!("driver reported a suboptimal swapchain");
            Ok(VkStatus::Suboptimal)
        }
        other => Err(other.into()),
    }
}
