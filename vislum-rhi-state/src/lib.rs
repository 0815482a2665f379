use std::ops::Deref;

pub mod command;
pub mod device;
pub mod error;
pub mod queue;
pub mod resource;
pub mod sync;

mod macros;

pub use error::{RhiError, RhiResult, VkStatus};

/// A trait for objects that wrap Vulkan handles.
pub trait VkHandle {
    type Handle: ash::vk::Handle;

    /// Returns the Vulkan handle of the object.
    fn vk_handle(&self) -> Self::Handle;
}

impl VkHandle for ash::Device {
    type Handle = ash::vk::Device;

    fn vk_handle(&self) -> Self::Handle {
        self.handle()
    }
}

/// A trait for objects that wrap Ash handles.
pub trait AshHandle {
    type Handle: VkHandle;

    fn ash_handle(&self) -> &Self::Handle;
}

/// Wraps a raw Vulkan handle so it prints as a hexadecimal address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugWrapper<T: ash::vk::Handle>(pub T);

impl<T> Deref for DebugWrapper<T>
where
    T: ash::vk::Handle,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::fmt::Debug for DebugWrapper<T>
where
    T: ash::vk::Handle + Copy,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0.as_raw())
    }
}

pub struct AshDebugWrapper<T: VkHandle>(pub T);

impl<T> Deref for AshDebugWrapper<T>
where
    T: VkHandle,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::fmt::Debug for AshDebugWrapper<T>
where
    T: VkHandle,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", ash::vk::Handle::as_raw(self.0.vk_handle()))
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::{self, Handle};

    use super::*;

    #[test]
    fn test_debug_wrapper_prints_hex() {
        let image = DebugWrapper(vk::Image::from_raw(0xBEEF));
        assert_eq!(format!("{:?}", image), "0xBEEF");
    }
}
