use std::sync::Arc;

use ash::vk;

use crate::{AshHandle, DebugWrapper, RhiResult, VkHandle, device::Device, error::check};

pub struct Fence {
    device: Arc<Device>,
    fence: DebugWrapper<vk::Fence>,
}

impl Fence {
    /// Creates a new fence in the signaled state.
    pub fn signaled(device: Arc<Device>) -> RhiResult<Arc<Self>> {
        Self::new(device, vk::FenceCreateFlags::SIGNALED)
    }

    fn new(device: Arc<Device>, flags: vk::FenceCreateFlags) -> RhiResult<Arc<Self>> {
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.ash_handle().create_fence(&create_info, None) }?;

        Ok(Arc::new(Self {
            device,
            fence: DebugWrapper(fence),
        }))
    }

    /// Blocks until the fence is signaled.
    pub fn wait(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .ash_handle()
                .wait_for_fences(&[self.fence.0], true, u64::MAX)
        }?;
        Ok(())
    }

    /// Returns `true` if the fence is signaled, without blocking.
    pub fn try_wait(&self) -> RhiResult<bool> {
        let device = self.device.ash_handle();
        let result = unsafe { (device.fp_v1_0().get_fence_status)(device.handle(), self.fence.0) };
        fence_status(result)
    }

    /// Resets the fence to unsignaled state.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe { self.device.ash_handle().reset_fences(&[self.fence.0]) }?;
        Ok(())
    }
}

impl VkHandle for Fence {
    type Handle = vk::Fence;

    fn vk_handle(&self) -> Self::Handle {
        self.fence.0
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_fence(self.fence.0, None);
        }
    }
}

/// `NOT_READY` is the unsignaled answer of `vkGetFenceStatus`, not an error.
fn fence_status(result: vk::Result) -> RhiResult<bool> {
    match result {
        vk::Result::NOT_READY => Ok(false),
        other => check(other).map(|_| true),
    }
}

/// A binary semaphore.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: DebugWrapper<vk::Semaphore>,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Arc<Self>> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.ash_handle().create_semaphore(&create_info, None) }?;

        Ok(Arc::new(Self {
            device,
            semaphore: DebugWrapper(semaphore),
        }))
    }
}

impl VkHandle for Semaphore {
    type Handle = vk::Semaphore;

    fn vk_handle(&self) -> Self::Handle {
        self.semaphore.0
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_semaphore(self.semaphore.0, None);
        }
    }
}
