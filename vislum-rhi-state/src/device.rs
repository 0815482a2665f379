use std::sync::Arc;

use crate::{
    AshDebugWrapper, AshHandle,
    queue::{Queue, QueueCreateInfo},
    resource::ResourceRegistry,
};

pub struct DeviceCreateInfo {
    /// The queues that were requested when the device was created.
    pub queues: Vec<QueueCreateInfo>,
}

/// A logical device together with its queues and resource registry.
///
/// The device itself is created and destroyed by the caller. This type only
/// borrows it for recording and submission.
pub struct Device {
    device: AshDebugWrapper<ash::Device>,
    queues: Vec<Queue>,
    resources: Arc<ResourceRegistry>,
}

static_assertions::assert_impl_all!(Device: Send, Sync);

impl AshHandle for Device {
    type Handle = ash::Device;

    fn ash_handle(&self) -> &Self::Handle {
        &self.device
    }
}

impl Device {
    /// Wraps an already created device.
    ///
    /// # Safety
    /// `device` must be a valid device that was created with every queue in
    /// `create_info.queues`, and it must outlive the returned object.
    pub unsafe fn from_raw(device: ash::Device, create_info: DeviceCreateInfo) -> Arc<Self> {
        let queues = create_info
            .queues
            .into_iter()
            .map(|info| {
                let queue = unsafe { device.get_device_queue(info.family_index, info.queue_index) };
                log::debug!(
                    "Registered {:?} queue {} of family {}",
                    info.queue_type,
                    info.queue_index,
                    info.family_index
                );
                Queue::new(queue, info)
            })
            .collect();

        Arc::new(Self {
            device: AshDebugWrapper(device),
            queues,
            resources: Arc::new(ResourceRegistry::new()),
        })
    }

    /// Returns the queue at `index` in creation order.
    pub fn queue(&self, index: usize) -> Option<&Queue> {
        self.queues.get(index)
    }

    /// Returns the first queue of the given family.
    pub fn queue_of_family(&self, family_index: u32) -> Option<&Queue> {
        self.queues.iter().find(|queue| queue.family_index() == family_index)
    }

    /// The registry holding the global state of every resource on this device.
    pub fn resources(&self) -> &Arc<ResourceRegistry> {
        &self.resources
    }
}
