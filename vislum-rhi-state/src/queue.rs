use std::sync::{Mutex, PoisonError};

use ash::vk;

use crate::{DebugWrapper, RhiResult, VkHandle, error::check};

/// The capabilities of a queue, which decide the pipeline stages it can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Copy,
}

impl QueueType {
    pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Copy];

    /// Row index of this queue type in the stage tables.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            QueueType::Graphics => 0,
            QueueType::Compute => 1,
            QueueType::Copy => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueueCreateInfo {
    pub family_index: u32,
    pub queue_index: u32,
    pub queue_type: QueueType,
}

/// A device queue.
///
/// Vulkan queues must not be submitted to from several threads at once, so
/// the handle is only reachable through [`Queue::submit`], which holds the
/// queue's lock for the duration of the driver call.
#[derive(Debug)]
pub struct Queue {
    queue: Mutex<DebugWrapper<vk::Queue>>,
    family_index: u32,
    queue_type: QueueType,
}

impl Queue {
    pub(crate) fn new(queue: vk::Queue, info: QueueCreateInfo) -> Self {
        Self {
            queue: Mutex::new(DebugWrapper(queue)),
            family_index: info.family_index,
            queue_type: info.queue_type,
        }
    }

    #[inline]
    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Submits work to this queue under the queue lock.
    pub fn submit(
        &self,
        device: &ash::Device,
        submits: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let result = unsafe {
            (device.fp_v1_0().queue_submit)(queue.0, submits.len() as u32, submits.as_ptr(), fence)
        };

        check(result).map(|_| ()).map_err(|e| {
            log::error!("rhi error: queue submit failed on family {}: {e}", self.family_index);
            e
        })
    }
}

impl VkHandle for Queue {
    type Handle = vk::Queue;

    fn vk_handle(&self) -> Self::Handle {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).0
    }
}
