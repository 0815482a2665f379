use std::sync::Arc;

use ash::vk;

use crate::{
    AshHandle, RhiResult, VkHandle,
    command::{
        BufferMemoryBarrier, CommandBufferUsageFlags, CommandPool, CommandPoolCreateInfo,
        ImageMemoryBarrier, PipelineStageFlags, RawCommandBuffer,
    },
    device::Device,
    queue::Queue,
    sync::Semaphore,
};

/// Submits the release half of queue family ownership transfers.
///
/// One tracker exists per source family and per command buffer. Each call to
/// [`submit_barrier`] rerecords the same helper command buffer and signals
/// the same semaphore, so the owning command buffer must wait on the
/// semaphore before the next call. Waiting for the owning command buffer
/// before resetting it guarantees that.
///
/// [`submit_barrier`]: QueueTransferTracker::submit_barrier
pub struct QueueTransferTracker {
    device: Arc<Device>,
    command_buffer: RawCommandBuffer,
    pool: CommandPool,
    semaphore: Arc<Semaphore>,
}

impl QueueTransferTracker {
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let pool = CommandPool::new(
            Arc::clone(&device),
            CommandPoolCreateInfo {
                queue_family_index,
                transient: true,
                reset_command_buffer: false,
            },
        )?;
        let command_buffer = pool.allocate()?;
        let semaphore = Semaphore::new(Arc::clone(&device))?;

        log::debug!("Created queue transfer tracker for family {}", queue_family_index);

        Ok(Self {
            device,
            command_buffer,
            pool,
            semaphore,
        })
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.pool.queue_family_index()
    }

    /// Records and submits the release barriers on `queue`.
    ///
    /// Returns the semaphore signaled once the release completes.
    pub fn submit_barrier(
        &mut self,
        queue: &Queue,
        buffer_barriers: &[BufferMemoryBarrier],
        image_barriers: &[ImageMemoryBarrier],
    ) -> RhiResult<vk::Semaphore> {
        debug_assert_eq!(queue.family_index(), self.queue_family_index());

        self.pool.reset()?;
        self.command_buffer.pool_reset();
        self.command_buffer.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        self.command_buffer.pipeline_barrier_raw(
            PipelineStageFlags::ALL_COMMANDS,
            PipelineStageFlags::BOTTOM_OF_PIPE,
            buffer_barriers,
            image_barriers,
        );
        self.command_buffer.end()?;

        let command_buffers = [self.command_buffer.vk_handle()];
        let signal_semaphores = [self.semaphore.vk_handle()];
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        queue.submit(self.device.ash_handle(), &[submit_info], vk::Fence::null())?;

        log::debug!(
            "Released {} buffers and {} texture subresources from family {}",
            buffer_barriers.len(),
            image_barriers.len(),
            self.queue_family_index()
        );

        Ok(self.semaphore.vk_handle())
    }
}
