use std::sync::Arc;

use ash::vk;

use crate::{
    AshHandle, DebugWrapper, RhiResult, VkHandle,
    command::{
        BarrierBatch, BufferCopy, BufferMemoryBarrier, BufferTextureCopy, CommandBufferUsageFlags,
        ImageAspectFlags, ImageLayout, ImageMemoryBarrier, IndexType, PipelineStageFlags, Rect2D,
        TextureCopy, Viewport,
    },
    device::Device,
};

#[derive(Debug, Clone, Copy)]
pub struct CommandPoolCreateInfo {
    pub queue_family_index: u32,
    /// Hints that command buffers are short lived.
    pub transient: bool,
    /// Allows command buffers to be reset individually.
    pub reset_command_buffer: bool,
}

pub struct CommandPool {
    device: Arc<Device>,
    pool: DebugWrapper<vk::CommandPool>,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a new command pool.
    pub fn new(device: Arc<Device>, create_info: CommandPoolCreateInfo) -> RhiResult<Self> {
        let mut flags = vk::CommandPoolCreateFlags::empty();
        if create_info.transient {
            flags |= vk::CommandPoolCreateFlags::TRANSIENT;
        }
        if create_info.reset_command_buffer {
            flags |= vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER;
        }

        let vk_create_info = vk::CommandPoolCreateInfo::default()
            .flags(flags)
            .queue_family_index(create_info.queue_family_index);

        let pool = unsafe { device.ash_handle().create_command_pool(&vk_create_info, None) }?;

        Ok(Self {
            device,
            pool: DebugWrapper(pool),
            queue_family_index: create_info.queue_family_index,
        })
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates a primary command buffer from this pool.
    ///
    /// The command buffer is freed when the pool is dropped.
    pub fn allocate(&self) -> RhiResult<RawCommandBuffer> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool.0)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers =
            unsafe { self.device.ash_handle().allocate_command_buffers(&allocate_info) }?;

        Ok(RawCommandBuffer {
            device: Arc::clone(&self.device),
            command_buffer: DebugWrapper(command_buffers[0]),
            recording: false,
        })
    }

    /// Resets every command buffer allocated from this pool.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .ash_handle()
                .reset_command_pool(self.pool.0, vk::CommandPoolResetFlags::empty())
        }?;
        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.ash_handle().destroy_command_pool(self.pool.0, None);
        }
    }
}

/// A primary command buffer without any state tracking.
pub struct RawCommandBuffer {
    device: Arc<Device>,
    command_buffer: DebugWrapper<vk::CommandBuffer>,
    recording: bool,
}

impl RawCommandBuffer {
    /// Begins recording commands into the command buffer.
    pub fn begin(&mut self, flags: CommandBufferUsageFlags) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags.to_vk());

        unsafe {
            self.device
                .ash_handle()
                .begin_command_buffer(self.command_buffer.0, &begin_info)
        }?;

        self.recording = true;
        Ok(())
    }

    /// Ends recording commands into the command buffer.
    pub fn end(&mut self) -> RhiResult<()> {
        self.recording = false;
        unsafe { self.device.ash_handle().end_command_buffer(self.command_buffer.0) }?;
        Ok(())
    }

    /// Marks the command buffer as not recording after its pool was reset.
    pub(crate) fn pool_reset(&mut self) {
        self.recording = false;
    }

    /// Returns whether this command buffer is currently recording.
    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Records a batch of barriers with a single pipeline barrier call.
    pub fn pipeline_barrier(&self, batch: &BarrierBatch) {
        self.pipeline_barrier_raw(
            batch.src_stage_mask,
            batch.dst_stage_mask,
            &batch.buffer_barriers,
            &batch.image_barriers,
        );
    }

    pub fn pipeline_barrier_raw(
        &self,
        src_stage_mask: PipelineStageFlags,
        dst_stage_mask: PipelineStageFlags,
        buffer_barriers: &[BufferMemoryBarrier],
        image_barriers: &[ImageMemoryBarrier],
    ) {
        let buffer_barriers: Vec<_> = buffer_barriers.iter().map(|b| b.to_vk()).collect();
        let image_barriers: Vec<_> = image_barriers.iter().map(|b| b.to_vk()).collect();

        unsafe {
            self.device.ash_handle().cmd_pipeline_barrier(
                self.command_buffer.0,
                src_stage_mask.to_vk(),
                dst_stage_mask.to_vk(),
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
    }

    /// Begins dynamic rendering.
    pub fn begin_rendering(&self, rendering_info: &vk::RenderingInfo<'_>) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_begin_rendering(self.command_buffer.0, rendering_info);
        }
    }

    /// Ends dynamic rendering.
    pub fn end_rendering(&self) {
        unsafe {
            self.device.ash_handle().cmd_end_rendering(self.command_buffer.0);
        }
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_set_viewport(self.command_buffer.0, 0, &[viewport.to_vk()]);
        }
    }

    pub fn set_scissor(&self, scissor: Rect2D) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_set_scissor(self.command_buffer.0, 0, &[scissor.to_vk()]);
        }
    }

    /// Binds a graphics or compute pipeline.
    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_bind_pipeline(self.command_buffer.0, bind_point, pipeline);
        }
    }

    pub fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[u64]) {
        unsafe {
            self.device.ash_handle().cmd_bind_vertex_buffers(
                self.command_buffer.0,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    pub fn bind_index_buffer(&self, buffer: vk::Buffer, offset: u64, index_type: IndexType) {
        unsafe {
            self.device.ash_handle().cmd_bind_index_buffer(
                self.command_buffer.0,
                buffer,
                offset,
                index_type.to_vk(),
            );
        }
    }

    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.ash_handle().cmd_draw(
                self.command_buffer.0,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.ash_handle().cmd_draw_indexed(
                self.command_buffer.0,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    pub fn dispatch(&self, x: u32, y: u32, z: u32) {
        unsafe {
            self.device
                .ash_handle()
                .cmd_dispatch(self.command_buffer.0, x, y, z);
        }
    }

    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[BufferCopy]) {
        let regions: Vec<_> = regions.iter().map(|r| r.to_vk()).collect();
        unsafe {
            self.device
                .ash_handle()
                .cmd_copy_buffer(self.command_buffer.0, src, dst, &regions);
        }
    }

    pub fn copy_buffer_to_image(
        &self,
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: ImageLayout,
        aspect: ImageAspectFlags,
        regions: &[BufferTextureCopy],
    ) {
        let regions: Vec<_> = regions.iter().map(|r| r.to_vk(aspect)).collect();
        unsafe {
            self.device.ash_handle().cmd_copy_buffer_to_image(
                self.command_buffer.0,
                src,
                dst,
                dst_layout.to_vk(),
                &regions,
            );
        }
    }

    pub fn copy_image_to_buffer(
        &self,
        src: vk::Image,
        src_layout: ImageLayout,
        aspect: ImageAspectFlags,
        dst: vk::Buffer,
        regions: &[BufferTextureCopy],
    ) {
        let regions: Vec<_> = regions.iter().map(|r| r.to_vk(aspect)).collect();
        unsafe {
            self.device.ash_handle().cmd_copy_image_to_buffer(
                self.command_buffer.0,
                src,
                src_layout.to_vk(),
                dst,
                &regions,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy_image(
        &self,
        src: vk::Image,
        src_layout: ImageLayout,
        src_aspect: ImageAspectFlags,
        dst: vk::Image,
        dst_layout: ImageLayout,
        dst_aspect: ImageAspectFlags,
        regions: &[TextureCopy],
    ) {
        let regions: Vec<_> = regions
            .iter()
            .map(|r| r.to_vk(src_aspect, dst_aspect))
            .collect();
        unsafe {
            self.device.ash_handle().cmd_copy_image(
                self.command_buffer.0,
                src,
                src_layout.to_vk(),
                dst,
                dst_layout.to_vk(),
                &regions,
            );
        }
    }

    /// Returns the device associated with this command buffer.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl VkHandle for RawCommandBuffer {
    type Handle = vk::CommandBuffer;

    fn vk_handle(&self) -> Self::Handle {
        self.command_buffer.0
    }
}
