use std::{
    any::Any,
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use ash::vk;
use smallvec::SmallVec;

use crate::{
    AshHandle, RhiError, RhiResult, VkHandle,
    command::{
        BufferCopy, BufferTextureCopy, CommandBufferUsageFlags, CommandPool,
        CommandPoolCreateInfo, ImageAspectFlags, ImageLayout, IndexType, PassKind, RawCommandBuffer,
        RecordingState, Rect2D, RenderPassDesc, ResourceStateTracker, TextureCopy, Viewport,
        transfer::QueueTransferTracker,
    },
    device::Device,
    queue::Queue,
    resource::{
        BufferBarrier, BufferId, ImageId, RegistryInner, SubresourceIndex, TextureBarrier,
    },
    sync::{Fence, Semaphore},
};

#[derive(Debug, Clone, Default)]
pub struct CommandBufferCreateInfo {
    /// Index of the target queue, as passed to [`Device::queue`].
    pub queue_index: usize,
    /// Used in log messages.
    pub name: Option<String>,
}

/// A command buffer that tracks the state of the resources it uses.
///
/// Resource states are declared with [`resource_barrier`] before the
/// commands using them. Declarations with an automatic before-state are
/// resolved when the command buffer is submitted, using the state published
/// by the last submission that touched the resource. Command buffers sharing
/// resources must therefore be submitted in the order their accesses should
/// happen.
///
/// A command buffer starts out recording. After [`submit`] it must be
/// [`reset`] before it can record again, and the caller must make sure the
/// GPU finished executing it first.
///
/// [`resource_barrier`]: CommandBuffer::resource_barrier
/// [`submit`]: CommandBuffer::submit
/// [`reset`]: CommandBuffer::reset
pub struct CommandBuffer {
    name: String,
    queue_index: usize,
    state: RecordingState,
    tracker: ResourceStateTracker,
    transfer_trackers: HashMap<u32, QueueTransferTracker>,
    attached: Vec<Arc<dyn Any + Send + Sync>>,
    fence: Arc<Fence>,
    command_buffer: RawCommandBuffer,
    resolve_buffer: RawCommandBuffer,
    pool: CommandPool,
    device: Arc<Device>,
}

static_assertions::assert_impl_all!(CommandBuffer: Send);

impl CommandBuffer {
    /// Creates a command buffer for a device queue and begins recording.
    pub fn new(device: Arc<Device>, create_info: CommandBufferCreateInfo) -> RhiResult<Self> {
        let Some(queue) = device.queue(create_info.queue_index) else {
            log::error!("rhi error: device has no queue at index {}", create_info.queue_index);
            return Err(RhiError::NotSupported);
        };

        let queue_family = queue.family_index();
        let queue_type = queue.queue_type();
        let name = create_info
            .name
            .unwrap_or_else(|| format!("command buffer ({:?} queue)", queue_type));

        let pool = CommandPool::new(
            Arc::clone(&device),
            CommandPoolCreateInfo {
                queue_family_index: queue_family,
                transient: false,
                reset_command_buffer: true,
            },
        )?;
        let mut command_buffer = pool.allocate()?;
        let resolve_buffer = pool.allocate()?;
        let fence = Fence::signaled(Arc::clone(&device))?;

        command_buffer.begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

        Ok(Self {
            name,
            queue_index: create_info.queue_index,
            state: RecordingState::Recording,
            tracker: ResourceStateTracker::new(queue_family, queue_type),
            transfer_trackers: HashMap::new(),
            attached: Vec::new(),
            fence,
            command_buffer,
            resolve_buffer,
            pool,
            device,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn state(&self) -> RecordingState {
        self.state
    }

    #[inline]
    pub fn queue_family(&self) -> u32 {
        self.tracker.queue_family()
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    fn queue(&self) -> RhiResult<&Queue> {
        self.device.queue(self.queue_index).ok_or(RhiError::NotSupported)
    }

    /// Declares the states resources are about to be used in.
    ///
    /// Must be called outside of any pass.
    pub fn resource_barrier(&mut self, buffers: &[BufferBarrier], textures: &[TextureBarrier]) {
        self.state.assert_outside_pass("resource_barrier");
        assert_eq!(
            self.state,
            RecordingState::Recording,
            "resource_barrier cannot be called once recording was closed by submit"
        );

        self.tracker.begin_new_barriers_batch();
        {
            let registry = self.device.resources().lock();
            for barrier in buffers {
                self.tracker.pack_buffer(&registry, barrier);
            }
            for barrier in textures {
                self.tracker.pack_image(&registry, barrier);
            }
        }

        let batch = self.tracker.barriers();
        if !batch.is_empty() {
            self.command_buffer.pipeline_barrier(&batch);
        }
    }

    /// Returns the layout a texture subresource is in at this point of the recording.
    pub fn get_image_layout(
        &self,
        texture: ImageId,
        subresource: SubresourceIndex,
    ) -> Option<ImageLayout> {
        let registry = self.device.resources().lock();
        self.tracker.get_image_layout(&registry, texture, subresource)
    }

    fn layout_of(
        &self,
        registry: &RegistryInner,
        texture: ImageId,
        subresource: SubresourceIndex,
    ) -> ImageLayout {
        self.tracker
            .get_image_layout(registry, texture, subresource)
            .unwrap_or_else(|| {
                log::warn!("{}: texture {:?} is not registered", self.name, texture);
                ImageLayout::Undefined
            })
    }

    fn buffer_handle(&self, buffer: BufferId) -> Option<vk::Buffer> {
        let handle = self.device.resources().buffer_handle(buffer);
        if handle.is_none() {
            log::error!("rhi error: {}: buffer {:?} is not registered", self.name, buffer);
        }
        handle
    }

    /// Keeps an object alive until the command buffer is reset.
    pub fn attach_device_object(&mut self, object: Arc<dyn Any + Send + Sync>) {
        self.attached.push(object);
    }

    pub fn begin_render_pass(&mut self, desc: &RenderPassDesc<'_>) {
        self.state.begin_pass(PassKind::Render);

        let registry = self.device.resources().lock();
        let color_attachments: SmallVec<[vk::RenderingAttachmentInfo<'static>; 8]> = desc
            .color_attachments
            .iter()
            .map(|attachment| {
                let layout = self.layout_of(&registry, attachment.texture, attachment.subresource);
                attachment.to_vk(layout.to_vk())
            })
            .collect();

        let depth_stencil = desc.depth_stencil_attachment.map(|attachment| {
            let layout = self
                .layout_of(&registry, attachment.texture, attachment.subresource)
                .to_vk();
            let has_stencil = registry
                .texture_info(attachment.texture)
                .is_some_and(|info| info.aspect.contains(ImageAspectFlags::STENCIL));

            (
                attachment.depth_to_vk(layout),
                has_stencil.then(|| attachment.stencil_to_vk(layout)),
            )
        });
        drop(registry);

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(desc.render_area.to_vk())
            .layer_count(desc.layer_count)
            .color_attachments(&color_attachments);

        if let Some((depth, stencil)) = &depth_stencil {
            rendering_info = rendering_info.depth_attachment(depth);
            if let Some(stencil) = stencil {
                rendering_info = rendering_info.stencil_attachment(stencil);
            }
        }

        self.command_buffer.begin_rendering(&rendering_info);
    }

    pub fn end_render_pass(&mut self) {
        self.state.end_pass(PassKind::Render);
        self.command_buffer.end_rendering();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.assert_in_pass(PassKind::Render);
        self.command_buffer.set_viewport(viewport);
    }

    pub fn set_scissor(&mut self, scissor: Rect2D) {
        self.state.assert_in_pass(PassKind::Render);
        self.command_buffer.set_scissor(scissor);
    }

    pub fn bind_graphics_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.state.assert_in_pass(PassKind::Render);
        self.command_buffer
            .bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
    }

    /// Binds vertex buffers, each with a byte offset.
    pub fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[(BufferId, u64)]) {
        self.state.assert_in_pass(PassKind::Render);

        let mut handles: SmallVec<[vk::Buffer; 8]> = SmallVec::with_capacity(buffers.len());
        let mut offsets: SmallVec<[u64; 8]> = SmallVec::with_capacity(buffers.len());
        for (buffer, offset) in buffers {
            let Some(handle) = self.buffer_handle(*buffer) else {
                return;
            };
            handles.push(handle);
            offsets.push(*offset);
        }

        self.command_buffer
            .bind_vertex_buffers(first_binding, &handles, &offsets);
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, index_type: IndexType) {
        self.state.assert_in_pass(PassKind::Render);
        if let Some(handle) = self.buffer_handle(buffer) {
            self.command_buffer.bind_index_buffer(handle, offset, index_type);
        }
    }

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.draw_instanced(vertex_count, 1, first_vertex, 0);
    }

    pub fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.state.assert_in_pass(PassKind::Render);
        self.command_buffer
            .draw(vertex_count, instance_count, first_vertex, first_instance);
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.draw_indexed_instanced(index_count, 1, first_index, vertex_offset, 0);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.state.assert_in_pass(PassKind::Render);
        self.command_buffer.draw_indexed(
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    pub fn begin_compute_pass(&mut self) {
        self.state.begin_pass(PassKind::Compute);
    }

    pub fn bind_compute_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.state.assert_in_pass(PassKind::Compute);
        self.command_buffer
            .bind_pipeline(vk::PipelineBindPoint::COMPUTE, pipeline);
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.state.assert_in_pass(PassKind::Compute);
        self.command_buffer.dispatch(x, y, z);
    }

    pub fn end_compute_pass(&mut self) {
        self.state.end_pass(PassKind::Compute);
    }

    pub fn begin_copy_pass(&mut self) {
        self.state.begin_pass(PassKind::Copy);
    }

    pub fn copy_buffer(&mut self, src: BufferId, dst: BufferId, regions: &[BufferCopy]) {
        self.state.assert_in_pass(PassKind::Copy);
        if let (Some(src), Some(dst)) = (self.buffer_handle(src), self.buffer_handle(dst)) {
            self.command_buffer.copy_buffer(src, dst, regions);
        }
    }

    /// Copies buffer data into a texture. Every region must target
    /// subresources in the same layout.
    pub fn copy_buffer_to_texture(
        &mut self,
        src: BufferId,
        dst: ImageId,
        regions: &[BufferTextureCopy],
    ) {
        self.state.assert_in_pass(PassKind::Copy);
        let Some(first) = regions.first() else {
            return;
        };

        let Some(src) = self.buffer_handle(src) else {
            return;
        };

        let registry = self.device.resources().lock();
        let Some(info) = registry.texture_info(dst) else {
            log::error!("rhi error: {}: texture {:?} is not registered", self.name, dst);
            return;
        };
        let layout = self.layout_of(
            &registry,
            dst,
            SubresourceIndex::new(first.mip_level, first.array_slice),
        );
        drop(registry);

        self.command_buffer
            .copy_buffer_to_image(src, info.handle, layout, info.aspect, regions);
    }

    /// Copies texture data into a buffer. Every region must read
    /// subresources in the same layout.
    pub fn copy_texture_to_buffer(
        &mut self,
        src: ImageId,
        dst: BufferId,
        regions: &[BufferTextureCopy],
    ) {
        self.state.assert_in_pass(PassKind::Copy);
        let Some(first) = regions.first() else {
            return;
        };

        let Some(dst) = self.buffer_handle(dst) else {
            return;
        };

        let registry = self.device.resources().lock();
        let Some(info) = registry.texture_info(src) else {
            log::error!("rhi error: {}: texture {:?} is not registered", self.name, src);
            return;
        };
        let layout = self.layout_of(
            &registry,
            src,
            SubresourceIndex::new(first.mip_level, first.array_slice),
        );
        drop(registry);

        self.command_buffer
            .copy_image_to_buffer(info.handle, layout, info.aspect, dst, regions);
    }

    pub fn copy_texture(&mut self, src: ImageId, dst: ImageId, regions: &[TextureCopy]) {
        self.state.assert_in_pass(PassKind::Copy);
        let Some(first) = regions.first() else {
            return;
        };

        let registry = self.device.resources().lock();
        let (Some(src_info), Some(dst_info)) =
            (registry.texture_info(src), registry.texture_info(dst))
        else {
            log::error!("rhi error: {}: copy between unregistered textures", self.name);
            return;
        };
        let src_layout = self.layout_of(
            &registry,
            src,
            SubresourceIndex::new(first.src_mip_level, first.src_array_slice),
        );
        let dst_layout = self.layout_of(
            &registry,
            dst,
            SubresourceIndex::new(first.dst_mip_level, first.dst_array_slice),
        );
        drop(registry);

        self.command_buffer.copy_image(
            src_info.handle,
            src_layout,
            src_info.aspect,
            dst_info.handle,
            dst_layout,
            dst_info.aspect,
            regions,
        );
    }

    pub fn end_copy_pass(&mut self) {
        self.state.end_pass(PassKind::Copy);
    }

    /// Submits the command buffer to its queue.
    ///
    /// Recording is closed before any driver call. If submitting fails the
    /// command buffer must be [`reset`](Self::reset) before it can be used
    /// again.
    ///
    /// First accesses are resolved against the global resource state, which
    /// may require submitting release barriers on the queues that own the
    /// resources. The resolved barriers run in a separate command buffer
    /// ahead of this one. Once submitted, the final resource states are
    /// published for later submissions.
    ///
    /// With `allow_host_wait`, [`wait`](Self::wait) and
    /// [`try_wait`](Self::try_wait) observe this submission.
    pub fn submit(
        &mut self,
        wait_semaphores: &[&Semaphore],
        signal_semaphores: &[&Semaphore],
        allow_host_wait: bool,
    ) -> RhiResult<()> {
        if let Err(e) = self.state.close() {
            log::error!("rhi error: {} was submitted without being reset", self.name);
            return Err(e);
        }

        self.tracker.generate_finish_barriers();
        let finish = self.tracker.barriers();
        if !finish.is_empty() {
            self.command_buffer.pipeline_barrier(&finish);
        }
        self.command_buffer.end()?;

        let registry = Arc::clone(self.device.resources());
        self.tracker.resolve(&registry.lock());

        let mut command_buffers: SmallVec<[vk::CommandBuffer; 2]> = SmallVec::new();
        let resolved = self.tracker.barriers();
        if !resolved.is_empty() {
            self.resolve_buffer
                .begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
            self.resolve_buffer.pipeline_barrier(&resolved);
            self.resolve_buffer.end()?;
            command_buffers.push(self.resolve_buffer.vk_handle());
        }
        command_buffers.push(self.command_buffer.vk_handle());

        let mut wait_handles: SmallVec<[vk::Semaphore; 4]> = SmallVec::new();
        let mut wait_stages: SmallVec<[vk::PipelineStageFlags; 4]> = SmallVec::new();

        for (family, barriers) in self.tracker.take_queue_transfers() {
            let Some(queue) = self.device.queue_of_family(family) else {
                log::error!("rhi error: no queue of family {} to release resources from", family);
                return Err(RhiError::NotSupported);
            };

            let transfer_tracker = match self.transfer_trackers.entry(family) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(QueueTransferTracker::new(Arc::clone(&self.device), family)?)
                }
            };

            let semaphore = transfer_tracker.submit_barrier(
                queue,
                &barriers.buffer_barriers,
                &barriers.image_barriers,
            )?;
            wait_handles.push(semaphore);
            wait_stages.push(vk::PipelineStageFlags::ALL_COMMANDS);
        }

        for semaphore in wait_semaphores {
            wait_handles.push(semaphore.vk_handle());
            wait_stages.push(vk::PipelineStageFlags::ALL_COMMANDS);
        }

        let signal_handles: SmallVec<[vk::Semaphore; 4]> =
            signal_semaphores.iter().map(|s| s.vk_handle()).collect();

        let fence = if allow_host_wait {
            self.fence.reset()?;
            self.fence.vk_handle()
        } else {
            vk::Fence::null()
        };

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_handles)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_handles);

        self.queue()?
            .submit(self.device.ash_handle(), &[submit_info], fence)?;

        self.tracker.apply(&mut registry.lock());
        self.state.mark_submitted();

        log::debug!(
            "Submitted {} ({} command buffers, {} waits)",
            self.name,
            command_buffers.len(),
            wait_handles.len()
        );

        Ok(())
    }

    /// Blocks until the last host-waitable submission completed.
    pub fn wait(&self) -> RhiResult<()> {
        self.fence.wait()
    }

    /// Returns `true` if the last host-waitable submission completed.
    pub fn try_wait(&self) -> RhiResult<bool> {
        self.fence.try_wait()
    }

    /// Clears all recorded commands and tracking state and begins recording again.
    ///
    /// The GPU must have finished executing the command buffer. Global
    /// resource state is not modified.
    pub fn reset(&mut self) -> RhiResult<()> {
        self.state.assert_outside_pass("reset");
        if self.state == RecordingState::Closed {
            // A release may have signaled its semaphore without a waiter.
            log::warn!("{}: resetting after a failed submit", self.name);
            self.transfer_trackers.clear();
        }

        if self.command_buffer.is_recording() {
            self.command_buffer.end()?;
        }

        self.pool.reset()?;
        self.command_buffer.pool_reset();
        self.resolve_buffer.pool_reset();

        self.tracker.reset();
        self.attached.clear();

        self.command_buffer
            .begin(CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        self.state.reopen();
        Ok(())
    }
}

impl VkHandle for CommandBuffer {
    type Handle = vk::CommandBuffer;

    fn vk_handle(&self) -> Self::Handle {
        self.command_buffer.vk_handle()
    }
}
