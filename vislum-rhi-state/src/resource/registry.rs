use std::sync::{Mutex, MutexGuard, PoisonError};

use ash::vk;
use slotmap::SlotMap;

use crate::{
    DebugWrapper,
    command::ImageAspectFlags,
    resource::{BufferStateFlags, SubresourceIndex, TextureStateFlags},
};

slotmap::new_key_type! {
    /// Identifies a buffer registered in a [`ResourceRegistry`].
    pub struct BufferId;

    /// Identifies a texture registered in a [`ResourceRegistry`].
    pub struct ImageId;
}

/// The state a resource was left in by the last submission that touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalState<S> {
    pub state: S,
    /// The queue family that owns the resource, if any queue used it yet.
    pub owner: Option<u32>,
}

impl<S> GlobalState<S> {
    pub const fn new(state: S, owner: Option<u32>) -> Self {
        Self { state, owner }
    }
}

impl GlobalState<BufferStateFlags> {
    pub const UNDEFINED: Self = Self::new(BufferStateFlags::empty(), None);
}

impl GlobalState<TextureStateFlags> {
    pub const UNDEFINED: Self = Self::new(TextureStateFlags::empty(), None);
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc {
    pub handle: vk::Buffer,
    pub initial_state: GlobalState<BufferStateFlags>,
}

impl BufferDesc {
    pub fn new(handle: vk::Buffer) -> Self {
        Self {
            handle,
            initial_state: GlobalState::<BufferStateFlags>::UNDEFINED,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDesc {
    pub handle: vk::Image,
    pub format: vk::Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    /// 3D textures track their state per mip level only.
    pub is_3d: bool,
    /// Applied to every subresource.
    pub initial_state: GlobalState<TextureStateFlags>,
}

impl TextureDesc {
    pub fn new(handle: vk::Image, format: vk::Format, mip_levels: u32, array_layers: u32) -> Self {
        Self {
            handle,
            format,
            mip_levels,
            array_layers,
            is_3d: false,
            initial_state: GlobalState::<TextureStateFlags>::UNDEFINED,
        }
    }
}

/// The immutable part of a registered texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureInfo {
    pub handle: vk::Image,
    pub format: vk::Format,
    pub aspect: ImageAspectFlags,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub is_3d: bool,
}

impl TextureInfo {
    /// The number of independently tracked subresources.
    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.tracked_layers()
    }

    #[inline]
    pub fn tracked_layers(&self) -> u32 {
        if self.is_3d { 1 } else { self.array_layers }
    }

    /// Flattens a subresource into its state slot, if it exists.
    pub fn subresource_slot(&self, index: SubresourceIndex) -> Option<u32> {
        let layer = if self.is_3d { 0 } else { index.array_slice };
        if index.mip_level >= self.mip_levels || layer >= self.tracked_layers() {
            return None;
        }

        Some(index.mip_level + layer * self.mip_levels)
    }

    /// Expands a state slot back into its mip level and array slice.
    #[inline]
    pub fn subresource_at(&self, slot: u32) -> SubresourceIndex {
        SubresourceIndex {
            mip_level: slot % self.mip_levels,
            array_slice: slot / self.mip_levels,
        }
    }
}

struct BufferEntry {
    handle: DebugWrapper<vk::Buffer>,
    state: GlobalState<BufferStateFlags>,
    generation: u64,
}

struct TextureEntry {
    info: TextureInfo,
    states: Vec<GlobalState<TextureStateFlags>>,
    generation: u64,
}

/// Owns the global state of every buffer and texture.
///
/// The registry is the single place where states published by a submission
/// become visible to later submissions. Each read or write is memory safe on
/// its own, but the registry does not order submissions: a caller that
/// submits two command buffers touching the same resource must make sure the
/// first `submit` returns before the second one starts.
///
/// Every resource also carries a submission generation that is bumped each
/// time a submission publishes its state. Debug builds use it to detect
/// submissions that raced on the same resource.
#[derive(Default)]
pub struct ResourceRegistry {
    inner: Mutex<RegistryInner>,
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

#[derive(Default)]
pub struct RegistryInner {
    buffers: SlotMap<BufferId, BufferEntry>,
    textures: SlotMap<ImageId, TextureEntry>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the registry for a batch of reads or writes.
    pub fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_buffer(&self, desc: BufferDesc) -> BufferId {
        self.lock().buffers.insert(BufferEntry {
            handle: DebugWrapper(desc.handle),
            state: desc.initial_state,
            generation: 0,
        })
    }

    pub fn register_texture(&self, desc: TextureDesc) -> ImageId {
        let info = TextureInfo {
            handle: desc.handle,
            format: desc.format,
            aspect: aspect_from_format(desc.format),
            mip_levels: desc.mip_levels.max(1),
            array_layers: desc.array_layers.max(1),
            is_3d: desc.is_3d,
        };

        let states = vec![desc.initial_state; info.subresource_count() as usize];
        self.lock().textures.insert(TextureEntry {
            info,
            states,
            generation: 0,
        })
    }

    /// Removes a buffer. Command buffers still referencing it skip it.
    pub fn unregister_buffer(&self, id: BufferId) -> bool {
        self.lock().buffers.remove(id).is_some()
    }

    /// Removes a texture. Command buffers still referencing it skip it.
    pub fn unregister_texture(&self, id: ImageId) -> bool {
        self.lock().textures.remove(id).is_some()
    }

    pub fn buffer_handle(&self, id: BufferId) -> Option<vk::Buffer> {
        self.lock().buffer_handle(id)
    }

    pub fn texture_info(&self, id: ImageId) -> Option<TextureInfo> {
        self.lock().texture_info(id)
    }

    pub fn buffer_state(&self, id: BufferId) -> Option<GlobalState<BufferStateFlags>> {
        self.lock().buffer_state(id)
    }

    pub fn texture_state(
        &self,
        id: ImageId,
        subresource: SubresourceIndex,
    ) -> Option<GlobalState<TextureStateFlags>> {
        let inner = self.lock();
        let info = inner.texture_info(id)?;
        inner.texture_state(id, info.subresource_slot(subresource)?)
    }
}

impl RegistryInner {
    pub fn buffer_handle(&self, id: BufferId) -> Option<vk::Buffer> {
        self.buffers.get(id).map(|entry| entry.handle.0)
    }

    pub fn texture_info(&self, id: ImageId) -> Option<TextureInfo> {
        self.textures.get(id).map(|entry| entry.info)
    }

    pub fn buffer_state(&self, id: BufferId) -> Option<GlobalState<BufferStateFlags>> {
        self.buffers.get(id).map(|entry| entry.state)
    }

    pub fn texture_state(&self, id: ImageId, slot: u32) -> Option<GlobalState<TextureStateFlags>> {
        self.textures
            .get(id)
            .and_then(|entry| entry.states.get(slot as usize).copied())
    }

    pub fn buffer_generation(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(id).map(|entry| entry.generation)
    }

    pub fn texture_generation(&self, id: ImageId) -> Option<u64> {
        self.textures.get(id).map(|entry| entry.generation)
    }

    /// Publishes a buffer state. Returns `false` if the buffer is gone.
    pub fn publish_buffer(&mut self, id: BufferId, state: GlobalState<BufferStateFlags>) -> bool {
        match self.buffers.get_mut(id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Publishes a texture subresource state. Returns `false` if the texture is gone.
    pub fn publish_texture(
        &mut self,
        id: ImageId,
        slot: u32,
        state: GlobalState<TextureStateFlags>,
    ) -> bool {
        match self
            .textures
            .get_mut(id)
            .and_then(|entry| entry.states.get_mut(slot as usize))
        {
            Some(current) => {
                *current = state;
                true
            }
            None => false,
        }
    }

    pub fn bump_buffer_generation(&mut self, id: BufferId) {
        if let Some(entry) = self.buffers.get_mut(id) {
            entry.generation += 1;
        }
    }

    pub fn bump_texture_generation(&mut self, id: ImageId) {
        if let Some(entry) = self.textures.get_mut(id) {
            entry.generation += 1;
        }
    }
}

/// Returns the aspects an image of the given format has.
pub fn aspect_from_format(format: vk::Format) -> ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D32_SFLOAT => {
            ImageAspectFlags::DEPTH
        }
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL,
        vk::Format::S8_UINT => ImageAspectFlags::STENCIL,
        _ => ImageAspectFlags::COLOR,
    }
}
