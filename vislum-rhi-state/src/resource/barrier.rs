use crate::resource::{BufferId, BufferStateFlags, ImageId, ResourceBarrierFlags, TextureStateFlags};

/// One mip level of one array slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubresourceIndex {
    pub mip_level: u32,
    pub array_slice: u32,
}

impl SubresourceIndex {
    pub const fn new(mip_level: u32, array_slice: u32) -> Self {
        Self {
            mip_level,
            array_slice,
        }
    }
}

/// The subresources a texture barrier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureSubresources {
    #[default]
    All,
    Single(SubresourceIndex),
}

/// Declares that a buffer is about to be used in another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBarrier {
    pub buffer: BufferId,
    /// [`BufferStateFlags::AUTOMATIC`] infers the state from the previous accessor.
    pub before: BufferStateFlags,
    pub after: BufferStateFlags,
    pub flags: ResourceBarrierFlags,
}

impl BufferBarrier {
    pub fn new(buffer: BufferId, before: BufferStateFlags, after: BufferStateFlags) -> Self {
        Self {
            buffer,
            before,
            after,
            flags: ResourceBarrierFlags::empty(),
        }
    }

    /// Transitions the buffer from whatever state it was left in.
    pub fn automatic(buffer: BufferId, after: BufferStateFlags) -> Self {
        Self::new(buffer, BufferStateFlags::AUTOMATIC, after)
    }

    pub fn with_flags(self, flags: ResourceBarrierFlags) -> Self {
        Self { flags, ..self }
    }
}

/// Declares that a texture is about to be used in another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBarrier {
    pub texture: ImageId,
    pub subresources: TextureSubresources,
    /// [`TextureStateFlags::AUTOMATIC`] infers the state from the previous accessor.
    pub before: TextureStateFlags,
    pub after: TextureStateFlags,
    pub flags: ResourceBarrierFlags,
}

impl TextureBarrier {
    pub fn new(texture: ImageId, before: TextureStateFlags, after: TextureStateFlags) -> Self {
        Self {
            texture,
            subresources: TextureSubresources::All,
            before,
            after,
            flags: ResourceBarrierFlags::empty(),
        }
    }

    /// Transitions every subresource from whatever state it was left in.
    pub fn automatic(texture: ImageId, after: TextureStateFlags) -> Self {
        Self::new(texture, TextureStateFlags::AUTOMATIC, after)
    }

    pub fn subresource(self, subresource: SubresourceIndex) -> Self {
        Self {
            subresources: TextureSubresources::Single(subresource),
            ..self
        }
    }

    pub fn with_flags(self, flags: ResourceBarrierFlags) -> Self {
        Self { flags, ..self }
    }
}
