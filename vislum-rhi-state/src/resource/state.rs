use bitflags::bitflags;

bitflags! {
    /// The ways a buffer can be accessed by the GPU.
    ///
    /// A buffer may be in several read states at once. Write states should
    /// not be combined with anything else.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferStateFlags: u32 {
        const INDIRECT_ARGUMENT = 0x0001;
        const VERTEX_BUFFER = 0x0002;
        const INDEX_BUFFER = 0x0004;
        const UNIFORM_BUFFER_VS = 0x0008;
        const SHADER_READ_VS = 0x0010;
        const UNIFORM_BUFFER_PS = 0x0020;
        const SHADER_READ_PS = 0x0040;
        const SHADER_WRITE_PS = 0x0080;
        const UNIFORM_BUFFER_CS = 0x0100;
        const SHADER_READ_CS = 0x0200;
        const SHADER_WRITE_CS = 0x0400;
        const COPY_DEST = 0x0800;
        const COPY_SOURCE = 0x1000;
        /// The before-state is whatever the previous accessor left.
        const AUTOMATIC = 0x8000_0000;
    }
}

bitflags! {
    /// The ways a texture subresource can be accessed by the GPU.
    ///
    /// The image layout is derived from these flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureStateFlags: u32 {
        const SHADER_READ_VS = 0x0001;
        const SHADER_READ_PS = 0x0002;
        const SHADER_WRITE_PS = 0x0004;
        const COLOR_ATTACHMENT_READ = 0x0008;
        const COLOR_ATTACHMENT_WRITE = 0x0010;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0020;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0040;
        const RESOLVE_ATTACHMENT = 0x0080;
        const SHADER_READ_CS = 0x0100;
        const SHADER_WRITE_CS = 0x0200;
        const COPY_DEST = 0x0400;
        const COPY_SOURCE = 0x0800;
        const PRESENT = 0x1000;
        /// The before-state is whatever the previous accessor left.
        const AUTOMATIC = 0x8000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceBarrierFlags: u32 {
        /// The resource memory was previously used by another resource.
        const ALIASING = 0x1;
        /// The previous content does not need to be preserved.
        const DISCARD_CONTENT = 0x2;
    }
}

impl ResourceBarrierFlags {
    /// Whether the previous content of the resource can be dropped.
    #[inline]
    pub fn discards(self) -> bool {
        self.intersects(Self::ALIASING | Self::DISCARD_CONTENT)
    }
}
