use ash::vk;

use crate::{vk_enum, vk_enum_flags};

vk_enum_flags! {
    pub struct CommandBufferUsageFlags: vk::CommandBufferUsageFlags {
        ONE_TIME_SUBMIT => ONE_TIME_SUBMIT,
    }
}

vk_enum! {
    pub enum ImageLayout: vk::ImageLayout {
        Undefined => UNDEFINED,
        General => GENERAL,
        ColorAttachmentOptimal => COLOR_ATTACHMENT_OPTIMAL,
        DepthStencilAttachmentOptimal => DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        DepthStencilReadOnlyOptimal => DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ShaderReadOnlyOptimal => SHADER_READ_ONLY_OPTIMAL,
        TransferSrcOptimal => TRANSFER_SRC_OPTIMAL,
        TransferDstOptimal => TRANSFER_DST_OPTIMAL,
        PresentSrcKhr => PRESENT_SRC_KHR,
    }
}

vk_enum_flags! {
    pub struct AccessFlags: vk::AccessFlags {
        INDIRECT_COMMAND_READ => INDIRECT_COMMAND_READ,
        INDEX_READ => INDEX_READ,
        VERTEX_ATTRIBUTE_READ => VERTEX_ATTRIBUTE_READ,
        UNIFORM_READ => UNIFORM_READ,
        SHADER_READ => SHADER_READ,
        SHADER_WRITE => SHADER_WRITE,
        COLOR_ATTACHMENT_READ => COLOR_ATTACHMENT_READ,
        COLOR_ATTACHMENT_WRITE => COLOR_ATTACHMENT_WRITE,
        DEPTH_STENCIL_ATTACHMENT_READ => DEPTH_STENCIL_ATTACHMENT_READ,
        DEPTH_STENCIL_ATTACHMENT_WRITE => DEPTH_STENCIL_ATTACHMENT_WRITE,
        TRANSFER_READ => TRANSFER_READ,
        TRANSFER_WRITE => TRANSFER_WRITE,
        MEMORY_READ => MEMORY_READ,
        MEMORY_WRITE => MEMORY_WRITE,
    }
}

vk_enum_flags! {
    pub struct PipelineStageFlags: vk::PipelineStageFlags {
        TOP_OF_PIPE => TOP_OF_PIPE,
        DRAW_INDIRECT => DRAW_INDIRECT,
        VERTEX_INPUT => VERTEX_INPUT,
        VERTEX_SHADER => VERTEX_SHADER,
        FRAGMENT_SHADER => FRAGMENT_SHADER,
        EARLY_FRAGMENT_TESTS => EARLY_FRAGMENT_TESTS,
        LATE_FRAGMENT_TESTS => LATE_FRAGMENT_TESTS,
        COLOR_ATTACHMENT_OUTPUT => COLOR_ATTACHMENT_OUTPUT,
        COMPUTE_SHADER => COMPUTE_SHADER,
        TRANSFER => TRANSFER,
        BOTTOM_OF_PIPE => BOTTOM_OF_PIPE,
        ALL_GRAPHICS => ALL_GRAPHICS,
        ALL_COMMANDS => ALL_COMMANDS,
    }
}

vk_enum_flags! {
    pub struct ImageAspectFlags: vk::ImageAspectFlags {
        COLOR => COLOR,
        DEPTH => DEPTH,
        STENCIL => STENCIL,
    }
}

vk_enum! {
    pub enum IndexType: vk::IndexType {
        Uint16 => UINT16,
        Uint32 => UINT32,
    }
}

vk_enum! {
    pub enum AttachmentLoadOp: vk::AttachmentLoadOp {
        Load => LOAD,
        Clear => CLEAR,
        DontCare => DONT_CARE,
    }
}

vk_enum! {
    pub enum AttachmentStoreOp: vk::AttachmentStoreOp {
        Store => STORE,
        DontCare => DONT_CARE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn to_vk(self) -> vk::Viewport {
        vk::Viewport {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    pub offset: [i32; 2],
    pub extent: [u32; 2],
}

impl Rect2D {
    pub fn new(offset: [i32; 2], extent: [u32; 2]) -> Self {
        Self { offset, extent }
    }

    pub fn to_vk(self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D {
                x: self.offset[0],
                y: self.offset[1],
            },
            extent: vk::Extent2D {
                width: self.extent[0],
                height: self.extent[1],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSubresourceRange {
    pub aspect_mask: ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl ImageSubresourceRange {
    /// A range covering exactly one mip level of one layer.
    pub fn single(aspect_mask: ImageAspectFlags, mip_level: u32, array_layer: u32) -> Self {
        Self {
            aspect_mask,
            base_mip_level: mip_level,
            level_count: 1,
            base_array_layer: array_layer,
            layer_count: 1,
        }
    }

    pub fn to_vk(self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask.to_vk(),
            base_mip_level: self.base_mip_level,
            level_count: self.level_count,
            base_array_layer: self.base_array_layer,
            layer_count: self.layer_count,
        }
    }
}

/// A buffer memory barrier covering the whole buffer.
///
/// Queue family indices are [`vk::QUEUE_FAMILY_IGNORED`] unless the barrier
/// is one half of an ownership transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMemoryBarrier {
    pub buffer: vk::Buffer,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
}

impl BufferMemoryBarrier {
    pub fn to_vk(self) -> vk::BufferMemoryBarrier<'static> {
        vk::BufferMemoryBarrier::default()
            .buffer(self.buffer)
            .src_access_mask(self.src_access_mask.to_vk())
            .dst_access_mask(self.dst_access_mask.to_vk())
            .src_queue_family_index(self.src_queue_family_index)
            .dst_queue_family_index(self.dst_queue_family_index)
            .offset(0)
            .size(vk::WHOLE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMemoryBarrier {
    pub image: vk::Image,
    pub subresource_range: ImageSubresourceRange,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
}

impl ImageMemoryBarrier {
    pub fn to_vk(self) -> vk::ImageMemoryBarrier<'static> {
        vk::ImageMemoryBarrier::default()
            .image(self.image)
            .subresource_range(self.subresource_range.to_vk())
            .src_access_mask(self.src_access_mask.to_vk())
            .dst_access_mask(self.dst_access_mask.to_vk())
            .old_layout(self.old_layout.to_vk())
            .new_layout(self.new_layout.to_vk())
            .src_queue_family_index(self.src_queue_family_index)
            .dst_queue_family_index(self.dst_queue_family_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

impl BufferCopy {
    pub fn to_vk(self) -> vk::BufferCopy {
        vk::BufferCopy {
            src_offset: self.src_offset,
            dst_offset: self.dst_offset,
            size: self.size,
        }
    }
}

/// A region copied between a buffer and one subresource of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTextureCopy {
    pub buffer_offset: u64,
    pub buffer_row_length: u32,
    pub buffer_image_height: u32,
    pub mip_level: u32,
    pub array_slice: u32,
    pub image_offset: [i32; 3],
    pub image_extent: [u32; 3],
}

impl BufferTextureCopy {
    pub fn to_vk(self, aspect_mask: ImageAspectFlags) -> vk::BufferImageCopy {
        vk::BufferImageCopy {
            buffer_offset: self.buffer_offset,
            buffer_row_length: self.buffer_row_length,
            buffer_image_height: self.buffer_image_height,
            image_subresource: subresource_layers(aspect_mask, self.mip_level, self.array_slice),
            image_offset: offset_3d(self.image_offset),
            image_extent: extent_3d(self.image_extent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCopy {
    pub src_mip_level: u32,
    pub src_array_slice: u32,
    pub src_offset: [i32; 3],
    pub dst_mip_level: u32,
    pub dst_array_slice: u32,
    pub dst_offset: [i32; 3],
    pub extent: [u32; 3],
}

impl TextureCopy {
    pub fn to_vk(
        self,
        src_aspect: ImageAspectFlags,
        dst_aspect: ImageAspectFlags,
    ) -> vk::ImageCopy {
        vk::ImageCopy {
            src_subresource: subresource_layers(
                src_aspect,
                self.src_mip_level,
                self.src_array_slice,
            ),
            src_offset: offset_3d(self.src_offset),
            dst_subresource: subresource_layers(
                dst_aspect,
                self.dst_mip_level,
                self.dst_array_slice,
            ),
            dst_offset: offset_3d(self.dst_offset),
            extent: extent_3d(self.extent),
        }
    }
}

fn subresource_layers(
    aspect_mask: ImageAspectFlags,
    mip_level: u32,
    array_slice: u32,
) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: aspect_mask.to_vk(),
        mip_level,
        base_array_layer: array_slice,
        layer_count: 1,
    }
}

fn offset_3d(offset: [i32; 3]) -> vk::Offset3D {
    vk::Offset3D {
        x: offset[0],
        y: offset[1],
        z: offset[2],
    }
}

fn extent_3d(extent: [u32; 3]) -> vk::Extent3D {
    vk::Extent3D {
        width: extent[0],
        height: extent[1],
        depth: extent[2],
    }
}
