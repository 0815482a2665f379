use ash::vk;

use crate::{
    command::{AttachmentLoadOp, AttachmentStoreOp, Rect2D},
    resource::{ImageId, SubresourceIndex},
};

#[derive(Debug, Clone, Copy)]
pub struct ColorAttachment {
    pub texture: ImageId,
    pub view: vk::ImageView,
    /// The subresource the view renders into.
    pub subresource: SubresourceIndex,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub clear_color: [f32; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilAttachment {
    pub texture: ImageId,
    pub view: vk::ImageView,
    pub subresource: SubresourceIndex,
    pub depth_load_op: AttachmentLoadOp,
    pub depth_store_op: AttachmentStoreOp,
    pub stencil_load_op: AttachmentLoadOp,
    pub stencil_store_op: AttachmentStoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// Describes a dynamic rendering pass.
///
/// Attachment layouts are not part of the description. They are taken from
/// the state the attachments are in when the pass begins, so the caller must
/// declare the attachment states with `resource_barrier` beforehand.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDesc<'a> {
    pub color_attachments: &'a [ColorAttachment],
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub render_area: Rect2D,
    pub layer_count: u32,
}

impl<'a> RenderPassDesc<'a> {
    pub fn new(color_attachments: &'a [ColorAttachment], render_area: Rect2D) -> Self {
        Self {
            color_attachments,
            depth_stencil_attachment: None,
            render_area,
            layer_count: 1,
        }
    }
}

impl ColorAttachment {
    pub(crate) fn to_vk(&self, layout: vk::ImageLayout) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(layout)
            .load_op(self.load_op.to_vk())
            .store_op(self.store_op.to_vk())
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            })
    }
}

impl DepthStencilAttachment {
    pub(crate) fn depth_to_vk(
        &self,
        layout: vk::ImageLayout,
    ) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(layout)
            .load_op(self.depth_load_op.to_vk())
            .store_op(self.depth_store_op.to_vk())
            .clear_value(self.clear_value())
    }

    pub(crate) fn stencil_to_vk(
        &self,
        layout: vk::ImageLayout,
    ) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(layout)
            .load_op(self.stencil_load_op.to_vk())
            .store_op(self.stencil_store_op.to_vk())
            .clear_value(self.clear_value())
    }

    fn clear_value(&self) -> vk::ClearValue {
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: self.clear_depth,
                stencil: self.clear_stencil,
            },
        }
    }
}
