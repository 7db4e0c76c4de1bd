//! Forward render pass: one color and one depth attachment

use ash::vk;

use crate::error::{RuntimeError, RuntimeResult};
use crate::gpu::Core;
use crate::target::Extent;

/// Depth format used by the kit
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Multiview mask rendering views `0..view_count` in one pass
pub fn view_mask(view_count: u32) -> u32 {
    match view_count {
        0 | 1 => 0,
        count => 1u32.checked_shl(count).map_or(u32::MAX, |bit| bit - 1),
    }
}

/// Orders this pass after attachment writes of earlier submissions
///
/// Attachments are shared between frames in flight, so the source scope is
/// the earlier frame's writes.
pub fn external_dependency() -> vk::SubpassDependency {
    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let writes = vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

    vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stages)
        .src_access_mask(writes)
        .dst_stage_mask(stages)
        .dst_access_mask(writes | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ)
        .build()
}

/// Render pass wrapper with RAII cleanup
///
/// Keeps a clone of the device handle and must be dropped before the
/// [`Core`] that created it. The runtime drops the application first.
pub struct ForwardPass {
    device: ash::Device,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
    view_count: u32,
}

impl ForwardPass {
    /// Create a pass that clears, draws, and leaves color in `final_layout`
    ///
    /// With `view_count` 2 the pass renders both layers of the target at once.
    pub fn new(core: &Core, color_format: vk::Format, final_layout: vk::ImageLayout, view_count: u32) -> RuntimeResult<Self> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(final_layout)
            .build();

        let depth_attachment = vk::AttachmentDescription::builder()
            .format(DEPTH_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let attachments = [color_attachment, depth_attachment];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .build()];

        let dependencies = [external_dependency()];

        let view_masks = [view_mask(view_count)];
        let correlation_masks = view_masks;
        let mut multiview = vk::RenderPassMultiviewCreateInfo::builder()
            .view_masks(&view_masks)
            .correlation_masks(&correlation_masks);

        let mut create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        if view_count > 1 {
            create_info = create_info.push_next(&mut multiview);
        }

        let render_pass = unsafe {
            core.device()
                .create_render_pass(&create_info, None)
                .map_err(RuntimeError::vk("render pass creation"))?
        };

        Ok(Self {
            device: core.device().clone(),
            render_pass,
            color_format,
            view_count,
        })
    }

    /// Get the render pass handle
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Color attachment format
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    /// Views rendered per draw
    pub fn view_count(&self) -> u32 {
        self.view_count
    }

    /// Begin the pass on `framebuffer`, clearing color to `clear_color` and depth to 1
    pub fn begin(&self, command_buffer: vk::CommandBuffer, framebuffer: vk::Framebuffer, extent: Extent, clear_color: [f32; 4]) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent.into(),
            })
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    /// End the pass
    pub fn end(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.cmd_end_render_pass(command_buffer);
        }
    }
}

impl Drop for ForwardPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_masks() {
        assert_eq!(view_mask(1), 0);
        assert_eq!(view_mask(2), 0b11);
        assert_eq!(view_mask(4), 0b1111);
    }

    /// The previous frame's attachment writes must be in the source scope
    #[test]
    fn test_external_dependency_covers_prior_writes() {
        let dependency = external_dependency();
        assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert!(dependency
            .src_access_mask
            .contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
        assert!(dependency.src_stage_mask.contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
        assert_eq!(dependency.src_stage_mask, dependency.dst_stage_mask);
    }
}
