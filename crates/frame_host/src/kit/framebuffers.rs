//! Framebuffers for the present target's images

use std::collections::HashMap;

use ash::vk;

use super::render_pass::{ForwardPass, DEPTH_FORMAT};
use crate::application::Frame;
use crate::error::{RuntimeError, RuntimeResult};
use crate::gpu::{Core, ImageDesc, ImageHandle};
use crate::target::Extent;

/// One framebuffer per target image plus a shared depth image
///
/// Everything is thrown away and rebuilt lazily when the target generation
/// changes. The driver drains all frames before a rebuild, so nothing being
/// destroyed here can still be in use.
///
/// Keeps a clone of the device handle; drop it before the [`Core`].
pub struct FramebufferCache {
    device: ash::Device,
    render_pass: vk::RenderPass,
    generation: Option<u64>,
    framebuffers: HashMap<u32, vk::Framebuffer>,
    depth: Option<ImageHandle>,
}

impl FramebufferCache {
    /// Empty cache for framebuffers compatible with `pass`
    pub fn new(core: &Core, pass: &ForwardPass) -> Self {
        Self {
            device: core.device().clone(),
            render_pass: pass.handle(),
            generation: None,
            framebuffers: HashMap::new(),
            depth: None,
        }
    }

    /// Framebuffer for the frame's target image, building it on first use
    pub fn framebuffer(&mut self, core: &Core, frame: &Frame<'_>) -> RuntimeResult<vk::Framebuffer> {
        if self.generation != Some(frame.generation) {
            self.clear();
            self.depth = Some(core.allocate_image(
                &ImageDesc::depth(frame.extent, DEPTH_FORMAT).with_layers(frame.layers),
            )?);
            self.generation = Some(frame.generation);
            log::debug!("Framebuffers invalidated for generation {}", frame.generation);
        }

        if let Some(&framebuffer) = self.framebuffers.get(&frame.image_index) {
            return Ok(framebuffer);
        }

        let depth_view = self
            .depth
            .as_ref()
            .map(ImageHandle::view)
            .ok_or_else(|| RuntimeError::invalid("depth image missing"))?;
        let framebuffer = self.create(frame.target.view, depth_view, frame.extent)?;
        self.framebuffers.insert(frame.image_index, framebuffer);
        Ok(framebuffer)
    }

    /// Number of framebuffers built for the current generation
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether nothing has been built yet
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    fn create(&self, color: vk::ImageView, depth: vk::ImageView, extent: Extent) -> RuntimeResult<vk::Framebuffer> {
        let attachments = [color, depth];
        // Multiview framebuffers have one layer; the views select array layers
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(self.render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        unsafe {
            self.device
                .create_framebuffer(&create_info, None)
                .map_err(RuntimeError::vk("framebuffer creation"))
        }
    }

    fn clear(&mut self) {
        for (_, framebuffer) in self.framebuffers.drain() {
            unsafe {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
        self.depth = None;
    }
}

impl Drop for FramebufferCache {
    fn drop(&mut self) {
        self.clear();
    }
}
