//! Offscreen present target for headless and stereo rendering

use ash::vk;

use super::allocator::{ImageDesc, ImageHandle};
use super::device::Capabilities;
use super::sync::Semaphore;
use super::Core;
use crate::backend::{FrameDevice, QueueSelector, Submission};
use crate::error::{RuntimeError, RuntimeResult};
use crate::target::{Acquired, Extent, ImageRing, PresentTarget, Presented, TargetImage};

/// Color format of offscreen images
pub const OFFSCREEN_FORMAT: vk::Format = vk::Format::B8G8R8A8_SRGB;

/// A ring of allocator-backed images standing in for a swapchain
///
/// Each image has one array layer per view, so a two-layer target receives
/// both eyes of a multiview pass. Images are never recycled before the frame
/// slot that rendered them has been waited on, see [`ImageRing`]. Acquire and present are empty submissions
/// that only move the semaphores, which keeps the frame protocol identical
/// to the window path.
pub struct OffscreenTarget {
    images: Vec<ImageHandle>,
    extent: Extent,
    layers: u32,
    ring: ImageRing,
    generation: u64,
    presented: u64,
}

impl OffscreenTarget {
    /// Allocate a target of `layers` array layers (1 or 2) for
    /// `frames_in_flight` concurrent frames
    pub fn new(core: &Core, extent: Extent, layers: u32, frames_in_flight: usize) -> RuntimeResult<Self> {
        if !(1..=2).contains(&layers) {
            return Err(RuntimeError::invalid(format!("offscreen target needs 1 or 2 layers, got {layers}")));
        }
        if layers > 1 && !core.capabilities().contains(Capabilities::MULTIVIEW) {
            return Err(RuntimeError::invalid("stereo target requires a multiview device"));
        }

        let ring = ImageRing::for_frames_in_flight(frames_in_flight);
        let images = allocate_images(core, extent, layers, ring.image_count())?;
        log::info!(
            "Offscreen target created: {}x{}, {} layer(s), {} images",
            extent.width,
            extent.height,
            layers,
            images.len()
        );

        Ok(Self {
            images,
            extent,
            layers,
            ring,
            generation: 0,
            presented: 0,
        })
    }

    /// Frames handed to [`present`](PresentTarget::present) so far
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }
}

fn allocate_images(core: &Core, extent: Extent, layers: u32, count: usize) -> RuntimeResult<Vec<ImageHandle>> {
    let desc = ImageDesc::color(
        extent,
        OFFSCREEN_FORMAT,
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
    )
    .with_layers(layers);

    (0..count).map(|_| core.allocate_image(&desc)).collect()
}

impl PresentTarget<Core> for OffscreenTarget {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> vk::Format {
        OFFSCREEN_FORMAT
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn layers(&self) -> u32 {
        self.layers
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn present_layout(&self) -> vk::ImageLayout {
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    }

    fn image(&self, index: u32) -> TargetImage {
        let image = &self.images[index as usize];
        TargetImage {
            image: image.image(),
            view: image.view(),
        }
    }

    fn acquire(
        &mut self,
        core: &Core,
        surface_extent: Extent,
        signal: &Semaphore,
        _timeout_ns: u64,
    ) -> RuntimeResult<Acquired> {
        if surface_extent.is_zero() || surface_extent != self.extent {
            return Ok(Acquired::Stale);
        }

        let index = self.ring.advance();

        let signal = [signal];
        core.submit(
            QueueSelector::Graphics,
            &Submission {
                command_buffers: &[],
                wait: &[],
                signal: &signal,
                fence: None,
            },
        )?;

        Ok(Acquired::Image { index, suboptimal: false })
    }

    fn present(&mut self, core: &Core, _index: u32, wait_on: &Semaphore) -> RuntimeResult<Presented> {
        let wait = [(wait_on, vk::PipelineStageFlags::ALL_COMMANDS)];
        core.submit(
            QueueSelector::Graphics,
            &Submission {
                command_buffers: &[],
                wait: &wait,
                signal: &[],
                fence: None,
            },
        )?;
        self.presented += 1;
        Ok(Presented::Done)
    }

    fn recreate(&mut self, core: &Core, extent: Extent) -> RuntimeResult<()> {
        let images = allocate_images(core, extent, self.layers, self.ring.image_count())?;
        self.images = images;
        self.extent = extent;
        self.ring.reset();
        self.generation += 1;
        log::info!(
            "Offscreen target recreated: {}x{}, generation {}",
            extent.width,
            extent.height,
            self.generation
        );
        Ok(())
    }
}
