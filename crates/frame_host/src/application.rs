//! Application contract
//!
//! The driver calls exactly three entry points: [`Application::new`] once,
//! [`Application::event`] for every platform event, and
//! [`Application::frame`] once per drawn tick.

use std::marker::PhantomData;

use ash::vk;

use crate::backend::FrameDevice;
use crate::error::RuntimeResult;
use crate::events::PlatformEvent;
use crate::gpu::Core;
use crate::platform::Platform;
use crate::target::{Extent, TargetImage};

/// What the application gets to set itself up
#[derive(Debug, Clone, Copy)]
pub struct InitContext {
    /// Recording command buffer, submitted and waited on before the first frame
    pub commands: vk::CommandBuffer,
    /// Color format of the present target
    pub color_format: vk::Format,
    /// Extent of the present target
    pub extent: Extent,
    /// Views per frame: 2 means render both eyes with multiview
    pub view_count: u32,
    /// Number of frame slots
    pub frames_in_flight: usize,
    /// Layout the frame's image must end in
    pub present_layout: vk::ImageLayout,
}

/// Everything needed to record one tick
///
/// Borrowed from the driver for a single [`Application::frame`] call.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Frame clock slot in `0..frames_in_flight`
    pub index: usize,
    /// Setup commands, executed before [`commands`](Self::commands)
    pub setup_commands: vk::CommandBuffer,
    /// Per-frame drawing commands
    pub commands: vk::CommandBuffer,
    /// Index of the acquired image in the present target
    pub image_index: u32,
    /// The image and its view
    pub target: TargetImage,
    /// Image extent
    pub extent: Extent,
    /// Image array layers: 2 for stereo
    pub layers: u32,
    /// Present target generation; changes whenever images are rebuilt
    pub generation: u64,
    /// Seconds since the loop started
    pub time: f32,
    pub(crate) _borrow: PhantomData<&'a ()>,
}

/// A program driven by the frame loop
pub trait Application<D: FrameDevice = Core>: Sized {
    /// Build the application, recording any uploads into `init.commands`
    fn new(init: &InitContext, core: &D, platform: &mut dyn Platform) -> RuntimeResult<Self>;

    /// Handle a platform event
    fn event(
        &mut self,
        _event: &PlatformEvent,
        _core: &D,
        _platform: &mut dyn Platform,
    ) -> RuntimeResult<()> {
        Ok(())
    }

    /// Record one frame into the frame's command buffers
    fn frame(&mut self, frame: Frame<'_>, core: &D, platform: &mut dyn Platform) -> RuntimeResult<()>;
}
