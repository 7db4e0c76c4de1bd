//! Platform adapters
//!
//! A platform supplies events, the current drawable extent, and (for window
//! systems) the Vulkan surface. The driver never talks to a window system
//! directly.

mod desktop;
mod headless;

pub use desktop::DesktopPlatform;
pub use headless::HeadlessPlatform;

use crate::error::RuntimeResult;
use crate::events::PlatformEvent;
use crate::gpu::{Instance, Surface};
use crate::target::Extent;

/// Kind of display a platform drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// A desktop window presented through a swapchain
    Desktop,
    /// A window on a stereo display; each swapchain image has one layer per eye
    StereoDisplay,
    /// No window; frames render into offscreen images
    Headless,
}

/// Interface the driver consumes from any windowing or display system
pub trait Platform {
    /// Which kind of display this is
    fn kind(&self) -> PlatformKind;

    /// Views rendered per frame: 1 for a monitor, 2 for a stereo display
    fn view_count(&self) -> u32 {
        1
    }

    /// Drawable size in pixels right now. Zero while minimized.
    fn framebuffer_extent(&self) -> Extent;

    /// Append every pending event to `events`
    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>);

    /// Ask for the loop to end; surfaces as [`PlatformEvent::CloseRequested`]
    /// on the next poll
    fn request_close(&mut self);

    /// Instance extensions the surface needs
    fn required_instance_extensions(&self) -> RuntimeResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Create the presentation surface, if this platform has one
    fn create_surface(&mut self, _instance: &Instance) -> RuntimeResult<Option<Surface>> {
        Ok(None)
    }
}
