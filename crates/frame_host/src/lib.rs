//! # Frame Host
//!
//! A host-side Vulkan runtime that owns the frame lifecycle: device setup,
//! swapchain (re)creation, frames in flight, and a per-frame callback loop.
//! Applications implement [`Application`] and record their own commands.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_host::prelude::*;
//!
//! struct Clear;
//!
//! impl Application for Clear {
//!     fn new(_init: &InitContext, _core: &Core, _platform: &mut dyn Platform) -> RuntimeResult<Self> {
//!         Ok(Self)
//!     }
//!
//!     fn frame(&mut self, _frame: Frame<'_>, _core: &Core, _platform: &mut dyn Platform) -> RuntimeResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> RuntimeResult<()> {
//!     let config = RuntimeConfig::new("clear");
//!     let mut platform = DesktopPlatform::new(&config.window)?;
//!     frame_host::run::<Clear>(&config, &mut platform)?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod frame_clock;
pub mod gpu;
pub mod host;
pub mod kit;
pub mod logging;
pub mod main_loop;
pub mod platform;
pub mod target;
pub mod time;

#[cfg(test)]
mod mock;

pub use application::{Application, Frame, InitContext};
pub use backend::{FrameDevice, QueueSelector, Submission};
pub use config::{Config, ConfigError, PresentModePreference, RuntimeConfig, ShaderConfig, WindowConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use events::{ElementState, KeyCode, MouseButton, PlatformEvent};
pub use frame_clock::{FrameClock, SlotCommands, SlotHandle, SlotState};
pub use gpu::{BufferHandle, Capabilities, Core, ImageDesc, ImageHandle, ResourceHandle, Swapchain};
pub use host::{run, HostTarget};
pub use main_loop::{LoopSettings, LoopStats, MainLoop, TickOutcome};
pub use platform::{DesktopPlatform, HeadlessPlatform, Platform, PlatformKind};
pub use target::{Extent, ImageRing, PresentTarget, SurfaceState};
pub use time::FrameTimer;

/// Common imports for applications
pub mod prelude {
    pub use crate::{
        Application, Config, Core, DesktopPlatform, ElementState, Extent, Frame, HeadlessPlatform, InitContext,
        KeyCode, Platform, PlatformEvent, RuntimeConfig, RuntimeError, RuntimeResult,
    };
    pub use ash::vk;
}
