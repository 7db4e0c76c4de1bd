//! Wiring the real device, target and loop together

use ash::vk;

use crate::application::Application;
use crate::config::RuntimeConfig;
use crate::error::RuntimeResult;
use crate::gpu::{Capabilities, Core, Instance, OffscreenTarget, Semaphore, Swapchain};
use crate::main_loop::{LoopSettings, LoopStats, MainLoop};
use crate::platform::Platform;
use crate::target::{Acquired, Extent, PresentTarget, Presented, TargetImage};

/// The present target the host picked for a platform
pub enum HostTarget {
    /// A window swapchain
    Window(Swapchain),
    /// Offscreen images, one layer per view
    Offscreen(OffscreenTarget),
}

macro_rules! delegate {
    ($self:ident, $target:ident => $call:expr) => {
        match $self {
            HostTarget::Window($target) => $call,
            HostTarget::Offscreen($target) => $call,
        }
    };
}

impl PresentTarget<Core> for HostTarget {
    fn extent(&self) -> Extent {
        delegate!(self, target => target.extent())
    }

    fn format(&self) -> vk::Format {
        delegate!(self, target => target.format())
    }

    fn image_count(&self) -> usize {
        delegate!(self, target => target.image_count())
    }

    fn layers(&self) -> u32 {
        delegate!(self, target => target.layers())
    }

    fn generation(&self) -> u64 {
        delegate!(self, target => target.generation())
    }

    fn present_layout(&self) -> vk::ImageLayout {
        delegate!(self, target => target.present_layout())
    }

    fn image(&self, index: u32) -> TargetImage {
        delegate!(self, target => target.image(index))
    }

    fn acquire(
        &mut self,
        core: &Core,
        surface_extent: Extent,
        signal: &Semaphore,
        timeout_ns: u64,
    ) -> RuntimeResult<Acquired> {
        delegate!(self, target => target.acquire(core, surface_extent, signal, timeout_ns))
    }

    fn present(&mut self, core: &Core, index: u32, wait_on: &Semaphore) -> RuntimeResult<Presented> {
        delegate!(self, target => target.present(core, index, wait_on))
    }

    fn recreate(&mut self, core: &Core, extent: Extent) -> RuntimeResult<()> {
        delegate!(self, target => target.recreate(core, extent))
    }

    fn release(&mut self, core: &Core) {
        delegate!(self, target => target.release(core));
    }
}

/// Device capabilities a platform needs
pub fn required_capabilities(platform: &dyn Platform, presents: bool, validation: bool) -> Capabilities {
    let mut capabilities = Capabilities::empty();
    capabilities.set(Capabilities::PRESENT, presents);
    capabilities.set(Capabilities::MULTIVIEW, platform.view_count() > 1);
    capabilities.set(Capabilities::VALIDATION, validation);
    capabilities
}

/// Open a device for `platform`, run `A` until it closes, and tear down
///
/// Platforms with a window surface get a [`Swapchain`]; the rest get an
/// [`OffscreenTarget`] sized for the frames in flight. Both carry one array
/// layer per view, so a stereo display gets a two-layer swapchain.
pub fn run<A: Application>(config: &RuntimeConfig, platform: &mut dyn Platform) -> RuntimeResult<LoopStats> {
    config.validate()?;

    let extensions = platform.required_instance_extensions()?;
    let instance = Instance::new(config, &extensions)?;
    let surface = platform.create_surface(&instance)?;
    let capabilities = required_capabilities(platform, surface.is_some(), instance.validation_enabled());

    let core = Core::create(instance, surface, capabilities)?;
    let extent = platform.framebuffer_extent();
    let target = if capabilities.contains(Capabilities::PRESENT) {
        HostTarget::Window(Swapchain::create(&core, extent, config.present_mode, platform.view_count())?)
    } else {
        HostTarget::Offscreen(OffscreenTarget::new(
            &core,
            extent,
            platform.view_count(),
            config.frames_in_flight,
        )?)
    };

    let main_loop = MainLoop::<Core, HostTarget, A>::new(core, target, platform, LoopSettings::from(config))?;
    main_loop.run(platform)
}
