//! Window swapchain
//!
//! Surface property choices live in [`SwapchainPlan`] so they can be checked
//! without a device. [`Swapchain`] turns a plan into images and views and
//! implements [`PresentTarget`] for the driver.

use ash::extensions::khr;
use ash::vk;

use super::device::Capabilities;
use super::{Core, Surface};
use crate::backend::QueueSelector;
use crate::config::PresentModePreference;
use crate::error::{RuntimeError, RuntimeResult};
use crate::target::{Acquired, Extent, PresentTarget, Presented, TargetImage};

/// Preferred format, used whenever the surface offers it
pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

fn preferred_present_mode(preference: PresentModePreference) -> vk::PresentModeKHR {
    match preference {
        PresentModePreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentModePreference::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentModePreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}

/// sRGB BGRA when offered, otherwise the first format the surface lists
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|format| format.format == PREFERRED_FORMAT.format && format.color_space == PREFERRED_FORMAT.color_space)
        .or_else(|| formats.first().copied())
}

/// The preferred mode when supported, FIFO otherwise
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], preference: PresentModePreference) -> vk::PresentModeKHR {
    let preferred = preferred_present_mode(preference);
    if modes.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's fixed extent, or `requested` clamped to what it allows
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: requested.width.clamp(min.width, max.width).max(1),
        height: requested.height.clamp(min.height, max.height).max(1),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// `requested` array layers, if the surface can hold that many
///
/// A stereo display presents both eyes as layers of one image.
pub fn choose_array_layers(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u32) -> RuntimeResult<u32> {
    let layers = requested.max(1);
    if layers > capabilities.max_image_array_layers {
        return Err(RuntimeError::DeviceUnavailable(format!(
            "surface supports {} array layer(s), {layers} needed",
            capabilities.max_image_array_layers
        )));
    }
    Ok(layers)
}

/// Everything a swapchain build decides from surface properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPlan {
    /// Image format and color space
    pub format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Actual image extent
    pub extent: vk::Extent2D,
    /// Minimum image count requested from the driver
    pub image_count: u32,
    /// Transform applied at presentation
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// Array layers per image, one per view
    pub layers: u32,
}

impl SwapchainPlan {
    /// Decide a plan for `requested` from queried surface properties
    pub fn choose(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: &[vk::SurfaceFormatKHR],
        present_modes: &[vk::PresentModeKHR],
        requested: Extent,
        preference: PresentModePreference,
        layers: u32,
    ) -> RuntimeResult<Self> {
        let format = choose_surface_format(formats)
            .ok_or_else(|| RuntimeError::DeviceUnavailable("surface reports no formats".to_string()))?;

        Ok(Self {
            format,
            present_mode: choose_present_mode(present_modes, preference),
            extent: choose_extent(capabilities, requested),
            image_count: choose_image_count(capabilities),
            pre_transform: capabilities.current_transform,
            layers: choose_array_layers(capabilities, layers)?,
        })
    }

    /// Query `surface` and decide a plan
    fn query(
        surface: &Surface,
        physical_device: vk::PhysicalDevice,
        requested: Extent,
        preference: PresentModePreference,
        layers: u32,
    ) -> RuntimeResult<Self> {
        let capabilities = surface.capabilities(physical_device)?;
        let formats = surface.formats(physical_device)?;
        let present_modes = surface.present_modes(physical_device)?;
        Self::choose(&capabilities, &formats, &present_modes, requested, preference, layers)
    }
}

/// Window swapchain with RAII cleanup
///
/// Built on the [`Core`]'s surface and must be dropped before it, since the
/// cloned device and loader handles do not keep the device alive. Images are
/// rebuilt in place by [`recreate`](PresentTarget::recreate); the old
/// swapchain is handed to the driver as `old_swapchain` and destroyed once
/// the new one exists.
///
/// A stereo display gets two array layers per image and views covering both,
/// so one multiview pass renders the two eyes.
pub struct Swapchain {
    loader: khr::Swapchain,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    plan: SwapchainPlan,
    preference: PresentModePreference,
    generation: u64,
    built_for: Extent,
    device: ash::Device,
}

impl Swapchain {
    /// Build a swapchain for `extent` on the core's surface with `layers`
    /// array layers (1 for a plain window, 2 for a stereo display)
    pub fn create(
        core: &Core,
        extent: Extent,
        preference: PresentModePreference,
        layers: u32,
    ) -> RuntimeResult<Self> {
        if layers > 1 && !core.capabilities().contains(Capabilities::MULTIVIEW) {
            return Err(RuntimeError::invalid("layered swapchain requires a multiview device"));
        }
        let surface = core.surface()?;
        let loader = khr::Swapchain::new(core.instance().raw(), core.device());
        let plan = SwapchainPlan::query(surface, core.physical_device(), extent, preference, layers)?;
        let families = core.queue_families();
        let (swapchain, images, views) =
            build(&loader, core.device(), surface, &plan, &families.unique(), vk::SwapchainKHR::null())?;

        log::info!(
            "Swapchain created: {}x{} {:?} {:?}, {} images, {} layer(s)",
            plan.extent.width,
            plan.extent.height,
            plan.format.format,
            plan.present_mode,
            images.len(),
            plan.layers
        );

        Ok(Self {
            loader,
            swapchain,
            images,
            views,
            plan,
            preference,
            generation: 0,
            built_for: extent,
            device: core.device().clone(),
        })
    }

    /// Decisions the current images were built with
    pub fn plan(&self) -> &SwapchainPlan {
        &self.plan
    }

    /// Raw swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    fn destroy_images(&mut self) {
        unsafe {
            for view in self.views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
        self.images.clear();
        self.swapchain = vk::SwapchainKHR::null();
    }
}

impl PresentTarget<Core> for Swapchain {
    fn extent(&self) -> Extent {
        self.plan.extent.into()
    }

    fn format(&self) -> vk::Format {
        self.plan.format.format
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn layers(&self) -> u32 {
        self.plan.layers
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn present_layout(&self) -> vk::ImageLayout {
        vk::ImageLayout::PRESENT_SRC_KHR
    }

    fn image(&self, index: u32) -> TargetImage {
        TargetImage {
            image: self.images[index as usize],
            view: self.views[index as usize],
        }
    }

    fn acquire(
        &mut self,
        _core: &Core,
        surface_extent: Extent,
        signal: &super::Semaphore,
        timeout_ns: u64,
    ) -> RuntimeResult<Acquired> {
        // Compared against the requested size, not the clamped one
        if surface_extent.is_zero() || surface_extent != self.built_for {
            log::debug!(
                "Swapchain built for {:?} but surface is {:?}",
                self.built_for,
                surface_extent
            );
            return Ok(Acquired::Stale);
        }

        let result = unsafe {
            self.loader
                .acquire_next_image(self.swapchain, timeout_ns, signal.handle(), vk::Fence::null())
        };

        match result {
            Ok((index, suboptimal)) => Ok(Acquired::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquired::Stale),
            Err(result) => Err(RuntimeError::from_vk("swapchain image acquire", result)),
        }
    }

    fn present(&mut self, core: &Core, index: u32, wait_on: &super::Semaphore) -> RuntimeResult<Presented> {
        let wait_semaphores = [wait_on.handle()];
        let swapchains = [self.swapchain];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);

        let result = unsafe { self.loader.queue_present(core.queue(QueueSelector::Present), &present_info) };

        match result {
            Ok(false) => Ok(Presented::Done),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Presented::Stale),
            Err(result) => Err(RuntimeError::from_vk("present", result)),
        }
    }

    fn recreate(&mut self, core: &Core, extent: Extent) -> RuntimeResult<()> {
        let surface = core.surface()?;
        let plan = SwapchainPlan::query(surface, core.physical_device(), extent, self.preference, self.plan.layers)?;
        let families = core.queue_families();
        let (swapchain, images, views) =
            build(&self.loader, &self.device, surface, &plan, &families.unique(), self.swapchain)?;

        self.destroy_images();
        self.swapchain = swapchain;
        self.images = images;
        self.views = views;
        self.plan = plan;
        self.built_for = extent;
        self.generation += 1;

        log::info!(
            "Swapchain recreated: {}x{}, generation {}",
            plan.extent.width,
            plan.extent.height,
            self.generation
        );
        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_images();
    }
}

type Built = (vk::SwapchainKHR, Vec<vk::Image>, Vec<vk::ImageView>);

fn build(
    loader: &khr::Swapchain,
    device: &ash::Device,
    surface: &Surface,
    plan: &SwapchainPlan,
    queue_families: &[u32],
    old_swapchain: vk::SwapchainKHR,
) -> RuntimeResult<Built> {
    let sharing_mode = if queue_families.len() > 1 {
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    };

    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface.handle())
        .min_image_count(plan.image_count)
        .image_format(plan.format.format)
        .image_color_space(plan.format.color_space)
        .image_extent(plan.extent)
        .image_array_layers(plan.layers)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(queue_families)
        .pre_transform(plan.pre_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(plan.present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let swapchain = unsafe {
        loader
            .create_swapchain(&create_info, None)
            .map_err(RuntimeError::vk("swapchain creation"))?
    };

    let images = match unsafe { loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(result) => {
            unsafe { loader.destroy_swapchain(swapchain, None) };
            return Err(RuntimeError::from_vk("swapchain images query", result));
        }
    };

    let view_type = if plan.layers > 1 {
        vk::ImageViewType::TYPE_2D_ARRAY
    } else {
        vk::ImageViewType::TYPE_2D
    };

    let mut views = Vec::with_capacity(images.len());
    for &image in &images {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(view_type)
            .format(plan.format.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: plan.layers,
            });

        match unsafe { device.create_image_view(&create_info, None) } {
            Ok(view) => views.push(view),
            Err(result) => {
                unsafe {
                    for view in views {
                        device.destroy_image_view(view, None);
                    }
                    loader.destroy_swapchain(swapchain, None);
                }
                return Err(RuntimeError::from_vk("swapchain image view creation", result));
            }
        }
    }

    Ok((swapchain, images, views))
}
