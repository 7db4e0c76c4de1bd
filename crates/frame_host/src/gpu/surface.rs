//! Presentation surface

use ash::extensions::khr;
use ash::vk;

use super::Instance;
use crate::error::{RuntimeError, RuntimeResult};

/// Window surface, destroyed on drop
///
/// Owned by the [`Core`](super::Core), so it outlives every swapchain built
/// on it and goes away just before the instance.
pub struct Surface {
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// Take ownership of a surface created by a platform
    pub fn from_raw(instance: &Instance, surface: vk::SurfaceKHR) -> Self {
        Self {
            surface_loader: khr::Surface::new(instance.entry(), instance.raw()),
            surface,
        }
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Whether `queue_family` on `physical_device` can present here
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family: u32) -> RuntimeResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family, self.surface)
                .map_err(RuntimeError::vk("surface support query"))
        }
    }

    /// Surface capabilities for a physical device
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> RuntimeResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
                .map_err(RuntimeError::vk("surface capabilities query"))
        }
    }

    /// Surface formats for a physical device
    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> RuntimeResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(RuntimeError::vk("surface formats query"))
        }
    }

    /// Present modes for a physical device
    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> RuntimeResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)
                .map_err(RuntimeError::vk("present modes query"))
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
