//! Physical device and queue family selection

use std::ffi::CStr;

use ash::extensions::khr;
use ash::vk;
use bitflags::bitflags;

use super::{Instance, Surface};
use crate::error::{RuntimeError, RuntimeResult};

bitflags! {
    /// What the caller needs from the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Present to a window surface
        const PRESENT = 1;
        /// Render two views per pass (Vulkan 1.1 multiview)
        const MULTIVIEW = 1 << 1;
        /// Validation layers were requested
        const VALIDATION = 1 << 2;
    }
}

/// Queue families the core opens queues on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family with graphics support
    pub graphics: u32,
    /// Family that can present; equals `graphics` when one family does both
    pub present: u32,
}

impl QueueFamilies {
    /// Whether presentation uses its own family
    pub fn is_split(&self) -> bool {
        self.graphics != self.present
    }

    /// Distinct families, graphics first
    pub fn unique(&self) -> Vec<u32> {
        if self.is_split() {
            vec![self.graphics, self.present]
        } else {
            vec![self.graphics]
        }
    }
}

/// Pick graphics and present families
///
/// `present_support[i]` says whether family `i` can present; `None` means no
/// surface is involved. The graphics family is preferred for presentation;
/// otherwise the first family that can present is used. A surface nobody
/// can present to is an error, never a silent fallback.
pub fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    present_support: Option<&[bool]>,
) -> RuntimeResult<QueueFamilies> {
    let graphics = families
        .iter()
        .position(|family| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .ok_or_else(|| RuntimeError::DeviceUnavailable("no graphics queue family".to_string()))?
        as u32;

    let Some(support) = present_support else {
        return Ok(QueueFamilies { graphics, present: graphics });
    };

    let can_present =
        |index: usize| support.get(index).copied().unwrap_or(false) && families[index].queue_count > 0;

    let present = if can_present(graphics as usize) {
        graphics
    } else {
        (0..families.len())
            .find(|&index| can_present(index))
            .ok_or_else(|| {
                RuntimeError::DeviceUnavailable("no queue family can present to the surface".to_string())
            })? as u32
    };

    Ok(QueueFamilies { graphics, present })
}

/// Preference order between device types; higher wins
pub fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    }
}

/// Highest ranked candidate, first one on ties
fn best_ranked<T>(candidates: Vec<T>, rank: impl Fn(&T) -> u32) -> Option<T> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(best) if rank(&best) >= rank(&candidate) => Some(best),
        _ => Some(candidate),
    })
}

/// A physical device that meets the requested capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub handle: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Chosen queue families
    pub families: QueueFamilies,
}

impl PhysicalDeviceInfo {
    /// Device name as reported by the driver
    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    /// Pick the best suitable device, preferring discrete GPUs
    pub fn select(instance: &Instance, surface: Option<&Surface>, capabilities: Capabilities) -> RuntimeResult<Self> {
        let devices = unsafe {
            instance
                .raw()
                .enumerate_physical_devices()
                .map_err(RuntimeError::vk("physical device enumeration"))?
        };

        let mut suitable = Vec::new();
        let mut last_rejection = None;
        for device in devices {
            match Self::evaluate(instance, device, surface, capabilities) {
                Ok(info) => suitable.push(info),
                Err(error) => {
                    log::debug!("Skipping physical device: {error}");
                    last_rejection = Some(error);
                }
            }
        }

        let chosen = best_ranked(suitable, |info| device_type_rank(info.properties.device_type))
            .ok_or_else(|| {
                last_rejection.unwrap_or_else(|| RuntimeError::DeviceUnavailable("no Vulkan devices".to_string()))
            })?;

        log::info!(
            "Selected GPU: {} ({:?}), graphics family {}, present family {}",
            chosen.name(),
            chosen.properties.device_type,
            chosen.families.graphics,
            chosen.families.present
        );
        Ok(chosen)
    }

    fn evaluate(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: Option<&Surface>,
        capabilities: Capabilities,
    ) -> RuntimeResult<Self> {
        let raw = instance.raw();
        let properties = unsafe { raw.get_physical_device_properties(device) };
        let memory_properties = unsafe { raw.get_physical_device_memory_properties(device) };
        let queue_families = unsafe { raw.get_physical_device_queue_family_properties(device) };

        let present_support = surface
            .map(|surface| {
                (0..queue_families.len() as u32)
                    .map(|index| surface.supports_present(device, index))
                    .collect::<RuntimeResult<Vec<bool>>>()
            })
            .transpose()?;
        let families = select_queue_families(&queue_families, present_support.as_deref())?;

        if surface.is_some() && !supports_extension(raw, device, khr::Swapchain::name())? {
            return Err(RuntimeError::DeviceUnavailable("swapchain extension not supported".to_string()));
        }

        if capabilities.contains(Capabilities::MULTIVIEW) && !supports_multiview(raw, device) {
            return Err(RuntimeError::DeviceUnavailable("multiview not supported".to_string()));
        }

        Ok(Self {
            handle: device,
            properties,
            memory_properties,
            families,
        })
    }
}

fn supports_extension(instance: &ash::Instance, device: vk::PhysicalDevice, name: &CStr) -> RuntimeResult<bool> {
    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .map_err(RuntimeError::vk("device extension enumeration"))?
    };

    Ok(extensions.iter().any(|available| {
        let extension_name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
        extension_name == name
    }))
}

fn supports_multiview(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    let mut multiview = vk::PhysicalDeviceMultiviewFeatures::default();
    let mut features = vk::PhysicalDeviceFeatures2::builder().push_next(&mut multiview);
    unsafe { instance.get_physical_device_features2(device, &mut features) };
    multiview.multiview == vk::TRUE
}
