//! Logical device ownership

use std::ffi::c_char;
use std::sync::Arc;

use ash::extensions::khr;
use ash::vk;

use super::allocator::{AllocatorShared, BufferHandle, ImageDesc, ImageHandle, ResourceHandle};
use super::commands::{self, CommandPool};
use super::device::{Capabilities, PhysicalDeviceInfo, QueueFamilies};
use super::sync::{Fence, Semaphore};
use super::{Instance, Surface};
use crate::backend::{FrameDevice, QueueSelector, Submission};
use crate::error::{RuntimeError, RuntimeResult};

/// The logical device, its queues and its allocator
///
/// Owns the instance and the window surface it was created from. Dropping
/// the core waits for the device to go idle, releases leaked allocations,
/// then destroys the device, the surface and the instance in that order.
pub struct Core {
    allocator: Arc<AllocatorShared>,
    device: ash::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    physical: PhysicalDeviceInfo,
    capabilities: Capabilities,
    surface: Option<Surface>,
    instance: Instance,
}

struct Opened {
    device: ash::Device,
    physical: PhysicalDeviceInfo,
}

impl Core {
    /// Select a physical device and open a logical device on it
    ///
    /// `surface` is required when `capabilities` contains
    /// [`Capabilities::PRESENT`]. Failure is final; nothing is retried.
    pub fn create(instance: Instance, surface: Option<Surface>, capabilities: Capabilities) -> RuntimeResult<Self> {
        let opened = match Self::open(&instance, surface.as_ref(), capabilities) {
            Ok(opened) => opened,
            Err(error) => {
                // The surface must go before its instance
                drop(surface);
                drop(instance);
                return Err(error);
            }
        };
        let Opened { device, physical } = opened;
        let families = physical.families;

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        let allocator = Arc::new(AllocatorShared::new(device.clone(), physical.memory_properties));

        log::info!("Logical device created on {} with {:?}", physical.name(), capabilities);

        Ok(Self {
            allocator,
            device,
            graphics_queue,
            present_queue,
            physical,
            capabilities,
            surface: if capabilities.contains(Capabilities::PRESENT) { surface } else { None },
            instance,
        })
    }

    fn open(instance: &Instance, surface: Option<&Surface>, capabilities: Capabilities) -> RuntimeResult<Opened> {
        let surface = match (capabilities.contains(Capabilities::PRESENT), surface) {
            (true, None) => return Err(RuntimeError::invalid("presentation requested without a surface")),
            (true, Some(surface)) => Some(surface),
            (false, _) => None,
        };

        let physical = PhysicalDeviceInfo::select(instance, surface, capabilities)?;
        let families = physical.families;

        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extension_names: Vec<*const c_char> = if surface.is_some() {
            vec![khr::Swapchain::name().as_ptr()]
        } else {
            Vec::new()
        };

        let features = vk::PhysicalDeviceFeatures::default();
        let mut multiview = vk::PhysicalDeviceMultiviewFeatures::builder().multiview(true);
        let mut create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);
        if capabilities.contains(Capabilities::MULTIVIEW) {
            create_info = create_info.push_next(&mut multiview);
        }

        let device = unsafe {
            instance
                .raw()
                .create_device(physical.handle, &create_info, None)
                .map_err(|result| {
                    RuntimeError::DeviceUnavailable(format!("logical device creation failed: {result:?}"))
                })?
        };

        Ok(Opened { device, physical })
    }

    /// Device function table
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// The instance the device was created from
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The window surface, when the core was opened for presentation
    pub fn surface(&self) -> RuntimeResult<&Surface> {
        self.surface
            .as_ref()
            .ok_or_else(|| RuntimeError::invalid("device was opened without a surface"))
    }

    /// Physical device handle
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical.handle
    }

    /// Physical device properties
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.physical.properties
    }

    /// Device limits, e.g. uniform buffer offset alignment
    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.physical.properties.limits
    }

    /// Queue families in use
    pub fn queue_families(&self) -> QueueFamilies {
        self.physical.families
    }

    /// Capabilities the device was opened with
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Queue for `selector`; both resolve to one queue when the families match
    pub fn queue(&self, selector: QueueSelector) -> vk::Queue {
        match selector {
            QueueSelector::Graphics => self.graphics_queue,
            QueueSelector::Present => self.present_queue,
        }
    }

    fn queue_family(&self, selector: QueueSelector) -> u32 {
        match selector {
            QueueSelector::Graphics => self.physical.families.graphics,
            QueueSelector::Present => self.physical.families.present,
        }
    }

    /// Allocate a buffer backed by its own memory
    ///
    /// `host_visible` asks for CPU-writable coherent memory; otherwise
    /// device-local memory is preferred.
    pub fn allocate(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        host_visible: bool,
    ) -> RuntimeResult<BufferHandle> {
        self.allocator.allocate_buffer(size, usage, host_visible)
    }

    /// Allocate a device-local 2D image with a view over all its layers
    pub fn allocate_image(&self, desc: &ImageDesc) -> RuntimeResult<ImageHandle> {
        self.allocator.allocate_image(desc)
    }

    /// Copy `bytes` into a host-visible buffer at `offset`
    pub fn write_buffer(&self, buffer: &BufferHandle, offset: u64, bytes: &[u8]) -> RuntimeResult<()> {
        buffer.write_bytes(offset, bytes)
    }

    /// Release an allocation now
    ///
    /// The caller guarantees the GPU no longer uses it.
    pub fn free(&self, handle: impl Into<ResourceHandle>) -> RuntimeResult<()> {
        let handle = handle.into();
        if !handle.belongs_to(&self.allocator) {
            return Err(RuntimeError::invalid("handle was allocated by another device"));
        }
        drop(handle);
        Ok(())
    }

    /// Allocations not yet freed
    pub fn live_allocations(&self) -> usize {
        self.allocator.live_count()
    }
}

impl FrameDevice for Core {
    type Fence = Fence;
    type Semaphore = Semaphore;
    type CommandPool = CommandPool;

    fn create_fence(&self, signaled: bool) -> RuntimeResult<Fence> {
        Fence::new(&self.device, signaled)
    }

    fn create_semaphore(&self) -> RuntimeResult<Semaphore> {
        Semaphore::new(&self.device)
    }

    fn create_command_pool(&self, queue: QueueSelector) -> RuntimeResult<CommandPool> {
        CommandPool::new(&self.device, self.queue_family(queue))
    }

    fn allocate_command_buffers(&self, pool: &CommandPool, count: u32) -> RuntimeResult<Vec<vk::CommandBuffer>> {
        pool.allocate_command_buffers(count)
    }

    fn wait_for_fence(&self, fence: &Fence, timeout_ns: u64) -> RuntimeResult<()> {
        fence.wait(timeout_ns)
    }

    fn reset_fence(&self, fence: &Fence) -> RuntimeResult<()> {
        fence.reset()
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
        commands::begin_one_time(&self.device, command_buffer)
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
        commands::end(&self.device, command_buffer)
    }

    fn submit(&self, queue: QueueSelector, submission: &Submission<'_, Self>) -> RuntimeResult<()> {
        let wait_semaphores: Vec<vk::Semaphore> =
            submission.wait.iter().map(|(semaphore, _)| semaphore.handle()).collect();
        let wait_stages: Vec<vk::PipelineStageFlags> = submission.wait.iter().map(|(_, stage)| *stage).collect();
        let signal_semaphores: Vec<vk::Semaphore> =
            submission.signal.iter().map(|semaphore| semaphore.handle()).collect();

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(submission.command_buffers)
            .signal_semaphores(&signal_semaphores);

        let fence = submission.fence.map_or(vk::Fence::null(), Fence::handle);

        unsafe {
            self.device
                .queue_submit(self.queue(queue), &[submit_info.build()], fence)
                .map_err(RuntimeError::vk("queue submit"))
        }
    }

    fn wait_idle(&self) -> RuntimeResult<()> {
        unsafe { self.device.device_wait_idle().map_err(RuntimeError::vk("device wait idle")) }
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        unsafe {
            if let Err(error) = self.device.device_wait_idle() {
                log::error!("Device wait idle failed during shutdown: {error:?}");
            }
        }

        let leaked = self.allocator.release_all();
        if leaked > 0 {
            log::warn!("{leaked} allocation(s) were still live at device shutdown");
        }

        unsafe {
            self.device.destroy_device(None);
        }
        log::info!("Logical device destroyed");
    }
}
