//! GPU memory-backed buffers and images
//!
//! Callers state intent (host-visible staging or device-local) and the
//! allocator picks the memory type. Every allocation gets its own
//! `vkDeviceMemory`; there is no sub-allocation and no defragmentation.
//!
//! Live allocations are tracked in a [`SlotMap`]. Handles free their entry
//! when dropped, and whatever is still live when the [`Core`](super::Core)
//! goes away is logged as a leak and released before the device is destroyed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use ash::vk;
use bytemuck::Pod;
use slotmap::{new_key_type, SlotMap};

use crate::error::{RuntimeError, RuntimeResult};
use crate::target::Extent;

new_key_type! {
    /// Registry key of one live allocation
    pub struct AllocationKey;
}

/// Pick a memory type index for an allocation
///
/// Host-visible requests need a `HOST_VISIBLE | HOST_COHERENT` type so writes
/// never need an explicit flush. Device-local requests prefer `DEVICE_LOCAL`
/// and fall back to the first compatible type. Ties go to the lowest index.
pub fn select_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    host_visible: bool,
) -> Option<u32> {
    let count = properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    let compatible = (0..count).filter(|&index| type_bits & (1u32 << index) != 0);
    let flags = |index: u32| properties.memory_types[index as usize].property_flags;

    if host_visible {
        let required = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        return compatible.clone().find(|&index| flags(index).contains(required));
    }

    compatible
        .clone()
        .find(|&index| flags(index).contains(vk::MemoryPropertyFlags::DEVICE_LOCAL))
        .or_else(|| compatible.clone().next())
}

/// Shape of a 2D image allocation
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Size in pixels
    pub extent: Extent,
    /// Texel format
    pub format: vk::Format,
    /// How the image will be used
    pub usage: vk::ImageUsageFlags,
    /// Aspect covered by the view
    pub aspect: vk::ImageAspectFlags,
    /// Array layers: 1 for mono, 2 for a stereo pair
    pub layers: u32,
}

impl ImageDesc {
    /// A single-layer color image
    pub fn color(extent: Extent, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            extent,
            format,
            usage,
            aspect: vk::ImageAspectFlags::COLOR,
            layers: 1,
        }
    }

    /// A single-layer depth attachment
    pub fn depth(extent: Extent, format: vk::Format) -> Self {
        Self {
            extent,
            format,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            aspect: vk::ImageAspectFlags::DEPTH,
            layers: 1,
        }
    }

    /// Same image with `layers` array layers
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    fn view_type(&self) -> vk::ImageViewType {
        if self.layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        }
    }

    fn validate(&self) -> RuntimeResult<()> {
        if self.extent.is_zero() {
            return Err(RuntimeError::invalid("image extent must be non-zero"));
        }
        if self.layers == 0 {
            return Err(RuntimeError::invalid("image needs at least one layer"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    Buffer(vk::Buffer),
    Image { image: vk::Image, view: vk::ImageView },
}

#[derive(Debug)]
struct Allocation {
    resource: Resource,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    host_visible: bool,
}

impl Allocation {
    unsafe fn destroy(self, device: &ash::Device) {
        match self.resource {
            Resource::Buffer(buffer) => device.destroy_buffer(buffer, None),
            Resource::Image { image, view } => {
                device.destroy_image_view(view, None);
                device.destroy_image(image, None);
            }
        }
        device.free_memory(self.memory, None);
    }
}

/// Registry of live allocations for one device
#[derive(Debug)]
pub struct ResourceAllocator {
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    live: SlotMap<AllocationKey, Allocation>,
}

impl ResourceAllocator {
    /// Create an empty registry for a device with `memory_properties`
    pub fn new(memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            memory_properties,
            live: SlotMap::with_key(),
        }
    }

    /// Number of allocations not yet freed
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Whether `key` still refers to a live allocation
    pub fn contains(&self, key: AllocationKey) -> bool {
        self.live.contains_key(key)
    }

    fn register(&mut self, allocation: Allocation) -> AllocationKey {
        self.live.insert(allocation)
    }

    fn unregister(&mut self, key: AllocationKey) -> Option<Allocation> {
        self.live.remove(key)
    }

    fn allocate_buffer(
        &mut self,
        device: &ash::Device,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        host_visible: bool,
    ) -> RuntimeResult<(AllocationKey, vk::Buffer)> {
        if size == 0 {
            return Err(RuntimeError::invalid("buffer size must be non-zero"));
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(out_of_memory("buffer creation", size))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match self.bind_memory(device, requirements, host_visible, |memory| unsafe {
            device.bind_buffer_memory(buffer, memory, 0)
        }) {
            Ok(memory) => memory,
            Err(error) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(error);
            }
        };

        let key = self.register(Allocation {
            resource: Resource::Buffer(buffer),
            memory,
            size,
            host_visible,
        });
        log::trace!("Allocated buffer {key:?}: {size} bytes, host visible: {host_visible}");
        Ok((key, buffer))
    }

    fn allocate_image(
        &mut self,
        device: &ash::Device,
        desc: &ImageDesc,
    ) -> RuntimeResult<(AllocationKey, vk::Image, vk::ImageView)> {
        desc.validate()?;

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(desc.layers)
            .format(desc.format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(desc.usage)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe {
            device
                .create_image(&image_info, None)
                .map_err(out_of_memory("image creation", 0))?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match self.bind_memory(device, requirements, false, |memory| unsafe {
            device.bind_image_memory(image, memory, 0)
        }) {
            Ok(memory) => memory,
            Err(error) => {
                unsafe { device.destroy_image(image, None) };
                return Err(error);
            }
        };

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(desc.view_type())
            .format(desc.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: desc.aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: desc.layers,
            });

        let view = match unsafe { device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(result) => {
                unsafe {
                    device.destroy_image(image, None);
                    device.free_memory(memory, None);
                }
                return Err(RuntimeError::from_vk("image view creation", result));
            }
        };

        let key = self.register(Allocation {
            resource: Resource::Image { image, view },
            memory,
            size: requirements.size,
            host_visible: false,
        });
        log::trace!(
            "Allocated image {key:?}: {}x{} {:?}, {} layer(s)",
            desc.extent.width,
            desc.extent.height,
            desc.format,
            desc.layers
        );
        Ok((key, image, view))
    }

    /// Allocate memory for `requirements` and bind it with `bind`
    fn bind_memory(
        &self,
        device: &ash::Device,
        requirements: vk::MemoryRequirements,
        host_visible: bool,
        bind: impl FnOnce(vk::DeviceMemory) -> Result<(), vk::Result>,
    ) -> RuntimeResult<vk::DeviceMemory> {
        let memory_type_index =
            select_memory_type(&self.memory_properties, requirements.memory_type_bits, host_visible).ok_or_else(
                || {
                    log::error!(
                        "No compatible memory type (bits {:#b}, host visible: {host_visible})",
                        requirements.memory_type_bits
                    );
                    RuntimeError::OutOfMemory { requested: requirements.size }
                },
            )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(out_of_memory("memory allocation", requirements.size))?
        };

        if let Err(result) = bind(memory) {
            unsafe { device.free_memory(memory, None) };
            return Err(RuntimeError::from_vk("memory binding", result));
        }

        Ok(memory)
    }

    fn write(&self, device: &ash::Device, key: AllocationKey, offset: u64, bytes: &[u8]) -> RuntimeResult<()> {
        let allocation = self
            .live
            .get(key)
            .ok_or_else(|| RuntimeError::invalid("write to a freed allocation"))?;

        if !allocation.host_visible {
            return Err(RuntimeError::invalid("buffer is not host visible"));
        }
        let len = bytes.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > allocation.size) {
            return Err(RuntimeError::invalid(format!(
                "write of {len} bytes at offset {offset} exceeds buffer of {} bytes",
                allocation.size
            )));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        unsafe {
            let mapped = device
                .map_memory(allocation.memory, offset, len, vk::MemoryMapFlags::empty())
                .map_err(RuntimeError::vk("memory map"))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());
            device.unmap_memory(allocation.memory);
        }
        Ok(())
    }

    fn free(&mut self, device: &ash::Device, key: AllocationKey) {
        if let Some(allocation) = self.unregister(key) {
            unsafe { allocation.destroy(device) };
        }
    }

    /// Destroy every live allocation, logging each as a leak
    ///
    /// The device must be idle.
    fn release_all(&mut self, device: &ash::Device) -> usize {
        let leaked = self.live.len();
        for (key, allocation) in self.live.drain() {
            log::error!(
                "Leaked {} {key:?} ({} bytes) released at shutdown",
                match allocation.resource {
                    Resource::Buffer(_) => "buffer",
                    Resource::Image { .. } => "image",
                },
                allocation.size
            );
            unsafe { allocation.destroy(device) };
        }
        leaked
    }
}

/// Replace the unknown size in an out-of-memory classification
fn out_of_memory(context: &'static str, requested: u64) -> impl Fn(vk::Result) -> RuntimeError {
    move |result| match RuntimeError::from_vk(context, result) {
        RuntimeError::OutOfMemory { .. } => RuntimeError::OutOfMemory { requested },
        other => other,
    }
}

/// The registry together with the device it allocates from
pub(crate) struct AllocatorShared {
    device: ash::Device,
    state: Mutex<ResourceAllocator>,
}

impl AllocatorShared {
    pub(crate) fn new(device: ash::Device, memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            device,
            state: Mutex::new(ResourceAllocator::new(memory_properties)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResourceAllocator> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.lock().live_count()
    }

    pub(crate) fn allocate_buffer(
        self: &Arc<Self>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        host_visible: bool,
    ) -> RuntimeResult<BufferHandle> {
        let (key, buffer) = self.lock().allocate_buffer(&self.device, size, usage, host_visible)?;
        Ok(BufferHandle {
            key,
            buffer,
            size,
            host_visible,
            owner: Arc::downgrade(self),
        })
    }

    pub(crate) fn allocate_image(self: &Arc<Self>, desc: &ImageDesc) -> RuntimeResult<ImageHandle> {
        let (key, image, view) = self.lock().allocate_image(&self.device, desc)?;
        Ok(ImageHandle {
            key,
            image,
            view,
            desc: *desc,
            owner: Arc::downgrade(self),
        })
    }

    pub(crate) fn release_all(&self) -> usize {
        self.lock().release_all(&self.device)
    }

    fn write(&self, key: AllocationKey, offset: u64, bytes: &[u8]) -> RuntimeResult<()> {
        self.lock().write(&self.device, key, offset, bytes)
    }

    fn free(&self, key: AllocationKey) {
        self.lock().free(&self.device, key);
    }
}

/// A buffer owned until freed or dropped
///
/// Not `Clone`: exactly one owner frees the memory, so it is never reused
/// while this handle is live.
#[derive(Debug)]
pub struct BufferHandle {
    key: AllocationKey,
    buffer: vk::Buffer,
    size: vk::DeviceSize,
    host_visible: bool,
    owner: Weak<AllocatorShared>,
}

impl BufferHandle {
    /// Vulkan buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Requested size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Whether the CPU can write this buffer
    pub fn is_host_visible(&self) -> bool {
        self.host_visible
    }

    /// Copy `bytes` into the buffer at `offset`
    pub fn write_bytes(&self, offset: u64, bytes: &[u8]) -> RuntimeResult<()> {
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| RuntimeError::invalid("buffer outlived its device"))?;
        owner.write(self.key, offset, bytes)
    }

    /// Copy a plain-old-data value into the buffer at `offset`
    pub fn write_pod<T: Pod>(&self, offset: u64, value: &T) -> RuntimeResult<()> {
        self.write_bytes(offset, bytemuck::bytes_of(value))
    }

    pub(crate) fn belongs_to(&self, owner: &Arc<AllocatorShared>) -> bool {
        std::ptr::eq(self.owner.as_ptr(), Arc::as_ptr(owner))
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.free(self.key);
        }
    }
}

/// A 2D image plus a view over all its layers, owned until freed or dropped
#[derive(Debug)]
pub struct ImageHandle {
    key: AllocationKey,
    image: vk::Image,
    view: vk::ImageView,
    desc: ImageDesc,
    owner: Weak<AllocatorShared>,
}

impl ImageHandle {
    /// Vulkan image handle
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// View covering every layer
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Shape the image was created with
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    pub(crate) fn belongs_to(&self, owner: &Arc<AllocatorShared>) -> bool {
        std::ptr::eq(self.owner.as_ptr(), Arc::as_ptr(owner))
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.free(self.key);
        }
    }
}

/// Either kind of allocation, for [`Core::free`](super::Core::free)
#[derive(Debug)]
pub enum ResourceHandle {
    /// A buffer
    Buffer(BufferHandle),
    /// An image
    Image(ImageHandle),
}

impl ResourceHandle {
    pub(crate) fn belongs_to(&self, owner: &Arc<AllocatorShared>) -> bool {
        match self {
            Self::Buffer(buffer) => buffer.belongs_to(owner),
            Self::Image(image) => image.belongs_to(owner),
        }
    }
}

impl From<BufferHandle> for ResourceHandle {
    fn from(handle: BufferHandle) -> Self {
        Self::Buffer(handle)
    }
}

impl From<ImageHandle> for ResourceHandle {
    fn from(handle: ImageHandle) -> Self {
        Self::Image(handle)
    }
}
