//! Vulkan objects behind the runtime
//!
//! Every wrapper owns its handle and destroys it on drop.

mod allocator;
mod commands;
mod core;
mod device;
mod instance;
mod offscreen;
mod surface;
mod swapchain;
mod sync;

pub use self::allocator::{
    select_memory_type, AllocationKey, BufferHandle, ImageDesc, ImageHandle, ResourceAllocator, ResourceHandle,
};
pub use self::commands::CommandPool;
pub use self::core::Core;
pub use self::device::{
    device_type_rank, select_queue_families, Capabilities, PhysicalDeviceInfo, QueueFamilies,
};
pub use self::instance::Instance;
pub use self::offscreen::{OffscreenTarget, OFFSCREEN_FORMAT};
pub use self::surface::Surface;
pub use self::swapchain::{
    choose_array_layers, choose_extent, choose_image_count, choose_present_mode, choose_surface_format, Swapchain,
    SwapchainPlan, PREFERRED_FORMAT,
};
pub use self::sync::{Fence, Semaphore};
