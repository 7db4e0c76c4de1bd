//! Command pools

use ash::{vk, Device};

use crate::error::{RuntimeError, RuntimeResult};

/// Command pool whose buffers are reset individually before each recording
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool for `queue_family_index`
    pub fn new(device: &Device, queue_family_index: u32) -> RuntimeResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&create_info, None)
                .map_err(RuntimeError::vk("command pool creation"))?
        };

        Ok(Self {
            device: device.clone(),
            command_pool,
        })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> RuntimeResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(RuntimeError::vk("command buffer allocation"))
        }
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        // Buffers allocated from the pool are freed with it
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Reset and begin a one-time-submit recording
pub fn begin_one_time(device: &Device, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
    let begin_info =
        vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    unsafe {
        device
            .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
            .map_err(RuntimeError::vk("command buffer reset"))?;
        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(RuntimeError::vk("command buffer begin"))
    }
}

/// Finish a recording
pub fn end(device: &Device, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
    unsafe {
        device
            .end_command_buffer(command_buffer)
            .map_err(RuntimeError::vk("command buffer end"))
    }
}
