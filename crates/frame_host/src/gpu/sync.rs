//! Fences and semaphores with RAII cleanup

use ash::{vk, Device};

use crate::error::{RuntimeError, RuntimeResult};

/// GPU-side ordering signal between queue operations
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a binary semaphore
    pub fn new(device: &Device) -> RuntimeResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(RuntimeError::vk("semaphore creation"))?
        };

        Ok(Self { device: device.clone(), semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-observable completion signal
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signaled
    pub fn new(device: &Device, signaled: bool) -> RuntimeResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(RuntimeError::vk("fence creation"))?
        };

        Ok(Self { device: device.clone(), fence })
    }

    /// Block until signaled; expiry is a [`RuntimeError::Timeout`]
    pub fn wait(&self, timeout_ns: u64) -> RuntimeResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout_ns)
                .map_err(RuntimeError::vk("frame fence"))
        }
    }

    /// Return to the unsignaled state
    pub fn reset(&self) -> RuntimeResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(RuntimeError::vk("fence reset"))
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}
