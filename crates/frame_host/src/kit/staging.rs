//! Uploads into device-local buffers

use ash::vk;

use crate::error::RuntimeResult;
use crate::gpu::{BufferHandle, Core};

/// A device-local buffer whose contents are being copied in
///
/// The copy is recorded into a command buffer; the staging buffer must stay
/// alive until that command buffer has finished executing. Call
/// [`finish`](Self::finish) once it has to drop the staging memory.
pub struct StagingUpload {
    buffer: BufferHandle,
    staging: Option<BufferHandle>,
}

impl StagingUpload {
    /// Record a copy of `bytes` into a new device-local buffer with `usage`
    pub fn record(
        core: &Core,
        command_buffer: vk::CommandBuffer,
        bytes: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> RuntimeResult<Self> {
        let size = bytes.len() as u64;
        let staging = core.allocate(size, vk::BufferUsageFlags::TRANSFER_SRC, true)?;
        staging.write_bytes(0, bytes)?;

        let buffer = core.allocate(size, usage | vk::BufferUsageFlags::TRANSFER_DST, false)?;

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            core.device()
                .cmd_copy_buffer(command_buffer, staging.handle(), buffer.handle(), &[region]);
        }

        log::debug!("Recorded staging upload of {size} bytes");
        Ok(Self {
            buffer,
            staging: Some(staging),
        })
    }

    /// The destination buffer
    pub fn buffer(&self) -> &BufferHandle {
        &self.buffer
    }

    /// Whether the staging memory is still held
    pub fn is_pending(&self) -> bool {
        self.staging.is_some()
    }

    /// Release the staging memory; the recorded copy must have completed
    pub fn finish(&mut self, core: &Core) -> RuntimeResult<()> {
        match self.staging.take() {
            Some(staging) => core.free(staging),
            None => Ok(()),
        }
    }

    /// Release the staging memory and keep only the destination buffer
    pub fn into_buffer(mut self, core: &Core) -> RuntimeResult<BufferHandle> {
        self.finish(core)?;
        Ok(self.buffer)
    }
}
