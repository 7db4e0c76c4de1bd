//! One uniform region per frame slot

use std::marker::PhantomData;

use ash::vk;
use bytemuck::Pod;

use crate::error::{RuntimeError, RuntimeResult};
use crate::gpu::{BufferHandle, Core};

/// Round `size` up to a multiple of `alignment` (zero means no constraint)
pub fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}

/// A host-visible buffer split into one `T` per frame slot
///
/// Regions are aligned to `minUniformBufferOffsetAlignment` so each one can
/// be bound with a dynamic offset. A slot's region is only written after
/// the slot's fence has signaled, so the GPU never reads a half-written value.
pub struct UniformRing<T: Pod> {
    buffer: BufferHandle,
    stride: u64,
    slots: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformRing<T> {
    /// Allocate `slots` regions
    pub fn new(core: &Core, slots: usize) -> RuntimeResult<Self> {
        if slots == 0 {
            return Err(RuntimeError::invalid("uniform ring needs at least one slot"));
        }
        let stride = align_up(
            std::mem::size_of::<T>() as u64,
            core.limits().min_uniform_buffer_offset_alignment,
        );
        let buffer = core.allocate(stride * slots as u64, vk::BufferUsageFlags::UNIFORM_BUFFER, true)?;
        log::debug!("Uniform ring: {slots} slots of {stride} bytes");

        Ok(Self {
            buffer,
            stride,
            slots,
            _marker: PhantomData,
        })
    }

    /// Write the value for `slot`
    pub fn write(&self, slot: usize, value: &T) -> RuntimeResult<()> {
        let offset = self.offset(slot)?;
        self.buffer.write_pod(offset, value)
    }

    /// Byte offset of `slot`'s region
    pub fn offset(&self, slot: usize) -> RuntimeResult<u64> {
        if slot >= self.slots {
            return Err(RuntimeError::invalid(format!("uniform slot {slot} out of {}", self.slots)));
        }
        Ok(slot as u64 * self.stride)
    }

    /// Dynamic offset for `slot`, as passed to `vkCmdBindDescriptorSets`
    pub fn dynamic_offset(&self, slot: usize) -> RuntimeResult<u32> {
        let offset = self.offset(slot)?;
        u32::try_from(offset).map_err(|_| RuntimeError::invalid("uniform offset exceeds u32"))
    }

    /// Bytes between consecutive regions
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Bytes of one value
    pub fn range(&self) -> u64 {
        std::mem::size_of::<T>() as u64
    }

    /// The backing buffer
    pub fn buffer(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}
