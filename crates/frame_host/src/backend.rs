//! Device seam used by the frame protocol
//!
//! [`FrameClock`](crate::FrameClock) and [`MainLoop`](crate::MainLoop) only
//! talk to the GPU through [`FrameDevice`]. [`Core`](crate::Core) is the real
//! implementation.

use ash::vk;

use crate::error::RuntimeResult;

/// Which queue a submission goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueSelector {
    /// The graphics queue
    Graphics,
    /// The present queue, which may be the graphics queue
    Present,
}

/// One batch of command buffers plus its synchronization
pub struct Submission<'a, D: FrameDevice + ?Sized> {
    /// Command buffers, executed in order
    pub command_buffers: &'a [vk::CommandBuffer],
    /// Semaphores to wait on, each with the stage that waits
    pub wait: &'a [(&'a D::Semaphore, vk::PipelineStageFlags)],
    /// Semaphores signaled when the batch completes
    pub signal: &'a [&'a D::Semaphore],
    /// Fence signaled when the batch completes
    pub fence: Option<&'a D::Fence>,
}

impl<'a, D: FrameDevice + ?Sized> Submission<'a, D> {
    /// A submission with no synchronization
    pub fn commands(command_buffers: &'a [vk::CommandBuffer]) -> Self {
        Self {
            command_buffers,
            wait: &[],
            signal: &[],
            fence: None,
        }
    }
}

/// GPU operations needed to run frames
///
/// Synchronization objects are associated types so each implementation can
/// own its handles (and destroy them on drop).
pub trait FrameDevice {
    /// CPU-observable completion signal
    type Fence;
    /// GPU-side ordering signal
    type Semaphore;
    /// Owner of command buffer memory
    type CommandPool;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> RuntimeResult<Self::Fence>;

    /// Create a binary semaphore
    fn create_semaphore(&self) -> RuntimeResult<Self::Semaphore>;

    /// Create a pool whose buffers can be reset individually
    fn create_command_pool(&self, queue: QueueSelector) -> RuntimeResult<Self::CommandPool>;

    /// Allocate primary command buffers from `pool`
    fn allocate_command_buffers(
        &self,
        pool: &Self::CommandPool,
        count: u32,
    ) -> RuntimeResult<Vec<vk::CommandBuffer>>;

    /// Block until `fence` signals; expiry is reported as [`Timeout`](crate::RuntimeError::Timeout)
    fn wait_for_fence(&self, fence: &Self::Fence, timeout_ns: u64) -> RuntimeResult<()>;

    /// Return `fence` to the unsignaled state
    fn reset_fence(&self, fence: &Self::Fence) -> RuntimeResult<()>;

    /// Reset and begin a one-time-submit recording
    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()>;

    /// Finish a recording
    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()>;

    /// Submit a batch to a queue
    fn submit(&self, queue: QueueSelector, submission: &Submission<'_, Self>) -> RuntimeResult<()>;

    /// Block until the device has no outstanding work
    fn wait_idle(&self) -> RuntimeResult<()>;
}
