//! Instrumented in-memory device, target, platform and application
//!
//! Every operation is appended to a shared call log so tests can assert
//! happens-before relations between fence waits, recording, submission,
//! presentation and teardown.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Deref;
use std::rc::Rc;

use ash::vk::{self, Handle};

use crate::application::{Application, Frame, InitContext};
use crate::backend::{FrameDevice, QueueSelector, Submission};
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{KeyCode, PlatformEvent};
use crate::platform::{Platform, PlatformKind};
use crate::target::{Acquired, Extent, ImageRing, PresentTarget, Presented, TargetImage};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateFence(u64),
    WaitFence(u64),
    ResetFence(u64),
    BeginCommands(u64),
    EndCommands(u64),
    Submit {
        command_buffers: Vec<u64>,
        wait: Vec<u64>,
        signal: Vec<u64>,
        fence: Option<u64>,
    },
    Acquire {
        requested: Extent,
        built_for: Extent,
    },
    AcquireStale,
    Present(u32),
    Recreate(Extent),
    WaitIdle,
    AppNew,
    AppEvent(PlatformEvent),
    AppFrame {
        slot: usize,
        image: u32,
    },
    Destroy(&'static str),
}

#[derive(Default)]
struct MockState {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u64>,
    hung: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct MockLog(Rc<MockState>);

impl MockLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.calls.borrow().clone()
    }

    pub fn push(&self, call: Call) {
        self.0.calls.borrow_mut().push(call);
    }

    fn next_id(&self) -> u64 {
        let id = self.0.next_id.get() + 1;
        self.0.next_id.set(id);
        id
    }

    /// Every later fence wait times out
    pub fn hang_gpu(&self) {
        self.0.hung.set(true);
    }

    /// Fences submitted but not yet waited on among the first `end` calls
    pub fn pending_fences_at(&self, end: usize) -> Vec<u64> {
        let calls = self.0.calls.borrow();
        let mut pending = HashSet::new();
        for call in &calls[..end] {
            match call {
                Call::Submit { fence: Some(fence), .. } => {
                    pending.insert(*fence);
                }
                Call::WaitFence(fence) => {
                    pending.remove(fence);
                }
                Call::WaitIdle => pending.clear(),
                _ => {}
            }
        }
        let mut pending: Vec<u64> = pending.into_iter().collect();
        pending.sort_unstable();
        pending
    }

    /// No command buffer was re-recorded while its last submission's fence
    /// was still unobserved
    pub fn recording_respected_fences(&self) -> bool {
        let mut fence_of = HashMap::new();
        let mut pending = HashSet::new();

        for call in self.0.calls.borrow().iter() {
            match call {
                Call::Submit { command_buffers, fence: Some(fence), .. } => {
                    pending.insert(*fence);
                    for buffer in command_buffers {
                        fence_of.insert(*buffer, *fence);
                    }
                }
                Call::WaitFence(fence) => {
                    pending.remove(fence);
                }
                Call::WaitIdle => pending.clear(),
                Call::BeginCommands(buffer) => {
                    if fence_of.get(buffer).is_some_and(|fence| pending.contains(fence)) {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    /// No image went back to the application while the submission that last
    /// rendered it could still be running
    ///
    /// Submissions on one queue retire in order, so observing any fence
    /// retires everything submitted before it.
    pub fn image_reuse_respected_fences(&self) -> bool {
        let mut serial = 0;
        let mut retired = 0;
        let mut latest_of = HashMap::new();
        let mut rendered_by = HashMap::new();
        let mut recording = None;

        for call in self.0.calls.borrow().iter() {
            match call {
                Call::AppFrame { image, .. } => {
                    if rendered_by.get(image).is_some_and(|&submission| submission > retired) {
                        return false;
                    }
                    recording = Some(*image);
                }
                Call::Submit { fence: Some(fence), .. } => {
                    serial += 1;
                    latest_of.insert(*fence, serial);
                    if let Some(image) = recording.take() {
                        rendered_by.insert(image, serial);
                    }
                }
                Call::WaitFence(fence) => {
                    if let Some(&submission) = latest_of.get(fence) {
                        retired = retired.max(submission);
                    }
                }
                Call::WaitIdle => retired = serial,
                _ => {}
            }
        }
        true
    }
}

pub struct MockDevice {
    log: MockLog,
}

impl MockDevice {
    pub fn new() -> Self {
        Self { log: MockLog::default() }
    }

    pub fn log(&self) -> MockLog {
        self.log.clone()
    }
}

impl Deref for MockDevice {
    type Target = MockLog;

    fn deref(&self) -> &MockLog {
        &self.log
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.log.push(Call::Destroy("device"));
    }
}

pub struct MockFence {
    id: u64,
    log: MockLog,
}

impl Drop for MockFence {
    fn drop(&mut self) {
        self.log.push(Call::Destroy("fence"));
    }
}

pub struct MockSemaphore {
    id: u64,
    log: MockLog,
}

impl Drop for MockSemaphore {
    fn drop(&mut self) {
        self.log.push(Call::Destroy("semaphore"));
    }
}

pub struct MockPool {
    log: MockLog,
}

impl Drop for MockPool {
    fn drop(&mut self) {
        self.log.push(Call::Destroy("command pool"));
    }
}

impl FrameDevice for MockDevice {
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type CommandPool = MockPool;

    fn create_fence(&self, _signaled: bool) -> RuntimeResult<MockFence> {
        let id = self.log.next_id();
        self.log.push(Call::CreateFence(id));
        Ok(MockFence { id, log: self.log() })
    }

    fn create_semaphore(&self) -> RuntimeResult<MockSemaphore> {
        Ok(MockSemaphore { id: self.log.next_id(), log: self.log() })
    }

    fn create_command_pool(&self, _queue: QueueSelector) -> RuntimeResult<MockPool> {
        Ok(MockPool { log: self.log() })
    }

    fn allocate_command_buffers(&self, _pool: &MockPool, count: u32) -> RuntimeResult<Vec<vk::CommandBuffer>> {
        Ok((0..count)
            .map(|_| vk::CommandBuffer::from_raw(self.log.next_id()))
            .collect())
    }

    fn wait_for_fence(&self, fence: &MockFence, _timeout_ns: u64) -> RuntimeResult<()> {
        if self.log.0.hung.get() {
            return Err(RuntimeError::Timeout { what: "frame fence" });
        }
        self.log.push(Call::WaitFence(fence.id));
        Ok(())
    }

    fn reset_fence(&self, fence: &MockFence) -> RuntimeResult<()> {
        self.log.push(Call::ResetFence(fence.id));
        Ok(())
    }

    fn begin_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
        self.log.push(Call::BeginCommands(command_buffer.as_raw()));
        Ok(())
    }

    fn end_commands(&self, command_buffer: vk::CommandBuffer) -> RuntimeResult<()> {
        self.log.push(Call::EndCommands(command_buffer.as_raw()));
        Ok(())
    }

    fn submit(&self, _queue: QueueSelector, submission: &Submission<'_, Self>) -> RuntimeResult<()> {
        self.log.push(Call::Submit {
            command_buffers: submission.command_buffers.iter().map(|buffer| buffer.as_raw()).collect(),
            wait: submission.wait.iter().map(|(semaphore, _)| semaphore.id).collect(),
            signal: submission.signal.iter().map(|semaphore| semaphore.id).collect(),
            fence: submission.fence.map(|fence| fence.id),
        });
        Ok(())
    }

    fn wait_idle(&self) -> RuntimeResult<()> {
        self.log.push(Call::WaitIdle);
        Ok(())
    }
}

pub struct MockTarget {
    extent: Extent,
    built_for: Extent,
    ring: ImageRing,
    layers: u32,
    generation: u64,
    forced_stale: usize,
    stale_present: bool,
}

impl MockTarget {
    /// Swapchain-like target with three images
    pub fn new(extent: Extent) -> Self {
        Self::with_ring(extent, ImageRing::with_count(3))
    }

    /// Offscreen-like target whose ring is sized by the frames in flight
    pub fn offscreen(extent: Extent, frames_in_flight: usize) -> Self {
        Self::with_ring(extent, ImageRing::for_frames_in_flight(frames_in_flight))
    }

    pub fn with_ring(extent: Extent, ring: ImageRing) -> Self {
        Self {
            extent,
            built_for: extent,
            ring,
            layers: 1,
            generation: 0,
            forced_stale: 0,
            stale_present: false,
        }
    }

    /// Images carry `layers` array layers, one per view
    pub fn layered(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    /// The next `count` acquires report out-of-date
    pub fn fail_next_acquires(&mut self, count: usize) {
        self.forced_stale = count;
    }

    /// The next present reports out-of-date
    pub fn stale_next_present(&mut self) {
        self.stale_present = true;
    }
}

impl PresentTarget<MockDevice> for MockTarget {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> vk::Format {
        vk::Format::B8G8R8A8_SRGB
    }

    fn image_count(&self) -> usize {
        self.ring.image_count()
    }

    fn layers(&self) -> u32 {
        self.layers
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn present_layout(&self) -> vk::ImageLayout {
        vk::ImageLayout::PRESENT_SRC_KHR
    }

    fn image(&self, index: u32) -> TargetImage {
        TargetImage {
            image: vk::Image::from_raw(u64::from(index) + 1),
            view: vk::ImageView::from_raw(u64::from(index) + 100),
        }
    }

    fn acquire(
        &mut self,
        device: &MockDevice,
        surface_extent: Extent,
        _signal: &MockSemaphore,
        _timeout_ns: u64,
    ) -> RuntimeResult<Acquired> {
        if self.forced_stale > 0 || surface_extent.is_zero() || surface_extent != self.built_for {
            self.forced_stale = self.forced_stale.saturating_sub(1);
            device.push(Call::AcquireStale);
            return Ok(Acquired::Stale);
        }

        device.push(Call::Acquire { requested: surface_extent, built_for: self.built_for });
        let index = self.ring.advance();
        Ok(Acquired::Image { index, suboptimal: false })
    }

    fn present(&mut self, device: &MockDevice, index: u32, _wait_on: &MockSemaphore) -> RuntimeResult<Presented> {
        device.push(Call::Present(index));
        if std::mem::take(&mut self.stale_present) {
            Ok(Presented::Stale)
        } else {
            Ok(Presented::Done)
        }
    }

    fn recreate(&mut self, device: &MockDevice, extent: Extent) -> RuntimeResult<()> {
        device.push(Call::Recreate(extent));
        self.extent = extent;
        self.built_for = extent;
        self.ring.reset();
        self.generation += 1;
        Ok(())
    }

    fn release(&mut self, device: &MockDevice) {
        device.push(Call::Destroy("target"));
    }
}

pub struct MockPlatform {
    extent: Extent,
    pending: VecDeque<PlatformEvent>,
    polls: u64,
    close_after: Option<u64>,
}

impl MockPlatform {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            pending: VecDeque::new(),
            polls: 0,
            close_after: None,
        }
    }

    pub fn resize(&mut self, extent: Extent) {
        self.extent = extent;
        self.pending.push_back(PlatformEvent::Resized {
            width: extent.width,
            height: extent.height,
        });
    }

    pub fn push_event(&mut self, event: PlatformEvent) {
        self.pending.push_back(event);
    }

    /// Deliver a close request on the poll after `polls` more polls
    pub fn close_after_polls(&mut self, polls: u64) {
        self.close_after = Some(self.polls + polls);
    }
}

impl Platform for MockPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Desktop
    }

    fn framebuffer_extent(&self) -> Extent {
        self.extent
    }

    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>) {
        self.polls += 1;
        if self.close_after.is_some_and(|limit| self.polls > limit) {
            self.close_after = None;
            self.pending.push_back(PlatformEvent::CloseRequested);
        }
        events.extend(self.pending.drain(..));
    }

    fn request_close(&mut self) {
        self.pending.push_back(PlatformEvent::CloseRequested);
    }
}

pub struct RecordingApp {
    pub frames: usize,
    pub fail_on_frame: Option<usize>,
    /// View count the application was initialized with
    pub init_views: u32,
    /// Layer count of every frame handed over
    pub frame_layers: Vec<u32>,
    log: MockLog,
}

impl Application<MockDevice> for RecordingApp {
    fn new(init: &InitContext, core: &MockDevice, _platform: &mut dyn Platform) -> RuntimeResult<Self> {
        core.push(Call::AppNew);
        Ok(Self {
            frames: 0,
            fail_on_frame: None,
            init_views: init.view_count,
            frame_layers: Vec::new(),
            log: core.log(),
        })
    }

    fn event(&mut self, event: &PlatformEvent, core: &MockDevice, platform: &mut dyn Platform) -> RuntimeResult<()> {
        core.push(Call::AppEvent(event.clone()));
        if event.is_key_press(KeyCode::Escape) {
            platform.request_close();
        }
        Ok(())
    }

    fn frame(&mut self, frame: Frame<'_>, core: &MockDevice, _platform: &mut dyn Platform) -> RuntimeResult<()> {
        self.frames += 1;
        self.frame_layers.push(frame.layers);
        core.push(Call::AppFrame { slot: frame.index, image: frame.image_index });
        if self.fail_on_frame == Some(self.frames) {
            return Err(RuntimeError::application("scripted frame failure"));
        }
        Ok(())
    }
}

impl Drop for RecordingApp {
    fn drop(&mut self) {
        self.log.push(Call::Destroy("app"));
    }
}
