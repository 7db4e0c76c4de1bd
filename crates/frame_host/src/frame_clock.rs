//! Frames in flight
//!
//! A [`FrameClock`] owns N slots. Each slot holds a setup command buffer, a
//! frame command buffer, a completion fence and two semaphores. A slot moves
//! `Idle -> Recording -> Submitted` and only returns to `Idle` once its fence
//! has been observed signaled, which happens lazily the next time the slot
//! comes around. That lets the CPU record slot N+1 while the GPU still runs
//! slot N.

use ash::vk;

use crate::backend::{FrameDevice, QueueSelector, Submission};
use crate::error::{RuntimeError, RuntimeResult};

/// Per-slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Free to record; any previous GPU use has completed
    Idle,
    /// Command buffers are open
    Recording,
    /// Handed to the GPU, fence not yet observed
    Submitted,
}

/// Proof that a slot has been acquired
///
/// Not `Clone`: exactly one holder, consumed by submit or skip.
#[derive(Debug)]
pub struct SlotHandle {
    index: usize,
}

impl SlotHandle {
    /// Slot index in `0..frames_in_flight`
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The two command buffers of a slot
#[derive(Debug, Clone, Copy)]
pub struct SlotCommands {
    /// Uploads and other one-off work, submitted first
    pub setup: vk::CommandBuffer,
    /// Per-frame drawing
    pub frame: vk::CommandBuffer,
}

struct FrameSlot<D: FrameDevice> {
    commands: SlotCommands,
    in_flight: D::Fence,
    image_available: D::Semaphore,
    render_finished: D::Semaphore,
    state: SlotState,
}

/// Fixed pool of per-frame command buffers and synchronization
pub struct FrameClock<D: FrameDevice> {
    slots: Vec<FrameSlot<D>>,
    current: usize,
    fence_timeout_ns: u64,
    submitted_frames: u64,
    // Dropped after the slots so buffers never outlive their pool
    command_pool: D::CommandPool,
}

impl<D: FrameDevice> FrameClock<D> {
    /// Create `frames_in_flight` slots on `device`
    pub fn new(device: &D, frames_in_flight: usize, fence_timeout_ns: u64) -> RuntimeResult<Self> {
        if frames_in_flight == 0 {
            return Err(RuntimeError::invalid("a frame clock needs at least one slot"));
        }

        let command_pool = device.create_command_pool(QueueSelector::Graphics)?;
        let buffers = device.allocate_command_buffers(&command_pool, (frames_in_flight * 2) as u32)?;

        let slots = buffers
            .chunks_exact(2)
            .map(|pair| {
                Ok(FrameSlot {
                    commands: SlotCommands { setup: pair[0], frame: pair[1] },
                    in_flight: device.create_fence(false)?,
                    image_available: device.create_semaphore()?,
                    render_finished: device.create_semaphore()?,
                    state: SlotState::Idle,
                })
            })
            .collect::<RuntimeResult<Vec<_>>>()?;

        log::debug!("Frame clock created with {} slots", slots.len());

        Ok(Self {
            slots,
            current: 0,
            fence_timeout_ns,
            submitted_frames: 0,
            command_pool,
        })
    }

    /// Number of slots
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot the next [`acquire_slot`](Self::acquire_slot) returns
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Total submissions so far
    pub fn submitted_frames(&self) -> u64 {
        self.submitted_frames
    }

    /// State of slot `index`
    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|slot| slot.state)
    }

    /// The command pool slots allocate from
    pub fn command_pool(&self) -> &D::CommandPool {
        &self.command_pool
    }

    /// Take the current slot, blocking on its fence if it is still in flight
    pub fn acquire_slot(&mut self, device: &D) -> RuntimeResult<SlotHandle> {
        let index = self.current;
        let slot = &mut self.slots[index];

        match slot.state {
            SlotState::Idle => {}
            SlotState::Submitted => {
                device.wait_for_fence(&slot.in_flight, self.fence_timeout_ns)?;
                slot.state = SlotState::Idle;
            }
            SlotState::Recording => {
                return Err(RuntimeError::invalid(format!(
                    "frame slot {index} acquired while still recording"
                )));
            }
        }

        Ok(SlotHandle { index })
    }

    /// Semaphore the image acquire for `slot` must signal
    pub fn image_available(&self, slot: &SlotHandle) -> &D::Semaphore {
        &self.slots[slot.index].image_available
    }

    /// Semaphore signaled when `slot`'s submission finishes
    pub fn render_finished(&self, slot: &SlotHandle) -> &D::Semaphore {
        &self.slots[slot.index].render_finished
    }

    /// Open both command buffers of `slot`, run `record`, and close them
    pub fn record<R>(
        &mut self,
        device: &D,
        slot: &SlotHandle,
        record: impl FnOnce(SlotCommands) -> RuntimeResult<R>,
    ) -> RuntimeResult<R> {
        let frame_slot = &mut self.slots[slot.index];
        if frame_slot.state != SlotState::Idle {
            return Err(RuntimeError::invalid(format!(
                "frame slot {} is {:?}, cannot record",
                slot.index, frame_slot.state
            )));
        }

        let commands = frame_slot.commands;
        device.begin_commands(commands.setup)?;
        device.begin_commands(commands.frame)?;
        frame_slot.state = SlotState::Recording;

        let output = record(commands)?;

        device.end_commands(commands.setup)?;
        device.end_commands(commands.frame)?;
        Ok(output)
    }

    /// Submit `slot` to the graphics queue and move to the next slot
    ///
    /// The submission waits on image-available at color output, signals
    /// render-finished, and arms the slot fence.
    pub fn submit_and_advance(&mut self, device: &D, slot: &SlotHandle) -> RuntimeResult<()> {
        let frame_slot = &mut self.slots[slot.index];
        if frame_slot.state != SlotState::Recording {
            return Err(RuntimeError::invalid(format!(
                "frame slot {} submitted without recording",
                slot.index
            )));
        }

        // Reset as late as possible so an earlier failure never leaves an
        // unsignaled fence behind with nothing queued to signal it
        device.reset_fence(&frame_slot.in_flight)?;

        let command_buffers = [frame_slot.commands.setup, frame_slot.commands.frame];
        let wait = [(
            &frame_slot.image_available,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        )];
        let signal = [&frame_slot.render_finished];
        device.submit(
            QueueSelector::Graphics,
            &Submission {
                command_buffers: &command_buffers,
                wait: &wait,
                signal: &signal,
                fence: Some(&frame_slot.in_flight),
            },
        )?;

        frame_slot.state = SlotState::Submitted;
        self.submitted_frames += 1;
        self.current = (self.current + 1) % self.slots.len();
        Ok(())
    }

    /// Give back a slot that was acquired but not recorded
    pub fn skip(&mut self, slot: SlotHandle) {
        log::trace!("Frame slot {} skipped", slot.index);
    }

    /// Release a slot once its submission and present are queued
    pub fn finish(&mut self, slot: SlotHandle) {
        log::trace!("Frame slot {} in flight", slot.index);
    }

    /// Wait for every submitted slot to complete
    pub fn wait_all(&mut self, device: &D) -> RuntimeResult<()> {
        for slot in &mut self.slots {
            if slot.state == SlotState::Submitted {
                device.wait_for_fence(&slot.in_flight, self.fence_timeout_ns)?;
                slot.state = SlotState::Idle;
            }
        }
        Ok(())
    }

    /// Mark every slot idle after the whole device has been drained
    pub fn assume_idle(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockDevice};

    fn run_tick(clock: &mut FrameClock<MockDevice>, device: &MockDevice) -> usize {
        let slot = clock.acquire_slot(device).unwrap();
        let index = slot.index();
        clock.record(device, &slot, |_| Ok(())).unwrap();
        clock.submit_and_advance(device, &slot).unwrap();
        clock.finish(slot);
        index
    }

    #[test]
    fn test_slots_rotate() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 3, 1_000).unwrap();

        let indices: Vec<usize> = (0..5).map(|_| run_tick(&mut clock, &device)).collect();
        assert_eq!(indices, [0, 1, 2, 0, 1]);
        assert_eq!(clock.submitted_frames(), 5);
    }

    /// With two slots, tick 3 reuses slot 0 only after tick 1's fence wait
    #[test]
    fn test_slot_reuse_waits_for_fence() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 2, 1_000).unwrap();

        for _ in 0..3 {
            run_tick(&mut clock, &device);
        }

        let calls = device.calls();
        let submits: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| matches!(call, Call::Submit { .. }))
            .map(|(position, _)| position)
            .collect();
        assert_eq!(submits.len(), 3);

        let Call::Submit { fence: Some(slot0_fence), command_buffers, .. } = &calls[submits[0]] else {
            panic!("first submit carries no fence");
        };
        let slot0_frame_buffer = command_buffers[1];

        let wait = calls
            .iter()
            .position(|call| *call == Call::WaitFence(*slot0_fence))
            .expect("slot 0 fence never waited on");
        let third_recording = calls
            .iter()
            .rposition(|call| *call == Call::BeginCommands(slot0_frame_buffer))
            .unwrap();

        assert!(wait > submits[1], "fence waited before it was needed");
        assert!(wait < third_recording, "slot 0 re-recorded before its fence signaled");
        assert!(device.recording_respected_fences());
    }

    #[test]
    fn test_first_use_does_not_wait() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 2, 1_000).unwrap();
        run_tick(&mut clock, &device);
        run_tick(&mut clock, &device);

        assert!(!device.calls().iter().any(|call| matches!(call, Call::WaitFence(_))));
    }

    #[test]
    fn test_fence_timeout_is_fatal() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 1, 1_000).unwrap();
        run_tick(&mut clock, &device);

        device.hang_gpu();
        let result = clock.acquire_slot(&device);
        assert!(matches!(result, Err(RuntimeError::Timeout { .. })));
        assert_eq!(clock.slot_state(0), Some(SlotState::Submitted));
    }

    #[test]
    fn test_submit_without_record_rejected() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 2, 1_000).unwrap();
        let slot = clock.acquire_slot(&device).unwrap();

        assert!(clock.submit_and_advance(&device, &slot).is_err());
        clock.skip(slot);
        assert_eq!(clock.current_index(), 0);
    }

    #[test]
    fn test_wait_all_drains_submitted_slots() {
        let device = MockDevice::new();
        let mut clock = FrameClock::new(&device, 2, 1_000).unwrap();
        run_tick(&mut clock, &device);
        run_tick(&mut clock, &device);

        clock.wait_all(&device).unwrap();
        assert_eq!(clock.slot_state(0), Some(SlotState::Idle));
        assert_eq!(clock.slot_state(1), Some(SlotState::Idle));
        assert_eq!(
            device.calls().iter().filter(|call| matches!(call, Call::WaitFence(_))).count(),
            2
        );
    }

    #[test]
    fn test_zero_slots_rejected() {
        let device = MockDevice::new();
        assert!(FrameClock::new(&device, 0, 1_000).is_err());
    }
}
