//! Per-tick driver
//!
//! One tick:
//! 1. pump platform events and forward them to the application
//! 2. take the next frame clock slot, waiting on its fence if needed
//! 3. rebuild a stale target, then acquire an image (stale means skip)
//! 4. hand the application a [`Frame`] to record into
//! 5. submit, then present off the render-finished semaphore
//!
//! Teardown always drains the device before anything is destroyed, and
//! destroys in reverse creation order: application, frame clock, present
//! target, core.

use std::marker::PhantomData;

use crate::application::{Application, Frame, InitContext};
use crate::backend::{FrameDevice, QueueSelector, Submission};
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::PlatformEvent;
use crate::frame_clock::FrameClock;
use crate::platform::Platform;
use crate::target::{Acquired, Extent, PresentTarget, Presented, SurfaceLifecycle};
use crate::time::FrameTimer;

/// Driver parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Frame clock slots
    pub frames_in_flight: usize,
    /// Bound on fence and acquire waits
    pub fence_timeout_ns: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for LoopSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            frames_in_flight: config.frames_in_flight,
            fence_timeout_ns: config.fence_timeout_ns(),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was recorded, submitted and presented
    Drawn,
    /// No frame this tick; the target was stale or the window has no area
    Skipped,
    /// A close was requested; call [`MainLoop::shutdown`]
    Exit,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks run
    pub ticks: u64,
    /// Frames submitted
    pub frames: u64,
    /// Ticks that drew nothing
    pub skipped: u64,
    /// Present target rebuilds
    pub recreations: u64,
}

/// Drives an [`Application`] on a device and present target
pub struct MainLoop<D, T, A>
where
    D: FrameDevice,
    T: PresentTarget<D>,
    A: Application<D>,
{
    // Field order is drop order and must stay reverse of creation. The app
    // and the target hold cloned device handles that dangle once core drops.
    app: A,
    clock: FrameClock<D>,
    target: T,
    core: D,
    surface: SurfaceLifecycle,
    timer: FrameTimer,
    events: Vec<PlatformEvent>,
    stats: LoopStats,
    fence_timeout_ns: u64,
}

impl<D, T, A> MainLoop<D, T, A>
where
    D: FrameDevice,
    T: PresentTarget<D>,
    A: Application<D>,
{
    /// Create the frame clock and the application
    ///
    /// The application's init commands are submitted and waited on before
    /// this returns.
    pub fn new(core: D, target: T, platform: &mut dyn Platform, settings: LoopSettings) -> RuntimeResult<Self> {
        let clock = match FrameClock::new(&core, settings.frames_in_flight, settings.fence_timeout_ns) {
            Ok(clock) => clock,
            Err(error) => {
                drain(&core);
                teardown(core, None, target);
                return Err(error);
            }
        };

        match init_application::<D, T, A>(&core, &clock, &target, platform, settings) {
            Ok(app) => {
                log::info!(
                    "Main loop ready: {} frames in flight, {}x{} target",
                    settings.frames_in_flight,
                    target.extent().width,
                    target.extent().height
                );
                Ok(Self {
                    app,
                    clock,
                    target,
                    core,
                    surface: SurfaceLifecycle::new(),
                    timer: FrameTimer::new(),
                    events: Vec::new(),
                    stats: LoopStats::default(),
                    fence_timeout_ns: settings.fence_timeout_ns,
                })
            }
            Err(error) => {
                log::error!("Application initialization failed: {error}");
                drain(&core);
                teardown(core, Some(clock), target);
                Err(error)
            }
        }
    }

    /// The device
    pub fn core(&self) -> &D {
        &self.core
    }

    /// The present target
    pub fn target(&self) -> &T {
        &self.target
    }

    /// The application
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Counters so far
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run one tick
    pub fn tick(&mut self, platform: &mut dyn Platform) -> RuntimeResult<TickOutcome> {
        self.stats.ticks += 1;

        if self.pump_events(platform)? {
            log::info!("Close requested");
            return Ok(TickOutcome::Exit);
        }

        let slot = self.clock.acquire_slot(&self.core)?;

        let surface_extent = platform.framebuffer_extent();
        if self.surface.needs_recreate() && !surface_extent.is_zero() {
            match self.recreate_target(surface_extent) {
                Ok(()) => {}
                Err(error) if error.is_recoverable() => {
                    log::warn!("Surface went stale again while rebuilding");
                    return Ok(self.skip(slot));
                }
                Err(error) => return Err(error),
            }
        }

        let acquired = self.target.acquire(
            &self.core,
            surface_extent,
            self.clock.image_available(&slot),
            self.fence_timeout_ns,
        )?;

        let image_index = match acquired {
            Acquired::Image { index, suboptimal } => {
                if suboptimal {
                    self.surface.mark_stale();
                }
                index
            }
            Acquired::Stale => {
                self.surface.mark_stale();
                return Ok(self.skip(slot));
            }
        };

        self.timer.tick();
        let target_image = self.target.image(image_index);
        let extent = self.target.extent();
        let layers = self.target.layers();
        let generation = self.target.generation();
        let time = self.timer.elapsed();

        let Self { app, clock, core, .. } = &mut *self;
        let core: &D = core;
        clock.record(core, &slot, |commands| {
            let frame = Frame {
                index: slot.index(),
                setup_commands: commands.setup,
                commands: commands.frame,
                image_index,
                target: target_image,
                extent,
                layers,
                generation,
                time,
                _borrow: PhantomData,
            };
            app.frame(frame, core, &mut *platform)
        })?;

        clock.submit_and_advance(core, &slot)?;

        let presented = self
            .target
            .present(&self.core, image_index, self.clock.render_finished(&slot))?;
        if presented == Presented::Stale {
            log::warn!("Present reported a stale surface");
            self.surface.mark_stale();
        }

        self.clock.finish(slot);
        self.stats.frames += 1;
        Ok(TickOutcome::Drawn)
    }

    /// Tick until a close request or a fatal error, then tear down
    pub fn run(mut self, platform: &mut dyn Platform) -> RuntimeResult<LoopStats> {
        log::info!("Entering main loop");

        loop {
            match self.tick(platform) {
                Ok(TickOutcome::Exit) => return self.shutdown(),
                Ok(TickOutcome::Drawn | TickOutcome::Skipped) => {}
                Err(error) => {
                    log::error!("Fatal error, shutting down: {error}");
                    if let Err(shutdown_error) = self.shutdown() {
                        log::error!("Shutdown after fatal error also failed: {shutdown_error}");
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Drain the device and destroy everything in reverse creation order
    pub fn shutdown(self) -> RuntimeResult<LoopStats> {
        let Self { app, mut clock, target, core, surface, stats, .. } = self;

        let stats = LoopStats { recreations: surface.recreations(), ..stats };
        log::info!(
            "Shutting down after {} ticks ({} frames, {} skipped)",
            stats.ticks,
            stats.frames,
            stats.skipped
        );

        let idle = core.wait_idle();
        clock.assume_idle();
        drop(app);
        teardown(core, Some(clock), target);

        idle.map(|()| stats)
    }

    /// Forward events; returns whether a close was requested
    fn pump_events(&mut self, platform: &mut dyn Platform) -> RuntimeResult<bool> {
        let mut events = std::mem::take(&mut self.events);
        platform.poll_events(&mut events);

        let mut close_requested = false;
        for event in &events {
            match event {
                PlatformEvent::Resized { width, height } => {
                    log::debug!("Resize to {width}x{height}");
                    self.surface.mark_stale();
                }
                PlatformEvent::CloseRequested => close_requested = true,
                _ => {}
            }
            self.app.event(event, &self.core, platform)?;
        }

        events.clear();
        self.events = events;
        Ok(close_requested)
    }

    fn recreate_target(&mut self, extent: Extent) -> RuntimeResult<()> {
        let Self { surface, clock, target, core, .. } = &mut *self;
        let core: &D = core;
        surface.recreate(|| clock.wait_all(core), || target.recreate(core, extent))?;

        log::info!(
            "Present target rebuilt at {}x{} (generation {})",
            extent.width,
            extent.height,
            self.target.generation()
        );
        Ok(())
    }

    fn skip(&mut self, slot: crate::frame_clock::SlotHandle) -> TickOutcome {
        self.clock.skip(slot);
        self.stats.skipped += 1;
        TickOutcome::Skipped
    }
}

fn init_application<D, T, A>(
    core: &D,
    clock: &FrameClock<D>,
    target: &T,
    platform: &mut dyn Platform,
    settings: LoopSettings,
) -> RuntimeResult<A>
where
    D: FrameDevice,
    T: PresentTarget<D>,
    A: Application<D>,
{
    let commands = core
        .allocate_command_buffers(clock.command_pool(), 1)?
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::invalid("no init command buffer allocated"))?;

    let init = InitContext {
        commands,
        color_format: target.format(),
        extent: target.extent(),
        view_count: target.layers(),
        frames_in_flight: settings.frames_in_flight,
        present_layout: target.present_layout(),
    };

    core.begin_commands(commands)?;
    let app = A::new(&init, core, platform)?;
    core.end_commands(commands)?;

    let fence = core.create_fence(false)?;
    let command_buffers = [commands];
    core.submit(
        QueueSelector::Graphics,
        &Submission {
            fence: Some(&fence),
            ..Submission::commands(&command_buffers)
        },
    )?;
    core.wait_for_fence(&fence, settings.fence_timeout_ns)?;

    Ok(app)
}

fn drain<D: FrameDevice>(core: &D) {
    if let Err(error) = core.wait_idle() {
        log::error!("Wait idle failed during teardown: {error}");
    }
}

/// Destroy in reverse creation order; the device must already be idle
fn teardown<D, T>(core: D, clock: Option<FrameClock<D>>, mut target: T)
where
    D: FrameDevice,
    T: PresentTarget<D>,
{
    drop(clock);
    target.release(&core);
    drop(target);
    drop(core);
    log::info!("Teardown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ElementState, KeyCode};
    use crate::mock::{Call, MockDevice, MockPlatform, MockTarget, RecordingApp};
    use crate::target::ImageRing;

    fn settings(frames_in_flight: usize) -> LoopSettings {
        LoopSettings { frames_in_flight, fence_timeout_ns: 1_000_000 }
    }

    fn build(
        device: MockDevice,
        platform: &mut MockPlatform,
        frames_in_flight: usize,
    ) -> MainLoop<MockDevice, MockTarget, RecordingApp> {
        let target = MockTarget::new(platform.framebuffer_extent());
        MainLoop::new(device, target, platform, settings(frames_in_flight)).unwrap()
    }

    #[test]
    fn test_init_commands_submitted_before_first_frame() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);

        let calls = log.calls();
        let init_submit = calls.iter().position(|call| matches!(call, Call::Submit { .. })).unwrap();
        let app_new = calls.iter().position(|call| *call == Call::AppNew).unwrap();
        let first_frame = calls.iter().position(|call| matches!(call, Call::AppFrame { .. })).unwrap();
        assert!(app_new < init_submit);
        assert!(init_submit < first_frame);
    }

    /// Tick 3 with two slots reuses slot 0 only after its fence signaled
    #[test]
    fn test_three_ticks_two_slots_fence_before_reuse() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        for _ in 0..3 {
            assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        }

        let frames: Vec<usize> = log
            .calls()
            .iter()
            .filter_map(|call| match call {
                Call::AppFrame { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(frames, [0, 1, 0]);
        assert!(log.recording_respected_fences());
        assert_eq!(
            log.calls().iter().filter(|call| matches!(call, Call::WaitFence(_))).count(),
            // one for the init submission, one before slot 0 is reused
            2
        );
    }

    /// An offscreen ring never hands back an image whose last frame may still run
    #[test]
    fn test_offscreen_ring_reuses_images_after_fence() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let target = MockTarget::offscreen(platform.framebuffer_extent(), 3);
        let mut main_loop: MainLoop<MockDevice, MockTarget, RecordingApp> =
            MainLoop::new(device, target, &mut platform, settings(3)).unwrap();

        for _ in 0..9 {
            assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        }

        assert_eq!(main_loop.target().image_count(), 3);
        assert!(log.image_reuse_respected_fences());
        assert!(log.recording_respected_fences());
    }

    /// Two images under three frames in flight is caught by the reuse check
    #[test]
    fn test_undersized_ring_reuses_busy_image() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let target = MockTarget::with_ring(platform.framebuffer_extent(), ImageRing::with_count(2));
        let mut main_loop: MainLoop<MockDevice, MockTarget, RecordingApp> =
            MainLoop::new(device, target, &mut platform, settings(3)).unwrap();

        for _ in 0..3 {
            main_loop.tick(&mut platform).unwrap();
        }

        assert!(!log.image_reuse_respected_fences());
    }

    /// A layered target drives the view count the application sees
    #[test]
    fn test_layered_target_renders_two_views() {
        let device = MockDevice::new();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let target = MockTarget::new(platform.framebuffer_extent()).layered(2);
        let mut main_loop: MainLoop<MockDevice, MockTarget, RecordingApp> =
            MainLoop::new(device, target, &mut platform, settings(2)).unwrap();

        for _ in 0..3 {
            assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        }
        platform.resize(Extent::new(640, 480));
        main_loop.tick(&mut platform).unwrap();

        assert_eq!(main_loop.app.init_views, 2);
        assert_eq!(main_loop.app.frame_layers, [2, 2, 2, 2]);
    }

    /// Every resize is reflected in the target before the next acquire
    #[test]
    fn test_extent_follows_resizes() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        for extent in [Extent::new(1024, 768), Extent::new(640, 480), Extent::new(640, 481)] {
            platform.resize(extent);
            assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
            assert_eq!(main_loop.target().extent(), extent);
        }

        let calls = log.calls();
        for (position, call) in calls.iter().enumerate() {
            if let Call::Acquire { requested, built_for } = call {
                assert_eq!(requested, built_for, "acquire at call {position} used a stale target");
            }
        }
        assert_eq!(main_loop.shutdown().unwrap().recreations, 3);
    }

    /// Recreation drains every in-flight slot before touching the target
    #[test]
    fn test_recreate_drains_in_flight_frames_first() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        main_loop.tick(&mut platform).unwrap();
        main_loop.tick(&mut platform).unwrap();
        platform.resize(Extent::new(400, 300));
        main_loop.tick(&mut platform).unwrap();

        let calls = log.calls();
        let recreate = calls.iter().position(|call| matches!(call, Call::Recreate(_))).unwrap();
        let pending = log.pending_fences_at(recreate);
        assert!(pending.is_empty(), "fences still pending at recreate: {pending:?}");
    }

    /// A zero-size window skips ticks without frames or submissions, then resumes
    #[test]
    fn test_minimized_window_skips_then_resumes() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        main_loop.tick(&mut platform).unwrap();
        platform.resize(Extent::new(0, 0));

        let before = log.calls().len();
        for _ in 0..5 {
            assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Skipped);
        }
        let during = log.calls()[before..].to_vec();
        assert!(!during.iter().any(|call| matches!(call, Call::AppFrame { .. })));
        assert!(!during.iter().any(|call| matches!(call, Call::Submit { .. })));
        assert_eq!(during.iter().filter(|call| matches!(call, Call::AcquireStale)).count(), 5);
        assert!(!during.iter().any(|call| matches!(call, Call::Recreate(_))));

        platform.resize(Extent::new(800, 600));
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        assert_eq!(main_loop.stats().skipped, 5);
    }

    /// An out-of-date acquire skips one tick and rebuilds on the next
    #[test]
    fn test_out_of_date_acquire_recreates_next_tick() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        main_loop.target.fail_next_acquires(1);
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Skipped);
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);

        let calls = log.calls();
        let recreate = calls
            .iter()
            .position(|call| *call == Call::Recreate(Extent::new(800, 600)))
            .expect("no recreate after out-of-date acquire");
        let frame = calls.iter().position(|call| matches!(call, Call::AppFrame { .. })).unwrap();
        assert!(recreate < frame);
    }

    /// Rebuilding at the same extent keeps image count and format
    #[test]
    fn test_same_extent_recreate_is_idempotent() {
        let device = MockDevice::new();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);
        main_loop.tick(&mut platform).unwrap();

        let count = main_loop.target().image_count();
        let format = main_loop.target().format();
        let generation = main_loop.target().generation();

        platform.resize(Extent::new(800, 600));
        main_loop.tick(&mut platform).unwrap();

        assert_eq!(main_loop.target().image_count(), count);
        assert_eq!(main_loop.target().format(), format);
        assert_eq!(main_loop.target().extent(), Extent::new(800, 600));
        assert_eq!(main_loop.target().generation(), generation + 1);
    }

    /// A suboptimal present draws normally and rebuilds before the next acquire
    #[test]
    fn test_stale_present_rebuilds_next_tick() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        main_loop.target.stale_next_present();
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);

        assert_eq!(log.calls().iter().filter(|call| matches!(call, Call::Recreate(_))).count(), 1);
    }

    /// Close arriving after a frame still lets that frame's present finish first
    #[test]
    fn test_close_after_frame_presents_before_teardown() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        platform.close_after_polls(2);
        let stats = main_loop.run(&mut platform).unwrap();
        assert_eq!(stats.frames, 2);

        let calls = log.calls();
        let last_present = calls.iter().rposition(|call| matches!(call, Call::Present(_))).unwrap();
        let wait_idle = calls.iter().rposition(|call| *call == Call::WaitIdle).unwrap();
        let app_destroyed = calls.iter().position(|call| *call == Call::Destroy("app")).unwrap();

        assert!(last_present < wait_idle);
        assert!(wait_idle < app_destroyed);
        assert!(calls.iter().any(|call| *call == Call::AppEvent(PlatformEvent::CloseRequested)));
    }

    /// The application asking to close goes through the same clean path
    #[test]
    fn test_application_close_request() {
        let device = MockDevice::new();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        platform.push_event(PlatformEvent::Key { key: KeyCode::Escape, state: ElementState::Pressed });
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Drawn);
        assert_eq!(main_loop.tick(&mut platform).unwrap(), TickOutcome::Exit);
    }

    /// Teardown runs in reverse creation order after draining the device
    #[test]
    fn test_teardown_order() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 1);
        main_loop.tick(&mut platform).unwrap();
        main_loop.shutdown().unwrap();

        let destroyed: Vec<&'static str> = log
            .calls()
            .iter()
            .filter_map(|call| match call {
                Call::Destroy(what) => Some(*what),
                _ => None,
            })
            .collect();

        let app = destroyed.iter().position(|what| *what == "app").unwrap();
        let pool = destroyed.iter().position(|what| *what == "command pool").unwrap();
        let target = destroyed.iter().position(|what| *what == "target").unwrap();
        let device = destroyed.iter().position(|what| *what == "device").unwrap();
        assert!(app < pool && pool < target && target < device);
        // Nothing holding a device handle outlives the device
        assert_eq!(device, destroyed.len() - 1);
    }

    #[test]
    fn test_application_error_is_fatal_and_tears_down() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);
        main_loop.app.fail_on_frame = Some(2);

        let result = main_loop.run(&mut platform);
        assert!(matches!(result, Err(RuntimeError::Application(_))));

        let calls = log.calls();
        assert!(calls.contains(&Call::WaitIdle));
        assert!(calls.contains(&Call::Destroy("device")));
    }

    #[test]
    fn test_fence_timeout_ends_loop() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 1);

        main_loop.tick(&mut platform).unwrap();
        log.hang_gpu();

        let result = main_loop.run(&mut platform);
        assert!(matches!(result, Err(RuntimeError::Timeout { .. })));
    }

    #[test]
    fn test_events_forwarded_in_order() {
        let device = MockDevice::new();
        let log = device.log();
        let mut platform = MockPlatform::new(Extent::new(800, 600));
        let mut main_loop = build(device, &mut platform, 2);

        platform.push_event(PlatformEvent::Focused(false));
        platform.push_event(PlatformEvent::CursorMoved { x: 1.0, y: 2.0 });
        main_loop.tick(&mut platform).unwrap();

        let events: Vec<PlatformEvent> = log
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AppEvent(event) => Some(event),
                _ => None,
            })
            .collect();
        assert_eq!(
            events,
            [PlatformEvent::Focused(false), PlatformEvent::CursorMoved { x: 1.0, y: 2.0 }]
        );
    }
}
