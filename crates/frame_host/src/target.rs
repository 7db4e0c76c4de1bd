//! Presentable image chains and their resize lifecycle

use ash::vk;

use crate::backend::FrameDevice;
use crate::error::RuntimeResult;

/// Size of a drawable surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent {
    /// Create an extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero dimension
    pub const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, 1.0 for a degenerate extent
    pub fn aspect(self) -> f32 {
        if self.is_zero() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl From<Extent> for vk::Extent2D {
    fn from(extent: Extent) -> Self {
        Self { width: extent.width, height: extent.height }
    }
}

impl From<vk::Extent2D> for Extent {
    fn from(extent: vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }
}

/// One presentable image and the view the application renders into
#[derive(Debug, Clone, Copy)]
pub struct TargetImage {
    /// Image handle
    pub image: vk::Image,
    /// View covering every layer of the image
    pub view: vk::ImageView,
}

/// Result of asking a target for its next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// An image is ready once the signal semaphore fires
    Image {
        /// Index into the target's images
        index: u32,
        /// Usable this tick, but the target should be rebuilt afterwards
        suboptimal: bool,
    },
    /// The chain no longer matches the surface; nothing was signaled
    Stale,
}

/// Result of queueing an image for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    /// Queued normally
    Done,
    /// Queued or dropped, and the chain must be rebuilt
    Stale,
}

/// A chain of images the driver renders into and presents
///
/// Implemented by the window [`Swapchain`](crate::gpu::Swapchain) and by the
/// offscreen stereo target.
pub trait PresentTarget<D: FrameDevice> {
    /// Current image extent
    fn extent(&self) -> Extent;

    /// Color format of every image
    fn format(&self) -> vk::Format;

    /// Number of images in the chain
    fn image_count(&self) -> usize;

    /// Array layers per image: 1 for mono, 2 for stereo
    fn layers(&self) -> u32;

    /// Bumped every time the images are rebuilt
    fn generation(&self) -> u64;

    /// Layout images must be left in for presentation
    fn present_layout(&self) -> vk::ImageLayout;

    /// Image and view at `index`
    fn image(&self, index: u32) -> TargetImage;

    /// Acquire the next image, signaling `signal` when it is ready
    ///
    /// `surface_extent` is what the platform reports right now; a mismatch
    /// with [`extent`](Self::extent) yields [`Acquired::Stale`].
    fn acquire(
        &mut self,
        device: &D,
        surface_extent: Extent,
        signal: &D::Semaphore,
        timeout_ns: u64,
    ) -> RuntimeResult<Acquired>;

    /// Present `index` once `wait_on` fires
    fn present(&mut self, device: &D, index: u32, wait_on: &D::Semaphore) -> RuntimeResult<Presented>;

    /// Rebuild every image at `extent`
    ///
    /// The caller drains all in-flight work first.
    fn recreate(&mut self, device: &D, extent: Extent) -> RuntimeResult<()>;

    /// Free device resources that do not release themselves on drop
    fn release(&mut self, _device: &D) {}
}

/// Round-robin image order for targets that own their images
///
/// The ring holds at least as many images as there are frames in flight.
/// An image comes back around only after the slot that waits on its last
/// submission's fence has been reacquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRing {
    count: u32,
    next: u32,
}

impl ImageRing {
    /// Smallest ring, so acquire and present can overlap
    pub const MIN_IMAGES: usize = 2;

    /// A ring sized for `frames_in_flight` concurrent frames
    pub fn for_frames_in_flight(frames_in_flight: usize) -> Self {
        Self::with_count(frames_in_flight.max(Self::MIN_IMAGES))
    }

    /// A ring of exactly `count` images, at least one
    pub fn with_count(count: usize) -> Self {
        Self { count: count.max(1) as u32, next: 0 }
    }

    /// Images in the ring
    pub const fn image_count(&self) -> usize {
        self.count as usize
    }

    /// Hand out the next index
    pub fn advance(&mut self) -> u32 {
        let index = self.next;
        self.next = (self.next + 1) % self.count;
        index
    }

    /// Start over at image 0 after a rebuild
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Resize lifecycle of a present target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Images match the surface
    Live,
    /// Images are invalid and must not be acquired from
    Stale,
    /// Draining in-flight work and rebuilding
    Recreating,
}

/// Tracks [`SurfaceState`] transitions for the driver
#[derive(Debug)]
pub struct SurfaceLifecycle {
    state: SurfaceState,
    recreations: u64,
}

impl Default for SurfaceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceLifecycle {
    /// A freshly built target is live
    pub const fn new() -> Self {
        Self { state: SurfaceState::Live, recreations: 0 }
    }

    /// Current state
    pub const fn state(&self) -> SurfaceState {
        self.state
    }

    /// Completed rebuilds so far
    pub const fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Whether a rebuild should happen before the next acquire
    pub fn needs_recreate(&self) -> bool {
        self.state != SurfaceState::Live
    }

    /// The whole image chain became invalid
    pub fn mark_stale(&mut self) {
        if self.state == SurfaceState::Live {
            log::debug!("Surface marked stale");
        }
        self.state = SurfaceState::Stale;
    }

    /// Drain in-flight work, rebuild the target, and go live again
    ///
    /// `drain` runs before any image is destroyed. A failed step leaves the
    /// surface stale so the next tick retries.
    pub fn recreate<F, R>(&mut self, drain: F, rebuild: R) -> RuntimeResult<()>
    where
        F: FnOnce() -> RuntimeResult<()>,
        R: FnOnce() -> RuntimeResult<()>,
    {
        self.state = SurfaceState::Recreating;
        let result = drain().and_then(|()| rebuild());
        match result {
            Ok(()) => {
                self.state = SurfaceState::Live;
                self.recreations += 1;
                Ok(())
            }
            Err(error) => {
                self.state = SurfaceState::Stale;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn test_extent_zero_and_aspect() {
        assert!(Extent::new(0, 600).is_zero());
        assert!(Extent::new(800, 0).is_zero());
        assert!(!Extent::new(800, 600).is_zero());
        assert!((Extent::new(800, 400).aspect() - 2.0).abs() < f32::EPSILON);
        assert!((Extent::new(0, 0).aspect() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_image_ring_covers_frames_in_flight() {
        assert_eq!(ImageRing::for_frames_in_flight(1).image_count(), 2);
        assert_eq!(ImageRing::for_frames_in_flight(2).image_count(), 2);
        assert_eq!(ImageRing::for_frames_in_flight(3).image_count(), 3);
        assert_eq!(ImageRing::for_frames_in_flight(8).image_count(), 8);
    }

    #[test]
    fn test_image_ring_wraps_and_resets() {
        let mut ring = ImageRing::for_frames_in_flight(3);
        let order: Vec<u32> = (0..5).map(|_| ring.advance()).collect();
        assert_eq!(order, [0, 1, 2, 0, 1]);

        ring.reset();
        assert_eq!(ring.advance(), 0);
    }

    #[test]
    fn test_lifecycle_live_stale_live() {
        let mut lifecycle = SurfaceLifecycle::new();
        assert!(!lifecycle.needs_recreate());

        lifecycle.mark_stale();
        assert_eq!(lifecycle.state(), SurfaceState::Stale);
        assert!(lifecycle.needs_recreate());

        let order = std::cell::RefCell::new(Vec::new());
        lifecycle
            .recreate(
                || {
                    order.borrow_mut().push("drain");
                    Ok(())
                },
                || {
                    order.borrow_mut().push("rebuild");
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(*order.borrow(), ["drain", "rebuild"]);
        assert_eq!(lifecycle.state(), SurfaceState::Live);
        assert_eq!(lifecycle.recreations(), 1);
    }

    /// A failed drain never reaches the rebuild step
    #[test]
    fn test_failed_drain_stays_stale() {
        let mut lifecycle = SurfaceLifecycle::new();
        lifecycle.mark_stale();

        let mut rebuilt = false;
        let result = lifecycle.recreate(
            || Err(RuntimeError::Timeout { what: "drain" }),
            || {
                rebuilt = true;
                Ok(())
            },
        );

        assert!(result.is_err());
        assert!(!rebuilt);
        assert_eq!(lifecycle.state(), SurfaceState::Stale);
        assert_eq!(lifecycle.recreations(), 0);
    }
}
