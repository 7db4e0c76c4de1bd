//! Window-less platform for offscreen and stereo rendering

use std::collections::VecDeque;

use super::{Platform, PlatformKind};
use crate::events::PlatformEvent;
use crate::target::Extent;

/// Platform with a fixed extent and no window
///
/// Pairs with the offscreen target. With two views it stands in for a
/// head-mounted display: every frame renders both eyes into one 2-layer image.
#[derive(Debug)]
pub struct HeadlessPlatform {
    extent: Extent,
    views: u32,
    pending: VecDeque<PlatformEvent>,
    frame_limit: Option<u64>,
    polls: u64,
    close_sent: bool,
}

impl HeadlessPlatform {
    /// Mono platform with the given extent
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            views: 1,
            pending: VecDeque::new(),
            frame_limit: None,
            polls: 0,
            close_sent: false,
        }
    }

    /// Stereo platform rendering two views per frame
    pub fn stereo(extent: Extent) -> Self {
        Self { views: 2, ..Self::new(extent) }
    }

    /// Request close after `polls` event polls
    #[must_use]
    pub fn with_frame_limit(mut self, polls: u64) -> Self {
        self.frame_limit = Some(polls);
        self
    }

    /// Queue an event for the next poll
    pub fn push_event(&mut self, event: PlatformEvent) {
        self.pending.push_back(event);
    }

    /// Change the reported extent and queue the matching resize event
    pub fn resize(&mut self, extent: Extent) {
        self.extent = extent;
        self.pending.push_back(PlatformEvent::Resized {
            width: extent.width,
            height: extent.height,
        });
    }

    /// Number of polls so far
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl Platform for HeadlessPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Headless
    }

    fn view_count(&self) -> u32 {
        self.views
    }

    fn framebuffer_extent(&self) -> Extent {
        self.extent
    }

    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>) {
        self.polls += 1;
        if self.frame_limit.is_some_and(|limit| self.polls > limit) {
            self.request_close();
        }

        while let Some(event) = self.pending.pop_front() {
            events.push(event);
        }
    }

    fn request_close(&mut self) {
        if !self.close_sent {
            self.close_sent = true;
            self.pending.push_back(PlatformEvent::CloseRequested);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_reports_two_views() {
        let platform = HeadlessPlatform::stereo(Extent::new(640, 480));
        assert_eq!(platform.view_count(), 2);
        assert_eq!(platform.kind(), PlatformKind::Headless);
    }

    #[test]
    fn test_frame_limit_closes_once() {
        let mut platform = HeadlessPlatform::new(Extent::new(64, 64)).with_frame_limit(2);
        let mut events = Vec::new();

        platform.poll_events(&mut events);
        platform.poll_events(&mut events);
        assert!(events.is_empty());

        platform.poll_events(&mut events);
        platform.poll_events(&mut events);
        assert_eq!(events, [PlatformEvent::CloseRequested]);
    }

    #[test]
    fn test_resize_updates_extent_and_queues_event() {
        let mut platform = HeadlessPlatform::new(Extent::new(64, 64));
        platform.resize(Extent::new(32, 16));

        let mut events = Vec::new();
        platform.poll_events(&mut events);

        assert_eq!(platform.framebuffer_extent(), Extent::new(32, 16));
        assert_eq!(events, [PlatformEvent::Resized { width: 32, height: 16 }]);
    }
}
