//! Normalized platform events
//!
//! Every platform adapter translates its native events into [`PlatformEvent`]
//! before the driver forwards them to the application.

/// Keys the runtime names explicitly; everything else arrives as [`KeyCode::Other`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyCode {
    Escape,
    Space,
    Enter,
    Tab,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    /// Letter keys, stored upper case
    Letter(char),
    /// Number row keys 0-9
    Digit(u8),
    /// Platform key code without a named mapping
    Other(i32),
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Wheel button
    Middle,
    /// Extra buttons by index
    Other(u8),
}

/// Button or key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Pressed down
    Pressed,
    /// Let go
    Released,
    /// Held long enough for the OS to repeat
    Repeat,
}

/// A window or input event in platform-independent form
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// Drawable surface changed size, in pixels. Zero means minimized.
    Resized {
        /// New framebuffer width
        width: u32,
        /// New framebuffer height
        height: u32,
    },

    /// The user or the platform asked to close
    CloseRequested,

    /// Window focus changed
    Focused(bool),

    /// Keyboard input
    Key {
        /// The key
        key: KeyCode,
        /// Its transition
        state: ElementState,
    },

    /// Mouse button input
    MouseButton {
        /// The button
        button: MouseButton,
        /// Its transition
        state: ElementState,
    },

    /// Cursor moved, in window coordinates
    CursorMoved {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },

    /// Scroll wheel or touchpad scroll
    Scroll {
        /// Horizontal offset
        dx: f64,
        /// Vertical offset
        dy: f64,
    },
}

impl PlatformEvent {
    /// Whether this event invalidates the current swapchain
    pub fn invalidates_surface(&self) -> bool {
        matches!(self, Self::Resized { .. })
    }

    /// True for a key press (not release or repeat) of `key`
    pub fn is_key_press(&self, key: KeyCode) -> bool {
        matches!(self, Self::Key { key: k, state: ElementState::Pressed } if *k == key)
    }
}
