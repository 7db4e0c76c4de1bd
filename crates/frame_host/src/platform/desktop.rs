//! Desktop windows using GLFW

use ash::vk;

use super::{Platform, PlatformKind};
use crate::config::WindowConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{ElementState, KeyCode, MouseButton, PlatformEvent};
use crate::gpu::{Instance, Surface};
use crate::target::Extent;

/// Longest block on the event queue while the window has no drawable area
const MINIMIZED_WAIT_SECS: f64 = 0.1;

/// GLFW window with Vulkan surface support
///
/// With [`WindowConfig::stereo`] set the window drives a stereo display and
/// reports two views, which the host turns into a two-layer swapchain.
pub struct DesktopPlatform {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    views: u32,
    close_reported: bool,
}

impl DesktopPlatform {
    /// Open a window without a client API so Vulkan can own the surface
    pub fn new(config: &WindowConfig) -> RuntimeResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)?;

        if !glfw.vulkan_supported() {
            return Err(RuntimeError::Platform("GLFW reports no Vulkan loader".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| RuntimeError::Platform("Window creation failed".to_string()))?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_focus_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);

        let views = view_count(config);
        log::info!(
            "Opened window '{}' ({}x{}, {} view(s))",
            config.title,
            config.width,
            config.height,
            views
        );

        Ok(Self {
            glfw,
            window,
            events,
            views,
            close_reported: false,
        })
    }

    /// Change the window title
    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}

impl Platform for DesktopPlatform {
    fn kind(&self) -> PlatformKind {
        display_kind(self.views)
    }

    fn view_count(&self) -> u32 {
        self.views
    }

    fn framebuffer_extent(&self) -> Extent {
        let (width, height) = self.window.get_framebuffer_size();
        Extent::new(width.max(0) as u32, height.max(0) as u32)
    }

    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>) {
        match event_wait(self.framebuffer_extent()) {
            Some(timeout) => self.glfw.wait_events_timeout(timeout),
            None => self.glfw.poll_events(),
        }

        for (_, event) in glfw::flush_messages(&self.events) {
            match translate_event(event) {
                Some(PlatformEvent::CloseRequested) => {
                    if !self.close_reported {
                        self.close_reported = true;
                        events.push(PlatformEvent::CloseRequested);
                    }
                }
                Some(event) => events.push(event),
                None => {}
            }
        }

        // request_close() sets the flag without producing a GLFW event
        if self.window.should_close() && !self.close_reported {
            self.close_reported = true;
            events.push(PlatformEvent::CloseRequested);
        }
    }

    fn request_close(&mut self) {
        self.window.set_should_close(true);
    }

    fn required_instance_extensions(&self) -> RuntimeResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| RuntimeError::Platform("Failed to get required extensions".to_string()))
    }

    fn create_surface(&mut self, instance: &Instance) -> RuntimeResult<Option<Surface>> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance.raw().handle(), std::ptr::null(), &mut surface);

        if result != vk::Result::SUCCESS {
            return Err(RuntimeError::Platform(format!("Failed to create Vulkan surface: {result:?}")));
        }

        Ok(Some(Surface::from_raw(instance, surface)))
    }
}

fn view_count(config: &WindowConfig) -> u32 {
    if config.stereo {
        2
    } else {
        1
    }
}

fn display_kind(views: u32) -> PlatformKind {
    if views > 1 {
        PlatformKind::StereoDisplay
    } else {
        PlatformKind::Desktop
    }
}

/// Block for events while minimized so skipped ticks do not spin
fn event_wait(extent: Extent) -> Option<f64> {
    extent.is_zero().then_some(MINIMIZED_WAIT_SECS)
}

fn element_state(action: glfw::Action) -> ElementState {
    match action {
        glfw::Action::Press => ElementState::Pressed,
        glfw::Action::Release => ElementState::Released,
        glfw::Action::Repeat => ElementState::Repeat,
    }
}

fn key_code(key: glfw::Key) -> KeyCode {
    let code = key as i32;
    match key {
        glfw::Key::Escape => KeyCode::Escape,
        glfw::Key::Space => KeyCode::Space,
        glfw::Key::Enter => KeyCode::Enter,
        glfw::Key::Tab => KeyCode::Tab,
        glfw::Key::Backspace => KeyCode::Backspace,
        glfw::Key::Left => KeyCode::Left,
        glfw::Key::Right => KeyCode::Right,
        glfw::Key::Up => KeyCode::Up,
        glfw::Key::Down => KeyCode::Down,
        // GLFW key codes follow ASCII for letters and digits
        _ if (65..=90).contains(&code) => KeyCode::Letter(char::from(code as u8)),
        _ if (48..=57).contains(&code) => KeyCode::Digit((code - 48) as u8),
        _ => KeyCode::Other(code),
    }
}

fn mouse_button(button: glfw::MouseButton) -> MouseButton {
    match button as i32 {
        0 => MouseButton::Left,
        1 => MouseButton::Right,
        2 => MouseButton::Middle,
        other => MouseButton::Other(other as u8),
    }
}

/// Normalize a GLFW event; events the runtime does not model map to `None`
fn translate_event(event: glfw::WindowEvent) -> Option<PlatformEvent> {
    let event = match event {
        glfw::WindowEvent::FramebufferSize(width, height) => PlatformEvent::Resized {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        },
        glfw::WindowEvent::Close => PlatformEvent::CloseRequested,
        glfw::WindowEvent::Focus(focused) => PlatformEvent::Focused(focused),
        glfw::WindowEvent::Key(key, _, action, _) => PlatformEvent::Key {
            key: key_code(key),
            state: element_state(action),
        },
        glfw::WindowEvent::MouseButton(button, action, _) => PlatformEvent::MouseButton {
            button: mouse_button(button),
            state: element_state(action),
        },
        glfw::WindowEvent::CursorPos(x, y) => PlatformEvent::CursorMoved { x, y },
        glfw::WindowEvent::Scroll(dx, dy) => PlatformEvent::Scroll { dx, dy },
        _ => return None,
    };
    Some(event)
}
