use crate::error::Result;
use crate::gl::{Graphics, Screen};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::collections::HashMap;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowAttributes, WindowId, WindowLevel};

/// Geometry of one attached display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl std::fmt::Display for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}x{} at {},{})",
            self.name, self.width, self.height, self.x, self.y
        )
    }
}

/// A monitor as reported by the window system.
#[derive(Debug, Clone)]
pub struct Output {
    pub monitor: Monitor,
    pub handle: MonitorHandle,
}

/// Lists attached monitors in the order the window system reports them.
pub fn enumerate(event_loop: &ActiveEventLoop) -> Vec<Output> {
    let primary = event_loop.primary_monitor();
    event_loop
        .available_monitors()
        .enumerate()
        .map(|(i, handle)| {
            let PhysicalPosition { x, y } = handle.position();
            let PhysicalSize { width, height } = handle.size();
            let monitor = Monitor {
                name: handle.name().unwrap_or_else(|| format!("monitor {}", i + 1)),
                x,
                y,
                width,
                height,
                is_primary: primary.as_ref() == Some(&handle),
            };
            Output { monitor, handle }
        })
        .collect()
}

/// Index of the primary monitor, falling back to the first one reported.
pub fn primary_index(monitors: &[Monitor]) -> Option<usize> {
    monitors
        .iter()
        .position(|monitor| monitor.is_primary)
        .or(if monitors.is_empty() { None } else { Some(0) })
}

/// Indices of the monitors to blank when `primary` shows something else.
pub fn secondary_indices(monitors: &[Monitor], include_primary: bool) -> Vec<usize> {
    let primary = primary_index(monitors);
    (0..monitors.len())
        .filter(|&i| include_primary || Some(i) != primary)
        .collect()
}

pub fn log_monitors(monitors: &[Monitor]) {
    if monitors.is_empty() {
        tracing::warn!("No monitors reported, using the default display");
    }
    let primary = primary_index(monitors);
    for (i, monitor) in monitors.iter().enumerate() {
        if Some(i) == primary {
            tracing::info!("Primary monitor: {monitor}");
        } else {
            tracing::info!("Secondary monitor: {monitor}");
        }
    }
}

/// Borderless fullscreen attributes. `None` leaves the choice of monitor to the window system.
pub fn fullscreen_attributes(output: Option<&Output>) -> WindowAttributes {
    let attributes = Window::default_attributes()
        .with_title("clipsaver")
        .with_decorations(false)
        .with_window_level(WindowLevel::AlwaysOnTop)
        .with_fullscreen(Some(Fullscreen::Borderless(
            output.map(|output| output.handle.clone()),
        )));
    match output {
        Some(Output { monitor, .. }) => attributes
            .with_position(PhysicalPosition::new(monitor.x, monitor.y))
            .with_inner_size(PhysicalSize::new(monitor.width, monitor.height)),
        None => attributes,
    }
}

/// Native id of `window` for players that draw into it themselves.
pub fn native_window_id(window: &Window) -> Option<i64> {
    match window.window_handle().ok()?.as_raw() {
        RawWindowHandle::Xlib(handle) => Some(handle.window as i64),
        RawWindowHandle::Xcb(handle) => Some(i64::from(handle.window.get())),
        RawWindowHandle::Win32(handle) => Some(handle.hwnd.get() as i64),
        _ => None,
    }
}

/// Every fullscreen window we own, plus the cursor state that goes with them.
///
/// Screens are added with the cursor hidden and confined. Whatever is left is
/// restored when the session is dropped.
pub struct DisplaySession {
    screens: HashMap<WindowId, Screen>,
    graphics: Graphics,
}

impl DisplaySession {
    pub fn open(event_loop: &ActiveEventLoop, attributes: WindowAttributes) -> Result<(Self, WindowId)> {
        let (graphics, screen) = Graphics::new(event_loop, attributes)?;
        let mut session = Self {
            screens: HashMap::new(),
            graphics,
        };
        let id = session.adopt(screen);
        Ok((session, id))
    }

    pub fn add_screen(&mut self, event_loop: &ActiveEventLoop, attributes: WindowAttributes) -> Result<WindowId> {
        let screen = self.graphics.create_screen(event_loop, attributes)?;
        Ok(self.adopt(screen))
    }

    fn adopt(&mut self, screen: Screen) -> WindowId {
        let window = screen.window();
        window.set_cursor_visible(false);
        if let Err(err) = window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
        {
            tracing::debug!("Could not grab the cursor: {err}");
        }
        window.request_redraw();
        let id = screen.id();
        self.screens.insert(id, screen);
        id
    }

    pub fn graphics(&self) -> &Graphics {
        &self.graphics
    }

    pub fn screen(&self, id: WindowId) -> Option<&Screen> {
        self.screens.get(&id)
    }

    /// Closes one window.
    pub fn remove(&mut self, id: WindowId) {
        if let Some(screen) = self.screens.remove(&id) {
            release_cursor(screen.window());
        }
    }

    pub fn clear_black(&self, id: WindowId) -> Result<()> {
        match self.screens.get(&id) {
            Some(screen) => self.graphics.clear_black(screen),
            None => Ok(()),
        }
    }
}

fn release_cursor(window: &Window) {
    window.set_cursor_grab(CursorGrabMode::None).ok();
    window.set_cursor_visible(true);
}

impl Drop for DisplaySession {
    fn drop(&mut self) {
        for screen in self.screens.values() {
            release_cursor(screen.window());
        }
        tracing::debug!("Display session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(name: &str, x: i32, is_primary: bool) -> Monitor {
        Monitor {
            name: name.to_string(),
            x,
            y: 0,
            width: 1920,
            height: 1080,
            is_primary,
        }
    }

    #[test]
    fn primary_is_found_anywhere() {
        let monitors = [monitor("left", -1920, false), monitor("main", 0, true)];
        assert_eq!(primary_index(&monitors), Some(1));
    }

    #[test]
    fn first_monitor_stands_in_for_missing_primary() {
        let monitors = [monitor("a", 0, false), monitor("b", 1920, false)];
        assert_eq!(primary_index(&monitors), Some(0));
        assert_eq!(primary_index(&[]), None);
    }

    #[test]
    fn secondaries_exclude_primary_unless_asked() {
        let monitors = [
            monitor("a", 0, false),
            monitor("main", 1920, true),
            monitor("c", 3840, false),
        ];
        assert_eq!(secondary_indices(&monitors, false), [0, 2]);
        assert_eq!(secondary_indices(&monitors, true), [0, 1, 2]);
        assert!(secondary_indices(&monitors[1..2], false).is_empty());
        assert!(secondary_indices(&[], true).is_empty());
    }

    #[test]
    fn monitor_display() {
        let text = monitor("HDMI-1", 1920, false).to_string();
        assert_eq!(text, "HDMI-1 (1920x1080 at 1920,0)");
    }
}
