use crate::abort::{InputEvent, Point};
use winit::event::{DeviceEvent, ElementState, WindowEvent};

/// Pointer position rebuilt from raw motion deltas.
///
/// Raw motion keeps arriving while another window (such as an embedded
/// player's child window) holds the pointer, unlike `CursorMoved`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualPointer {
    x: f64,
    y: f64,
}

impl VirtualPointer {
    pub fn moved(&mut self, (dx, dy): (f64, f64)) -> Point {
        self.x += dx;
        self.y += dy;
        self.position()
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.round() as i64, self.y.round() as i64)
    }
}

pub fn from_window_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(InputEvent::Quit),
        WindowEvent::KeyboardInput {
            event,
            is_synthetic: false,
            ..
        } if event.state == ElementState::Pressed => {
            Some(InputEvent::KeyPressed)
        }
        WindowEvent::MouseInput {
            state: ElementState::Pressed,
            ..
        } => Some(InputEvent::ButtonPressed),
        _ => None,
    }
}

pub fn from_device_event(event: &DeviceEvent, pointer: &mut VirtualPointer) -> Option<InputEvent> {
    match event {
        DeviceEvent::MouseMotion { delta } => Some(InputEvent::PointerMoved(pointer.moved(*delta))),
        DeviceEvent::Key(key) if key.state == ElementState::Pressed => Some(InputEvent::KeyPressed),
        DeviceEvent::Button {
            state: ElementState::Pressed,
            ..
        } => Some(InputEvent::ButtonPressed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_accumulates_into_a_position() {
        let mut pointer = VirtualPointer::default();
        let event = DeviceEvent::MouseMotion { delta: (3.0, -1.5) };
        assert_eq!(
            from_device_event(&event, &mut pointer),
            Some(InputEvent::PointerMoved(Point::new(3, -2)))
        );
        let event = DeviceEvent::MouseMotion { delta: (3.4, 0.0) };
        assert_eq!(
            from_device_event(&event, &mut pointer),
            Some(InputEvent::PointerMoved(Point::new(6, -2)))
        );
    }

    #[test]
    fn buttons_count_only_on_press() {
        let mut pointer = VirtualPointer::default();
        let press = DeviceEvent::Button {
            button: 1,
            state: ElementState::Pressed,
        };
        let release = DeviceEvent::Button {
            button: 1,
            state: ElementState::Released,
        };
        assert_eq!(
            from_device_event(&press, &mut pointer),
            Some(InputEvent::ButtonPressed)
        );
        assert_eq!(from_device_event(&release, &mut pointer), None);
    }

    #[test]
    fn close_is_a_quit() {
        assert_eq!(
            from_window_event(&WindowEvent::CloseRequested),
            Some(InputEvent::Quit)
        );
        assert_eq!(from_window_event(&WindowEvent::Focused(false)), None);
    }
}
