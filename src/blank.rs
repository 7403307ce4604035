use crate::abort::{AbortController, InputEvent, Verdict};
use crate::display::{self, DisplaySession, Monitor};
use crate::error::{Error, Result};
use crate::input::{self, VirtualPointer};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, DeviceEvents, EventLoop};
use winit::window::WindowId;

/// Live blank screens, each ending on its own input.
///
/// Window input reaches only the unit it belongs to; raw device input reaches
/// every unit. Done once the last unit has finished.
#[derive(Debug, Default)]
pub struct Units {
    units: HashMap<WindowId, AbortController>,
}

impl Units {
    pub fn insert(&mut self, id: WindowId, abort: AbortController) {
        self.units.insert(id, abort);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Routes window input. Returns the unit if it just finished.
    pub fn window_input(&mut self, id: WindowId, event: InputEvent, now: Instant) -> Option<WindowId> {
        let abort = self.units.get_mut(&id)?;
        match abort.observe(event, now) {
            Verdict::Abort(_) => {
                self.units.remove(&id);
                Some(id)
            }
            Verdict::Continue => None,
        }
    }

    /// Routes device input to every unit. Returns the units that finished.
    pub fn device_input(&mut self, event: InputEvent, now: Instant) -> Vec<WindowId> {
        let mut finished = Vec::new();
        self.units.retain(|id, abort| match abort.observe(event, now) {
            Verdict::Abort(_) => {
                finished.push(*id);
                false
            }
            Verdict::Continue => true,
        });
        finished
    }

    /// Per-tick displacement check on every unit.
    pub fn check(&mut self, now: Instant) -> Vec<WindowId> {
        let mut finished = Vec::new();
        self.units.retain(|id, abort| match abort.check(now) {
            Verdict::Abort(_) => {
                finished.push(*id);
                false
            }
            Verdict::Continue => true,
        });
        finished
    }
}

pub struct BlankSettings {
    pub include_primary: bool,
    pub threshold: u32,
    pub grace: Duration,
    pub poll_interval: Duration,
}

impl Default for BlankSettings {
    fn default() -> Self {
        Self {
            include_primary: false,
            threshold: 5,
            grace: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
        }
    }
}

struct Blanker {
    settings: BlankSettings,
    units: Units,
    display: Option<DisplaySession>,
    pointer: VirtualPointer,
    next_tick: Instant,
    started: bool,
    error: Option<Error>,
}

impl Blanker {
    fn new(settings: BlankSettings) -> Self {
        Self {
            settings,
            units: Units::default(),
            display: None,
            pointer: VirtualPointer::default(),
            next_tick: Instant::now(),
            started: false,
            error: None,
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let outputs = display::enumerate(event_loop);
        let monitors: Vec<Monitor> = outputs.iter().map(|output| output.monitor.clone()).collect();
        display::log_monitors(&monitors);

        let targets = display::secondary_indices(&monitors, self.settings.include_primary);
        let mut targets = targets.into_iter().map(|i| &outputs[i]);
        let Some(first) = targets.next() else {
            tracing::info!("Nothing to blank");
            return Ok(());
        };

        // Nothing is kept unless every screen opens.
        let now = Instant::now();
        let mut units = Units::default();
        let (mut session, id) = DisplaySession::open(event_loop, display::fullscreen_attributes(Some(first)))?;
        units.insert(id, self.abort_controller(now));
        for output in targets {
            let id = session.add_screen(event_loop, display::fullscreen_attributes(Some(output)))?;
            units.insert(id, self.abort_controller(now));
        }
        tracing::info!(
            "Blanking {} monitor(s). Move the mouse or press a key to end.",
            units.len()
        );
        self.units = units;
        self.display = Some(session);
        Ok(())
    }

    fn fail(&mut self, err: Error) {
        self.units = Units::default();
        self.display = None;
        self.error = Some(err);
    }

    fn finished(&self) -> bool {
        self.started && (self.error.is_some() || self.units.is_empty())
    }

    fn abort_controller(&self, now: Instant) -> AbortController {
        AbortController::new(self.settings.threshold, self.settings.grace, now)
    }

    fn close(&mut self, finished: impl IntoIterator<Item = WindowId>) {
        if let Some(session) = &mut self.display {
            for id in finished {
                tracing::debug!("Blank screen {id:?} done");
                session.remove(id);
            }
        }
    }
}

impl ApplicationHandler for Blanker {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;
        if let Err(err) = self.open(event_loop) {
            self.fail(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::RedrawRequested => {
                if let Some(session) = &self.display {
                    if let Err(err) = session.clear_black(id) {
                        tracing::warn!("Failed to draw: {err}");
                    }
                }
            }
            WindowEvent::Resized(_) => {
                if let Some(session) = &self.display {
                    if let Some(screen) = session.screen(id) {
                        screen.resize(session.graphics());
                        screen.window().request_redraw();
                    }
                }
            }
            event => {
                if let Some(input) = input::from_window_event(&event) {
                    let finished = self.units.window_input(id, input, Instant::now());
                    self.close(finished);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(input) = input::from_device_event(&event, &mut self.pointer) {
            let finished = self.units.device_input(input, Instant::now());
            self.close(finished);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_tick {
            self.next_tick = now + self.settings.poll_interval;
            let finished = self.units.check(now);
            self.close(finished);
        }
        if self.finished() {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.display = None;
    }
}

/// Blanks monitors until each of them has seen input.
pub fn run(settings: BlankSettings) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.listen_device_events(DeviceEvents::Always);
    let mut app = Blanker::new(settings);
    event_loop.run_app(&mut app)?;
    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::Point;

    fn units(ids: &[WindowId], now: Instant) -> Units {
        let mut units = Units::default();
        for id in ids {
            units.insert(*id, AbortController::new(5, Duration::ZERO, now));
        }
        units
    }

    fn ids() -> [WindowId; 2] {
        [WindowId::from(1), WindowId::from(2)]
    }

    #[test]
    fn window_input_ends_only_its_unit() {
        let now = Instant::now();
        let [a, b] = ids();
        let mut units = units(&[a, b], now);
        assert_eq!(units.window_input(a, InputEvent::KeyPressed, now), Some(a));
        assert_eq!(units.len(), 1);
        assert_eq!(units.window_input(a, InputEvent::KeyPressed, now), None);
        assert_eq!(units.window_input(b, InputEvent::Quit, now), Some(b));
        assert!(units.is_empty());
    }

    #[test]
    fn device_input_reaches_every_unit() {
        let now = Instant::now();
        let [a, b] = ids();
        let mut units = units(&[a, b], now);
        assert!(units
            .device_input(InputEvent::PointerMoved(Point::new(0, 0)), now)
            .is_empty());
        let mut finished = units.device_input(InputEvent::PointerMoved(Point::new(40, 0)), now);
        finished.sort_by_key(|id| u64::from(*id));
        assert_eq!(finished, [a, b]);
        assert!(units.is_empty());
    }

    #[test]
    fn small_motion_keeps_screens_black() {
        let now = Instant::now();
        let [a, b] = ids();
        let mut units = units(&[a, b], now);
        units.device_input(InputEvent::PointerMoved(Point::new(10, 10)), now);
        units.device_input(InputEvent::PointerMoved(Point::new(12, 9)), now);
        assert!(units.check(now).is_empty());
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn failed_open_leaves_no_units_and_finishes() {
        let now = Instant::now();
        let [a, b] = ids();
        let mut blanker = Blanker::new(BlankSettings::default());
        assert!(!blanker.finished());
        blanker.started = true;
        blanker.units = units(&[a, b], now);
        assert!(!blanker.finished());

        blanker.fail(Error::Window("second monitor refused".to_string()));
        assert!(blanker.units.is_empty());
        assert!(blanker.display.is_none());
        assert!(blanker.finished());
        assert!(matches!(blanker.error, Some(Error::Window(_))));
    }

    #[test]
    fn an_error_finishes_even_with_live_units() {
        let now = Instant::now();
        let [a, _] = ids();
        let mut blanker = Blanker::new(BlankSettings::default());
        blanker.started = true;
        blanker.units = units(&[a], now);
        blanker.error = Some(Error::Graphics("context lost".to_string()));
        assert!(blanker.finished());
    }
}
