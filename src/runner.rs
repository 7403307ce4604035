use crate::abort::{AbortController, InputEvent};
use crate::display::{self, DisplaySession, Monitor};
use crate::error::{Error, Result};
use crate::input::{self, VirtualPointer};
use crate::media::{MediaLibrary, VideoFile, VideoFormat};
use crate::mpvclient::{MpvClient, Output};
use crate::playback::{Outcome, PlaybackSession, Rotation, Step};
use crate::settings::{Backend, Settings};
use rand::rngs::ThreadRng;
use rand::thread_rng;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, DeviceEvents, EventLoop, EventLoopProxy};
use winit::window::WindowId;

#[derive(Debug)]
pub enum UserEvent {
    /// mpv has a new frame.
    Redraw,
    /// mpv has queued events.
    MpvWakeup,
}

/// Renderer for a clip. `embeddable` says whether the window can be handed to mpv.
pub fn choose_backend(preference: Backend, format: VideoFormat, embeddable: bool) -> Backend {
    match preference {
        Backend::Embed if embeddable => Backend::Embed,
        Backend::Auto if embeddable && format == VideoFormat::ElementaryStream => Backend::Embed,
        _ => Backend::Render,
    }
}

struct Screensaver {
    settings: Settings,
    library: MediaLibrary,
    rotation: Rotation,
    rng: ThreadRng,
    proxy: EventLoopProxy<UserEvent>,
    // Declared before `display`: players must go while the GL context is alive.
    playback: Option<PlaybackSession<MpvClient>>,
    display: Option<DisplaySession>,
    primary: Option<WindowId>,
    pointer: VirtualPointer,
    next_tick: Instant,
    grace: bool,
    error: Option<Error>,
}

impl Screensaver {
    fn new(settings: Settings, library: MediaLibrary, proxy: EventLoopProxy<UserEvent>) -> Self {
        let rotation = Rotation::new(settings.on_input, library.len());
        Self {
            settings,
            library,
            rotation,
            rng: thread_rng(),
            proxy,
            playback: None,
            display: None,
            primary: None,
            pointer: VirtualPointer::default(),
            next_tick: Instant::now(),
            grace: true,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn open_display(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let outputs = display::enumerate(event_loop);
        let monitors: Vec<Monitor> = outputs.iter().map(|output| output.monitor.clone()).collect();
        display::log_monitors(&monitors);

        let primary = display::primary_index(&monitors).map(|i| &outputs[i]);
        let (mut session, id) =
            DisplaySession::open(event_loop, display::fullscreen_attributes(primary))?;
        if self.settings.blank_others {
            for i in display::secondary_indices(&monitors, false) {
                tracing::debug!("Blanking {}", monitors[i]);
                session.add_screen(event_loop, display::fullscreen_attributes(Some(&outputs[i])))?;
            }
        }
        self.display = Some(session);
        self.primary = Some(id);
        Ok(())
    }

    fn start(&self, video: VideoFile) -> Result<PlaybackSession<MpvClient>> {
        let (Some(session), Some(primary)) = (&self.display, self.primary) else {
            return Err(Error::Window("display session is not open".to_string()));
        };
        let screen = session
            .screen(primary)
            .ok_or_else(|| Error::Window("primary window is gone".to_string()))?;
        let wid = display::native_window_id(screen.window());
        let output = match choose_backend(self.settings.backend, video.format, wid.is_some()) {
            Backend::Embed => Output::Embed(wid.unwrap_or_default()),
            _ => {
                session.graphics().make_current(screen)?;
                Output::Render(session.graphics().display())
            }
        };
        let backend = match output {
            Output::Embed(_) => "embedded player",
            Output::Render(_) => "render context",
        };
        tracing::info!("Starting video: {} ({backend})", video.path.display());

        let grace = if self.grace {
            self.settings.startup_grace()
        } else {
            Duration::ZERO
        };
        let abort = AbortController::new(self.settings.mouse_threshold, grace, Instant::now());
        let player = MpvClient::new(output, self.proxy.clone(), &self.settings)?;
        PlaybackSession::start(video, player, abort)
    }

    fn next_clip(&mut self, event_loop: &ActiveEventLoop) {
        loop {
            let video = self.library.choose(&mut self.rng).clone();
            let name = video.name();
            match self.start(video) {
                Ok(session) => {
                    self.playback = Some(session);
                    self.grace = false;
                    if let Some(window) = self.primary_window() {
                        window.request_redraw();
                    }
                    return;
                }
                Err(err) => {
                    tracing::warn!("Skipping {name}: {err}");
                    if let Err(err) = self.rotation.failed() {
                        return self.fail(event_loop, err);
                    }
                }
            }
        }
    }

    fn primary_window(&self) -> Option<&winit::window::Window> {
        let screen = self.display.as_ref()?.screen(self.primary?)?;
        Some(screen.window())
    }

    fn close_playback(&mut self) {
        let Some(playback) = self.playback.take() else {
            return;
        };
        if let (Some(session), Some(primary)) = (&self.display, self.primary) {
            if let Some(screen) = session.screen(primary) {
                session.graphics().make_current(screen).ok();
            }
        }
        playback.close();
    }

    fn finish_clip(&mut self, event_loop: &ActiveEventLoop, outcome: Outcome) {
        if let Some(playback) = &self.playback {
            match &outcome {
                Outcome::Failed(message) => {
                    tracing::warn!("Skipping {}: {message}", playback.video().name())
                }
                _ => tracing::debug!("{} finished: {outcome:?}", playback.video().name()),
            }
        }
        self.close_playback();
        match self.rotation.after(&outcome) {
            Ok(Step::NextClip) => {
                self.grace = matches!(outcome, Outcome::Aborted(_));
                self.next_clip(event_loop);
            }
            Ok(Step::Exit) => event_loop.exit(),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn redraw(&mut self, id: WindowId) -> Result<()> {
        let Some(session) = &self.display else {
            return Ok(());
        };
        if Some(id) != self.primary {
            return session.clear_black(id);
        }
        let Some(screen) = session.screen(id) else {
            return Ok(());
        };
        session.graphics().make_current(screen)?;
        let size = screen.window().inner_size();
        let drew = match &mut self.playback {
            Some(playback) => playback.draw(size.width, size.height)?,
            None => false,
        };
        if drew {
            session.graphics().present(screen)
        } else {
            session.clear_black(id)
        }
    }

    fn handle_input(&mut self, event: InputEvent) {
        if let Some(playback) = &mut self.playback {
            playback.handle_input(event, Instant::now());
        }
    }

    fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ApplicationHandler<UserEvent> for Screensaver {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.display.is_some() {
            return;
        }
        if let Err(err) = self.open_display(event_loop) {
            return self.fail(event_loop, err);
        }
        self.next_clip(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(id) {
                    tracing::warn!("Failed to draw: {err}");
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
                    self.handle_input(input);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(input) = input::from_device_event(&event, &mut self.pointer) {
            self.handle_input(input);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Redraw => {
                if let Some(window) = self.primary_window() {
                    window.request_redraw();
                }
            }
            // Drained on the next tick.
            UserEvent::MpvWakeup => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let aborted = self.playback.as_ref().is_some_and(|playback| !playback.is_running());
        if now >= self.next_tick || aborted {
            self.next_tick = now + self.settings.poll_interval();
            if let Some(outcome) = self.playback.as_mut().and_then(|playback| playback.tick(now)) {
                self.finish_clip(event_loop, outcome);
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.close_playback();
        self.display = None;
    }
}

/// Plays random clips from `library` until the user shows up.
pub fn run(settings: Settings, library: MediaLibrary) -> Result<()> {
    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    event_loop.listen_device_events(DeviceEvents::Always);
    let mut app = Screensaver::new(settings, library, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;
    app.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementary_streams_go_to_the_embedded_player() {
        assert_eq!(
            choose_backend(Backend::Auto, VideoFormat::ElementaryStream, true),
            Backend::Embed
        );
        assert_eq!(
            choose_backend(Backend::Auto, VideoFormat::Container, true),
            Backend::Render
        );
    }

    #[test]
    fn render_when_the_window_cannot_be_embedded() {
        assert_eq!(
            choose_backend(Backend::Auto, VideoFormat::ElementaryStream, false),
            Backend::Render
        );
        assert_eq!(
            choose_backend(Backend::Embed, VideoFormat::Container, false),
            Backend::Render
        );
    }

    #[test]
    fn explicit_choice_wins() {
        assert_eq!(
            choose_backend(Backend::Embed, VideoFormat::Container, true),
            Backend::Embed
        );
        assert_eq!(
            choose_backend(Backend::Render, VideoFormat::ElementaryStream, true),
            Backend::Render
        );
    }
}
