use crate::error::{Error, Result};
use crate::player::{Player, PlayerState};
use crate::runner::UserEvent;
use crate::settings::Settings;
use glutin::display::GlDisplay;
use libmpv::events::{Event as MPVEvent, EventContext};
use libmpv::render::{OpenGLInitParams, RenderContext, RenderParam, RenderParamApiType};
use libmpv2 as libmpv;
use std::ffi::{c_void, CString};
use std::path::Path;
use winit::event_loop::EventLoopProxy;

type GLContext = glutin::display::Display;

/// Where mpv puts the picture.
pub enum Output {
    /// mpv renders into our GL surface, one frame per `draw`.
    Render(GLContext),
    /// mpv takes over the native window with this id.
    Embed(i64),
}

pub struct MpvClient {
    // Dropped in field order: the render context has to go before the handle.
    render: Option<RenderContext>,
    events: Option<EventContext>,
    mpv: Option<libmpv::Mpv>,
    state: PlayerState,
    loaded: bool,
}

fn get_proc_address(display: &GLContext, name: &str) -> *mut c_void {
    match CString::new(name) {
        Ok(name) => display.get_proc_address(&name) as *mut c_void,
        Err(_) => std::ptr::null_mut(),
    }
}

impl MpvClient {
    /// Creates a player. For [`Output::Render`] the GL context must be current.
    pub fn new(output: Output, proxy: EventLoopProxy<UserEvent>, settings: &Settings) -> Result<Self> {
        let mut mpv = libmpv::Mpv::new()?;
        mpv.set_property("mute", settings.mute)?;
        mpv.set_property("hwdec", settings.hwdec.as_str())?;
        mpv.set_property("input-default-bindings", false)?;
        mpv.set_property("osd-level", 0i64)?;
        mpv.set_property("sub-visibility", false)?;

        let render = match output {
            Output::Embed(wid) => {
                mpv.set_property("wid", wid)?;
                None
            }
            Output::Render(display) => {
                mpv.set_property("vo", "libmpv")?;
                let mut render_context = RenderContext::new(
                    unsafe { mpv.ctx.as_mut() },
                    [
                        RenderParam::ApiType(RenderParamApiType::OpenGl),
                        RenderParam::InitParams(OpenGLInitParams {
                            get_proc_address,
                            ctx: display,
                        }),
                    ],
                )?;
                let event_proxy = proxy.clone();
                render_context.set_update_callback(move || {
                    event_proxy.send_event(UserEvent::Redraw).ok();
                });
                Some(render_context)
            }
        };

        let mut events = EventContext::new(mpv.ctx);
        events.disable_deprecated_events()?;
        events.set_wakeup_callback(move || {
            proxy.send_event(UserEvent::MpvWakeup).ok();
        });

        Ok(MpvClient {
            render,
            events: Some(events),
            mpv: Some(mpv),
            state: PlayerState::Idle,
            loaded: false,
        })
    }

    fn mpv(&self) -> Result<&libmpv::Mpv> {
        self.mpv.as_ref().ok_or(Error::Released)
    }
}

impl Player for MpvClient {
    fn load(&mut self, path: &Path) -> Result<()> {
        let path = path
            .to_str()
            .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;
        let mpv = self.mpv()?;
        mpv.set_property("pause", true)?;
        // %len% quoting survives any character in the path
        let quoted = format!("%{}%{}", path.len(), path);
        mpv.command("loadfile", &[&quoted, "replace"])?;
        self.state = PlayerState::Loading;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.mpv()?.set_property("pause", false)?;
        Ok(())
    }

    fn state(&mut self) -> PlayerState {
        let Some(events) = self.events.as_mut() else {
            return self.state.clone();
        };
        while !self.state.is_finished() {
            match events.wait_event(0.0) {
                Some(Ok(MPVEvent::FileLoaded)) => {
                    self.loaded = true;
                    self.state = PlayerState::Playing;
                }
                Some(Ok(MPVEvent::EndFile(_))) | Some(Ok(MPVEvent::Shutdown)) => {
                    self.state = if self.loaded {
                        PlayerState::Ended
                    } else {
                        PlayerState::Failed("file could not be opened".to_string())
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(err)) if self.loaded => {
                    tracing::warn!("Playback stopped early: {err}");
                    self.state = PlayerState::Ended;
                }
                Some(Err(err)) => self.state = PlayerState::Failed(err.to_string()),
                None => break,
            }
        }
        self.state.clone()
    }

    fn stop(&mut self) {
        if let Some(mpv) = &self.mpv {
            mpv.command("stop", &[]).ok();
        }
    }

    fn release(&mut self) {
        drop(self.render.take());
        drop(self.events.take());
        drop(self.mpv.take());
    }

    fn draw(&mut self, width: u32, height: u32) -> Result<bool> {
        match &self.render {
            Some(render) => {
                render.render::<GLContext>(0, width as _, height as _, true)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Drop for MpvClient {
    fn drop(&mut self) {
        self.release();
    }
}
