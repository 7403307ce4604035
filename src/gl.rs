use crate::error::{Error, Result};
use glow::HasContext;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, PossiblyCurrentGlContext};
use glutin::display::{Display, DisplayApiPreference, GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::GlWindow;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::num::NonZeroU32;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId};

fn open_display(event_loop: &ActiveEventLoop) -> Result<Display> {
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(windows)]
    let preference = DisplayApiPreference::Wgl(None);
    #[cfg(all(unix, not(target_os = "macos")))]
    let preference = DisplayApiPreference::Egl;

    let raw_display_handle = event_loop.display_handle()?.as_raw();
    Ok(unsafe { Display::new(raw_display_handle, preference)? })
}

/// The config with the most samples, if there is any.
fn best_config<C>(configs: impl Iterator<Item = C>, samples: impl Fn(&C) -> u8) -> Option<C> {
    configs.max_by_key(|config| samples(config))
}

/// A window together with the GL surface drawn into it.
pub struct Screen {
    // The surface has to go before its window.
    surface: Surface<WindowSurface>,
    window: Window,
}

impl Screen {
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn resize(&self, graphics: &Graphics) {
        let size = self.window.inner_size();
        if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            self.surface.resize(&graphics.context, width, height);
        }
    }
}

/// The GL context shared by every screen.
pub struct Graphics {
    gl: glow::Context,
    context: PossiblyCurrentContext,
    config: Config,
}

impl Graphics {
    /// Opens the first window and a context for it.
    pub fn new(event_loop: &ActiveEventLoop, attributes: WindowAttributes) -> Result<(Self, Screen)> {
        let display = open_display(event_loop)?;
        let configs = unsafe { display.find_configs(ConfigTemplateBuilder::new().build())? };
        let config = best_config(configs, GlConfig::num_samples)
            .ok_or_else(|| Error::Graphics("the display offers no GL config".to_string()))?;
        let window = glutin_winit::finalize_window(event_loop, attributes, &config)?;

        let raw_window_handle = window.window_handle().ok().map(|handle| handle.as_raw());
        let context_attributes = ContextAttributesBuilder::new().build(raw_window_handle);
        let not_current = unsafe { config.display().create_context(&config, &context_attributes)? };

        let surface = create_surface(&config, &window)?;
        let context = not_current.make_current(&surface)?;
        surface
            .set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN))
            .ok();

        let display = config.display();
        let gl = unsafe { glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name)) };

        Ok((Self { gl, context, config }, Screen { surface, window }))
    }

    /// Opens another window that shares this context.
    pub fn create_screen(&self, event_loop: &ActiveEventLoop, attributes: WindowAttributes) -> Result<Screen> {
        let window = glutin_winit::finalize_window(event_loop, attributes, &self.config)?;
        let surface = create_surface(&self.config, &window)?;
        Ok(Screen { surface, window })
    }

    pub fn display(&self) -> Display {
        self.config.display()
    }

    pub fn make_current(&self, screen: &Screen) -> Result<()> {
        self.context.make_current(&screen.surface)?;
        Ok(())
    }

    pub fn clear_black(&self, screen: &Screen) -> Result<()> {
        self.make_current(screen)?;
        unsafe {
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        self.present(screen)
    }

    pub fn present(&self, screen: &Screen) -> Result<()> {
        screen.surface.swap_buffers(&self.context)?;
        Ok(())
    }
}

fn create_surface(config: &Config, window: &Window) -> Result<Surface<WindowSurface>> {
    let attributes = window.build_surface_attributes(Default::default())?;
    let surface = unsafe { config.display().create_window_surface(config, &attributes)? };
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_configs_is_none() {
        assert_eq!(best_config(std::iter::empty::<(&str, u8)>(), |(_, samples)| *samples), None);
    }

    #[test]
    fn most_samples_wins() {
        let configs = [("plain", 0), ("msaa4", 4), ("msaa2", 2)];
        let best = best_config(configs.into_iter(), |(_, samples)| *samples);
        assert_eq!(best, Some(("msaa4", 4)));
    }
}
