// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! The xdg-shell toplevel all views are presented in.

use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Proxy, QueueHandle};
use wayland_protocols::xdg::shell::client::xdg_surface::XdgSurface;
use wayland_protocols::xdg::shell::client::xdg_toplevel::{self, XdgToplevel};
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use crate::config::FdoConfig;
use crate::egl::EglContext;
use crate::error::FrameError;
use crate::frame::{BindingId, ImageId, PresentSurface, ReleaseToken};
use crate::session::FdoState;
use crate::wpe::WpeApi;

const APP_ID: &str = "com.igalia.Cog";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PendingConfigure {
    size: Option<(u32, u32)>,
    fullscreen: bool,
}

/// Toplevel window state.
#[derive(Debug)]
pub(crate) struct Window {
    surface: WlSurface,
    xdg_surface: XdgSurface,
    toplevel: XdgToplevel,
    size: (u32, u32),
    fullscreen: bool,
    scale: i32,
    pending: Option<PendingConfigure>,
}

impl Window {
    pub(crate) fn new(
        compositor: &WlCompositor,
        wm_base: &XdgWmBase,
        qh: &QueueHandle<FdoState>,
        config: &FdoConfig,
    ) -> Self {
        let surface = compositor.create_surface(qh, ());
        let xdg_surface = wm_base.get_xdg_surface(&surface, qh, ());
        let toplevel = xdg_surface.get_toplevel(qh, ());
        toplevel.set_title(config.title.clone());
        toplevel.set_app_id(APP_ID.into());
        if config.fullscreen {
            toplevel.set_fullscreen(None);
        }
        surface.commit();
        log::debug!(
            "created {}x{} window{}",
            config.width,
            config.height,
            if config.fullscreen { " (fullscreen)" } else { "" }
        );

        Self {
            surface,
            xdg_surface,
            toplevel,
            size: (config.width, config.height),
            fullscreen: config.fullscreen,
            scale: 1,
            pending: None,
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Records a toplevel configure; applied on the next surface configure.
    pub(crate) fn toplevel_configure(&mut self, width: i32, height: i32, states: &[u8]) {
        let size = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        };
        self.pending = Some(PendingConfigure {
            size,
            fullscreen: has_state(states, xdg_toplevel::State::Fullscreen),
        });
    }

    /// Acknowledges a surface configure. Returns the new size if it changed.
    pub(crate) fn ack_configure(&mut self, serial: u32) -> Option<(u32, u32)> {
        self.xdg_surface.ack_configure(serial);
        let pending = self.pending.take()?;
        self.fullscreen = pending.fullscreen;
        match pending.size {
            Some(size) if size != self.size => {
                self.size = size;
                Some(size)
            }
            _ => None,
        }
    }

    /// Applies the scale of the output the surface is shown on.
    pub(crate) fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
        if self.surface.version() >= 3 {
            self.surface.set_buffer_scale(scale);
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.toplevel.destroy();
        self.xdg_surface.destroy();
        self.surface.destroy();
    }
}

fn has_state(states: &[u8], wanted: xdg_toplevel::State) -> bool {
    states
        .chunks_exact(4)
        .filter_map(|raw| raw.try_into().ok().map(u32::from_ne_bytes))
        .any(|state| state == wanted as u32)
}

/// A [`Window`] plus what it takes to put exported images on it.
pub(crate) struct WindowPresenter<'a> {
    pub(crate) window: &'a mut Window,
    pub(crate) compositor: &'a WlCompositor,
    pub(crate) egl: &'a EglContext,
    pub(crate) wpe: &'a WpeApi,
    pub(crate) conn: &'a Connection,
    pub(crate) qh: &'a QueueHandle<FdoState>,
}

impl PresentSurface for WindowPresenter<'_> {
    type Buffer = WlBuffer;

    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen
    }

    fn size(&self) -> (u32, u32) {
        self.window.size
    }

    fn scale(&self) -> i32 {
        self.window.scale
    }

    fn set_opaque_region(&mut self, region: Option<(u32, u32)>) {
        match region {
            Some((width, height)) => {
                let width = i32::try_from(width).unwrap_or(i32::MAX);
                let height = i32::try_from(height).unwrap_or(i32::MAX);
                let region = self.compositor.create_region(self.qh, ());
                region.add(0, 0, width, height);
                self.window.surface.set_opaque_region(Some(&region));
                region.destroy();
            }
            None => self.window.surface.set_opaque_region(None),
        }
    }

    fn create_buffer(
        &mut self,
        image: ImageId,
        token: ReleaseToken,
    ) -> Result<WlBuffer, FrameError> {
        let egl_image = self.wpe.egl_image(image);
        // SAFETY: `egl_image` belongs to an image the engine just exported
        // on this EGL display.
        let proxy = unsafe { self.egl.create_wayland_buffer(egl_image) }
            .ok_or(FrameError::BufferCreation)?;
        let data = self.qh.make_data::<WlBuffer, ReleaseToken>(token);
        // SAFETY: `proxy` is a fresh `wl_buffer` on this connection, not yet
        // managed by anyone else.
        let id = unsafe {
            self.conn
                .backend()
                .manage_object(WlBuffer::interface(), proxy.as_ptr(), data)
        };
        WlBuffer::from_id(self.conn, id).map_err(|_| FrameError::BufferCreation)
    }

    fn attach(&mut self, buffer: WlBuffer) {
        self.window.surface.attach(Some(&buffer), 0, 0);
    }

    fn damage(&mut self, width: i32, height: i32) {
        self.window.surface.damage(0, 0, width, height);
    }

    fn request_frame(&mut self, binding: BindingId) {
        self.window.surface.frame(self.qh, binding);
    }

    fn commit(&mut self) {
        self.window.surface.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::has_state;
    use wayland_protocols::xdg::shell::client::xdg_toplevel::State;

    fn encode(states: &[State]) -> Vec<u8> {
        states
            .iter()
            .flat_map(|s| (*s as u32).to_ne_bytes())
            .collect()
    }

    #[test]
    fn detects_fullscreen_state() {
        assert!(has_state(&encode(&[State::Activated, State::Fullscreen]), State::Fullscreen));
        assert!(!has_state(&encode(&[State::Maximized]), State::Fullscreen));
        assert!(!has_state(&[], State::Fullscreen));
    }

    #[test]
    fn ignores_trailing_partial_entries() {
        let mut raw = encode(&[State::Fullscreen]);
        raw.truncate(3);
        assert!(!has_state(&raw, State::Fullscreen));
    }
}
