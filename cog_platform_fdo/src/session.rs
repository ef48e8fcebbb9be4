// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Compositor session state and protocol event handling.

use std::os::fd::OwnedFd;
use std::rc::Rc;

use wayland_client::globals::GlobalListContents;
use wayland_client::protocol::wl_buffer::{self, WlBuffer};
use wayland_client::protocol::wl_callback::{self, WlCallback};
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_keyboard::{self, KeyState, KeymapFormat, WlKeyboard};
use wayland_client::protocol::wl_output::{self, WlOutput};
use wayland_client::protocol::wl_pointer::{self, ButtonState, WlPointer};
use wayland_client::protocol::wl_region::WlRegion;
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_seat::{self, Capability, WlSeat};
use wayland_client::protocol::wl_surface::{self, WlSurface};
use wayland_client::protocol::wl_touch::{self, WlTouch};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum, delegate_noop};
use wayland_protocols::xdg::shell::client::xdg_surface::{self, XdgSurface};
use wayland_protocols::xdg::shell::client::xdg_toplevel::{self, XdgToplevel};
use wayland_protocols::xdg::shell::client::xdg_wm_base::{self, XdgWmBase};

use cog_platform::input::KeyboardEvent;

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::egl::EglContext;
use crate::error::FrameError;
use crate::frame::{BindingId, FrameExchange, ImageId, ReleaseOutcome, ReleaseToken};
use crate::translate::InputHandler;
use crate::window::{Window, WindowPresenter};
use crate::wpe::{FdoExportChannel, WpeApi};
use crate::xkb::{XkbContext, XkbKeyboard};

/// A bound `wl_output` and its last advertised scale.
#[derive(Debug)]
pub(crate) struct Output {
    name: u32,
    proxy: WlOutput,
    scale: i32,
}

impl Output {
    pub(crate) fn bind(
        registry: &WlRegistry,
        name: u32,
        version: u32,
        qh: &QueueHandle<FdoState>,
    ) -> Self {
        let proxy = registry.bind::<WlOutput, _, _>(name, version.min(3), qh, name);
        Self { name, proxy, scale: 1 }
    }

    fn release(self) {
        if self.proxy.version() >= 3 {
            self.proxy.release();
        }
    }
}

/// Seat devices and the keymap.
#[derive(Debug, Default)]
pub(crate) struct Devices {
    pub(crate) seat: Option<WlSeat>,
    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    touch: Option<WlTouch>,
    xkb: Option<XkbContext>,
    keymap: Option<XkbKeyboard>,
}

impl Devices {
    /// Devices of a seat whose capabilities are not known yet.
    pub(crate) fn with_seat(seat: Option<WlSeat>) -> Self {
        Self {
            seat,
            ..Self::default()
        }
    }

    fn update_capabilities(&mut self, seat: &WlSeat, caps: Capability, qh: &QueueHandle<FdoState>) {
        match (caps.contains(Capability::Pointer), self.pointer.take()) {
            (true, None) => self.pointer = Some(seat.get_pointer(qh, ())),
            (false, Some(pointer)) => release_pointer(pointer),
            (_, current) => self.pointer = current,
        }
        match (caps.contains(Capability::Keyboard), self.keyboard.take()) {
            (true, None) => self.keyboard = Some(seat.get_keyboard(qh, ())),
            (false, Some(keyboard)) => {
                release_keyboard(keyboard);
                self.keymap = None;
            }
            (_, current) => self.keyboard = current,
        }
        match (caps.contains(Capability::Touch), self.touch.take()) {
            (true, None) => self.touch = Some(seat.get_touch(qh, ())),
            (false, Some(touch)) => release_touch(touch),
            (_, current) => self.touch = current,
        }
        log::debug!(
            "seat devices: pointer={} keyboard={} touch={}",
            self.pointer.is_some(),
            self.keyboard.is_some(),
            self.touch.is_some()
        );
    }

    fn load_keymap(&mut self, fd: OwnedFd, size: u32) {
        let xkb = self.xkb.get_or_insert_with(XkbContext::new);
        match xkb.keyboard_from_fd(fd, size) {
            Ok(keymap) => self.keymap = Some(keymap),
            Err(err) => log::warn!("ignoring keymap: {err}"),
        }
    }

    fn release(&mut self) {
        self.keymap = None;
        if let Some(pointer) = self.pointer.take() {
            release_pointer(pointer);
        }
        if let Some(keyboard) = self.keyboard.take() {
            release_keyboard(keyboard);
        }
        if let Some(touch) = self.touch.take() {
            release_touch(touch);
        }
        if let Some(seat) = self.seat.take()
            && seat.version() >= 5
        {
            seat.release();
        }
    }
}

fn release_pointer(pointer: WlPointer) {
    if pointer.version() >= 3 {
        pointer.release();
    }
}

fn release_keyboard(keyboard: WlKeyboard) {
    if keyboard.version() >= 3 {
        keyboard.release();
    }
}

fn release_touch(touch: WlTouch) {
    if touch.version() >= 3 {
        touch.release();
    }
}

/// Everything protocol handlers touch.
///
/// Fields are dropped after [`Drop::drop`] has torn the session down in
/// order: input handler, bindings, devices, window, outputs. EGL and the
/// engine library go last.
pub(crate) struct FdoState {
    pub(crate) conn: Connection,
    pub(crate) qh: QueueHandle<Self>,
    pub(crate) compositor: WlCompositor,
    pub(crate) wm_base: XdgWmBase,
    pub(crate) outputs: Vec<Output>,
    pub(crate) current_output: Option<WlOutput>,
    pub(crate) scale: i32,
    pub(crate) devices: Devices,
    pub(crate) window: Option<Window>,
    pub(crate) frames: FrameExchange<FdoExportChannel>,
    pub(crate) handler: Option<Box<dyn InputHandler>>,
    pub(crate) egl: EglContext,
    pub(crate) wpe: Rc<WpeApi>,
}

impl core::fmt::Debug for FdoState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FdoState")
            .field("outputs", &self.outputs)
            .field("scale", &self.scale)
            .field("window", &self.window)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl FdoState {
    /// Current window size, or the default before the window exists.
    pub(crate) fn window_size(&self) -> (u32, u32) {
        self.window.as_ref().map_or((DEFAULT_WIDTH, DEFAULT_HEIGHT), Window::size)
    }

    fn presenter(&mut self) -> Option<(&mut FrameExchange<FdoExportChannel>, WindowPresenter<'_>)> {
        let window = self.window.as_mut()?;
        Some((
            &mut self.frames,
            WindowPresenter {
                window,
                compositor: &self.compositor,
                egl: &self.egl,
                wpe: &self.wpe,
                conn: &self.conn,
                qh: &self.qh,
            },
        ))
    }

    /// Puts an image exported for `id` on screen.
    pub(crate) fn present(&mut self, id: BindingId, image: ImageId) -> Result<(), FrameError> {
        let (frames, mut presenter) = self.presenter().ok_or(FrameError::UnknownBinding(id))?;
        frames.on_export(id, image, &mut presenter)
    }

    /// Restarts the frame clock of visible views.
    pub(crate) fn resume_active_views(&mut self) -> usize {
        match self.presenter() {
            Some((frames, mut presenter)) => frames.resume_active_views(&mut presenter),
            None => 0,
        }
    }

    fn apply_scale(&mut self, scale: i32) {
        if !cfg!(feature = "device-scaling") || scale == self.scale {
            return;
        }
        log::debug!("output scale {} -> {scale}", self.scale);
        self.scale = scale;
        if let Some(window) = self.window.as_mut() {
            window.set_scale(scale);
        }
        if let Some(handler) = self.handler.as_mut() {
            handler.output_scale_changed(scale);
        }
    }

    fn output_scale(&self, output: &WlOutput) -> Option<i32> {
        self.outputs.iter().find(|o| o.proxy == *output).map(|o| o.scale)
    }
}

impl Drop for FdoState {
    fn drop(&mut self) {
        self.handler = None;
        let bindings = self.frames.clear();
        if !bindings.is_empty() {
            log::debug!("destroying {} view binding(s) still alive at teardown", bindings.len());
        }
        drop(bindings);
        self.devices.release();
        self.window = None;
        self.current_output = None;
        for output in self.outputs.drain(..) {
            output.release();
        }
        self.wm_base.destroy();
        if let Err(err) = self.conn.flush() {
            log::debug!("final flush failed: {err}");
        }
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for FdoState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &GlobalListContents,
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } if interface == WlOutput::interface().name => {
                log::debug!("output {name} added");
                state.outputs.push(Output::bind(registry, name, version, qh));
            }
            wl_registry::Event::GlobalRemove { name } => {
                if let Some(pos) = state.outputs.iter().position(|o| o.name == name) {
                    log::debug!("output {name} removed");
                    let output = state.outputs.swap_remove(pos);
                    if state.current_output.as_ref() == Some(&output.proxy) {
                        state.current_output = None;
                    }
                    output.release();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlOutput, u32> for FdoState {
    fn event(
        state: &mut Self,
        proxy: &WlOutput,
        event: wl_output::Event,
        _: &u32,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_output::Event::Scale { factor } = event {
            if let Some(output) = state.outputs.iter_mut().find(|o| o.proxy == *proxy) {
                output.scale = factor;
            }
            if state.current_output.as_ref() == Some(proxy) {
                state.apply_scale(factor);
            }
        }
    }
}

impl Dispatch<XdgWmBase, ()> for FdoState {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let xdg_surface::Event::Configure { serial } = event else {
            return;
        };
        let Some(resized) = state.window.as_mut().and_then(|w| w.ack_configure(serial)) else {
            return;
        };
        log::debug!("window resized to {}x{}", resized.0, resized.1);
        if let Some(handler) = state.handler.as_mut() {
            handler.window_resized(resized.0, resized.1);
        }
    }
}

impl Dispatch<XdgToplevel, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, states } => {
                if let Some(window) = state.window.as_mut() {
                    window.toplevel_configure(width, height, &states);
                }
            }
            xdg_toplevel::Event::Close => {
                if let Some(handler) = state.handler.as_mut() {
                    handler.close_requested();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSurface, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &WlSurface,
        event: wl_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_surface::Event::Enter { output } = event {
            let scale = state.output_scale(&output).unwrap_or(1);
            state.current_output = Some(output);
            state.apply_scale(scale);
        }
    }
}

impl Dispatch<WlSeat, ()> for FdoState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(caps),
        } = event
        {
            state.devices.update_capabilities(seat, caps, qh);
        }
    }
}

impl Dispatch<WlPointer, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let Some(handler) = state.handler.as_mut() else {
            return;
        };
        match event {
            wl_pointer::Event::Enter {
                surface_x, surface_y, ..
            } => handler.pointer_motion(0, surface_x, surface_y),
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => handler.pointer_motion(time, surface_x, surface_y),
            wl_pointer::Event::Button {
                time,
                button,
                state: button_state,
                ..
            } => handler.pointer_button(
                time,
                button,
                button_state == WEnum::Value(ButtonState::Pressed),
            ),
            wl_pointer::Event::Axis {
                time,
                axis: WEnum::Value(axis),
                value,
            } => handler.pointer_axis(time, u32::from(axis), value),
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format == WEnum::Value(KeymapFormat::XkbV1) {
                    state.devices.load_keymap(fd, size);
                } else {
                    log::warn!("unsupported keymap format {format:?}");
                }
            }
            wl_keyboard::Event::Key {
                time,
                key,
                state: key_state,
                ..
            } => {
                let (Some(keymap), Some(handler)) =
                    (state.devices.keymap.as_ref(), state.handler.as_mut())
                else {
                    return;
                };
                let (keysym, unicode) = keymap.translate(key);
                handler.key(KeyboardEvent {
                    time,
                    keysym,
                    unicode,
                    pressed: key_state == WEnum::Value(KeyState::Pressed),
                    modifiers: keymap.modifiers(),
                });
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => {
                let Some(keymap) = state.devices.keymap.as_mut() else {
                    return;
                };
                keymap.update_mask(mods_depressed, mods_latched, mods_locked, group);
                let modifiers = keymap.modifiers();
                if let Some(handler) = state.handler.as_mut() {
                    handler.modifiers_changed(modifiers);
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlTouch, ()> for FdoState {
    fn event(
        state: &mut Self,
        _: &WlTouch,
        event: wl_touch::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let Some(handler) = state.handler.as_mut() else {
            return;
        };
        match event {
            wl_touch::Event::Down { time, id, x, y, .. } => handler.touch_down(time, id, x, y),
            wl_touch::Event::Motion { time, id, x, y } => handler.touch_motion(time, id, x, y),
            wl_touch::Event::Up { time, id, .. } => handler.touch_up(time, id),
            _ => {}
        }
    }
}

impl Dispatch<WlCallback, BindingId> for FdoState {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        binding: &BindingId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.frames.on_frame_done(*binding);
        }
    }
}

impl Dispatch<WlBuffer, ReleaseToken> for FdoState {
    fn event(
        state: &mut Self,
        buffer: &WlBuffer,
        event: wl_buffer::Event,
        token: &ReleaseToken,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            match state.frames.on_buffer_release(*token) {
                ReleaseOutcome::Released => {}
                outcome => log::trace!("buffer release for {token:?}: {outcome:?}"),
            }
            buffer.destroy();
        }
    }
}

delegate_noop!(FdoState: WlCompositor);
delegate_noop!(FdoState: WlRegion);
