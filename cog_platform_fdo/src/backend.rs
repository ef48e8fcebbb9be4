// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! The per-process backend session and the engine-facing callbacks.
//!
//! The session lives in a thread-local slot on the thread running the host
//! event loop. Engine callbacks (image exported, view destroyed) can arrive
//! while the session is already borrowed, for example when releasing an
//! image makes the engine export the next one. They are queued and run by
//! whoever holds the session once it is released.
//!
//! ```text
//! engine ──export──▶ on_export_fdo_egl_image ─▶ DEFERRED ─▶ drain ─▶ FdoState::present
//! host   ──destroy─▶ destroy_view_binding     ─▶ DEFERRED ─▶ drain ─▶ FrameExchange::remove
//! host   ──fd ready▶ on_display_readable      ─▶ EventPump::pump ─▶ Dispatch impls
//! ```

use core::ffi::c_void;
use core::ptr::{self, NonNull};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::AsRawFd;
use std::rc::Rc;

use cog_platform::abi::ViewBackendHandle;
use cog_platform::{Cancellable, Shell, ShellRef, UnsupportedOperationError, ViewBackend};
use wayland_client::globals::registry_queue_init;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::Connection;
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use crate::config::FdoConfig;
use crate::egl::EglContext;
use crate::error::{FdoError, FrameError};
use crate::event_loop::EventPump;
use crate::frame::{BindingId, FrameExchange, ImageId};
use crate::probe::SupportProbe;
use crate::session::{Devices, FdoState, Output};
use crate::translate::{Host, ShellInputHandler};
use crate::window::Window;
use crate::wpe::{
    EngineView, ExportableEglClient, ExportedImage, FdoExportChannel, WpeApi, image_id,
};

/// Process-wide compositor connection, probed once.
static DISPLAY: SupportProbe<Connection> = SupportProbe::new();

static EXPORT_CLIENT: ExportableEglClient = ExportableEglClient::new(on_export_fdo_egl_image);

thread_local! {
    static BACKEND: RefCell<Option<FdoBackend>> = const { RefCell::new(None) };
    static DEFERRED: RefCell<VecDeque<Deferred>> = const { RefCell::new(VecDeque::new()) };
}

/// Engine callback waiting for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    Export { binding: BindingId, image: ImageId },
    Destroy(BindingId),
}

fn shared_connection() -> Option<Connection> {
    DISPLAY.get_or_probe(|| Connection::connect_to_env().map_err(FdoError::Connect))
}

/// Whether a Wayland compositor is reachable.
///
/// The first call connects; the outcome is remembered for the lifetime of
/// the process, and later calls reuse it.
#[must_use]
pub fn is_supported() -> bool {
    shared_connection().is_some()
}

/// The application side as seen by the input translator.
struct FdoHost {
    shell: ShellRef,
    wpe: Rc<WpeApi>,
}

impl core::fmt::Debug for FdoHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FdoHost").field("shell", &self.shell).finish_non_exhaustive()
    }
}

impl Shell for FdoHost {
    fn zoom_level(&self) -> f64 {
        self.shell.zoom_level()
    }

    fn set_zoom_level(&self, level: f64) {
        self.shell.set_zoom_level(level);
    }

    fn go_back(&self) {
        self.shell.go_back();
    }

    fn go_forward(&self) {
        self.shell.go_forward();
    }

    fn quit(&self) {
        self.shell.quit();
    }
}

impl Host for FdoHost {
    fn with_active_view(&self, f: &mut dyn FnMut(&dyn ViewBackend)) -> bool {
        let Some(native) = self.shell.active_view_backend() else {
            return false;
        };
        // SAFETY: the host returns a live engine view backend and keeps it
        // alive while its own loop is running this callback.
        let view = unsafe { EngineView::new(Rc::clone(&self.wpe), native.cast()) };
        f(&view);
        true
    }
}

/// A set-up session.
#[derive(Debug)]
struct FdoBackend {
    shell: ShellRef,
    pump: EventPump,
    state: FdoState,
}

impl FdoBackend {
    fn new(shell: ShellRef, config: &FdoConfig) -> Result<Self, FdoError> {
        let conn = shared_connection().ok_or(FdoError::NotInitialized)?;
        let wpe = Rc::new(WpeApi::load()?);

        let (globals, queue) = registry_queue_init::<FdoState>(&conn).map_err(FdoError::Globals)?;
        let mut pump = EventPump::new(queue);
        let qh = pump.queue_handle();

        // SAFETY: the display pointer belongs to `conn`, which the session
        // state keeps alive for as long as the EGL context.
        let egl = unsafe { EglContext::new(conn.backend().display_ptr()) }?;

        let compositor = globals
            .bind::<WlCompositor, _, _>(&qh, 3..=4, ())
            .map_err(|_| FdoError::MissingGlobal {
                interface: "wl_compositor",
            })?;
        let wm_base = globals
            .bind::<XdgWmBase, _, _>(&qh, 1..=5, ())
            .map_err(|_| FdoError::MissingGlobal { interface: "xdg_wm_base" })?;
        let seat = globals.bind::<WlSeat, _, _>(&qh, 1..=5, ()).ok();
        if seat.is_none() {
            log::warn!("compositor offers no seat, input is disabled");
        }
        let outputs = globals.contents().with_list(|list| {
            list.iter()
                .filter(|global| global.interface == "wl_output")
                .map(|global| Output::bind(globals.registry(), global.name, global.version, &qh))
                .collect::<Vec<_>>()
        });

        let window = Window::new(&compositor, &wm_base, &qh, config);
        let handler = ShellInputHandler::new(FdoHost {
            shell,
            wpe: Rc::clone(&wpe),
        });

        let mut state = FdoState {
            conn,
            qh,
            compositor,
            wm_base,
            outputs,
            current_output: None,
            scale: 1,
            devices: Devices::with_seat(seat),
            window: Some(window),
            frames: FrameExchange::new(),
            handler: Some(Box::new(handler)),
            egl,
            wpe,
        };
        pump.roundtrip(&mut state)?;
        state.wpe.initialize_for_egl_display(state.egl.display_ptr())?;

        log::info!("Wayland session ready, {} output(s)", state.outputs.len());
        Ok(Self { shell, pump, state })
    }

    fn run(&mut self, task: Deferred) {
        match task {
            Deferred::Export { binding, image } => {
                if let Err(err) = self.state.present(binding, image) {
                    log::warn!("dropping frame of {binding:?}: {err}");
                }
            }
            Deferred::Destroy(binding) => match self.state.frames.remove(binding) {
                Some(_) => log::debug!("view binding {binding:?} destroyed"),
                None => log::debug!("destroy notify for unknown binding {binding:?}"),
            },
        }
    }

    fn flush(&self) {
        if let Err(err) = self.pump.flush() {
            log::warn!("cannot flush compositor requests: {err}");
        }
    }

    fn pump(&mut self) -> Result<usize, FdoError> {
        self.pump.pump(&mut self.state)
    }

    fn create_view_backend(&mut self) -> Result<NonNull<ViewBackendHandle>, FdoError> {
        let (width, height) = self.state.window_size();
        let wpe = Rc::clone(&self.state.wpe);
        let id = self
            .state
            .frames
            .try_insert_with(|id| FdoExportChannel::new(wpe, &EXPORT_CLIENT, id, width, height))?;
        let native = self
            .state
            .frames
            .channel(id)
            .map(FdoExportChannel::native_view_backend)
            .ok_or(FrameError::UnknownBinding(id))?;

        let user_data = Box::into_raw(Box::new(id));
        // SAFETY: `native` stays alive until the destroy notify removes the
        // binding, and `destroy_view_binding` frees `user_data` exactly once.
        let wrapped = unsafe {
            self.shell
                .wrap_view_backend(native, destroy_view_binding, user_data.cast())
        };
        match wrapped {
            Some(wrapped) => {
                log::debug!("view binding {id:?} created at {width}x{height}");
                Ok(wrapped)
            }
            None => {
                // SAFETY: the host declined, so ownership never left us.
                drop(unsafe { Box::from_raw(user_data) });
                self.state.frames.remove(id);
                Err(FrameError::Wrapper.into())
            }
        }
    }

    fn resume_active_views(&mut self) -> usize {
        let resumed = self.state.resume_active_views();
        self.flush();
        resumed
    }
}

/// Runs `f` with the session, then any engine callbacks it triggered.
fn with_backend<R>(f: impl FnOnce(&mut FdoBackend) -> R) -> Result<R, FdoError> {
    let result = BACKEND.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return Err(FdoError::Reentrant);
        };
        slot.as_mut().map(f).ok_or(FdoError::NotInitialized)
    });
    drain_deferred();
    result
}

fn defer(task: Deferred) {
    DEFERRED.with_borrow_mut(|queue| queue.push_back(task));
    drain_deferred();
}

/// Runs queued engine callbacks unless an outer frame holds the session;
/// that frame drains them on its way out.
fn drain_deferred() {
    BACKEND.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return;
        };
        let Some(backend) = slot.as_mut() else {
            DEFERRED.with_borrow_mut(VecDeque::clear);
            return;
        };
        let mut ran = false;
        while let Some(task) = DEFERRED.with_borrow_mut(VecDeque::pop_front) {
            backend.run(task);
            ran = true;
        }
        if ran {
            backend.flush();
        }
    });
}

/// Sets up the session: connects, creates the window and input handling,
/// initialises the engine on the EGL display and registers the compositor
/// socket with the host loop.
///
/// # Errors
///
/// Fails if a cancellable is passed, if `params` is malformed, or if any
/// step of session setup fails. Everything acquired so far is released.
pub fn setup(
    shell: ShellRef,
    params: Option<&str>,
    cancellable: Option<&Cancellable>,
) -> Result<(), FdoError> {
    if cancellable.is_some() {
        return Err(UnsupportedOperationError { operation: "setup" }.into());
    }
    let config = FdoConfig::parse(params)?;

    let fd = BACKEND.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| FdoError::Reentrant)?;
        if slot.is_some() {
            log::warn!("backend already set up, keeping the existing session");
            return Ok(None);
        }
        let backend = FdoBackend::new(shell, &config)?;
        let fd = backend.state.conn.backend().poll_fd().as_raw_fd();
        *slot = Some(backend);
        Ok::<_, FdoError>(Some(fd))
    })?;

    if let Some(fd) = fd {
        // SAFETY: `on_display_readable` ignores its user data and copes with
        // the session being gone.
        let watched = unsafe { shell.watch_fd(fd, on_display_readable, ptr::null_mut()) };
        if !watched {
            log::warn!(
                "host cannot watch the compositor socket; call `dispatch` from the host loop"
            );
        }
    }
    Ok(())
}

/// Creates a view binding and returns the host-wrapped view backend.
///
/// # Errors
///
/// Fails if the session is not set up, if the engine cannot create the
/// export channel, or if the host cannot wrap it.
pub fn create_view_backend() -> Result<NonNull<ViewBackendHandle>, FdoError> {
    with_backend(FdoBackend::create_view_backend)?
}

/// Requests a frame for every visible view that is not already waiting
/// for one. Returns how many were resumed.
///
/// # Errors
///
/// Fails if the session is not set up.
pub fn resume_active_views() -> Result<usize, FdoError> {
    with_backend(FdoBackend::resume_active_views)
}

/// Reads and dispatches pending compositor events without blocking.
///
/// # Errors
///
/// Fails if the session is not set up or the connection broke.
pub fn dispatch() -> Result<usize, FdoError> {
    with_backend(FdoBackend::pump)?
}

/// Tears the session down. Views still bound are destroyed with it.
pub fn teardown() {
    let backend = BACKEND.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => slot.take(),
        Err(_) => {
            log::error!("teardown requested from a backend callback, ignored");
            None
        }
    });
    match backend {
        Some(backend) => {
            drop(backend);
            log::debug!("backend torn down");
        }
        None => log::debug!("teardown without a session"),
    }
    DEFERRED.with_borrow_mut(VecDeque::clear);
}

unsafe extern "C" fn on_export_fdo_egl_image(data: *mut c_void, image: *mut ExportedImage) {
    let (Some(binding), Some(image)) =
        (NonNull::new(data.cast::<BindingId>()), NonNull::new(image))
    else {
        log::error!("export callback without binding or image");
        return;
    };
    // SAFETY: `data` points at the binding id owned by the channel that
    // created this exportable, which outlives it.
    let binding = unsafe { *binding.as_ptr() };
    defer(Deferred::Export {
        binding,
        image: image_id(image),
    });
}

unsafe extern "C" fn destroy_view_binding(user_data: *mut c_void) {
    if user_data.is_null() {
        return;
    }
    // SAFETY: allocated in `create_view_backend` and handed to the host,
    // which calls this exactly once.
    let binding = *unsafe { Box::from_raw(user_data.cast::<BindingId>()) };
    defer(Deferred::Destroy(binding));
}

unsafe extern "C" fn on_display_readable(_user_data: *mut c_void) -> bool {
    match with_backend(FdoBackend::pump) {
        Ok(Ok(_)) | Err(FdoError::Reentrant) => true,
        Ok(Err(err)) => {
            log::error!("compositor connection lost: {err}");
            false
        }
        Err(_) => false,
    }
}
