// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Engine bindings: libwpe and WPEBackend-fdo, opened at runtime.

use core::ffi::{c_char, c_void};
use core::ptr::{self, NonNull};
use std::rc::Rc;

use cog_platform::ActivityState;
use cog_platform::input::{AxisEvent, KeyboardEvent, PointerEvent, TouchEvent, TouchPoint};
use cog_platform::view::ViewBackend;
use libloading::Library;

use crate::error::{FdoError, FrameError};
use crate::frame::{BindingId, ExportChannel, ImageId};

const LIBWPE: &str = "libwpe-1.0.so.1";
const LIBWPE_FDO: &str = "libWPEBackend-fdo-1.0.so.1";

/// `struct wpe_view_backend`
#[repr(C)]
pub(crate) struct NativeViewBackend {
    _private: [u8; 0],
}

/// `struct wpe_view_backend_exportable_fdo`
#[repr(C)]
pub(crate) struct Exportable {
    _private: [u8; 0],
}

/// `struct wpe_fdo_egl_exported_image`
#[repr(C)]
pub(crate) struct ExportedImage {
    _private: [u8; 0],
}

pub(crate) type ExportFdoEglImageFn =
    unsafe extern "C" fn(data: *mut c_void, image: *mut ExportedImage);

/// `struct wpe_view_backend_exportable_fdo_egl_client`
#[repr(C)]
#[allow(dead_code, reason = "read by the engine")]
pub(crate) struct ExportableEglClient {
    export_egl_image: Option<unsafe extern "C" fn(*mut c_void, *mut c_void)>,
    export_fdo_egl_image: Option<ExportFdoEglImageFn>,
    export_shm_buffer: Option<unsafe extern "C" fn(*mut c_void, *mut c_void)>,
    _reserved0: Option<unsafe extern "C" fn()>,
    _reserved1: Option<unsafe extern "C" fn()>,
}

impl ExportableEglClient {
    pub(crate) const fn new(export: ExportFdoEglImageFn) -> Self {
        Self {
            export_egl_image: None,
            export_fdo_egl_image: Some(export),
            export_shm_buffer: None,
            _reserved0: None,
            _reserved1: None,
        }
    }
}

#[repr(C)]
struct RawPointerEvent {
    kind: u32,
    time: u32,
    x: i32,
    y: i32,
    button: u32,
    state: u32,
    modifiers: u32,
}

const AXIS_EVENT_MOTION: u32 = 1;

#[repr(C)]
struct RawAxisEvent {
    kind: u32,
    time: u32,
    x: i32,
    y: i32,
    axis: u32,
    value: i32,
    modifiers: u32,
}

#[repr(C)]
struct RawTouchEvent {
    touchpoints: *const TouchPoint,
    touchpoints_length: u64,
    kind: u32,
    id: i32,
    time: u32,
    modifiers: u32,
}

#[repr(C)]
struct RawKeyboardEvent {
    time: u32,
    key_code: u32,
    hardware_key_code: u32,
    pressed: bool,
    modifiers: u32,
}

/// Resolves `name` from `library` as a `T`.
///
/// # Safety
///
/// `T` must be the C signature of `name`.
pub(crate) unsafe fn load_symbol<T: Copy>(
    library: &Library,
    soname: &'static str,
    name: &[u8],
) -> Result<T, FdoError> {
    // SAFETY: forwarded from the caller.
    unsafe { library.get::<T>(name) }
        .map(|symbol| *symbol)
        .map_err(|source| FdoError::EngineLoad {
            library: soname,
            source,
        })
}

pub(crate) fn open_library(soname: &'static str) -> Result<Library, FdoError> {
    // SAFETY: the engine libraries have no unusual initialisers.
    unsafe { Library::new(soname) }.map_err(|source| FdoError::EngineLoad {
        library: soname,
        source,
    })
}

/// Entry points of the engine libraries this backend calls.
pub(crate) struct WpeApi {
    loader_init: unsafe extern "C" fn(*const c_char) -> bool,
    dispatch_pointer_event: unsafe extern "C" fn(*mut NativeViewBackend, *const RawPointerEvent),
    dispatch_axis_event: unsafe extern "C" fn(*mut NativeViewBackend, *const RawAxisEvent),
    dispatch_touch_event: unsafe extern "C" fn(*mut NativeViewBackend, *const RawTouchEvent),
    dispatch_keyboard_event: unsafe extern "C" fn(*mut NativeViewBackend, *const RawKeyboardEvent),
    dispatch_set_size: unsafe extern "C" fn(*mut NativeViewBackend, u32, u32),
    dispatch_set_device_scale_factor: unsafe extern "C" fn(*mut NativeViewBackend, f32),
    add_activity_state: unsafe extern "C" fn(*mut NativeViewBackend, u32),
    get_activity_state: unsafe extern "C" fn(*mut NativeViewBackend) -> u32,

    initialize_for_egl_display: unsafe extern "C" fn(*mut c_void) -> bool,
    exportable_egl_create:
        unsafe extern "C" fn(*const ExportableEglClient, *mut c_void, u32, u32) -> *mut Exportable,
    exportable_destroy: unsafe extern "C" fn(*mut Exportable),
    exportable_get_view_backend: unsafe extern "C" fn(*mut Exportable) -> *mut NativeViewBackend,
    exportable_dispatch_frame_complete: unsafe extern "C" fn(*mut Exportable),
    exportable_release_image: unsafe extern "C" fn(*mut Exportable, *mut ExportedImage),
    exported_image_egl_image: unsafe extern "C" fn(*mut ExportedImage) -> *mut c_void,

    fdo_lib: Library,
    wpe_lib: Library,
}

impl core::fmt::Debug for WpeApi {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WpeApi")
            .field("wpe", &self.wpe_lib)
            .field("fdo", &self.fdo_lib)
            .finish_non_exhaustive()
    }
}

impl WpeApi {
    /// Opens both libraries and points libwpe at the fdo backend.
    pub(crate) fn load() -> Result<Self, FdoError> {
        let wpe = open_library(LIBWPE)?;
        let fdo = open_library(LIBWPE_FDO)?;

        // SAFETY: every signature below mirrors the engine headers.
        let api = unsafe {
            Self {
                loader_init: load_symbol(&wpe, LIBWPE, b"wpe_loader_init\0")?,
                dispatch_pointer_event: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_pointer_event\0",
                )?,
                dispatch_axis_event: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_axis_event\0",
                )?,
                dispatch_touch_event: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_touch_event\0",
                )?,
                dispatch_keyboard_event: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_keyboard_event\0",
                )?,
                dispatch_set_size: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_set_size\0",
                )?,
                dispatch_set_device_scale_factor: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_dispatch_set_device_scale_factor\0",
                )?,
                add_activity_state: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_add_activity_state\0",
                )?,
                get_activity_state: load_symbol(
                    &wpe,
                    LIBWPE,
                    b"wpe_view_backend_get_activity_state\0",
                )?,

                initialize_for_egl_display: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_fdo_initialize_for_egl_display\0",
                )?,
                exportable_egl_create: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_view_backend_exportable_fdo_egl_create\0",
                )?,
                exportable_destroy: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_view_backend_exportable_fdo_destroy\0",
                )?,
                exportable_get_view_backend: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_view_backend_exportable_fdo_get_view_backend\0",
                )?,
                exportable_dispatch_frame_complete: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_view_backend_exportable_fdo_dispatch_frame_complete\0",
                )?,
                exportable_release_image: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_view_backend_exportable_fdo_egl_dispatch_release_exported_image\0",
                )?,
                exported_image_egl_image: load_symbol(
                    &fdo,
                    LIBWPE_FDO,
                    b"wpe_fdo_egl_exported_image_get_egl_image\0",
                )?,
                fdo_lib: fdo,
                wpe_lib: wpe,
            }
        };

        let backend = c"libWPEBackend-fdo-1.0.so.1";
        // SAFETY: `backend` is NUL-terminated and outlives the call.
        if !unsafe { (api.loader_init)(backend.as_ptr()) } {
            return Err(FdoError::EngineInit("wpe_loader_init"));
        }
        log::debug!("loaded {LIBWPE} and {LIBWPE_FDO}");
        Ok(api)
    }

    /// Binds the fdo backend to `display`.
    pub(crate) fn initialize_for_egl_display(&self, display: *mut c_void) -> Result<(), FdoError> {
        // SAFETY: `display` is an initialised EGL display.
        if unsafe { (self.initialize_for_egl_display)(display) } {
            Ok(())
        } else {
            Err(FdoError::EngineInit("wpe_fdo_initialize_for_egl_display"))
        }
    }

    /// The EGL image backing an exported image.
    pub(crate) fn egl_image(&self, image: ImageId) -> *mut c_void {
        // SAFETY: `ImageId`s are only minted from live exported images.
        unsafe { (self.exported_image_egl_image)(image_ptr(image)) }
    }
}

fn image_ptr(image: ImageId) -> *mut ExportedImage {
    ptr::with_exposed_provenance_mut(image.0)
}

pub(crate) fn image_id(image: NonNull<ExportedImage>) -> ImageId {
    ImageId(image.as_ptr().expose_provenance())
}

/// An engine view backend, driven through libwpe.
#[derive(Debug)]
pub(crate) struct EngineView {
    api: Rc<WpeApi>,
    backend: NonNull<NativeViewBackend>,
}

impl EngineView {
    /// # Safety
    ///
    /// `backend` must stay alive for as long as the returned value is used.
    pub(crate) unsafe fn new(api: Rc<WpeApi>, backend: NonNull<NativeViewBackend>) -> Self {
        Self { api, backend }
    }
}

impl ViewBackend for EngineView {
    fn dispatch_pointer_event(&self, event: &PointerEvent) {
        let raw = RawPointerEvent {
            kind: event.kind as u32,
            time: event.time,
            x: event.x,
            y: event.y,
            button: event.button,
            state: event.state,
            modifiers: event.modifiers.bits(),
        };
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.dispatch_pointer_event)(self.backend.as_ptr(), &raw) };
    }

    fn dispatch_axis_event(&self, event: &AxisEvent) {
        let raw = RawAxisEvent {
            kind: AXIS_EVENT_MOTION,
            time: event.time,
            x: event.x,
            y: event.y,
            axis: event.axis,
            value: event.value,
            modifiers: event.modifiers.bits(),
        };
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.dispatch_axis_event)(self.backend.as_ptr(), &raw) };
    }

    fn dispatch_touch_event(&self, event: &TouchEvent<'_>) {
        let raw = RawTouchEvent {
            touchpoints: event.points.as_ptr(),
            touchpoints_length: event.points.len() as u64,
            kind: event.kind as u32,
            id: event.id,
            time: event.time,
            modifiers: event.modifiers.bits(),
        };
        // SAFETY: the backend is live per `EngineView::new`; `TouchPoint` has
        // the engine's raw touch layout and outlives the call.
        unsafe { (self.api.dispatch_touch_event)(self.backend.as_ptr(), &raw) };
    }

    fn dispatch_keyboard_event(&self, event: &KeyboardEvent) {
        let raw = RawKeyboardEvent {
            time: event.time,
            key_code: event.keysym,
            hardware_key_code: event.unicode,
            pressed: event.pressed,
            modifiers: event.modifiers.bits(),
        };
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.dispatch_keyboard_event)(self.backend.as_ptr(), &raw) };
    }

    fn dispatch_set_size(&self, width: u32, height: u32) {
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.dispatch_set_size)(self.backend.as_ptr(), width, height) };
    }

    fn dispatch_set_device_scale_factor(&self, scale: f32) {
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.dispatch_set_device_scale_factor)(self.backend.as_ptr(), scale) };
    }

    fn add_activity_state(&self, state: ActivityState) {
        // SAFETY: the backend is live per `EngineView::new`.
        unsafe { (self.api.add_activity_state)(self.backend.as_ptr(), state.bits()) };
    }

    fn activity_state(&self) -> ActivityState {
        // SAFETY: the backend is live per `EngineView::new`.
        let bits = unsafe { (self.api.get_activity_state)(self.backend.as_ptr()) };
        ActivityState::from_bits_retain(bits)
    }
}

/// One exportable: the engine half of a view binding.
///
/// Owns the exportable (and with it the engine view backend); dropping it
/// destroys both.
#[derive(Debug)]
pub(crate) struct FdoExportChannel {
    view: EngineView,
    exportable: NonNull<Exportable>,
    // Read by the export callback; must stay at a stable address until the
    // exportable is destroyed.
    binding: Box<BindingId>,
}

impl FdoExportChannel {
    /// Creates an exportable of `width × height` whose exports are reported
    /// for `binding` through `client`.
    pub(crate) fn new(
        api: Rc<WpeApi>,
        client: &'static ExportableEglClient,
        binding: BindingId,
        width: u32,
        height: u32,
    ) -> Result<Self, FrameError> {
        let binding = Box::new(binding);
        let data = ptr::from_ref::<BindingId>(&*binding).cast_mut().cast();
        // SAFETY: `client` is static and `data` outlives the exportable.
        let exportable = unsafe { (api.exportable_egl_create)(client, data, width, height) };
        let exportable = NonNull::new(exportable).ok_or(FrameError::ExportChannel)?;

        // SAFETY: `exportable` was just created.
        let backend = unsafe { (api.exportable_get_view_backend)(exportable.as_ptr()) };
        let Some(backend) = NonNull::new(backend) else {
            // SAFETY: created above and not shared yet.
            unsafe { (api.exportable_destroy)(exportable.as_ptr()) };
            return Err(FrameError::ViewBackend);
        };

        // SAFETY: the view backend lives as long as the exportable, which
        // this channel owns.
        let view = unsafe { EngineView::new(api, backend) };
        Ok(Self {
            view,
            exportable,
            binding,
        })
    }

    /// The native view backend, for wrapping by the host.
    pub(crate) fn native_view_backend(&self) -> NonNull<c_void> {
        self.view.backend.cast()
    }
}

impl ExportChannel for FdoExportChannel {
    fn dispatch_frame_complete(&mut self) {
        // SAFETY: the exportable is owned by `self`.
        unsafe { (self.view.api.exportable_dispatch_frame_complete)(self.exportable.as_ptr()) };
    }

    fn release_image(&mut self, image: ImageId) {
        // SAFETY: the exportable is owned by `self`; the frame exchange only
        // releases images this exportable exported, once each.
        unsafe {
            (self.view.api.exportable_release_image)(self.exportable.as_ptr(), image_ptr(image));
        }
    }

    fn add_activity_state(&mut self, state: ActivityState) {
        self.view.add_activity_state(state);
    }

    fn activity_state(&self) -> ActivityState {
        self.view.activity_state()
    }
}

impl Drop for FdoExportChannel {
    fn drop(&mut self) {
        log::debug!("destroying exportable for {:?}", self.binding);
        // SAFETY: owned by `self` and destroyed exactly once.
        unsafe { (self.view.api.exportable_destroy)(self.exportable.as_ptr()) };
    }
}
