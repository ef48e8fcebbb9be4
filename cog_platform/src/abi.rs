// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! C ABI shared between the host and platform plugins.
//!
//! A platform plugin is a shared library exporting a fixed set of
//! `extern "C"` entry points. The host resolves them by name (see
//! [`Platform`](crate::platform::Platform)) and hands the plugin a
//! [`ShellInterface`] describing the application services it may call back
//! into.
//!
//! | Symbol | Signature | Required |
//! |---|---|---|
//! | [`SETUP_SYMBOL`] | [`SetupFn`] | yes |
//! | [`TEARDOWN_SYMBOL`] | [`TeardownFn`] | yes |
//! | [`GET_VIEW_BACKEND_SYMBOL`] | [`GetViewBackendFn`] | yes |
//! | [`INIT_VIEW_SYMBOL`] | [`InitViewFn`] | no |
//! | [`RESIZE_SYMBOL`] | [`ResizeFn`] | no |
//! | [`CREATE_IM_CONTEXT_SYMBOL`] | [`CreateImContextFn`] | no |
//! | [`RESUME_ACTIVE_VIEWS_SYMBOL`] | [`ResumeActiveViewsFn`] | no |
//!
//! All strings crossing the boundary are NUL-terminated UTF-8. All calls
//! happen on the host's event-loop thread.

use core::ffi::{CStr, c_char, c_int, c_void};
use core::fmt;

/// Opaque host-side platform object, passed as the first argument of every
/// entry point.
#[repr(C)]
pub struct PlatformHandle {
    _private: [u8; 0],
}

/// Opaque web view owned by the host.
#[repr(C)]
pub struct ViewHandle {
    _private: [u8; 0],
}

/// Opaque engine-facing view backend wrapper produced by
/// [`ShellInterface::wrap_view_backend`].
#[repr(C)]
pub struct ViewBackendHandle {
    _private: [u8; 0],
}

/// Opaque input-method context.
#[repr(C)]
pub struct ImContextHandle {
    _private: [u8; 0],
}

/// `cog_platform_plugin_setup`
pub const SETUP_SYMBOL: &CStr = c"cog_platform_plugin_setup";
/// `cog_platform_plugin_teardown`
pub const TEARDOWN_SYMBOL: &CStr = c"cog_platform_plugin_teardown";
/// `cog_platform_plugin_get_view_backend`
pub const GET_VIEW_BACKEND_SYMBOL: &CStr = c"cog_platform_plugin_get_view_backend";
/// `cog_platform_plugin_init_web_view`
pub const INIT_VIEW_SYMBOL: &CStr = c"cog_platform_plugin_init_web_view";
/// `cog_platform_plugin_resize`
pub const RESIZE_SYMBOL: &CStr = c"cog_platform_plugin_resize";
/// `cog_platform_plugin_create_im_context`
pub const CREATE_IM_CONTEXT_SYMBOL: &CStr = c"cog_platform_plugin_create_im_context";
/// `cog_platform_plugin_resume_active_views`
pub const RESUME_ACTIVE_VIEWS_SYMBOL: &CStr = c"cog_platform_plugin_resume_active_views";

/// Initialises the plugin. Returns `false` on failure.
///
/// `params` is an opaque, backend-defined configuration string and may be
/// null.
pub type SetupFn = unsafe extern "C" fn(
    platform: *mut PlatformHandle,
    shell: *const ShellInterface,
    params: *const c_char,
) -> bool;

/// Releases everything acquired by [`SetupFn`].
pub type TeardownFn = unsafe extern "C" fn(platform: *mut PlatformHandle);

/// Creates a view backend, optionally sharing context with `related_view`
/// (which may be null). Returns null on failure.
pub type GetViewBackendFn = unsafe extern "C" fn(
    platform: *mut PlatformHandle,
    related_view: *mut ViewHandle,
) -> *mut ViewBackendHandle;

/// Lets the plugin customise a freshly created view.
pub type InitViewFn = unsafe extern "C" fn(platform: *mut PlatformHandle, view: *mut ViewHandle);

/// Applies a backend-defined resize request.
pub type ResizeFn = unsafe extern "C" fn(platform: *mut PlatformHandle, params: *const c_char);

/// Creates an input-method context, or returns null.
pub type CreateImContextFn =
    unsafe extern "C" fn(platform: *mut PlatformHandle) -> *mut ImContextHandle;

/// Restarts frame pacing for views that became active again.
pub type ResumeActiveViewsFn = unsafe extern "C" fn(platform: *mut PlatformHandle);

/// Destructor attached to a wrapped view backend.
pub type DestroyNotify = unsafe extern "C" fn(user_data: *mut c_void);

/// Called by the host loop when a watched file descriptor becomes readable.
///
/// Returning `false` removes the watch.
pub type FdReadyFn = unsafe extern "C" fn(user_data: *mut c_void) -> bool;

/// Application services a plugin may call.
///
/// Every slot is optional. `context` is passed back verbatim as the first
/// argument of each call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ShellInterface {
    /// Host data passed to every callback.
    pub context: *mut c_void,
    /// Wraps a native engine view backend into the object the web view
    /// consumes. `destroy` is invoked with `user_data` when the wrapper is
    /// released.
    pub wrap_view_backend: Option<
        unsafe extern "C" fn(
            context: *mut c_void,
            native_backend: *mut c_void,
            destroy: DestroyNotify,
            user_data: *mut c_void,
        ) -> *mut ViewBackendHandle,
    >,
    /// Returns the native engine view backend of the active view, or null.
    pub active_view_backend: Option<unsafe extern "C" fn(context: *mut c_void) -> *mut c_void>,
    /// Returns the active view's zoom level.
    pub zoom_level: Option<unsafe extern "C" fn(context: *mut c_void) -> f64>,
    /// Sets the active view's zoom level.
    pub set_zoom_level: Option<unsafe extern "C" fn(context: *mut c_void, level: f64)>,
    /// Navigates the active view back.
    pub go_back: Option<unsafe extern "C" fn(context: *mut c_void)>,
    /// Navigates the active view forward.
    pub go_forward: Option<unsafe extern "C" fn(context: *mut c_void)>,
    /// Quits the application.
    pub quit: Option<unsafe extern "C" fn(context: *mut c_void)>,
    /// Adds `fd` to the host event loop; `ready` is called with `user_data`
    /// whenever it becomes readable.
    pub watch_fd: Option<
        unsafe extern "C" fn(
            context: *mut c_void,
            fd: c_int,
            ready: FdReadyFn,
            user_data: *mut c_void,
        ),
    >,
}

impl ShellInterface {
    /// An interface with no services, for hosts that do not provide any.
    pub const EMPTY: Self = Self {
        context: core::ptr::null_mut(),
        wrap_view_backend: None,
        active_view_backend: None,
        zoom_level: None,
        set_zoom_level: None,
        go_back: None,
        go_forward: None,
        quit: None,
        watch_fd: None,
    };
}

impl fmt::Debug for ShellInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellInterface")
            .field("context", &self.context)
            .field("wrap_view_backend", &self.wrap_view_backend.is_some())
            .field("active_view_backend", &self.active_view_backend.is_some())
            .field("zoom_level", &self.zoom_level.is_some())
            .field("set_zoom_level", &self.set_zoom_level.is_some())
            .field("go_back", &self.go_back.is_some())
            .field("go_forward", &self.go_forward.is_some())
            .field("quit", &self.quit.is_some())
            .field("watch_fd", &self.watch_fd.is_some())
            .finish()
    }
}

macro_rules! opaque_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($ty), "@{:p}"), self)
                }
            }
        )*
    };
}

opaque_debug!(PlatformHandle, ViewHandle, ViewBackendHandle, ImContextHandle);
