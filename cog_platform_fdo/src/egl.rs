// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! EGL display for the compositor connection and the image → buffer interop.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::sync::OnceLock;

use khronos_egl as egl;
use wayland_sys::client::{wl_display, wl_proxy};

use crate::error::FdoError;

/// `eglCreateWaylandBufferFromImageWL`
type CreateWaylandBufferFromImageWl =
    unsafe extern "C" fn(display: egl::EGLDisplay, image: egl::EGLImage) -> *mut wl_proxy;

/// Resolved once per process.
static CREATE_BUFFER_FROM_IMAGE: OnceLock<Option<CreateWaylandBufferFromImageWl>> = OnceLock::new();

/// An initialised EGL display on top of the compositor connection.
pub(crate) struct EglContext {
    instance: egl::DynamicInstance<egl::EGL1_4>,
    display: egl::Display,
}

impl core::fmt::Debug for EglContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EglContext")
            .field("display", &self.display.as_ptr())
            .finish_non_exhaustive()
    }
}

impl EglContext {
    /// Loads libEGL and initialises a display for `wl_display`.
    ///
    /// # Safety
    ///
    /// `wl_display` must be the live display of the compositor connection
    /// and outlive the returned context.
    pub(crate) unsafe fn new(wl_display: *mut wl_display) -> Result<Self, FdoError> {
        // SAFETY: loading the system libEGL.
        let instance = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }
            .map_err(|err| {
                log::debug!("libEGL: {err:?}");
                FdoError::Egl {
                    context: "cannot load libEGL",
                    source: None,
                }
            })?;

        // SAFETY: forwarded from the caller.
        let display = unsafe { instance.get_display(wl_display.cast::<c_void>()) }.ok_or(
            FdoError::Egl {
                context: "no EGL display for the compositor connection",
                source: None,
            },
        )?;

        let (major, minor) = instance.initialize(display).map_err(|source| FdoError::Egl {
            context: "eglInitialize",
            source: Some(source),
        })?;
        log::debug!("EGL {major}.{minor} initialised");

        let context = Self { instance, display };
        if context.create_buffer_fn().is_none() {
            return Err(FdoError::Egl {
                context: "eglCreateWaylandBufferFromImageWL unavailable",
                source: None,
            });
        }
        Ok(context)
    }

    /// Raw `EGLDisplay`.
    pub(crate) fn display_ptr(&self) -> *mut c_void {
        self.display.as_ptr()
    }

    fn create_buffer_fn(&self) -> Option<CreateWaylandBufferFromImageWl> {
        *CREATE_BUFFER_FROM_IMAGE.get_or_init(|| {
            let address = self.instance.get_proc_address("eglCreateWaylandBufferFromImageWL")?;
            // SAFETY: the extension's documented signature.
            Some(unsafe {
                core::mem::transmute::<extern "system" fn(), CreateWaylandBufferFromImageWl>(
                    address,
                )
            })
        })
    }

    /// Creates a `wl_buffer` proxy showing `image`.
    ///
    /// # Safety
    ///
    /// `image` must be a live `EGLImage` of this display.
    pub(crate) unsafe fn create_wayland_buffer(
        &self,
        image: *mut c_void,
    ) -> Option<NonNull<wl_proxy>> {
        let create = self.create_buffer_fn()?;
        // SAFETY: display initialised; `image` per the caller.
        NonNull::new(unsafe { create(self.display.as_ptr(), image) })
    }
}

impl Drop for EglContext {
    fn drop(&mut self) {
        if let Err(err) = self.instance.terminate(self.display) {
            log::warn!("eglTerminate failed: {err}");
        }
    }
}
