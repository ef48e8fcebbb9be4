// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Application services reachable from a plugin.

use core::ffi::{c_int, c_void};
use core::ptr::NonNull;

use crate::abi::{DestroyNotify, FdReadyFn, ShellInterface, ViewBackendHandle};

/// Application-level commands the key-shortcut interceptor may issue.
pub trait Shell {
    /// Zoom level of the active view.
    fn zoom_level(&self) -> f64;
    /// Sets the zoom level of the active view.
    fn set_zoom_level(&self, level: f64);
    /// Navigates the active view back in its history.
    fn go_back(&self);
    /// Navigates the active view forward in its history.
    fn go_forward(&self);
    /// Asks the application to quit.
    fn quit(&self);
}

/// Safe handle over a host-provided [`ShellInterface`].
///
/// Missing slots make the corresponding call a no-op (or return a neutral
/// value).
#[derive(Clone, Copy, Debug)]
pub struct ShellRef {
    interface: ShellInterface,
}

impl ShellRef {
    /// Wraps a copy of `interface`.
    ///
    /// # Safety
    ///
    /// Every non-null slot must be callable with `interface.context` for as
    /// long as the returned value (or a copy of it) is used, and only from
    /// the thread running the host event loop.
    #[must_use]
    pub unsafe fn new(interface: &ShellInterface) -> Self {
        Self {
            interface: *interface,
        }
    }

    /// The raw interface.
    #[must_use]
    pub fn interface(&self) -> &ShellInterface {
        &self.interface
    }

    /// Native engine view backend of the active view, if there is one.
    #[must_use]
    pub fn active_view_backend(&self) -> Option<NonNull<c_void>> {
        let f = self.interface.active_view_backend?;
        // SAFETY: guaranteed by the contract of `ShellRef::new`.
        NonNull::new(unsafe { f(self.interface.context) })
    }

    /// Wraps `native` into the object the web view consumes.
    ///
    /// Returns `None` if the host cannot wrap backends or declines. In that
    /// case `destroy` has not been called and `user_data` is still owned by
    /// the caller.
    ///
    /// # Safety
    ///
    /// `native` must be a live engine view backend, and `destroy` must be
    /// safe to call exactly once with `user_data`.
    #[must_use]
    pub unsafe fn wrap_view_backend(
        &self,
        native: NonNull<c_void>,
        destroy: DestroyNotify,
        user_data: *mut c_void,
    ) -> Option<NonNull<ViewBackendHandle>> {
        let f = self.interface.wrap_view_backend?;
        // SAFETY: slot validity per `ShellRef::new`; arguments per this
        // function's contract.
        NonNull::new(unsafe { f(self.interface.context, native.as_ptr(), destroy, user_data) })
    }

    /// Registers `fd` with the host event loop. Returns `false` if the host
    /// offers no fd watching.
    ///
    /// # Safety
    ///
    /// `ready` must be safe to call with `user_data` whenever `fd` becomes
    /// readable until it returns `false`.
    pub unsafe fn watch_fd(&self, fd: c_int, ready: FdReadyFn, user_data: *mut c_void) -> bool {
        let Some(f) = self.interface.watch_fd else {
            return false;
        };
        // SAFETY: slot validity per `ShellRef::new`; callback per this
        // function's contract.
        unsafe { f(self.interface.context, fd, ready, user_data) };
        true
    }
}

impl Shell for ShellRef {
    fn zoom_level(&self) -> f64 {
        match self.interface.zoom_level {
            // SAFETY: guaranteed by the contract of `ShellRef::new`.
            Some(f) => unsafe { f(self.interface.context) },
            None => 1.0,
        }
    }

    fn set_zoom_level(&self, level: f64) {
        if let Some(f) = self.interface.set_zoom_level {
            // SAFETY: guaranteed by the contract of `ShellRef::new`.
            unsafe { f(self.interface.context, level) };
        }
    }

    fn go_back(&self) {
        if let Some(f) = self.interface.go_back {
            // SAFETY: guaranteed by the contract of `ShellRef::new`.
            unsafe { f(self.interface.context) };
        }
    }

    fn go_forward(&self) {
        if let Some(f) = self.interface.go_forward {
            // SAFETY: guaranteed by the contract of `ShellRef::new`.
            unsafe { f(self.interface.context) };
        }
    }

    fn quit(&self) {
        if let Some(f) = self.interface.quit {
            // SAFETY: guaranteed by the contract of `ShellRef::new`.
            unsafe { f(self.interface.context) };
        }
    }
}
