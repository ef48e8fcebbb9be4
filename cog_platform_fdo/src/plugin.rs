// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! C entry points the host resolves from the shared library.
//!
//! `init_web_view`, `resize` and `create_im_context` are not exported: the
//! window follows compositor configures, and views need no extra setup.

#![allow(unreachable_pub, reason = "exported by symbol name, not by path")]

use core::ffi::{CStr, c_char};
use core::ptr;

use cog_platform::ShellRef;
use cog_platform::abi::{
    GetViewBackendFn, PlatformHandle, ResumeActiveViewsFn, SetupFn, ShellInterface, TeardownFn,
    ViewBackendHandle, ViewHandle,
};

use crate::backend;

const _: SetupFn = cog_platform_plugin_setup;
const _: TeardownFn = cog_platform_plugin_teardown;
const _: GetViewBackendFn = cog_platform_plugin_get_view_backend;
const _: ResumeActiveViewsFn = cog_platform_plugin_resume_active_views;

/// # Safety
///
/// `shell` must be null or point to an interface valid for the lifetime of
/// the session; `params` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cog_platform_plugin_setup(
    _platform: *mut PlatformHandle,
    shell: *const ShellInterface,
    params: *const c_char,
) -> bool {
    // SAFETY: per this function's contract.
    let interface = unsafe { shell.as_ref() }.unwrap_or(&ShellInterface::EMPTY);
    // SAFETY: the host keeps its services callable until teardown.
    let shell = unsafe { ShellRef::new(interface) };
    let params = if params.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per this function's contract.
        match unsafe { CStr::from_ptr(params) }.to_str() {
            Ok(params) => Some(params),
            Err(err) => {
                log::error!("backend parameters are not UTF-8: {err}");
                return false;
            }
        }
    };

    match backend::setup(shell, params, None) {
        Ok(()) => true,
        Err(err) => {
            log::error!("cannot set up the Wayland platform: {err}");
            false
        }
    }
}

/// # Safety
///
/// Must be called on the thread that called setup.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cog_platform_plugin_teardown(_platform: *mut PlatformHandle) {
    backend::teardown();
}

/// # Safety
///
/// Must be called on the thread that called setup.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cog_platform_plugin_get_view_backend(
    _platform: *mut PlatformHandle,
    _related_view: *mut ViewHandle,
) -> *mut ViewBackendHandle {
    match backend::create_view_backend() {
        Ok(handle) => handle.as_ptr(),
        Err(err) => {
            log::error!("cannot create a view backend: {err}");
            ptr::null_mut()
        }
    }
}

/// # Safety
///
/// Must be called on the thread that called setup.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cog_platform_plugin_resume_active_views(_platform: *mut PlatformHandle) {
    match backend::resume_active_views() {
        Ok(count) => log::debug!("resumed {count} view(s)"),
        Err(err) => log::warn!("cannot resume views: {err}"),
    }
}
