// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Wayland platform plugin for the WPE shell.
//!
//! Views render through WPEBackend-fdo: the engine exports one EGL image
//! per frame, which is wrapped in a `wl_buffer` and committed to an
//! xdg-shell toplevel. Compositor input is translated into engine events
//! for the active view.
//!
//! ```text
//!  engine ──export image──► FrameExchange ──attach/damage/frame/commit──► compositor
//!    ▲                          │  ▲                                          │
//!    │ frame complete           │  └── frame done / buffer release ─────────┘
//!    └── release image ◄────────┘
//!
//!  compositor input ──► ShellInputHandler ──shortcut?──► Shell (zoom, back, quit)
//!                                     └────────────────► active ViewBackend
//! ```
//!
//! The crate builds both as a `cdylib` exporting the `cog_platform_plugin_*`
//! entry points and as an `rlib` with the same operations as Rust functions
//! ([`setup`], [`create_view_backend`], [`resume_active_views`],
//! [`teardown`]).
//!
//! The pure parts are public and usable on their own:
//!
//! - [`frame`]: the per-view frame exchange state machine.
//! - [`translate`], [`touch`] and [`shortcuts`]: input translation.
//! - [`probe`]: the memoised, lock-guarded compositor support probe.
//! - [`config`]: `key=value` backend parameters.
//!
//! libwpe, libWPEBackend-fdo and libEGL are opened at runtime. Keymaps are
//! compiled with xkbcommon.
//!
//! # Crate features
//!
//! - `device-scaling` (enabled by default): follow the scale of the output
//!   the window is on and forward it to views.
//! - `input-method`: forward input-method context creation in the loader.

#![expect(
    unsafe_code,
    reason = "the engine and EGL are called through their C ABI"
)]

mod backend;
pub mod config;
mod egl;
pub mod error;
mod event_loop;
pub mod frame;
mod plugin;
pub mod probe;
mod session;
pub mod shortcuts;
pub mod touch;
pub mod translate;
mod window;
mod wpe;
mod xkb;

pub use backend::{
    create_view_backend, dispatch, is_supported, resume_active_views, setup, teardown,
};
pub use config::FdoConfig;
pub use error::{ConfigError, FdoError, FrameError, InputError};
pub use frame::{
    BindingId, BindingStats, ExportChannel, FrameExchange, FramePhase, ImageId, PresentSurface,
    ReleaseOutcome, ReleaseToken,
};
pub use probe::SupportProbe;
pub use translate::{Host, InputHandler, ShellInputHandler};
