// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Backend contract, loader and lifecycle facade for WPE shell platform
//! plugins.
//!
//! A platform plugin is a shared library that connects the web engine's view
//! backend to some windowing system. `cog_platform` defines what such a
//! plugin exports and how the host binds and drives it:
//!
//! ```text
//!   host                                        plugin (.so)
//!   ────                                        ────────────
//!   Platform::load_first([..]) ──dlopen/dlsym──► cog_platform_plugin_*
//!       │
//!       ├─ setup(&ShellInterface, params) ─────► builds its session
//!       ├─ get_view_backend(..) ───────────────► wraps an engine backend
//!       │                       ◄── ShellInterface callbacks (zoom, quit, ..)
//!       └─ teardown() / drop ──────────────────► releases everything
//! ```
//!
//! **[`abi`]**: C types, entry-point symbol names and signatures, and the
//! [`ShellInterface`](abi::ShellInterface) table of host services.
//!
//! **[`platform`]**: [`Platform`], which binds required and optional entry
//! points and forwards calls to them.
//!
//! **[`shell`]**: [`Shell`], the application commands a plugin may issue,
//! and [`ShellRef`], its implementation over a host interface.
//!
//! **[`view`]** and **[`input`]**: the engine-facing interface a plugin
//! drives: [`ViewBackend`], activity flags and input event types.
//!
//! # Crate features
//!
//! - `input-method` (disabled by default): forward
//!   `create_input_method_context` to plugins that export it.

#![expect(
    unsafe_code,
    reason = "binding and calling C entry points of dynamically loaded plugins"
)]

pub mod abi;
pub mod cancel;
pub mod error;
pub mod input;
pub mod platform;
pub mod shell;
pub mod view;

pub use cancel::Cancellable;
pub use error::{LoadError, PlatformError, UnsupportedOperationError};
pub use platform::{EntryPoint, Platform, SymbolSource};
pub use shell::{Shell, ShellRef};
pub use view::{ActivityState, ViewBackend};
