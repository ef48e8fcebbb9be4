// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Error types of the Wayland platform plugin.

use cog_platform::UnsupportedOperationError;

use crate::frame::BindingId;

/// Failure to initialise or drive the backend session.
#[derive(Debug, thiserror::Error)]
pub enum FdoError {
    /// No compositor connection could be established.
    #[error("cannot connect to the Wayland compositor")]
    Connect(#[source] wayland_client::ConnectError),
    /// The initial registry roundtrip failed.
    #[error("cannot enumerate compositor globals")]
    Globals(#[source] wayland_client::globals::GlobalError),
    /// A global required by the backend is not advertised.
    #[error("compositor lacks required global `{interface}`")]
    MissingGlobal {
        /// Interface name of the missing global.
        interface: &'static str,
    },
    /// A runtime library (engine, keymap) could not be loaded.
    #[error("cannot load `{library}`")]
    EngineLoad {
        /// Name of the library.
        library: &'static str,
        /// Loader diagnostic.
        #[source]
        source: libloading::Error,
    },
    /// The engine refused to initialise its backend.
    #[error("engine initialisation failed: {0}")]
    EngineInit(&'static str),
    /// An EGL call failed.
    #[error("EGL: {context}")]
    Egl {
        /// What was being attempted.
        context: &'static str,
        /// EGL error code, when one was reported.
        #[source]
        source: Option<khronos_egl::Error>,
    },
    /// Input devices or the keymap could not be set up.
    #[error("input setup failed: {0}")]
    Input(String),
    /// The `params` string is malformed.
    #[error("invalid backend parameters")]
    Config(#[from] ConfigError),
    /// The caller asked for something this backend cannot do.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),
    /// An operation that needs a set-up session was called without one.
    #[error("backend is not initialised")]
    NotInitialized,
    /// The backend was entered again from one of its own callbacks.
    #[error("backend re-entered while busy")]
    Reentrant,
    /// Creating or driving a view binding failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// Reading from or writing to the compositor socket failed.
    #[error("compositor connection failed")]
    Protocol(#[from] wayland_client::backend::WaylandError),
    /// Dispatching compositor events failed.
    #[error("cannot dispatch compositor events")]
    Dispatch(#[from] wayland_client::DispatchError),
}

/// Failure in the frame exchange of one view.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The engine could not create the export channel.
    #[error("cannot create export channel")]
    ExportChannel,
    /// The export channel has no engine view backend.
    #[error("export channel has no view backend")]
    ViewBackend,
    /// The host could not wrap the view backend.
    #[error("host failed to wrap the view backend")]
    Wrapper,
    /// No compositor buffer could be created for an exported image.
    #[error("cannot create compositor buffer for exported image")]
    BufferCreation,
    /// The binding was removed or never existed.
    #[error("unknown view binding {0:?}")]
    UnknownBinding(BindingId),
}

/// Failure translating an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// The compositor reported a touch id outside the tracked range.
    #[error("touch id {id} outside 0..{capacity}")]
    TouchIdOutOfRange {
        /// The offending id.
        id: i32,
        /// Number of tracked slots.
        capacity: usize,
    },
}

/// Malformed `key=value` backend parameters.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric option did not parse.
    #[error("`{key}` expects a positive integer, got `{value}`")]
    InvalidNumber {
        /// Option name.
        key: String,
        /// Offending value.
        value: String,
    },
}
