// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Error types for loading and driving platform plugins.

use std::ffi::CStr;

/// Failure to bind a platform plugin.
///
/// Recoverable: the host is expected to move on to the next candidate.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The shared library could not be opened.
    #[error("cannot open platform module `{soname}`")]
    Open {
        /// Name passed to the loader.
        soname: String,
        /// Loader diagnostic.
        #[source]
        source: libloading::Error,
    },
    /// The module does not export one of the mandatory entry points.
    #[error("platform module lacks required entry point `{}`", symbol.to_string_lossy())]
    MissingRequiredEntryPoint {
        /// The missing symbol.
        symbol: &'static CStr,
    },
    /// None of the candidates passed to
    /// [`Platform::load_first`](crate::platform::Platform::load_first) could
    /// be bound.
    #[error("no usable platform module among {tried} candidate(s)")]
    NoCandidate {
        /// Number of candidates tried.
        tried: usize,
        /// Error of the last candidate, if any was tried.
        #[source]
        last: Option<Box<LoadError>>,
    },
}

/// Failure reported through the lifecycle facade.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The handle has not been bound to a module.
    #[error("platform module not loaded")]
    NotLoaded,
    /// The plugin's setup entry point reported failure.
    #[error("platform setup failed")]
    SetupFailed,
    /// The plugin did not produce a view backend.
    #[error("platform could not create a view backend")]
    NoViewBackend,
    /// A parameter string contained an interior NUL byte.
    #[error("platform parameters contain an interior NUL byte")]
    InvalidParams(#[from] std::ffi::NulError),
}

/// Returned when an operation does not support the requested mode, such as
/// cancelling an uninterruptible initialisation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{operation} does not support cancellation")]
pub struct UnsupportedOperationError {
    /// The operation that was asked to do something it cannot.
    pub operation: &'static str,
}
