// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Dynamic backend binding and the lifecycle facade over it.
//!
//! A [`Platform`] starts out empty, is bound exactly once to a module
//! exporting the entry points listed in [`abi`](crate::abi), and is then
//! driven through its forwarding methods:
//!
//! ```text
//!   Platform::new()
//!       │ try_load(soname) / bind_from(source)
//!       ▼
//!   bound ──► setup(shell, params) ──► get_view_backend(..) ──► ... ──► teardown()
//!       │
//!       ▼ drop / close()
//!   library closed
//! ```
//!
//! Required entry points (`setup`, `teardown`, `get_view_backend`) must all
//! resolve or binding fails and the module is released again. Optional ones
//! are recorded as an [`EntryPoint`] and silently skipped when absent.

use core::ffi::c_void;
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};
use std::ffi::{CStr, CString, OsStr};

use crate::abi::{
    CREATE_IM_CONTEXT_SYMBOL, CreateImContextFn, GET_VIEW_BACKEND_SYMBOL, GetViewBackendFn,
    INIT_VIEW_SYMBOL, ImContextHandle, InitViewFn, PlatformHandle, RESIZE_SYMBOL,
    RESUME_ACTIVE_VIEWS_SYMBOL, ResizeFn, ResumeActiveViewsFn, SETUP_SYMBOL, SetupFn,
    ShellInterface, TEARDOWN_SYMBOL, TeardownFn, ViewBackendHandle, ViewHandle,
};
use crate::error::{LoadError, PlatformError};

/// Something entry points can be resolved from.
///
/// Implemented for [`libloading::Library`]; statically linked backends and
/// tests can provide their own table.
pub trait SymbolSource {
    /// Returns the address exported under `name`, if any.
    fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>>;
}

impl SymbolSource for libloading::Library {
    fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: reading a symbol as a plain address has no preconditions;
        // giving it a function type is covered by `Platform::bind_from`.
        let address = unsafe { self.get::<*mut c_void>(name.to_bytes_with_nul()) }.ok()?;
        NonNull::new(*address)
    }
}

/// An optional entry point.
#[derive(Clone, Copy, Debug)]
pub enum EntryPoint<F> {
    /// The module exports it.
    Present(F),
    /// The module does not export it.
    Absent,
    /// The capability is compiled out of this build, whatever the module
    /// exports.
    Unsupported,
}

impl<F: Copy> EntryPoint<F> {
    /// Returns the function if present.
    #[must_use]
    pub fn get(&self) -> Option<F> {
        match self {
            Self::Present(f) => Some(*f),
            Self::Absent | Self::Unsupported => None,
        }
    }

    /// Returns `true` if calls will be forwarded.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

#[derive(Clone, Copy, Debug)]
struct EntryPoints {
    setup: SetupFn,
    teardown: TeardownFn,
    get_view_backend: GetViewBackendFn,
    init_view: EntryPoint<InitViewFn>,
    resize: EntryPoint<ResizeFn>,
    create_im_context: EntryPoint<CreateImContextFn>,
    resume_active_views: EntryPoint<ResumeActiveViewsFn>,
}

impl EntryPoints {
    /// # Safety
    ///
    /// Every symbol `source` exports under a contract name must have the
    /// signature [`abi`](crate::abi) assigns to it.
    unsafe fn resolve(source: &dyn SymbolSource) -> Result<Self, LoadError> {
        let required = |symbol: &'static CStr| {
            source
                .symbol(symbol)
                .map(NonNull::as_ptr)
                .ok_or(LoadError::MissingRequiredEntryPoint { symbol })
        };
        let optional = |symbol: &'static CStr| source.symbol(symbol).map(NonNull::as_ptr);

        let setup = required(SETUP_SYMBOL)?;
        let teardown = required(TEARDOWN_SYMBOL)?;
        let get_view_backend = required(GET_VIEW_BACKEND_SYMBOL)?;

        // SAFETY (all transmutes below): guaranteed by the caller; the
        // addresses are non-null function entry points of these types.
        let init_view = match optional(INIT_VIEW_SYMBOL) {
            Some(f) => EntryPoint::Present(unsafe { mem::transmute::<*mut c_void, InitViewFn>(f) }),
            None => EntryPoint::Absent,
        };
        let resize = match optional(RESIZE_SYMBOL) {
            Some(f) => EntryPoint::Present(unsafe { mem::transmute::<*mut c_void, ResizeFn>(f) }),
            None => EntryPoint::Absent,
        };
        let create_im_context = if cfg!(feature = "input-method") {
            match optional(CREATE_IM_CONTEXT_SYMBOL) {
                Some(f) => EntryPoint::Present(unsafe {
                    mem::transmute::<*mut c_void, CreateImContextFn>(f)
                }),
                None => EntryPoint::Absent,
            }
        } else {
            EntryPoint::Unsupported
        };
        let resume_active_views = match optional(RESUME_ACTIVE_VIEWS_SYMBOL) {
            Some(f) => EntryPoint::Present(unsafe {
                mem::transmute::<*mut c_void, ResumeActiveViewsFn>(f)
            }),
            None => EntryPoint::Absent,
        };

        Ok(Self {
            setup: unsafe { mem::transmute::<*mut c_void, SetupFn>(setup) },
            teardown: unsafe { mem::transmute::<*mut c_void, TeardownFn>(teardown) },
            get_view_backend: unsafe {
                mem::transmute::<*mut c_void, GetViewBackendFn>(get_view_backend)
            },
            init_view,
            resize,
            create_im_context,
            resume_active_views,
        })
    }
}

/// A platform plugin bound through its C entry points.
///
/// Owns the module it was bound from; dropping the `Platform` tears the
/// plugin down (if it was set up) and closes the module.
pub struct Platform {
    module: Option<Box<dyn SymbolSource>>,
    name: Option<String>,
    entries: Option<EntryPoints>,
    set_up: bool,
    torn_down: bool,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("set_up", &self.set_up)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform {
    /// Creates an unbound platform.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            module: None,
            name: None,
            entries: None,
            set_up: false,
            torn_down: false,
        }
    }

    /// Opens `soname` and binds it.
    ///
    /// # Errors
    ///
    /// See [`try_load`](Self::try_load).
    pub fn load(soname: impl AsRef<OsStr>) -> Result<Self, LoadError> {
        let mut platform = Self::new();
        platform.try_load(soname)?;
        Ok(platform)
    }

    /// Tries each candidate in order and returns the first that binds.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoCandidate`] carrying the last failure when no
    /// candidate could be bound.
    pub fn load_first<I>(candidates: I) -> Result<Self, LoadError>
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let mut tried = 0;
        let mut last = None;
        for soname in candidates {
            tried += 1;
            match Self::load(soname.as_ref()) {
                Ok(platform) => return Ok(platform),
                Err(err) => {
                    log::debug!("skipping platform candidate: {err}");
                    last = Some(Box::new(err));
                }
            }
        }
        Err(LoadError::NoCandidate { tried, last })
    }

    /// Opens the shared library `soname` and binds its entry points.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Open`] if the library cannot be opened and
    /// [`LoadError::MissingRequiredEntryPoint`] if it lacks a mandatory
    /// symbol; in the latter case the library is closed again.
    ///
    /// # Panics
    ///
    /// Panics if the platform is already bound.
    pub fn try_load(&mut self, soname: impl AsRef<OsStr>) -> Result<(), LoadError> {
        let soname = soname.as_ref();
        assert!(self.module.is_none(), "platform is already bound");

        // SAFETY: running a library's initialisers is inherent to loading a
        // plugin; the host only passes names of platform modules.
        let library = unsafe { libloading::Library::new(soname) }.map_err(|source| {
            LoadError::Open {
                soname: soname.to_string_lossy().into_owned(),
                source,
            }
        })?;
        // SAFETY: modules exporting the contract symbol names implement the
        // contract signatures.
        unsafe { self.bind_from(library) }?;
        self.name = Some(soname.to_string_lossy().into_owned());
        Ok(())
    }

    /// Binds the entry points exported by `source`.
    ///
    /// On failure `source` is dropped before returning, so a second attempt
    /// on another source starts from a clean, unbound handle.
    ///
    /// # Safety
    ///
    /// Every contract symbol exported by `source` must have the signature
    /// declared in [`abi`](crate::abi) and remain valid while `source` is
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingRequiredEntryPoint`] if a mandatory symbol
    /// is absent.
    ///
    /// # Panics
    ///
    /// Panics if the platform is already bound.
    pub unsafe fn bind_from(
        &mut self,
        source: impl SymbolSource + 'static,
    ) -> Result<(), LoadError> {
        assert!(self.module.is_none(), "platform is already bound");

        // SAFETY: forwarded from the caller.
        match unsafe { EntryPoints::resolve(&source) } {
            Ok(entries) => {
                log::debug!(
                    "bound platform module (init_view: {}, resize: {}, im: {}, resume: {})",
                    entries.init_view.is_present(),
                    entries.resize.is_present(),
                    entries.create_im_context.is_present(),
                    entries.resume_active_views.is_present(),
                );
                self.entries = Some(entries);
                self.module = Some(Box::new(source));
                self.set_up = false;
                self.torn_down = false;
                Ok(())
            }
            Err(err) => {
                drop(source);
                Err(err)
            }
        }
    }

    /// Returns `true` once bound.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Name of the module this platform was loaded from, if loaded by name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Tears the plugin down if needed and closes the module.
    ///
    /// Calling this on a closed or never-bound platform does nothing.
    pub fn close(&mut self) {
        if self.set_up && !self.torn_down {
            self.teardown();
        }
        self.entries = None;
        self.name = None;
        if self.module.take().is_some() {
            log::debug!("closed platform module");
        }
    }

    fn handle(&mut self) -> *mut PlatformHandle {
        ptr::from_mut(self).cast()
    }

    fn entries(&self, operation: &str) -> Option<EntryPoints> {
        if self.entries.is_none() {
            log::error!("{operation}: platform module not loaded");
        }
        self.entries
    }

    /// Initialises the plugin with the host's `shell` services.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotLoaded`] on an unbound platform,
    /// [`PlatformError::InvalidParams`] if `params` contains a NUL byte and
    /// [`PlatformError::SetupFailed`] if the plugin reports failure.
    pub fn setup(
        &mut self,
        shell: &ShellInterface,
        params: Option<&str>,
    ) -> Result<(), PlatformError> {
        let entries = self.entries("setup").ok_or(PlatformError::NotLoaded)?;
        let params = params.map(CString::new).transpose()?;
        let params_ptr = params.as_ref().map_or(ptr::null(), |p| p.as_ptr());
        let handle = self.handle();

        // SAFETY: the entry point matches `SetupFn`; `shell` and `params`
        // outlive the call.
        if unsafe { (entries.setup)(handle, shell, params_ptr) } {
            self.set_up = true;
            self.torn_down = false;
            Ok(())
        } else {
            Err(PlatformError::SetupFailed)
        }
    }

    /// Tears the plugin down.
    ///
    /// Only the first call after a successful bind is forwarded; later calls
    /// are no-ops.
    pub fn teardown(&mut self) {
        let Some(entries) = self.entries("teardown") else {
            return;
        };
        if self.torn_down {
            log::debug!("platform already torn down");
            return;
        }
        self.torn_down = true;
        self.set_up = false;
        let handle = self.handle();
        // SAFETY: the entry point matches `TeardownFn`.
        unsafe { (entries.teardown)(handle) };
    }

    /// Asks the plugin for a new view backend.
    ///
    /// `related_view` is an existing view to share rendering context with.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotLoaded`] on an unbound platform and
    /// [`PlatformError::NoViewBackend`] if the plugin returns nothing.
    pub fn get_view_backend(
        &mut self,
        related_view: Option<NonNull<ViewHandle>>,
    ) -> Result<NonNull<ViewBackendHandle>, PlatformError> {
        let entries = self
            .entries("get_view_backend")
            .ok_or(PlatformError::NotLoaded)?;
        let handle = self.handle();
        let related = related_view.map_or(ptr::null_mut(), NonNull::as_ptr);
        // SAFETY: the entry point matches `GetViewBackendFn`.
        let backend = unsafe { (entries.get_view_backend)(handle, related) };
        NonNull::new(backend).ok_or(PlatformError::NoViewBackend)
    }

    /// Lets the plugin customise `view`, if it supports doing so.
    pub fn init_view(&mut self, view: NonNull<ViewHandle>) {
        let Some(entries) = self.entries("init_view") else {
            return;
        };
        if let Some(init_view) = entries.init_view.get() {
            let handle = self.handle();
            // SAFETY: the entry point matches `InitViewFn`.
            unsafe { init_view(handle, view.as_ptr()) };
        }
    }

    /// Forwards a backend-defined resize request, if supported.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidParams`] if `params` contains a NUL
    /// byte.
    pub fn resize(&mut self, params: &str) -> Result<(), PlatformError> {
        let Some(entries) = self.entries("resize") else {
            return Ok(());
        };
        if let Some(resize) = entries.resize.get() {
            let params = CString::new(params)?;
            let handle = self.handle();
            // SAFETY: the entry point matches `ResizeFn`; `params` outlives
            // the call.
            unsafe { resize(handle, params.as_ptr()) };
        }
        Ok(())
    }

    /// Creates an input-method context.
    ///
    /// Returns `None` when the plugin lacks the entry point, when the
    /// `input-method` feature is disabled, or when the plugin declines.
    pub fn create_input_method_context(&mut self) -> Option<NonNull<ImContextHandle>> {
        let entries = self.entries("create_input_method_context")?;
        let create = entries.create_im_context.get()?;
        let handle = self.handle();
        // SAFETY: the entry point matches `CreateImContextFn`.
        NonNull::new(unsafe { create(handle) })
    }

    /// Restarts frame pacing for views that became active again, if the
    /// plugin supports it.
    pub fn resume_active_views(&mut self) {
        let Some(entries) = self.entries("resume_active_views") else {
            return;
        };
        if let Some(resume) = entries.resume_active_views.get() {
            let handle = self.handle();
            // SAFETY: the entry point matches `ResumeActiveViewsFn`.
            unsafe { resume(handle) };
        }
    }

    /// Returns how `create_input_method_context` will behave.
    #[must_use]
    pub fn input_method_support(&self) -> EntryPoint<()> {
        match self.entries.map(|e| e.create_im_context) {
            Some(EntryPoint::Present(_)) => EntryPoint::Present(()),
            Some(EntryPoint::Unsupported) => EntryPoint::Unsupported,
            Some(EntryPoint::Absent) | None => EntryPoint::Absent,
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryPoint, Platform, SymbolSource};
    use crate::abi::{
        GET_VIEW_BACKEND_SYMBOL, ImContextHandle, PlatformHandle, RESIZE_SYMBOL,
        RESUME_ACTIVE_VIEWS_SYMBOL, SETUP_SYMBOL, ShellInterface, TEARDOWN_SYMBOL,
        ViewBackendHandle, ViewHandle,
    };
    use crate::error::{LoadError, PlatformError};
    use core::ffi::{CStr, c_char, c_void};
    use core::ptr::{self, NonNull};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    thread_local! {
        static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record(call: impl Into<String>) {
        CALLS.with_borrow_mut(|calls| calls.push(call.into()));
    }

    fn calls() -> Vec<String> {
        CALLS.with_borrow(Clone::clone)
    }

    unsafe extern "C" fn fake_setup(
        _platform: *mut PlatformHandle,
        _shell: *const ShellInterface,
        params: *const c_char,
    ) -> bool {
        if params.is_null() {
            record("setup");
            return true;
        }
        // SAFETY: the facade passes a NUL-terminated string.
        let params = unsafe { CStr::from_ptr(params) }.to_string_lossy().into_owned();
        record(format!("setup:{params}"));
        params != "fail"
    }

    unsafe extern "C" fn fake_teardown(_platform: *mut PlatformHandle) {
        record("teardown");
    }

    static BACKEND_SENTINEL: u8 = 0;

    unsafe extern "C" fn fake_get_view_backend(
        _platform: *mut PlatformHandle,
        related: *mut ViewHandle,
    ) -> *mut ViewBackendHandle {
        record(format!("get_view_backend:{}", related.is_null()));
        ptr::from_ref(&BACKEND_SENTINEL).cast_mut().cast()
    }

    unsafe extern "C" fn null_get_view_backend(
        _platform: *mut PlatformHandle,
        _related: *mut ViewHandle,
    ) -> *mut ViewBackendHandle {
        ptr::null_mut()
    }

    unsafe extern "C" fn fake_resize(_platform: *mut PlatformHandle, params: *const c_char) {
        // SAFETY: the facade passes a NUL-terminated string.
        let params = unsafe { CStr::from_ptr(params) }.to_string_lossy().into_owned();
        record(format!("resize:{params}"));
    }

    unsafe extern "C" fn fake_resume(_platform: *mut PlatformHandle) {
        record("resume");
    }

    struct FakeModule {
        symbols: Vec<(&'static CStr, *mut c_void)>,
        dropped: Rc<Cell<bool>>,
    }

    impl FakeModule {
        fn new(dropped: &Rc<Cell<bool>>) -> Self {
            Self {
                symbols: Vec::new(),
                dropped: Rc::clone(dropped),
            }
        }

        fn with(mut self, name: &'static CStr, address: *mut c_void) -> Self {
            self.symbols.push((name, address));
            self
        }

        fn complete(dropped: &Rc<Cell<bool>>) -> Self {
            Self::new(dropped)
                .with(SETUP_SYMBOL, fake_setup as *mut c_void)
                .with(TEARDOWN_SYMBOL, fake_teardown as *mut c_void)
                .with(GET_VIEW_BACKEND_SYMBOL, fake_get_view_backend as *mut c_void)
        }
    }

    impl SymbolSource for FakeModule {
        fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
            self.symbols
                .iter()
                .find(|(symbol, _)| *symbol == name)
                .and_then(|(_, address)| NonNull::new(*address))
        }
    }

    impl Drop for FakeModule {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    fn bound_platform(module: FakeModule) -> Platform {
        let mut platform = Platform::new();
        // SAFETY: the fake symbols have the contract signatures.
        unsafe { platform.bind_from(module) }.expect("fake module binds");
        platform
    }

    #[test]
    fn missing_required_entry_point_releases_module() {
        let dropped = Rc::new(Cell::new(false));
        let module = FakeModule::new(&dropped)
            .with(SETUP_SYMBOL, fake_setup as *mut c_void)
            .with(GET_VIEW_BACKEND_SYMBOL, fake_get_view_backend as *mut c_void);

        let mut platform = Platform::new();
        // SAFETY: the fake symbols have the contract signatures.
        let err = unsafe { platform.bind_from(module) }.unwrap_err();

        assert!(
            matches!(
                err,
                LoadError::MissingRequiredEntryPoint { symbol } if symbol == TEARDOWN_SYMBOL
            ),
            "unexpected error: {err:?}"
        );
        assert!(dropped.get(), "failed bind must release the module");
        assert!(!platform.is_loaded());

        let second = Rc::new(Cell::new(false));
        // SAFETY: the fake symbols have the contract signatures.
        unsafe { platform.bind_from(FakeModule::complete(&second)) }
            .expect("a valid module binds after a failed attempt");
        assert!(platform.is_loaded());
        assert!(!second.get());
    }

    #[test]
    fn each_required_entry_point_is_mandatory() {
        for missing in [SETUP_SYMBOL, TEARDOWN_SYMBOL, GET_VIEW_BACKEND_SYMBOL] {
            let dropped = Rc::new(Cell::new(false));
            let mut module = FakeModule::complete(&dropped);
            module.symbols.retain(|(name, _)| *name != missing);

            let mut platform = Platform::new();
            // SAFETY: the fake symbols have the contract signatures.
            let err = unsafe { platform.bind_from(module) }.unwrap_err();
            assert!(
                matches!(err, LoadError::MissingRequiredEntryPoint { symbol } if symbol == missing),
                "expected {missing:?} to be reported, got {err:?}"
            );
            assert!(dropped.get(), "module must be released");
        }
    }

    #[test]
    #[should_panic(expected = "platform is already bound")]
    fn rebinding_is_a_programming_error() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));
        // SAFETY: the fake symbols have the contract signatures.
        let _ = unsafe { platform.bind_from(FakeModule::complete(&dropped)) };
    }

    #[test]
    fn teardown_is_forwarded_once() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        platform
            .setup(&ShellInterface::EMPTY, Some("width=640"))
            .expect("setup succeeds");
        platform.teardown();
        platform.teardown();

        assert_eq!(calls(), ["setup:width=640", "teardown"]);
    }

    #[test]
    fn drop_tears_down_and_closes() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));
        platform.setup(&ShellInterface::EMPTY, None).expect("setup succeeds");

        drop(platform);

        assert_eq!(calls(), ["setup", "teardown"]);
        assert!(dropped.get(), "module closed on drop");
    }

    #[test]
    fn close_is_idempotent() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        platform.close();
        assert!(dropped.get());
        platform.close();
        assert!(!platform.is_loaded());
        assert!(calls().is_empty(), "never set up, so no teardown");
    }

    #[test]
    fn setup_failure_is_reported() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        let err = platform
            .setup(&ShellInterface::EMPTY, Some("fail"))
            .unwrap_err();
        assert!(matches!(err, PlatformError::SetupFailed));
    }

    #[test]
    fn setup_rejects_interior_nul() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        let err = platform
            .setup(&ShellInterface::EMPTY, Some("a\0b"))
            .unwrap_err();
        assert!(matches!(err, PlatformError::InvalidParams(_)));
        assert!(calls().is_empty());
    }

    #[test]
    fn get_view_backend_forwards_related_view() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        let backend = platform.get_view_backend(None).expect("backend created");
        assert_eq!(
            backend.as_ptr().cast::<u8>().cast_const(),
            ptr::from_ref(&BACKEND_SENTINEL)
        );

        let mut view_storage = 0_u8;
        let view = NonNull::from(&mut view_storage).cast::<ViewHandle>();
        platform.get_view_backend(Some(view)).expect("backend created");

        assert_eq!(calls(), ["get_view_backend:true", "get_view_backend:false"]);
    }

    #[test]
    fn null_view_backend_is_an_error() {
        let dropped = Rc::new(Cell::new(false));
        let module = FakeModule::new(&dropped)
            .with(SETUP_SYMBOL, fake_setup as *mut c_void)
            .with(TEARDOWN_SYMBOL, fake_teardown as *mut c_void)
            .with(GET_VIEW_BACKEND_SYMBOL, null_get_view_backend as *mut c_void);
        let mut platform = bound_platform(module);

        assert!(matches!(
            platform.get_view_backend(None),
            Err(PlatformError::NoViewBackend)
        ));
    }

    #[test]
    fn absent_optional_entry_points_are_no_ops() {
        let dropped = Rc::new(Cell::new(false));
        let mut platform = bound_platform(FakeModule::complete(&dropped));

        let mut view_storage = 0_u8;
        platform.init_view(NonNull::from(&mut view_storage).cast());
        platform.resize("800x600").expect("absent resize is fine");
        platform.resume_active_views();
        let im: Option<NonNull<ImContextHandle>> = platform.create_input_method_context();

        assert!(im.is_none());
        assert!(calls().is_empty());
    }

    #[test]
    fn present_optional_entry_points_are_forwarded() {
        let dropped = Rc::new(Cell::new(false));
        let module = FakeModule::complete(&dropped)
            .with(RESIZE_SYMBOL, fake_resize as *mut c_void)
            .with(RESUME_ACTIVE_VIEWS_SYMBOL, fake_resume as *mut c_void);
        let mut platform = bound_platform(module);

        platform.resize("800x600").expect("resize forwarded");
        platform.resume_active_views();

        assert_eq!(calls(), ["resize:800x600", "resume"]);
    }

    #[test]
    fn input_method_support_reflects_build_features() {
        let dropped = Rc::new(Cell::new(false));
        let platform = bound_platform(FakeModule::complete(&dropped));

        let support = platform.input_method_support();
        if cfg!(feature = "input-method") {
            assert!(matches!(support, EntryPoint::Absent));
        } else {
            assert!(matches!(support, EntryPoint::Unsupported));
        }
    }

    #[test]
    fn unbound_platform_refuses_calls() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut platform = Platform::new();

        assert!(matches!(
            platform.setup(&ShellInterface::EMPTY, None),
            Err(PlatformError::NotLoaded)
        ));
        assert!(matches!(
            platform.get_view_backend(None),
            Err(PlatformError::NotLoaded)
        ));
        platform.teardown();
        platform.resume_active_views();
        assert!(platform.create_input_method_context().is_none());
    }

    #[test]
    fn missing_library_fails_to_open() {
        let err = Platform::load("libcog-platform-does-not-exist.so").unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }), "got {err:?}");
    }

    #[test]
    fn load_first_reports_exhausted_candidates() {
        let err = Platform::load_first(["libcog-missing-a.so", "libcog-missing-b.so"]).unwrap_err();
        match err {
            LoadError::NoCandidate { tried, last } => {
                assert_eq!(tried, 2);
                assert!(matches!(last.as_deref(), Some(LoadError::Open { .. })));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn foreign_library_lacks_entry_points() {
        let err = Platform::load("libc.so.6").unwrap_err();
        assert!(
            matches!(
                err,
                LoadError::MissingRequiredEntryPoint { symbol } if symbol == SETUP_SYMBOL
            ),
            "got {err:?}"
        );
    }
}
