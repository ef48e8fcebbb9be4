// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! The engine's per-view endpoint, as seen by a platform backend.

use bitflags::bitflags;

use crate::input::{AxisEvent, KeyboardEvent, PointerEvent, TouchEvent};

bitflags! {
    /// Activity state of a view backend.
    ///
    /// Bit values match the engine's.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ActivityState: u32 {
        /// The view is visible.
        const VISIBLE = 1 << 0;
        /// The view has input focus.
        const FOCUSED = 1 << 1;
        /// The view is placed in a window.
        const IN_WINDOW = 1 << 2;
        /// The view has exported at least one frame.
        const INITIATED = 1 << 4;
    }
}

/// Receives input, geometry and activity updates for one view.
///
/// Implemented by the backend over the engine's native view backend, and by
/// mocks in tests.
pub trait ViewBackend {
    /// Delivers a pointer motion or button event.
    fn dispatch_pointer_event(&self, event: &PointerEvent);

    /// Delivers a scroll event.
    fn dispatch_axis_event(&self, event: &AxisEvent);

    /// Delivers a touch event together with the full touch-point table.
    fn dispatch_touch_event(&self, event: &TouchEvent<'_>);

    /// Delivers a key event.
    fn dispatch_keyboard_event(&self, event: &KeyboardEvent);

    /// Informs the view of its new logical size.
    fn dispatch_set_size(&self, width: u32, height: u32);

    /// Informs the view of the output's device scale factor.
    fn dispatch_set_device_scale_factor(&self, scale: f32);

    /// Sets `state` bits on the view.
    fn add_activity_state(&self, state: ActivityState);

    /// Current activity state of the view.
    fn activity_state(&self) -> ActivityState;
}
