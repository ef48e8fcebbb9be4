// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Input events in the engine's representation.
//!
//! Coordinates are in device pixels, already multiplied by the output
//! scale. Timestamps are the compositor's millisecond clock.

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier mask.
    ///
    /// Bit values match the engine's.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        /// Control.
        const CONTROL = 1 << 0;
        /// Shift.
        const SHIFT = 1 << 1;
        /// Alt.
        const ALT = 1 << 2;
        /// Meta / logo.
        const META = 1 << 3;
    }
}

/// Kind of a [`PointerEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PointerEventKind {
    /// The pointer moved.
    Motion = 1,
    /// A button changed state.
    Button = 2,
}

/// Pointer motion or button event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    /// Motion or button.
    pub kind: PointerEventKind,
    /// Event time.
    pub time: u32,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Last button that changed state (Linux input code).
    pub button: u32,
    /// `1` if that button is pressed, `0` otherwise.
    pub state: u32,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Scroll event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisEvent {
    /// Event time.
    pub time: u32,
    /// Pointer horizontal position.
    pub x: i32,
    /// Pointer vertical position.
    pub y: i32,
    /// `0` for vertical, `1` for horizontal scrolling.
    pub axis: u32,
    /// Scroll amount, truncated to whole units.
    pub value: i32,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Kind of a touch record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum TouchEventKind {
    /// Unused slot.
    #[default]
    Null = 0,
    /// A finger went down.
    Down = 1,
    /// A finger moved.
    Motion = 2,
    /// A finger was lifted.
    Up = 3,
}

/// One raw touch record, laid out as the engine expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TouchPoint {
    /// Last transition of this point.
    pub kind: TouchEventKind,
    /// Event time.
    pub time: u32,
    /// Touch id.
    pub id: i32,
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

impl TouchPoint {
    /// An empty slot.
    pub const NULL: Self = Self {
        kind: TouchEventKind::Null,
        time: 0,
        id: 0,
        x: 0,
        y: 0,
    };
}

/// Touch event: the transition that happened plus every tracked point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchEvent<'a> {
    /// All touch slots, including unused ones.
    pub points: &'a [TouchPoint],
    /// Transition that triggered this event.
    pub kind: TouchEventKind,
    /// Id of the point that changed.
    pub id: i32,
    /// Event time.
    pub time: u32,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

/// Key press or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Event time.
    pub time: u32,
    /// XKB keysym.
    pub keysym: u32,
    /// UTF-32 character produced by the key, or `0`.
    pub unicode: u32,
    /// `true` on press.
    pub pressed: bool,
    /// Modifiers active after this event.
    pub modifiers: Modifiers,
}
