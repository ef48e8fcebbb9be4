// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Fixed-capacity table of active touch points.

use cog_platform::input::{Modifiers, TouchEvent, TouchEventKind, TouchPoint};

use crate::error::InputError;

/// Number of simultaneous touch points tracked.
pub const TOUCH_SLOTS: usize = 10;

/// Last raw record of each touch id, indexed by id.
///
/// Every dispatched [`TouchEvent`] carries the whole table, used slots and
/// empty ones alike.
#[derive(Clone, Debug, Default)]
pub struct TouchSlotTable {
    points: [TouchPoint; TOUCH_SLOTS],
}

impl TouchSlotTable {
    /// Creates a table with every slot empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: [TouchPoint::NULL; TOUCH_SLOTS],
        }
    }

    /// All slots.
    #[must_use]
    pub fn points(&self) -> &[TouchPoint] {
        &self.points
    }

    fn slot(id: i32) -> Result<usize, InputError> {
        usize::try_from(id)
            .ok()
            .filter(|&slot| slot < TOUCH_SLOTS)
            .ok_or(InputError::TouchIdOutOfRange {
                id,
                capacity: TOUCH_SLOTS,
            })
    }

    /// Records a finger going down at `(x, y)` and passes the event to
    /// `dispatch`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TouchIdOutOfRange`] without dispatching if `id`
    /// has no slot.
    pub fn down(
        &mut self,
        time: u32,
        id: i32,
        x: i32,
        y: i32,
        dispatch: impl FnOnce(&TouchEvent<'_>),
    ) -> Result<(), InputError> {
        self.record(TouchEventKind::Down, time, id, Some((x, y)), dispatch)
    }

    /// Records a finger moving to `(x, y)` and passes the event to
    /// `dispatch`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TouchIdOutOfRange`] without dispatching if `id`
    /// has no slot.
    pub fn motion(
        &mut self,
        time: u32,
        id: i32,
        x: i32,
        y: i32,
        dispatch: impl FnOnce(&TouchEvent<'_>),
    ) -> Result<(), InputError> {
        self.record(TouchEventKind::Motion, time, id, Some((x, y)), dispatch)
    }

    /// Records a finger being lifted at its last known position, passes the
    /// event to `dispatch`, then clears the slot.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::TouchIdOutOfRange`] without dispatching if `id`
    /// has no slot.
    pub fn up(
        &mut self,
        time: u32,
        id: i32,
        dispatch: impl FnOnce(&TouchEvent<'_>),
    ) -> Result<(), InputError> {
        let slot = Self::slot(id)?;
        self.record(TouchEventKind::Up, time, id, None, dispatch)?;
        self.points[slot] = TouchPoint::NULL;
        Ok(())
    }

    fn record(
        &mut self,
        kind: TouchEventKind,
        time: u32,
        id: i32,
        position: Option<(i32, i32)>,
        dispatch: impl FnOnce(&TouchEvent<'_>),
    ) -> Result<(), InputError> {
        let slot = Self::slot(id)?;
        let (x, y) = position.unwrap_or((self.points[slot].x, self.points[slot].y));
        self.points[slot] = TouchPoint {
            kind,
            time,
            id,
            x,
            y,
        };
        dispatch(&TouchEvent {
            points: &self.points,
            kind,
            id,
            time,
            modifiers: Modifiers::empty(),
        });
        Ok(())
    }
}
