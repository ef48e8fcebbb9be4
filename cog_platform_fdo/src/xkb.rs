// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Keymap handling through xkbcommon.

use std::os::fd::OwnedFd;

use cog_platform::input::Modifiers;
use xkbcommon::xkb;

use crate::error::FdoError;

/// Offset between evdev scancodes and XKB keycodes.
const EVDEV_OFFSET: u32 = 8;

/// An xkbcommon context.
pub(crate) struct XkbContext {
    context: xkb::Context,
}

impl core::fmt::Debug for XkbContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XkbContext").finish_non_exhaustive()
    }
}

impl XkbContext {
    pub(crate) fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
        }
    }

    /// Compiles the keymap the compositor sent as a shared-memory file.
    pub(crate) fn keyboard_from_fd(
        &self,
        fd: OwnedFd,
        size: u32,
    ) -> Result<XkbKeyboard, FdoError> {
        // SAFETY: the compositor sent `fd` as a `wl_keyboard.keymap` file of
        // `size` bytes in text format.
        let keymap = unsafe {
            xkb::Keymap::new_from_fd(
                &self.context,
                fd,
                size as usize,
                xkb::KEYMAP_FORMAT_TEXT_V1,
                xkb::KEYMAP_COMPILE_NO_FLAGS,
            )
        }
        .map_err(|err| FdoError::Input(format!("cannot map keymap: {err}")))?
        .ok_or_else(|| FdoError::Input("cannot compile keymap".into()))?;
        Ok(XkbKeyboard::new(&keymap))
    }
}

/// Compiled keymap plus its modifier/layout state.
pub(crate) struct XkbKeyboard {
    state: xkb::State,
}

impl core::fmt::Debug for XkbKeyboard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XkbKeyboard")
            .field("modifiers", &self.modifiers())
            .finish_non_exhaustive()
    }
}

impl XkbKeyboard {
    fn new(keymap: &xkb::Keymap) -> Self {
        Self {
            state: xkb::State::new(keymap),
        }
    }

    /// Applies a `wl_keyboard.modifiers` event.
    pub(crate) fn update_mask(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        self.state.update_mask(depressed, latched, locked, 0, 0, group);
    }

    /// Keysym and UTF-32 character for an evdev scancode.
    pub(crate) fn translate(&self, scancode: u32) -> (u32, u32) {
        let keycode = xkb::Keycode::new(scancode + EVDEV_OFFSET);
        (
            self.state.key_get_one_sym(keycode).raw(),
            self.state.key_get_utf32(keycode),
        )
    }

    /// Engine modifier mask of the effective XKB modifiers.
    pub(crate) fn modifiers(&self) -> Modifiers {
        const NAMES: [(&str, Modifiers); 4] = [
            (xkb::MOD_NAME_CTRL, Modifiers::CONTROL),
            (xkb::MOD_NAME_SHIFT, Modifiers::SHIFT),
            (xkb::MOD_NAME_ALT, Modifiers::ALT),
            (xkb::MOD_NAME_LOGO, Modifiers::META),
        ];
        NAMES
            .iter()
            .filter(|(name, _)| self.state.mod_name_is_active(name, xkb::STATE_MODS_EFFECTIVE))
            .fold(Modifiers::empty(), |acc, (_, bit)| acc | *bit)
    }
}
