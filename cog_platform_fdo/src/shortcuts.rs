// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Application key shortcuts handled before the engine sees a key.

use cog_platform::Shell;
use cog_platform::input::{KeyboardEvent, Modifiers};

/// Zoom change per step.
pub const ZOOM_STEP: f64 = 0.1;

const KEY_W: u32 = 0x77;
const KEY_EQUAL: u32 = 0x3d;
const KEY_MINUS: u32 = 0x2d;
const KEY_0: u32 = 0x30;
const KEY_LEFT: u32 = 0xff51;
const KEY_RIGHT: u32 = 0xff53;
/// `^W`: what xkb produces for Ctrl+W.
const CTRL_W_UNICODE: u32 = 0x17;

/// An application command bound to a key chord.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shortcut {
    /// Quit the application.
    Quit,
    /// Add the given amount to the zoom level.
    Zoom(f64),
    /// Reset the zoom level to 1.
    ResetZoom,
    /// Navigate back.
    Back,
    /// Navigate forward.
    Forward,
}

impl Shortcut {
    /// Matches a key event against the built-in chords.
    ///
    /// Modifiers must match exactly, and releases never match.
    #[must_use]
    pub fn from_event(event: &KeyboardEvent) -> Option<Self> {
        if !event.pressed {
            return None;
        }
        let chord = (event.unicode, event.keysym);
        if event.modifiers == Modifiers::CONTROL {
            match chord {
                (CTRL_W_UNICODE, KEY_W) => Some(Self::Quit),
                (KEY_EQUAL, KEY_EQUAL) => Some(Self::Zoom(ZOOM_STEP)),
                (KEY_MINUS, KEY_MINUS) => Some(Self::Zoom(-ZOOM_STEP)),
                (KEY_0, KEY_0) => Some(Self::ResetZoom),
                _ => None,
            }
        } else if event.modifiers == Modifiers::ALT {
            match chord {
                (0, KEY_LEFT) => Some(Self::Back),
                (0, KEY_RIGHT) => Some(Self::Forward),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Performs the command on `shell`.
    pub fn run(self, shell: &dyn Shell) {
        log::debug!("running shortcut {self:?}");
        match self {
            Self::Quit => shell.quit(),
            Self::Zoom(step) => shell.set_zoom_level(shell.zoom_level() + step),
            Self::ResetZoom => shell.set_zoom_level(1.0),
            Self::Back => shell.go_back(),
            Self::Forward => shell.go_forward(),
        }
    }
}

/// Runs the shortcut bound to `event`, if any. Returns `true` if the key was
/// consumed and must not reach the engine.
pub fn intercept(event: &KeyboardEvent, shell: &dyn Shell) -> bool {
    match Shortcut::from_event(event) {
        Some(shortcut) => {
            shortcut.run(shell);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{KEY_LEFT, Shortcut, intercept};
    use cog_platform::Shell;
    use cog_platform::input::{KeyboardEvent, Modifiers};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingShell {
        zoom: Cell<f64>,
        log: RefCell<Vec<&'static str>>,
    }

    impl Shell for RecordingShell {
        fn zoom_level(&self) -> f64 {
            self.zoom.get()
        }
        fn set_zoom_level(&self, level: f64) {
            self.zoom.set(level);
        }
        fn go_back(&self) {
            self.log.borrow_mut().push("back");
        }
        fn go_forward(&self) {
            self.log.borrow_mut().push("forward");
        }
        fn quit(&self) {
            self.log.borrow_mut().push("quit");
        }
    }

    fn key(modifiers: Modifiers, unicode: u32, keysym: u32, pressed: bool) -> KeyboardEvent {
        KeyboardEvent {
            time: 0,
            keysym,
            unicode,
            pressed,
            modifiers,
        }
    }

    #[test]
    fn ctrl_w_quits_only_on_press() {
        let shell = RecordingShell::default();

        assert!(!intercept(&key(Modifiers::CONTROL, 0x17, 0x77, false), &shell));
        assert!(shell.log.borrow().is_empty());

        assert!(intercept(&key(Modifiers::CONTROL, 0x17, 0x77, true), &shell));
        assert_eq!(*shell.log.borrow(), ["quit"]);
    }

    #[test]
    fn zoom_chords_adjust_level() {
        let shell = RecordingShell {
            zoom: Cell::new(1.0),
            ..RecordingShell::default()
        };

        assert!(intercept(&key(Modifiers::CONTROL, 0x3d, 0x3d, true), &shell));
        assert!((shell.zoom.get() - 1.1).abs() < 1e-9);
        assert!(intercept(&key(Modifiers::CONTROL, 0x2d, 0x2d, true), &shell));
        assert!(intercept(&key(Modifiers::CONTROL, 0x2d, 0x2d, true), &shell));
        assert!((shell.zoom.get() - 0.9).abs() < 1e-9);
        assert!(intercept(&key(Modifiers::CONTROL, 0x30, 0x30, true), &shell));
        assert_eq!(shell.zoom.get(), 1.0);
    }

    #[test]
    fn alt_arrows_navigate() {
        let shell = RecordingShell::default();
        assert!(intercept(&key(Modifiers::ALT, 0, KEY_LEFT, true), &shell));
        assert!(intercept(&key(Modifiers::ALT, 0, 0xff53, true), &shell));
        assert_eq!(*shell.log.borrow(), ["back", "forward"]);
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let ctrl_shift = Modifiers::CONTROL | Modifiers::SHIFT;
        assert_eq!(Shortcut::from_event(&key(ctrl_shift, 0x17, 0x77, true)), None);
        assert_eq!(Shortcut::from_event(&key(Modifiers::empty(), 0x77, 0x77, true)), None);
        assert_eq!(Shortcut::from_event(&key(Modifiers::ALT, 0, 0xff52, true)), None);
    }
}
