// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Compositor input → engine input.
//!
//! The session reports device events to one registered [`InputHandler`].
//! [`ShellInputHandler`] is the handler the backend installs: it scales
//! coordinates by the output scale, keeps the touch-point table, runs the
//! application key shortcuts and dispatches everything else to the active
//! view.

use cog_platform::input::{AxisEvent, KeyboardEvent, Modifiers, PointerEvent, PointerEventKind};
use cog_platform::{Shell, ViewBackend};

use crate::shortcuts;
use crate::touch::TouchSlotTable;

/// Receiver of session events. Every method defaults to doing nothing.
///
/// Coordinates are surface-local logical pixels as sent by the compositor.
#[allow(unused_variables, reason = "default implementations ignore their arguments")]
pub trait InputHandler {
    /// The surface entered an output with the given scale.
    fn output_scale_changed(&mut self, scale: i32) {}
    /// The window was configured to a new size.
    fn window_resized(&mut self, width: u32, height: u32) {}
    /// The user asked to close the window.
    fn close_requested(&mut self) {}
    /// The effective keyboard modifiers changed.
    fn modifiers_changed(&mut self, modifiers: Modifiers) {}
    /// The pointer moved.
    fn pointer_motion(&mut self, time: u32, x: f64, y: f64) {}
    /// A pointer button changed state.
    fn pointer_button(&mut self, time: u32, button: u32, pressed: bool) {}
    /// Scrolling on `axis` by `value`.
    fn pointer_axis(&mut self, time: u32, axis: u32, value: f64) {}
    /// A finger touched down.
    fn touch_down(&mut self, time: u32, id: i32, x: f64, y: f64) {}
    /// A finger moved.
    fn touch_motion(&mut self, time: u32, id: i32, x: f64, y: f64) {}
    /// A finger was lifted.
    fn touch_up(&mut self, time: u32, id: i32) {}
    /// A key was pressed or released.
    fn key(&mut self, event: KeyboardEvent) {}
}

/// What the translator needs from the application.
pub trait Host: Shell {
    /// Runs `f` with the active view. Returns `false` if there is none.
    fn with_active_view(&self, f: &mut dyn FnMut(&dyn ViewBackend)) -> bool;
}

/// The backend's input handler.
#[derive(Debug)]
pub struct ShellInputHandler<H> {
    host: H,
    scale: i32,
    x: f64,
    y: f64,
    button: u32,
    button_state: u32,
    modifiers: Modifiers,
    touch: TouchSlotTable,
}

impl<H: Host> ShellInputHandler<H> {
    /// Creates a handler at scale 1.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            scale: 1,
            x: 0.0,
            y: 0.0,
            button: 0,
            button_state: 0,
            modifiers: Modifiers::empty(),
            touch: TouchSlotTable::new(),
        }
    }

    /// The application host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Current output scale.
    #[must_use]
    pub fn scale(&self) -> i32 {
        self.scale
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the engine takes whole surface pixels"
    )]
    fn scaled(&self, v: f64) -> i32 {
        v as i32 * self.scale
    }

    fn dispatch(&self, f: &mut dyn FnMut(&dyn ViewBackend)) {
        if !self.host.with_active_view(f) {
            log::trace!("no active view; input dropped");
        }
    }

    fn pointer_event(&self, kind: PointerEventKind, time: u32) -> PointerEvent {
        PointerEvent {
            kind,
            time,
            x: self.scaled(self.x),
            y: self.scaled(self.y),
            button: self.button,
            state: self.button_state,
            modifiers: self.modifiers,
        }
    }
}

impl<H: Host> InputHandler for ShellInputHandler<H> {
    fn output_scale_changed(&mut self, scale: i32) {
        self.scale = scale.max(1);
        if cfg!(feature = "device-scaling") {
            let factor = self.scale as f32;
            self.dispatch(&mut |view| view.dispatch_set_device_scale_factor(factor));
        }
    }

    fn window_resized(&mut self, width: u32, height: u32) {
        self.dispatch(&mut |view| view.dispatch_set_size(width, height));
    }

    fn close_requested(&mut self) {
        log::debug!("window closed by the compositor");
        self.host.quit();
    }

    fn modifiers_changed(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    fn pointer_motion(&mut self, time: u32, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        let event = self.pointer_event(PointerEventKind::Motion, time);
        self.dispatch(&mut |view| view.dispatch_pointer_event(&event));
    }

    fn pointer_button(&mut self, time: u32, button: u32, pressed: bool) {
        self.button = button;
        self.button_state = u32::from(pressed);
        let event = self.pointer_event(PointerEventKind::Button, time);
        self.dispatch(&mut |view| view.dispatch_pointer_event(&event));
    }

    #[expect(clippy::cast_possible_truncation, reason = "scroll deltas are small")]
    fn pointer_axis(&mut self, time: u32, axis: u32, value: f64) {
        let event = AxisEvent {
            time,
            x: self.scaled(self.x),
            y: self.scaled(self.y),
            axis,
            value: value as i32,
            modifiers: self.modifiers,
        };
        self.dispatch(&mut |view| view.dispatch_axis_event(&event));
    }

    fn touch_down(&mut self, time: u32, id: i32, x: f64, y: f64) {
        let (x, y) = (self.scaled(x), self.scaled(y));
        let host = &self.host;
        if let Err(err) = self.touch.down(time, id, x, y, |event| {
            host.with_active_view(&mut |view| view.dispatch_touch_event(event));
        }) {
            log::warn!("touch down ignored: {err}");
        }
    }

    fn touch_motion(&mut self, time: u32, id: i32, x: f64, y: f64) {
        let (x, y) = (self.scaled(x), self.scaled(y));
        let host = &self.host;
        if let Err(err) = self.touch.motion(time, id, x, y, |event| {
            host.with_active_view(&mut |view| view.dispatch_touch_event(event));
        }) {
            log::warn!("touch motion ignored: {err}");
        }
    }

    fn touch_up(&mut self, time: u32, id: i32) {
        let host = &self.host;
        if let Err(err) = self.touch.up(time, id, |event| {
            host.with_active_view(&mut |view| view.dispatch_touch_event(event));
        }) {
            log::warn!("touch up ignored: {err}");
        }
    }

    fn key(&mut self, event: KeyboardEvent) {
        self.modifiers = event.modifiers;
        if shortcuts::intercept(&event, &self.host) {
            return;
        }
        self.dispatch(&mut |view| view.dispatch_keyboard_event(&event));
    }
}

#[cfg(test)]
mod tests {
    use super::{Host, InputHandler, ShellInputHandler};
    use cog_platform::input::{
        AxisEvent, KeyboardEvent, Modifiers, PointerEvent, PointerEventKind, TouchEvent,
        TouchEventKind, TouchPoint,
    };
    use cog_platform::{ActivityState, Shell, ViewBackend};
    use std::cell::{Cell, RefCell};

    #[derive(Debug, PartialEq)]
    enum Seen {
        Pointer(PointerEvent),
        Axis(AxisEvent),
        Touch(TouchEventKind, i32, Vec<TouchPoint>),
        Key(KeyboardEvent),
        Size(u32, u32),
        Scale(f32),
    }

    #[derive(Default)]
    struct MockView {
        seen: RefCell<Vec<Seen>>,
    }

    impl ViewBackend for MockView {
        fn dispatch_pointer_event(&self, event: &PointerEvent) {
            self.seen.borrow_mut().push(Seen::Pointer(*event));
        }
        fn dispatch_axis_event(&self, event: &AxisEvent) {
            self.seen.borrow_mut().push(Seen::Axis(*event));
        }
        fn dispatch_touch_event(&self, event: &TouchEvent<'_>) {
            self.seen
                .borrow_mut()
                .push(Seen::Touch(event.kind, event.id, event.points.to_vec()));
        }
        fn dispatch_keyboard_event(&self, event: &KeyboardEvent) {
            self.seen.borrow_mut().push(Seen::Key(*event));
        }
        fn dispatch_set_size(&self, width: u32, height: u32) {
            self.seen.borrow_mut().push(Seen::Size(width, height));
        }
        fn dispatch_set_device_scale_factor(&self, scale: f32) {
            self.seen.borrow_mut().push(Seen::Scale(scale));
        }
        fn add_activity_state(&self, _state: ActivityState) {}
        fn activity_state(&self) -> ActivityState {
            ActivityState::empty()
        }
    }

    #[derive(Default)]
    struct MockHost {
        view: Option<MockView>,
        quits: Cell<u32>,
        zoom: Cell<f64>,
    }

    impl MockHost {
        fn with_view() -> Self {
            Self {
                view: Some(MockView::default()),
                ..Self::default()
            }
        }

        fn seen(&self) -> Vec<Seen> {
            self.view
                .as_ref()
                .map(|v| v.seen.take())
                .unwrap_or_default()
        }
    }

    impl Shell for MockHost {
        fn zoom_level(&self) -> f64 {
            self.zoom.get()
        }
        fn set_zoom_level(&self, level: f64) {
            self.zoom.set(level);
        }
        fn go_back(&self) {}
        fn go_forward(&self) {}
        fn quit(&self) {
            self.quits.set(self.quits.get() + 1);
        }
    }

    impl Host for MockHost {
        fn with_active_view(&self, f: &mut dyn FnMut(&dyn ViewBackend)) -> bool {
            match &self.view {
                Some(view) => {
                    f(view);
                    true
                }
                None => false,
            }
        }
    }

    fn key(modifiers: Modifiers, unicode: u32, keysym: u32, pressed: bool) -> KeyboardEvent {
        KeyboardEvent {
            time: 5,
            keysym,
            unicode,
            pressed,
            modifiers,
        }
    }

    #[test]
    fn pointer_coordinates_are_truncated_then_scaled() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.output_scale_changed(2);
        handler.host().seen();

        handler.pointer_motion(10, 10.75, 20.25);
        handler.pointer_button(11, 0x110, true);

        let seen = handler.host().seen();
        assert_eq!(
            seen,
            [
                Seen::Pointer(PointerEvent {
                    kind: PointerEventKind::Motion,
                    time: 10,
                    x: 20,
                    y: 40,
                    button: 0,
                    state: 0,
                    modifiers: Modifiers::empty(),
                }),
                Seen::Pointer(PointerEvent {
                    kind: PointerEventKind::Button,
                    time: 11,
                    x: 20,
                    y: 40,
                    button: 0x110,
                    state: 1,
                    modifiers: Modifiers::empty(),
                }),
            ]
        );
    }

    #[test]
    fn axis_uses_last_pointer_position() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.pointer_motion(1, 3.0, 4.0);
        handler.host().seen();

        handler.pointer_axis(2, 0, -10.5);
        assert_eq!(
            handler.host().seen(),
            [Seen::Axis(AxisEvent {
                time: 2,
                x: 3,
                y: 4,
                axis: 0,
                value: -10,
                modifiers: Modifiers::empty(),
            })]
        );
    }

    #[test]
    fn touch_sequence_reaches_view() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.output_scale_changed(2);
        handler.host().seen();

        handler.touch_down(1, 0, 5.9, 6.1);
        handler.touch_up(2, 0);
        handler.touch_motion(3, 11, 0.0, 0.0);

        let seen = handler.host().seen();
        assert_eq!(seen.len(), 2, "out-of-range touch id must be dropped");
        let Seen::Touch(kind, id, points) = &seen[1] else {
            panic!("expected touch event, got {:?}", seen[1]);
        };
        assert_eq!((*kind, *id), (TouchEventKind::Up, 0));
        assert_eq!((points[0].x, points[0].y), (10, 12));
    }

    #[test]
    fn shortcuts_are_not_forwarded() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());

        handler.key(key(Modifiers::CONTROL, 0x17, 0x77, true));
        assert_eq!(handler.host().quits.get(), 1);
        assert!(handler.host().seen().is_empty());

        let release = key(Modifiers::CONTROL, 0x17, 0x77, false);
        handler.key(release);
        assert_eq!(handler.host().quits.get(), 1);
        assert_eq!(handler.host().seen(), [Seen::Key(release)]);
    }

    #[test]
    fn key_modifiers_flow_into_pointer_events() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.modifiers_changed(Modifiers::SHIFT);
        handler.pointer_motion(1, 0.0, 0.0);

        let seen = handler.host().seen();
        let Seen::Pointer(event) = &seen[0] else {
            panic!("expected pointer event");
        };
        assert_eq!(event.modifiers, Modifiers::SHIFT);
    }

    #[test]
    fn resize_and_close() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.window_resized(640, 480);
        handler.close_requested();

        assert_eq!(handler.host().seen(), [Seen::Size(640, 480)]);
        assert_eq!(handler.host().quits.get(), 1);
    }

    #[test]
    fn device_scale_is_forwarded_when_enabled() {
        let mut handler = ShellInputHandler::new(MockHost::with_view());
        handler.output_scale_changed(3);

        assert_eq!(handler.scale(), 3);
        let seen = handler.host().seen();
        if cfg!(feature = "device-scaling") {
            assert_eq!(seen, [Seen::Scale(3.0)]);
        } else {
            assert!(seen.is_empty());
        }
    }

    #[test]
    fn events_without_active_view_are_dropped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut handler = ShellInputHandler::new(MockHost::default());
        handler.pointer_motion(1, 1.0, 1.0);
        handler.key(key(Modifiers::empty(), 0x61, 0x61, true));
        handler.touch_down(1, 0, 1.0, 1.0);
        assert!(handler.host().seen().is_empty());
    }

    #[test]
    fn default_handler_ignores_everything() {
        #[derive(Default)]
        struct Counting {
            keys: u32,
        }
        impl InputHandler for Counting {
            fn key(&mut self, _event: KeyboardEvent) {
                self.keys += 1;
            }
        }

        let mut handler = Counting::default();
        handler.output_scale_changed(2);
        handler.window_resized(640, 480);
        handler.close_requested();
        handler.modifiers_changed(Modifiers::SHIFT);
        handler.pointer_motion(1, 2.5, 3.5);
        handler.pointer_button(2, 0x110, true);
        handler.pointer_axis(3, 0, -12.75);
        handler.touch_down(4, 0, 1.0, 1.0);
        handler.touch_motion(5, 0, 2.0, 2.0);
        handler.touch_up(6, 0);
        handler.key(key(Modifiers::empty(), 0x61, 0x61, true));
        assert_eq!(handler.keys, 1);
    }
}
