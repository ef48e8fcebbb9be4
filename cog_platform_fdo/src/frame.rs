// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Exported-image ↔ compositor frame exchange.
//!
//! Each view backend is represented by a binding in a [`FrameExchange`].
//! The engine exports rendered frames through the binding's
//! [`ExportChannel`]; each one is turned into a compositor buffer, attached,
//! damaged and committed, and the binding waits for the compositor's frame
//! callback before telling the engine the frame is complete.
//!
//! ```text
//!             export(image)                 commit
//!   Idle ───────────────────► Exported ───────────────► Presented
//!    ▲                                                      │ frame done
//!    │            buffer release (last outstanding)         ▼
//!    └──────────────────────────────────────────── AwaitingRelease
//! ```
//!
//! At most one frame callback is pending per binding, so the engine never
//! gets more frame-complete notifications than it exported frames (plus one
//! from [`FrameExchange::resume_active_views`]).
//!
//! Every compositor buffer carries a [`ReleaseToken`] naming the binding and
//! image it shows. A release is resolved through that token alone, and an
//! image is released back to its channel at most once.

use core::fmt;

use cog_platform::ActivityState;

use crate::error::FrameError;

/// A handle to a binding in a [`FrameExchange`].
///
/// Contains both a slot index and a generation counter so that callbacks
/// arriving after a binding was removed (and its slot reused) are detected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId {
    idx: u32,
    generation: u32,
}

impl BindingId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindingId({}@gen{})", self.idx, self.generation)
    }
}

/// Opaque identity of an exported image (its engine address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

/// Attached to every compositor buffer: which binding's image it shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReleaseToken {
    /// Binding that exported the image.
    pub binding: BindingId,
    /// The image shown by the buffer.
    pub image: ImageId,
}

/// Engine side of one binding.
pub trait ExportChannel {
    /// Tells the engine the last frame was displayed.
    fn dispatch_frame_complete(&mut self);
    /// Returns `image` to the engine for reuse.
    fn release_image(&mut self, image: ImageId);
    /// Sets activity bits on the view backend.
    fn add_activity_state(&mut self, state: ActivityState);
    /// Current activity bits of the view backend.
    fn activity_state(&self) -> ActivityState;
}

/// Compositor side: the one window surface all bindings present to.
pub trait PresentSurface {
    /// Compositor buffer type.
    type Buffer;

    /// Whether the window is fullscreen.
    fn is_fullscreen(&self) -> bool;
    /// Logical window size.
    fn size(&self) -> (u32, u32);
    /// Output scale the window is shown at.
    fn scale(&self) -> i32;
    /// Marks the given area (from the origin) opaque, or unsets the region.
    fn set_opaque_region(&mut self, region: Option<(u32, u32)>);
    /// Wraps `image` in a buffer whose release reports `token`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BufferCreation`] if no buffer can be created.
    fn create_buffer(
        &mut self,
        image: ImageId,
        token: ReleaseToken,
    ) -> Result<Self::Buffer, FrameError>;
    /// Attaches `buffer` at the origin.
    fn attach(&mut self, buffer: Self::Buffer);
    /// Damages `width × height` buffer pixels from the origin.
    fn damage(&mut self, width: i32, height: i32);
    /// Registers a one-shot frame callback reported for `binding`.
    fn request_frame(&mut self, binding: BindingId);
    /// Commits pending surface state.
    fn commit(&mut self);
}

/// Position of a binding in the exchange cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePhase {
    /// Nothing exported, or everything released.
    #[default]
    Idle,
    /// An image was received and is being turned into a buffer.
    Exported,
    /// The buffer is committed; waiting for the frame callback.
    Presented,
    /// The frame was displayed; waiting for the compositor to release the
    /// buffer.
    AwaitingRelease,
}

/// Per-binding counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Images received from the engine.
    pub exports: u64,
    /// Frame callbacks requested.
    pub frame_requests: u64,
    /// Frame-complete notifications sent to the engine.
    pub frames_completed: u64,
    /// Images returned to the engine.
    pub releases: u64,
}

/// How a buffer release was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The image went back to its binding's channel.
    Released,
    /// The image was already released; nothing was done.
    NotOutstanding,
    /// The binding is gone; only the buffer needs destroying.
    BindingGone,
}

struct Binding<C> {
    channel: C,
    held: Option<ImageId>,
    outstanding: Vec<ImageId>,
    frame_pending: bool,
    phase: FramePhase,
    stats: BindingStats,
}

impl<C> Binding<C> {
    fn new(channel: C) -> Self {
        Self {
            channel,
            held: None,
            outstanding: Vec::new(),
            frame_pending: false,
            phase: FramePhase::Idle,
            stats: BindingStats::default(),
        }
    }

    fn settle(&mut self) {
        self.phase = match (self.frame_pending, self.outstanding.is_empty()) {
            (true, _) => FramePhase::Presented,
            (false, false) => FramePhase::AwaitingRelease,
            (false, true) => FramePhase::Idle,
        };
    }
}

impl<C: ExportChannel> Binding<C> {
    fn release(&mut self, image: ImageId) -> bool {
        let Some(pos) = self.outstanding.iter().position(|&i| i == image) else {
            return false;
        };
        self.outstanding.swap_remove(pos);
        if self.held == Some(image) {
            self.held = None;
        }
        self.stats.releases += 1;
        self.channel.release_image(image);
        true
    }

    fn release_all(&mut self) {
        for image in core::mem::take(&mut self.outstanding) {
            self.stats.releases += 1;
            self.channel.release_image(image);
        }
        self.held = None;
        self.frame_pending = false;
        self.phase = FramePhase::Idle;
    }
}

struct Slot<C> {
    generation: u32,
    binding: Option<Binding<C>>,
}

/// All view bindings of the session and their exchange state.
pub struct FrameExchange<C> {
    slots: Vec<Slot<C>>,
    free_list: Vec<u32>,
    last_exported: Option<ReleaseToken>,
}

impl<C> fmt::Debug for FrameExchange<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameExchange")
            .field("bindings", &self.len())
            .field("free", &self.free_list.len())
            .field("last_exported", &self.last_exported)
            .finish()
    }
}

impl<C> Default for FrameExchange<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FrameExchange<C> {
    /// Creates an empty exchange.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            last_exported: None,
        }
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Returns `true` if there are no live bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `id` refers to a live binding.
    #[must_use]
    pub fn contains(&self, id: BindingId) -> bool {
        self.get(id).is_some()
    }

    /// Ids of all live bindings.
    pub fn ids(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.binding.as_ref().map(|_| BindingId {
                idx: idx as u32,
                generation: slot.generation,
            })
        })
    }

    /// The most recent export across all bindings. Diagnostic only.
    #[must_use]
    pub fn last_exported(&self) -> Option<ReleaseToken> {
        self.last_exported
    }

    /// Current phase of `id`.
    #[must_use]
    pub fn phase(&self, id: BindingId) -> Option<FramePhase> {
        self.get(id).map(|b| b.phase)
    }

    /// Counters of `id`.
    #[must_use]
    pub fn stats(&self, id: BindingId) -> Option<BindingStats> {
        self.get(id).map(|b| b.stats)
    }

    /// Whether `id` is waiting for a frame callback.
    #[must_use]
    pub fn is_frame_pending(&self, id: BindingId) -> bool {
        self.get(id).is_some_and(|b| b.frame_pending)
    }

    /// The image `id` currently holds, if any.
    #[must_use]
    pub fn held_image(&self, id: BindingId) -> Option<ImageId> {
        self.get(id).and_then(|b| b.held)
    }

    /// The export channel of `id`.
    #[must_use]
    pub fn channel(&self, id: BindingId) -> Option<&C> {
        self.get(id).map(|b| &b.channel)
    }

    /// Inserts a binding whose channel is built by `make`, which receives the
    /// id the binding will have.
    ///
    /// # Errors
    ///
    /// Propagates the error of `make`; nothing is inserted in that case.
    pub fn try_insert_with<E>(
        &mut self,
        make: impl FnOnce(BindingId) -> Result<C, E>,
    ) -> Result<BindingId, E> {
        let id = match self.free_list.last() {
            Some(&idx) => BindingId {
                idx,
                generation: self.slots[idx as usize].generation,
            },
            None => BindingId {
                idx: self.slots.len() as u32,
                generation: 0,
            },
        };
        let channel = make(id)?;
        if self.free_list.pop().is_some() {
            self.slots[id.idx as usize].binding = Some(Binding::new(channel));
        } else {
            self.slots.push(Slot {
                generation: 0,
                binding: Some(Binding::new(channel)),
            });
        }
        log::debug!("inserted view binding {id:?}");
        Ok(id)
    }

    fn get(&self, id: BindingId) -> Option<&Binding<C>> {
        let slot = self.slots.get(id.idx as usize)?;
        (slot.generation == id.generation)
            .then_some(slot.binding.as_ref())
            .flatten()
    }

    fn get_mut(&mut self, id: BindingId) -> Option<&mut Binding<C>> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation == id.generation {
            slot.binding.as_mut()
        } else {
            None
        }
    }
}

impl<C: ExportChannel> FrameExchange<C> {
    /// Removes `id`, returning its channel for destruction.
    ///
    /// Every image the binding still has out at the compositor is released
    /// back to the channel first; the buffers showing them will later report
    /// [`ReleaseOutcome::BindingGone`].
    pub fn remove(&mut self, id: BindingId) -> Option<C> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let mut binding = slot.binding.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.idx);
        binding.release_all();
        if self.last_exported.is_some_and(|t| t.binding == id) {
            self.last_exported = None;
        }
        log::debug!("removed view binding {id:?} ({:?})", binding.stats);
        Some(binding.channel)
    }

    /// Removes every binding, returning their channels.
    pub fn clear(&mut self) -> Vec<C> {
        let ids: Vec<_> = self.ids().collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Presents `image`, just exported by `id`, on `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownBinding`] if `id` is not live, and
    /// [`FrameError::BufferCreation`] if no buffer could be made; the image
    /// is handed straight back to the engine in that case.
    pub fn on_export<S: PresentSurface>(
        &mut self,
        id: BindingId,
        image: ImageId,
        surface: &mut S,
    ) -> Result<(), FrameError> {
        let binding = self.get_mut(id).ok_or(FrameError::UnknownBinding(id))?;
        let token = ReleaseToken { binding: id, image };

        binding.held = Some(image);
        binding.phase = FramePhase::Exported;
        binding.stats.exports += 1;
        binding.channel.add_activity_state(ActivityState::INITIATED);
        log::trace!("{id:?}: exported {image:?}");

        let (width, height) = surface.size();
        if surface.is_fullscreen() {
            surface.set_opaque_region(Some((width, height)));
        } else {
            surface.set_opaque_region(None);
        }

        let buffer = match surface.create_buffer(image, token) {
            Ok(buffer) => buffer,
            Err(err) => {
                binding.held = None;
                binding.stats.releases += 1;
                binding.channel.release_image(image);
                if !binding.frame_pending {
                    binding.stats.frames_completed += 1;
                    binding.channel.dispatch_frame_complete();
                }
                binding.settle();
                return Err(err);
            }
        };
        if !binding.outstanding.contains(&image) {
            binding.outstanding.push(image);
        }

        let scale = surface.scale();
        surface.attach(buffer);
        surface.damage(width as i32 * scale, height as i32 * scale);
        if !binding.frame_pending {
            surface.request_frame(id);
            binding.frame_pending = true;
            binding.stats.frame_requests += 1;
        }
        surface.commit();
        binding.phase = FramePhase::Presented;

        self.last_exported = Some(token);
        Ok(())
    }

    /// Handles the frame callback requested for `id`. Returns `false` if the
    /// binding is gone.
    pub fn on_frame_done(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.get_mut(id) else {
            log::debug!("frame callback for removed binding {id:?}");
            return false;
        };
        if !binding.frame_pending {
            log::trace!("{id:?}: no frame requested");
            return true;
        }
        binding.frame_pending = false;
        binding.stats.frames_completed += 1;
        binding.channel.dispatch_frame_complete();
        binding.settle();
        log::trace!("{id:?}: frame complete, now {:?}", binding.phase);
        true
    }

    /// Handles the compositor releasing the buffer that carried `token`.
    pub fn on_buffer_release(&mut self, token: ReleaseToken) -> ReleaseOutcome {
        let Some(binding) = self.get_mut(token.binding) else {
            return ReleaseOutcome::BindingGone;
        };
        if !binding.release(token.image) {
            log::trace!("{:?}: {:?} already released", token.binding, token.image);
            return ReleaseOutcome::NotOutstanding;
        }
        if binding.phase != FramePhase::Exported {
            binding.settle();
        }
        ReleaseOutcome::Released
    }

    /// Requests a frame for every binding whose view is visible, has
    /// presented before and is not already waiting for one. A binding is
    /// resumed at most once between two exports. Returns the number of
    /// frames requested.
    pub fn resume_active_views<S: PresentSurface>(&mut self, surface: &mut S) -> usize {
        let wanted = ActivityState::VISIBLE | ActivityState::INITIATED;
        let mut requested = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let Some(binding) = slot.binding.as_mut() else {
                continue;
            };
            if binding.frame_pending
                || binding.stats.frames_completed > binding.stats.exports
                || !binding.channel.activity_state().contains(wanted)
            {
                continue;
            }
            let id = BindingId {
                idx: idx as u32,
                generation: slot.generation,
            };
            log::debug!("resuming {id:?}");
            surface.request_frame(id);
            binding.frame_pending = true;
            binding.stats.frame_requests += 1;
            binding.settle();
            requested += 1;
        }
        if requested > 0 {
            surface.commit();
        }
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BindingId, ExportChannel, FrameExchange, FramePhase, ImageId, PresentSurface,
        ReleaseOutcome, ReleaseToken,
    };
    use crate::error::FrameError;
    use cog_platform::ActivityState;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct MockChannel {
        name: &'static str,
        state: ActivityState,
        log: Log,
    }

    impl MockChannel {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                state: ActivityState::empty(),
                log: Rc::clone(log),
            }
        }
    }

    impl ExportChannel for MockChannel {
        fn dispatch_frame_complete(&mut self) {
            self.log.borrow_mut().push(format!("{}:frame_complete", self.name));
        }
        fn release_image(&mut self, image: ImageId) {
            self.log
                .borrow_mut()
                .push(format!("{}:release:{}", self.name, image.0));
        }
        fn add_activity_state(&mut self, state: ActivityState) {
            self.state |= state;
        }
        fn activity_state(&self) -> ActivityState {
            self.state
        }
    }

    #[derive(Default)]
    struct MockSurface {
        fullscreen: bool,
        fail_buffers: bool,
        calls: Vec<String>,
        frame_requests: Vec<BindingId>,
        buffers: Vec<ReleaseToken>,
    }

    impl PresentSurface for MockSurface {
        type Buffer = ReleaseToken;

        fn is_fullscreen(&self) -> bool {
            self.fullscreen
        }
        fn size(&self) -> (u32, u32) {
            (800, 600)
        }
        fn scale(&self) -> i32 {
            2
        }
        fn set_opaque_region(&mut self, region: Option<(u32, u32)>) {
            self.calls.push(format!("opaque:{region:?}"));
        }
        fn create_buffer(
            &mut self,
            image: ImageId,
            token: ReleaseToken,
        ) -> Result<ReleaseToken, FrameError> {
            assert_eq!(token.image, image);
            if self.fail_buffers {
                return Err(FrameError::BufferCreation);
            }
            self.calls.push("create_buffer".into());
            self.buffers.push(token);
            Ok(token)
        }
        fn attach(&mut self, _buffer: ReleaseToken) {
            self.calls.push("attach".into());
        }
        fn damage(&mut self, width: i32, height: i32) {
            self.calls.push(format!("damage:{width}x{height}"));
        }
        fn request_frame(&mut self, binding: BindingId) {
            self.calls.push("frame".into());
            self.frame_requests.push(binding);
        }
        fn commit(&mut self) {
            self.calls.push("commit".into());
        }
    }

    fn exchange_with(
        names: &[&'static str],
        log: &Log,
    ) -> (FrameExchange<MockChannel>, Vec<BindingId>) {
        let mut exchange = FrameExchange::new();
        let ids = names
            .iter()
            .map(|&name| {
                exchange
                    .try_insert_with(|_| Ok::<_, FrameError>(MockChannel::new(name, log)))
                    .unwrap()
            })
            .collect();
        (exchange, ids)
    }

    #[test]
    fn export_follows_protocol_order() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();

        exchange.on_export(ids[0], ImageId(1), &mut surface).unwrap();

        assert_eq!(
            surface.calls,
            ["opaque:None", "create_buffer", "attach", "damage:1600x1200", "frame", "commit"]
        );
        assert!(exchange.channel(ids[0]).unwrap().state.contains(ActivityState::INITIATED));
        assert_eq!(exchange.phase(ids[0]), Some(FramePhase::Presented));
        assert_eq!(
            exchange.last_exported(),
            Some(ReleaseToken {
                binding: ids[0],
                image: ImageId(1)
            })
        );
    }

    #[test]
    fn fullscreen_sets_opaque_region() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface {
            fullscreen: true,
            ..MockSurface::default()
        };

        exchange.on_export(ids[0], ImageId(1), &mut surface).unwrap();
        assert_eq!(surface.calls[0], "opaque:Some((800, 600))");
    }

    #[test]
    fn one_frame_callback_in_flight() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();

        for image in 1..=3 {
            exchange.on_export(ids[0], ImageId(image), &mut surface).unwrap();
        }
        assert_eq!(surface.frame_requests.len(), 1);
        assert!(exchange.is_frame_pending(ids[0]));

        assert!(exchange.on_frame_done(ids[0]));
        let stats = exchange.stats(ids[0]).unwrap();
        assert_eq!(stats.exports, 3);
        assert_eq!(stats.frames_completed, 1);
        assert!(stats.frames_completed <= stats.exports + 1);
        assert_eq!(*log.borrow(), ["v:frame_complete"]);
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();
        let id = ids[0];

        exchange.on_export(id, ImageId(7), &mut surface).unwrap();
        exchange.on_frame_done(id);
        assert_eq!(exchange.phase(id), Some(FramePhase::AwaitingRelease));

        let token = surface.buffers[0];
        assert_eq!(exchange.on_buffer_release(token), ReleaseOutcome::Released);
        assert_eq!(exchange.phase(id), Some(FramePhase::Idle));
        assert_eq!(exchange.held_image(id), None);
        assert_eq!(*log.borrow(), ["v:frame_complete", "v:release:7"]);
    }

    #[test]
    fn release_resolves_through_token_owner() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["one", "two"], &log);
        let mut surface = MockSurface::default();

        exchange.on_export(ids[0], ImageId(0xA), &mut surface).unwrap();
        exchange.on_export(ids[1], ImageId(0xB), &mut surface).unwrap();
        assert_eq!(exchange.last_exported().unwrap().image, ImageId(0xB));

        let buffer_a = surface.buffers[0];
        assert_eq!(exchange.on_buffer_release(buffer_a), ReleaseOutcome::Released);

        assert_eq!(*log.borrow(), ["one:release:10"]);
        assert_eq!(exchange.held_image(ids[1]), Some(ImageId(0xB)));
    }

    #[test]
    fn images_are_never_released_twice() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();

        exchange.on_export(ids[0], ImageId(1), &mut surface).unwrap();
        let token = surface.buffers[0];

        assert_eq!(exchange.on_buffer_release(token), ReleaseOutcome::Released);
        assert_eq!(exchange.on_buffer_release(token), ReleaseOutcome::NotOutstanding);
        assert_eq!(exchange.stats(ids[0]).unwrap().releases, 1);
    }

    #[test]
    fn buffer_failure_hands_image_back() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface {
            fail_buffers: true,
            ..MockSurface::default()
        };

        let err = exchange.on_export(ids[0], ImageId(5), &mut surface).unwrap_err();
        assert!(matches!(err, FrameError::BufferCreation));
        assert_eq!(*log.borrow(), ["v:release:5", "v:frame_complete"]);
        assert_eq!(exchange.phase(ids[0]), Some(FramePhase::Idle));
        assert!(surface.frame_requests.is_empty());
        let stats = exchange.stats(ids[0]).unwrap();
        assert_eq!(stats.frames_completed, 1);
        assert_eq!(stats.releases, 1);
    }

    #[test]
    fn buffer_failure_leaves_pending_frame_to_callback() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();

        exchange.on_export(ids[0], ImageId(1), &mut surface).unwrap();
        surface.fail_buffers = true;
        assert!(exchange.on_export(ids[0], ImageId(2), &mut surface).is_err());
        assert_eq!(*log.borrow(), ["v:release:2"]);
        assert!(exchange.is_frame_pending(ids[0]));

        exchange.on_frame_done(ids[0]);
        assert_eq!(*log.borrow(), ["v:release:2", "v:frame_complete"]);
    }

    #[test]
    fn removal_releases_outstanding_and_invalidates_handles() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();
        let id = ids[0];

        exchange.on_export(id, ImageId(3), &mut surface).unwrap();
        let channel = exchange.remove(id).unwrap();
        assert_eq!(channel.name, "v");
        assert_eq!(*log.borrow(), ["v:release:3"]);

        assert_eq!(exchange.on_buffer_release(surface.buffers[0]), ReleaseOutcome::BindingGone);
        assert!(!exchange.on_frame_done(id));
        assert!(exchange.last_exported().is_none());

        let reused = exchange
            .try_insert_with(|_| Ok::<_, FrameError>(MockChannel::new("w", &log)))
            .unwrap();
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused.generation(), id.generation());
        assert!(!exchange.contains(id));
        assert!(matches!(
            exchange.on_export(id, ImageId(4), &mut surface),
            Err(FrameError::UnknownBinding(_))
        ));
    }

    #[test]
    fn failed_insert_leaves_exchange_unchanged() {
        let mut exchange = FrameExchange::<MockChannel>::new();
        let err = exchange
            .try_insert_with(|_| Err(FrameError::ExportChannel))
            .unwrap_err();
        assert!(matches!(err, FrameError::ExportChannel));
        assert!(exchange.is_empty());
    }

    #[test]
    fn resume_requires_visible_and_initiated() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["a", "b"], &log);
        let mut surface = MockSurface::default();

        assert_eq!(exchange.resume_active_views(&mut surface), 0);
        assert!(surface.calls.is_empty());

        exchange.on_export(ids[0], ImageId(1), &mut surface).unwrap();
        exchange.on_frame_done(ids[0]);
        // Initiated but not visible.
        assert_eq!(exchange.resume_active_views(&mut surface), 0);

        exchange.slots[ids[0].index() as usize]
            .binding
            .as_mut()
            .unwrap()
            .channel
            .add_activity_state(ActivityState::VISIBLE);
        exchange.slots[ids[1].index() as usize]
            .binding
            .as_mut()
            .unwrap()
            .channel
            .add_activity_state(ActivityState::VISIBLE);

        surface.frame_requests.clear();
        assert_eq!(exchange.resume_active_views(&mut surface), 1);
        assert_eq!(surface.frame_requests, [ids[0]]);

        // Already pending: nothing more.
        assert_eq!(exchange.resume_active_views(&mut surface), 0);
    }

    #[test]
    fn repeated_resume_keeps_back_pressure() {
        let log = Log::default();
        let (mut exchange, ids) = exchange_with(&["v"], &log);
        let mut surface = MockSurface::default();
        let id = ids[0];

        exchange.on_export(id, ImageId(1), &mut surface).unwrap();
        exchange.on_frame_done(id);
        exchange.slots[id.index() as usize]
            .binding
            .as_mut()
            .unwrap()
            .channel
            .add_activity_state(ActivityState::VISIBLE);

        assert_eq!(exchange.resume_active_views(&mut surface), 1);
        exchange.on_frame_done(id);
        for _ in 0..2 {
            assert_eq!(exchange.resume_active_views(&mut surface), 0);
            exchange.on_frame_done(id);
        }

        let stats = exchange.stats(id).unwrap();
        assert_eq!(stats.exports, 1);
        assert_eq!(stats.frames_completed, 2);
        assert_eq!(stats.frame_requests, 2);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn clear_drains_every_binding() {
        let log = Log::default();
        let (mut exchange, _) = exchange_with(&["a", "b", "c"], &log);
        let channels = exchange.clear();
        assert_eq!(channels.len(), 3);
        assert!(exchange.is_empty());
        assert_eq!(exchange.ids().count(), 0);
    }
}
