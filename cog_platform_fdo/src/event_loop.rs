// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Event-queue ownership for the backend session.
//!
//! The backend owns one `EventQueue<FdoState>`. Every object that takes
//! part in event delivery (`wl_surface`, `wl_output`, `wl_callback`, input
//! devices, and the adopted `wl_buffer`s) is created with its
//! [`QueueHandle`]; using any other handle silently drops the events.
//!
//! ```text
//! host loop ──fd readable──▶ EventPump::pump
//!                              flush ─▶ prepare_read/read
//!                              ─▶ dispatch inner queue (libEGL objects)
//!                              ─▶ dispatch_pending(FdoState) ─▶ flush
//! ```
//!
//! Buffers created by libEGL start out on the connection's inner queue; the
//! inner dispatch makes sure nothing parked there starves.

use std::io::ErrorKind;

use wayland_client::backend::{ReadEventsGuard, WaylandError};
use wayland_client::{DispatchError, EventQueue, QueueHandle};

use crate::error::FdoError;
use crate::session::FdoState;

/// Backend-owned event queue.
#[derive(Debug)]
pub(crate) struct EventPump {
    event_queue: EventQueue<FdoState>,
}

impl EventPump {
    pub(crate) fn new(event_queue: EventQueue<FdoState>) -> Self {
        Self { event_queue }
    }

    /// Handle every backend object must be created with.
    pub(crate) fn queue_handle(&self) -> QueueHandle<FdoState> {
        self.event_queue.handle()
    }

    /// Dispatches already-queued events without touching the socket.
    pub(crate) fn dispatch_pending(
        &mut self,
        state: &mut FdoState,
    ) -> Result<usize, DispatchError> {
        self.event_queue.dispatch_pending(state)
    }

    /// Blocks until the compositor has processed every request sent so far.
    pub(crate) fn roundtrip(&mut self, state: &mut FdoState) -> Result<usize, DispatchError> {
        self.event_queue.roundtrip(state)
    }

    /// Flushes pending requests. A full socket is not an error.
    pub(crate) fn flush(&self) -> Result<(), WaylandError> {
        match self.event_queue.flush() {
            Err(WaylandError::Io(err)) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            other => other,
        }
    }

    /// Starts a synchronized socket read. `None` means events are queued
    /// and must be dispatched first.
    pub(crate) fn prepare_read(&self) -> Option<ReadEventsGuard> {
        self.event_queue.prepare_read()
    }

    /// One non-blocking iteration: send, read what is available, dispatch.
    pub(crate) fn pump(&mut self, state: &mut FdoState) -> Result<usize, FdoError> {
        self.flush()?;
        if let Some(guard) = self.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(err)) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => return Err(err.into()),
            }
        }
        state.conn.backend().dispatch_inner_queue()?;
        let dispatched = self.dispatch_pending(state)?;
        self.flush()?;
        Ok(dispatched)
    }
}
