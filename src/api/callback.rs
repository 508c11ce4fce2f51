//! Callback-based API for event-driven hosts.
//!
//! The host pushes ranging bundles (or attaches a [`RangingSource`]) and gets
//! position updates and diagnostics through registered callbacks.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::api::types::{ApiError, ApiResult, PositionUpdate, SessionEvent};
use crate::core::{AnchorPoint, BeaconSample};
use crate::pipeline::{PositioningSession, TickOutcome};
use crate::ranging::RangingSource;

/// Callback function type for position updates
pub type PositionCallback = Box<dyn Fn(PositionUpdate) + Send>;

/// Callback function type for session events
pub type EventCallback = Box<dyn Fn(SessionEvent) + Send>;

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

pub struct CallbackPositioningApi {
    session: PositioningSession,
    sequence: u64,
    callback_counter: u32,
    position_callbacks: HashMap<CallbackHandle, PositionCallback>,
    event_callbacks: HashMap<CallbackHandle, EventCallback>,
}

impl CallbackPositioningApi {
    pub fn new(session: PositioningSession) -> Self {
        Self {
            session,
            sequence: 0,
            callback_counter: 0,
            position_callbacks: HashMap::new(),
            event_callbacks: HashMap::new(),
        }
    }

    pub fn register_position_callback(&mut self, callback: PositionCallback) -> CallbackHandle {
        let handle = self.next_handle();
        self.position_callbacks.insert(handle, callback);
        handle
    }

    pub fn register_event_callback(&mut self, callback: EventCallback) -> CallbackHandle {
        let handle = self.next_handle();
        self.event_callbacks.insert(handle, callback);
        handle
    }

    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> ApiResult<()> {
        let removed = self.position_callbacks.remove(&handle).is_some()
            || self.event_callbacks.remove(&handle).is_some();

        if removed {
            Ok(())
        } else {
            Err(ApiError::InvalidHandle(handle.id()))
        }
    }

    /// Run one bundle through the session and fire callbacks.
    ///
    /// Returns the update when this bundle produced a new estimate.
    pub fn handle_bundle(&mut self, bundle: &[BeaconSample]) -> Option<PositionUpdate> {
        let old_state = self.session.state();
        let was_loaded = self.session.registry().is_loaded();

        let result = self.session.process_tick(bundle);

        if !was_loaded && self.session.registry().is_loaded() {
            self.trigger_event(SessionEvent::RegistryLoaded {
                anchors: self.session.registry().len(),
            });
        }
        let new_state = self.session.state();
        if new_state != old_state {
            self.trigger_event(SessionEvent::StateChanged { old_state, new_state });
        }

        match result {
            Ok(TickOutcome::Solved { distances, fix }) => {
                self.sequence += 1;
                let update = PositionUpdate {
                    sequence: self.sequence,
                    estimate: fix.position,
                    nearest_beacon: fix.nearest_beacon,
                    distances,
                };
                for callback in self.position_callbacks.values() {
                    callback(update.clone());
                }
                Some(update)
            }
            Ok(TickOutcome::SolveSkipped { reason, .. }) => {
                self.trigger_event(SessionEvent::SolveSkipped { reason });
                None
            }
            Ok(TickOutcome::Accumulating { .. }) => None,
            Err(error) => {
                self.trigger_event(SessionEvent::TickRejected { error });
                None
            }
        }
    }

    pub fn stage_anchor_feed(&mut self, feed: Vec<AnchorPoint>) -> bool {
        self.session.stage_anchor_feed(feed)
    }

    /// Drain a ranging source until it is exhausted, returning the updates emitted
    pub fn run_source(&mut self, source: &mut dyn RangingSource) -> ApiResult<Vec<PositionUpdate>> {
        let mut updates = Vec::new();
        loop {
            match source.next_bundle() {
                Ok(Some(bundle)) => updates.extend(self.handle_bundle(&bundle)),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "ranging source failed");
                    return Err(e.into());
                }
            }
        }
        debug!(
            delivered = source.status().bundles_delivered,
            updates = updates.len(),
            "ranging source drained"
        );
        Ok(updates)
    }

    pub fn session(&self) -> &PositioningSession {
        &self.session
    }

    pub fn into_session(self) -> PositioningSession {
        self.session
    }

    fn next_handle(&mut self) -> CallbackHandle {
        self.callback_counter += 1;
        CallbackHandle(self.callback_counter)
    }

    fn trigger_event(&self, event: SessionEvent) {
        for callback in self.event_callbacks.values() {
            callback(event.clone());
        }
    }
}
