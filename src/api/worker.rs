//! Single-thread owner of a positioning session.
//!
//! Scanner callbacks may fire on any thread. They only enqueue; all session
//! mutation happens on the worker thread, one message at a time.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::api::callback::CallbackPositioningApi;
use crate::api::types::{ApiError, ApiResult};
use crate::core::{AnchorPoint, BeaconSample};

enum WorkerMessage {
    Bundle(Vec<BeaconSample>),
    AnchorFeed(Vec<AnchorPoint>),
}

pub struct SessionWorker {
    sender: Option<Sender<WorkerMessage>>,
    handle: Option<JoinHandle<CallbackPositioningApi>>,
}

impl SessionWorker {
    /// Move the API onto its own thread
    pub fn spawn(mut api: CallbackPositioningApi) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerMessage>();

        let handle = thread::spawn(move || {
            let mut processed = 0u64;
            for message in receiver {
                match message {
                    WorkerMessage::Bundle(bundle) => {
                        api.handle_bundle(&bundle);
                        processed += 1;
                    }
                    WorkerMessage::AnchorFeed(feed) => {
                        api.stage_anchor_feed(feed);
                    }
                }
            }
            info!(processed, "session worker stopped");
            api
        });
        debug!("session worker started");

        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Queue a ranging bundle. Safe to call from any thread holding a sender.
    pub fn submit_bundle(&self, bundle: Vec<BeaconSample>) -> ApiResult<()> {
        self.send(WorkerMessage::Bundle(bundle))
    }

    pub fn stage_anchor_feed(&self, feed: Vec<AnchorPoint>) -> ApiResult<()> {
        self.send(WorkerMessage::AnchorFeed(feed))
    }

    /// Cloneable handle for producer threads
    pub fn submitter(&self) -> ApiResult<BundleSubmitter> {
        self.sender
            .clone()
            .map(|sender| BundleSubmitter { sender })
            .ok_or(ApiError::WorkerStopped)
    }

    /// Process everything already queued, stop the thread and hand the API back
    pub fn shutdown(mut self) -> ApiResult<CallbackPositioningApi> {
        self.sender.take();
        let handle = self.handle.take().ok_or(ApiError::WorkerStopped)?;
        handle.join().map_err(|_| ApiError::WorkerPanicked)
    }

    fn send(&self, message: WorkerMessage) -> ApiResult<()> {
        let sender = self.sender.as_ref().ok_or(ApiError::WorkerStopped)?;
        sender.send(message).map_err(|_| ApiError::WorkerStopped)
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Producer-side handle onto a [`SessionWorker`] queue
#[derive(Clone)]
pub struct BundleSubmitter {
    sender: Sender<WorkerMessage>,
}

impl BundleSubmitter {
    pub fn submit(&self, bundle: Vec<BeaconSample>) -> ApiResult<()> {
        self.sender
            .send(WorkerMessage::Bundle(bundle))
            .map_err(|_| ApiError::WorkerStopped)
    }
}
