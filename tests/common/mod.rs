#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use chat_relay::{
    AttachmentRef, DestinationId, FetchError, FetchedMedia, InboundFetcher, OutboundPayload,
    OutboundTransport, SendError,
};

/// Outbound transport double: records every send attempt, with
/// per-destination scripted failures and hangs.
#[derive(Default)]
pub struct RecordingOutbound {
    pub attempts: Mutex<Vec<(DestinationId, OutboundPayload)>>,
    pub failing: Mutex<HashSet<String>>,
    pub hanging: Mutex<HashSet<String>>,
    pub connects: AtomicUsize,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_destination(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn hang_destination(&self, id: &str) {
        self.hanging.lock().unwrap().insert(id.to_string());
    }

    pub fn attempts(&self) -> Vec<(DestinationId, OutboundPayload)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutboundTransport for RecordingOutbound {
    async fn connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    async fn send(
        &self,
        destination: &DestinationId,
        payload: &OutboundPayload,
    ) -> Result<(), SendError> {
        if self.hanging.lock().unwrap().contains(&destination.0) {
            std::future::pending::<()>().await;
        }

        self.attempts
            .lock()
            .unwrap()
            .push((destination.clone(), payload.clone()));

        if self.failing.lock().unwrap().contains(&destination.0) {
            return Err(SendError::Rejected);
        }
        Ok(())
    }
}

/// Inbound fetcher double: serves scripted media by reference.
#[derive(Default)]
pub struct RecordingFetcher {
    media: Mutex<HashMap<String, FetchedMedia>>,
    pub fetches: AtomicUsize,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_media(&self, fetch_ref: &str, media: FetchedMedia) {
        self.media
            .lock()
            .unwrap()
            .insert(fetch_ref.to_string(), media);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InboundFetcher for RecordingFetcher {
    async fn fetch_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FetchedMedia, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.media
            .lock()
            .unwrap()
            .get(&attachment.fetch_ref)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}
