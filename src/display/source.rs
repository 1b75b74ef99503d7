//! Frame event transport between the core and the presentation pipeline.
//!
//! One consumer at a time, at most one pending frame. A new frame pushed over
//! an undelivered one replaces it, so a slow consumer only ever sees the
//! latest image.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, trace, warn};
use thiserror::Error;

use super::PRESENT_FRAME_EVENT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscribeError {
    #[error("no frame events are published under {0:?}")]
    UnknownEvent(String),
    #[error("frame events already have a subscriber")]
    AlreadySubscribed,
}

/// All emitters are gone; no further frames will arrive.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("frame source closed")]
pub struct SourceClosed;

/// Called on the producer thread after a frame is queued for the consumer.
pub type Waker = Box<dyn Fn() + Send>;

type SharedWaker = Arc<Mutex<Option<Waker>>>;

pub fn channel() -> (FrameEmitter, FrameSource) {
    let (tx, rx) = bounded(1);
    let active = Arc::new(AtomicBool::new(false));
    let waker = SharedWaker::default();

    let emitter = FrameEmitter {
        tx,
        rx: rx.clone(),
        active: active.clone(),
        waker: waker.clone(),
    };
    let source = FrameSource { rx, active, waker };
    (emitter, source)
}

/// Producer half, held by the core.
#[derive(Clone)]
pub struct FrameEmitter {
    tx: Sender<Vec<u8>>,
    // Used to evict a stale frame when the slot is full.
    rx: Receiver<Vec<u8>>,
    active: Arc<AtomicBool>,
    waker: SharedWaker,
}

impl FrameEmitter {
    /// Pushes a frame and wakes the consumer. Returns false when nobody is
    /// subscribed and the frame was discarded.
    pub fn emit(&self, frame: Vec<u8>) -> bool {
        if !self.active.load(Ordering::Acquire) {
            trace!("Dropping frame, no subscriber.");
            return false;
        }

        let queued = match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                trace!("Replacing undelivered frame.");
                let _ = self.rx.try_recv();
                self.tx.try_send(frame).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        };
        if queued {
            self.wake();
        }
        queued
    }

    fn wake(&self) {
        let Ok(waker) = self.waker.lock() else {
            warn!("Frame waker lock poisoned, consumer not woken.");
            return;
        };
        if let Some(wake) = waker.as_ref() {
            wake();
        }
    }
}

/// Consumer half. Hands out at most one live [`Subscription`].
pub struct FrameSource {
    rx: Receiver<Vec<u8>>,
    active: Arc<AtomicBool>,
    waker: SharedWaker,
}

impl FrameSource {
    /// Registers the callback run on every queued frame, replacing any
    /// earlier one. This is how an event loop learns that a frame is ready
    /// without polling.
    pub fn set_waker(&self, waker: impl Fn() + Send + 'static) {
        match self.waker.lock() {
            Ok(mut slot) => *slot = Some(Box::new(waker)),
            Err(_) => warn!("Frame waker lock poisoned, waker not set."),
        }
    }

    pub fn subscribe(&self, event: &str) -> Result<Subscription, SubscribeError> {
        if event != PRESENT_FRAME_EVENT {
            return Err(SubscribeError::UnknownEvent(event.to_string()));
        }
        if self.active.swap(true, Ordering::AcqRel) {
            return Err(SubscribeError::AlreadySubscribed);
        }

        // Frames left over from a previous subscriber are stale.
        while self.rx.try_recv().is_ok() {}

        debug!("Subscribed to {:?}.", event);
        Ok(Subscription {
            rx: self.rx.clone(),
            active: self.active.clone(),
        })
    }
}

/// Live subscription. Dropping it cancels delivery.
pub struct Subscription {
    rx: Receiver<Vec<u8>>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Next pending frame, if any, without blocking.
    pub fn try_next(&self) -> Result<Option<Vec<u8>>, SourceClosed> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SourceClosed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        debug!("Cancelled subscription to {:?}.", PRESENT_FRAME_EVENT);
    }
}
