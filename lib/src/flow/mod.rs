// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Guided flow state machines
//!
//! Each flow owns a single state variable with strictly sequential
//! transitions and publishes state changes on a single-consumer
//! channel; long-running device operations run under the flow's
//! [`CancelToken`] so a user-initiated cancel interrupts them promptly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::{Error, ErrorClass};

pub mod airgap;
pub mod setup;
pub mod signing;

pub use airgap::{AirGapFlow, AirGapState};
pub use setup::{SetupFlow, SetupState};
pub use signing::{SigningFlow, SigningState};

/// Terminal error payload carried by flow `Error` states
#[derive(Clone, Debug, PartialEq)]
pub struct FlowError {
    /// Human readable message
    pub message: String,
    /// Classification, so security failures are never presented as
    /// retryable connectivity issues
    pub class: ErrorClass,
}

impl From<&Error> for FlowError {
    fn from(e: &Error) -> Self {
        Self {
            message: e.to_string(),
            class: e.class(),
        }
    }
}

/// Cancellation handle shared between a flow and its caller.
///
/// Cheap to clone; firing is sticky and observed by every in-flight
/// operation of the flow.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender kept alive by the token itself; unreachable
                futures::future::pending::<()>().await;
            }
        }
    }

    /// Sleep, aborting early with [`Error::Cancelled`] on cancellation
    pub async fn sleep(&self, duration: Duration) -> Result<(), Error> {
        tokio::select! {
            _ = self.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `fut` unless the token fires first
pub(crate) async fn with_cancel<T>(
    cancel: &CancelToken,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        r = fut => r,
    }
}
