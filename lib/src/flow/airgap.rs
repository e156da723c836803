// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Air-gapped signing flow
//!
//! Moves a signing request out to, and a signature back from, a device
//! with no electrical or radio link: the request is rendered as (one
//! or a cycle of) optical frames, the signed payload is scanned back.

use std::sync::Mutex as StdMutex;

use futures::{future::Either, stream, Stream};
use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};

use coldsign_proto::airgap::{encode_frames, AirGapDecoder, AirGapRequest, FrameCycle, ScanOutcome};

use crate::{config::AirGapConfig, flow::FlowError, Error};

/// Air-gap flow states
#[derive(Clone, Debug, strum::Display)]
pub enum AirGapState {
    /// Outbound frames ready for display / animation
    DisplayRequest { frames: Vec<String> },
    /// Waiting for the signed payload to be scanned back
    ScanSignature,
    /// Scan complete; transient pause before the result is surfaced
    Processing,
    /// Signed payload delivered
    Complete { signature: Vec<u8> },
    /// Terminal failure for this attempt
    Error { error: FlowError },
}

/// Air-gapped signing flow for one request.
///
/// The request is immutable and the frames are encoded once at
/// construction, so [`AirGapFlow::retry`] restarts with outbound
/// frames identical to the first attempt.
pub struct AirGapFlow {
    request: AirGapRequest,
    frames: Vec<String>,
    config: AirGapConfig,
    state: Mutex<AirGapState>,
    events: StdMutex<Option<mpsc::Sender<AirGapState>>>,
    decoder: Mutex<AirGapDecoder>,
}

impl AirGapFlow {
    /// Create a flow for the request, encoding the outbound frames
    pub fn new(request: AirGapRequest, config: AirGapConfig) -> Result<Self, Error> {
        let frames = encode_frames(&request)?;
        Ok(Self {
            request,
            state: Mutex::new(AirGapState::DisplayRequest {
                frames: frames.clone(),
            }),
            frames,
            config,
            events: StdMutex::new(None),
            decoder: Mutex::new(AirGapDecoder::new()),
        })
    }

    /// Request carried by this flow
    pub fn request(&self) -> &AirGapRequest {
        &self.request
    }

    /// Outbound frames for this request
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Begin the outbound leg: returns the state stream, starting with
    /// `DisplayRequest`
    pub async fn begin_outbound(&self) -> mpsc::Receiver<AirGapState> {
        let (tx, rx) = mpsc::channel(16);
        *self.events.lock().unwrap() = Some(tx);

        self.publish(AirGapState::DisplayRequest {
            frames: self.frames.clone(),
        })
        .await;

        rx
    }

    /// Current state snapshot
    pub async fn state(&self) -> AirGapState {
        self.state.lock().await.clone()
    }

    /// Outbound frames as a timed stream.
    ///
    /// A single frame is yielded once; a multi-part transfer cycles
    /// indefinitely at the configured fixed rate, so the far side can
    /// resynchronize from any point in the cycle.
    pub fn frame_stream(&self) -> impl Stream<Item = String> + Send {
        let cycle = FrameCycle::new(self.frames.clone());

        if !cycle.is_animated() {
            return Either::Left(stream::iter(self.frames.clone()));
        }

        let interval = tokio::time::interval(self.config.frame_interval);
        let animated = stream::unfold((cycle, interval), |(mut cycle, mut interval)| async move {
            interval.tick().await;
            cycle.next().map(|frame| (frame, (cycle, interval)))
        });

        Either::Right(animated)
    }

    /// User flipped from displaying the request to scanning the
    /// signature
    pub async fn proceed_to_scan(&self) {
        let state = self.state.lock().await.clone();
        if !matches!(state, AirGapState::DisplayRequest { .. }) {
            warn!("proceed_to_scan ignored in state {state}");
            return;
        }

        self.publish(AirGapState::ScanSignature).await;
    }

    /// Feed one scanned code.
    ///
    /// Partial multi-part transfers stay in `ScanSignature`; a complete
    /// payload moves through `Processing` to `Complete`; an invalid
    /// code is a terminal error for this attempt.
    pub async fn submit_scanned_code(&self, code: &str) {
        let state = self.state.lock().await.clone();
        if !matches!(state, AirGapState::ScanSignature) {
            warn!("submit_scanned_code ignored in state {state}");
            return;
        }

        let outcome = self.decoder.lock().await.receive(code);
        match outcome {
            Ok(ScanOutcome::Complete(signature)) => {
                self.publish(AirGapState::Processing).await;

                // Transient pause so a UI can show the processing state
                tokio::time::sleep(self.config.processing_delay).await;

                self.publish(AirGapState::Complete { signature }).await;
            }
            Ok(ScanOutcome::Partial { received, total }) => {
                debug!("scan progress: {received}/{total} frames");
            }
            Err(e) => {
                self.fail(&Error::AirGap(e)).await;
            }
        }
    }

    /// Restart from `DisplayRequest` after an error or abandoned scan,
    /// with frames identical to the first attempt
    pub async fn retry(&self) {
        self.decoder.lock().await.reset();

        self.publish(AirGapState::DisplayRequest {
            frames: self.frames.clone(),
        })
        .await;
    }

    async fn fail(&self, error: &Error) {
        self.publish(AirGapState::Error {
            error: FlowError::from(error),
        })
        .await;
    }

    async fn publish(&self, state: AirGapState) {
        debug!("air-gap state: {state}");
        *self.state.lock().await = state.clone();

        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(state).await;
        }
    }
}
