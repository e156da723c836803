// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Air-gap optical transport: request encoding, chunked frames, reassembly
//!
//! Signing requests cross the trust boundary as displayed QR codes and
//! signatures return the same way; no electrical or radio link exists.
//! Payloads small enough for one code are a single base64 frame; larger
//! payloads are split into [`MultiPartFrame`]s cycled on a fixed-rate
//! timer, each frame self-describing its position so a scanner can
//! resynchronize from any point in the cycle.
//!
//! The [`MultiPartFrame`] JSON shape (`index`, `total`, `data`,
//! `checksum`) is an interoperability contract; do not change it.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::chain::Chain;

/// Serialized requests below this size fit a single (un-animated) frame
pub const SINGLE_FRAME_LIMIT: usize = 500;

/// Chunk size for multi-part transfers
pub const FRAME_CHUNK_SIZE: usize = 300;

/// Fixed animation rate for multi-part transfers
pub const FRAMES_PER_SECOND: u32 = 8;

/// Interval between animated frames
pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / FRAMES_PER_SECOND as u64);

/// Air-gap transport errors
#[derive(Debug, thiserror::Error)]
pub enum AirGapError {
    /// Scanned code is neither a frame JSON nor valid base64
    #[error("scanned code is not a valid frame")]
    InvalidQrFormat,

    /// Frame index outside the declared transfer
    #[error("frame {index} out of range for a transfer of {total} parts")]
    FrameOutOfRange { index: usize, total: usize },

    /// Frame checksum / total disagrees with the transfer in progress
    #[error("frame does not belong to the transfer in progress")]
    FrameMismatch,

    /// Requests must carry a payload
    #[error("empty request payload")]
    EmptyPayload,

    /// Frame / request serialization failure
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// First eight bytes of SHA-256 over `payload`, hex encoded.
///
/// Used as the whole-transfer tag on every frame and as the request's
/// own payload checksum.
pub fn payload_checksum(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    hex::encode(&digest[..8])
}

/// Air-gap request kinds
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AirGapRequestKind {
    SignTransaction,
    SignMessage,
    SignTypedData,
    #[serde(rename = "signPSBT")]
    SignPsbt,
}

/// Signing request carried over the optical transport.
///
/// Immutable; constructed once per signing attempt so regeneration of
/// the outbound frames is idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirGapRequest {
    #[serde(rename = "type")]
    pub kind: AirGapRequestKind,
    pub chain: Chain,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    pub checksum: String,
}

impl AirGapRequest {
    /// Create a request, computing the payload checksum
    pub fn new(kind: AirGapRequestKind, chain: Chain, payload: Vec<u8>) -> Result<Self, AirGapError> {
        if payload.is_empty() {
            return Err(AirGapError::EmptyPayload);
        }
        let checksum = payload_checksum(&payload);
        Ok(Self {
            kind,
            chain,
            payload,
            checksum,
        })
    }

    /// Transaction-signing request
    pub fn sign_transaction(chain: Chain, payload: Vec<u8>) -> Result<Self, AirGapError> {
        Self::new(AirGapRequestKind::SignTransaction, chain, payload)
    }

    /// Message-signing request
    pub fn sign_message(chain: Chain, payload: Vec<u8>) -> Result<Self, AirGapError> {
        Self::new(AirGapRequestKind::SignMessage, chain, payload)
    }

    /// Typed-data (EIP-712) signing request
    pub fn sign_typed_data(chain: Chain, payload: Vec<u8>) -> Result<Self, AirGapError> {
        Self::new(AirGapRequestKind::SignTypedData, chain, payload)
    }

    /// PSBT signing request
    pub fn sign_psbt(payload: Vec<u8>) -> Result<Self, AirGapError> {
        Self::new(AirGapRequestKind::SignPsbt, Chain::Bitcoin, payload)
    }

    /// Check the embedded checksum against the payload
    pub fn verify_checksum(&self) -> bool {
        payload_checksum(&self.payload) == self.checksum
    }

    /// Serialize for frame chunking
    pub fn to_bytes(&self) -> Result<Vec<u8>, AirGapError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a reassembled request
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AirGapError> {
        serde_json::from_slice(bytes).map_err(|_| AirGapError::InvalidQrFormat)
    }
}

/// One frame of a multi-part transfer.
///
/// The checksum is the whole-transfer tag repeated on every frame so a
/// scanner can tell from any single frame which transfer it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPartFrame {
    pub index: usize,
    pub total: usize,
    pub data: String,
    pub checksum: String,
}

impl MultiPartFrame {
    /// Render to the on-wire frame string
    pub fn to_frame_string(&self) -> Result<String, AirGapError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Encode a request into displayable frame strings.
///
/// Serialized requests under [`SINGLE_FRAME_LIMIT`] become one raw
/// base64 frame; anything larger is chunked into [`FRAME_CHUNK_SIZE`]
/// byte [`MultiPartFrame`]s. Deterministic for a given request.
pub fn encode_frames(request: &AirGapRequest) -> Result<Vec<String>, AirGapError> {
    let bytes = request.to_bytes()?;

    if bytes.len() < SINGLE_FRAME_LIMIT {
        return Ok(vec![BASE64.encode(&bytes)]);
    }

    let total = (bytes.len() + FRAME_CHUNK_SIZE - 1) / FRAME_CHUNK_SIZE;
    let mut frames = Vec::with_capacity(total);

    for (index, chunk) in bytes.chunks(FRAME_CHUNK_SIZE).enumerate() {
        let frame = MultiPartFrame {
            index,
            total,
            data: BASE64.encode(chunk),
            checksum: request.checksum.clone(),
        };
        frames.push(frame.to_frame_string()?);
    }

    Ok(frames)
}

/// Restartable, indefinitely looping frame sequence for animated display
#[derive(Clone, Debug)]
pub struct FrameCycle {
    frames: Vec<String>,
    next: usize,
}

impl FrameCycle {
    pub fn new(frames: Vec<String>) -> Self {
        Self { frames, next: 0 }
    }

    /// Number of distinct frames in one cycle
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when the sequence needs animation (more than one frame)
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Rewind to the first frame
    pub fn restart(&mut self) {
        self.next = 0;
    }
}

/// Yields frames forever, wrapping at the end of the cycle
impl Iterator for FrameCycle {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Some(frame)
    }
}

/// Outcome of feeding one scanned code to the decoder
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Transfer complete, payload reassembled
    Complete(Vec<u8>),
    /// More frames outstanding
    Partial { received: usize, total: usize },
}

/// Inbound decoder: accepts raw base64 single frames and multi-part
/// frame JSON, reassembling the latter by `index`/`total`/`checksum`.
///
/// Frames may arrive in any order and repeats are harmless.
#[derive(Debug, Default)]
pub struct AirGapDecoder {
    parts: BTreeMap<usize, Vec<u8>>,
    total: Option<usize>,
    checksum: Option<String>,
}

impl AirGapDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any in-progress transfer
    pub fn reset(&mut self) {
        self.parts.clear();
        self.total = None;
        self.checksum = None;
    }

    /// Frames received for the transfer in progress
    pub fn received(&self) -> usize {
        self.parts.len()
    }

    /// Feed one scanned code.
    ///
    /// Multi-part frames are JSON objects; the base64 alphabet never
    /// contains `{`, so anything else is treated as a single raw frame.
    pub fn receive(&mut self, code: &str) -> Result<ScanOutcome, AirGapError> {
        let code = code.trim();

        if code.starts_with('{') {
            let frame: MultiPartFrame =
                serde_json::from_str(code).map_err(|_| AirGapError::InvalidQrFormat)?;
            return self.receive_frame(frame);
        }

        let bytes = BASE64.decode(code).map_err(|_| AirGapError::InvalidQrFormat)?;
        Ok(ScanOutcome::Complete(bytes))
    }

    fn receive_frame(&mut self, frame: MultiPartFrame) -> Result<ScanOutcome, AirGapError> {
        if frame.total == 0 || frame.index >= frame.total {
            return Err(AirGapError::FrameOutOfRange {
                index: frame.index,
                total: frame.total,
            });
        }

        // A frame from a different transfer never corrupts the one in
        // progress
        if self.total.map_or(false, |t| t != frame.total)
            || self.checksum.as_ref().map_or(false, |c| *c != frame.checksum)
        {
            return Err(AirGapError::FrameMismatch);
        }

        let data = BASE64
            .decode(&frame.data)
            .map_err(|_| AirGapError::InvalidQrFormat)?;

        self.total = Some(frame.total);
        self.checksum = Some(frame.checksum);
        self.parts.insert(frame.index, data);

        let total = self.total.unwrap_or(0);
        if self.parts.len() == total {
            let mut payload = vec![];
            for part in self.parts.values() {
                payload.extend_from_slice(part);
            }
            self.reset();
            return Ok(ScanOutcome::Complete(payload));
        }

        Ok(ScanOutcome::Partial {
            received: self.parts.len(),
            total,
        })
    }
}

/// Serialize byte payloads as base64 strings
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s).map_err(de::Error::custom)
    }
}
