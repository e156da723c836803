// Copyright (c) 2022-2023 The MobileCoin Foundation

use coldsign_proto::{airgap::AirGapError, chain::Chain, path::PathError};

use crate::signer::SignerError;

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No device available for the requested operation
    #[error("no matching device available")]
    NoDevice,

    /// Discovery wait expired without the target device appearing
    #[error("device not found within {0} seconds")]
    DeviceNotFound(u64),

    /// Malformed derivation path
    #[error("invalid derivation path: {0}")]
    InvalidPath(#[from] PathError),

    /// Derivation path does not fit the chain
    #[error("derivation path coin type {coin_type:?} does not match {chain} (expected {expected})")]
    ChainMismatch {
        chain: Chain,
        expected: u32,
        coin_type: Option<u32>,
    },

    /// User declared the device-displayed address different from ours
    #[error("address mismatch: the address shown on the device does not match")]
    AddressMismatch,

    /// Timeout waiting for user interaction
    #[error("timeout waiting for user interaction")]
    UserTimeout,

    /// Operation cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Signer backend error, surfaced verbatim
    #[error("{0}")]
    Signer(#[from] SignerError),

    /// Air-gap transport error
    #[error("air-gap transport: {0}")]
    AirGap(#[from] AirGapError),

    /// Account persistence error
    #[error("account store: {0}")]
    Store(String),

    /// Flow method called in a state that does not accept it
    #[error("operation invalid in state {0}")]
    InvalidState(String),
}

/// Coarse error classification for presentation.
///
/// Security failures (address mismatch, on-device rejection) must be
/// distinguishable from transient connectivity failures so a UI never
/// suggests "try again" for them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ErrorClass {
    Connectivity,
    Derivation,
    Security,
    Signing,
    Transport,
    Storage,
}

impl Error {
    /// Classify for presentation
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NoDevice
            | Error::DeviceNotFound(_)
            | Error::UserTimeout
            | Error::Cancelled
            | Error::InvalidState(_) => ErrorClass::Connectivity,

            Error::InvalidPath(_) | Error::ChainMismatch { .. } => ErrorClass::Derivation,

            Error::AddressMismatch => ErrorClass::Security,

            Error::Signer(e) => match e {
                SignerError::DeviceRejected => ErrorClass::Security,
                SignerError::Unreachable
                | SignerError::LinkDropped
                | SignerError::DeviceBusy
                | SignerError::DeviceLocked
                | SignerError::UserTimeout => ErrorClass::Connectivity,
                SignerError::InvalidPath => ErrorClass::Derivation,
                SignerError::Other(_) => ErrorClass::Signing,
            },

            Error::AirGap(_) => ErrorClass::Transport,
            Error::Store(_) => ErrorClass::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_failures_are_not_connectivity() {
        assert_eq!(Error::AddressMismatch.class(), ErrorClass::Security);
        assert_eq!(
            Error::Signer(SignerError::DeviceRejected).class(),
            ErrorClass::Security
        );
        assert_eq!(Error::DeviceNotFound(30).class(), ErrorClass::Connectivity);
    }

    #[test]
    fn signer_errors_display_verbatim() {
        let e = Error::Signer(SignerError::Other("E1234: blind signing disabled".into()));
        assert_eq!(e.to_string(), "E1234: blind signing disabled");
    }
}
