// Copyright (c) 2022-2023 The MobileCoin Foundation

//! [`Signer`] capability trait, wrapping vendor device protocols
//!

use async_trait::async_trait;

use coldsign_proto::{
    account::AddressResult,
    chain::Chain,
    device::{ConnectionStatus, DiscoveredDevice},
    path::DerivationPath,
    tx::{HardwareWalletTransaction, SignatureResult},
};

/// Errors surfaced by signer backends.
///
/// Flow state machines pass these through verbatim; presentation is the
/// caller's concern.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SignerError {
    /// Device did not respond to the handshake
    #[error("device unreachable")]
    Unreachable,

    /// Link dropped mid-session
    #[error("device link dropped")]
    LinkDropped,

    /// Device is servicing another operation
    #[error("device busy")]
    DeviceBusy,

    /// Device requires a PIN / unlock first
    #[error("device locked")]
    DeviceLocked,

    /// User declined the operation on-device
    #[error("operation rejected by user on device")]
    DeviceRejected,

    /// The device refused the derivation path
    #[error("derivation path rejected by device")]
    InvalidPath,

    /// Timeout waiting for on-device interaction
    #[error("timeout waiting for device interaction")]
    UserTimeout,

    /// Backend-specific failure, preformatted by the backend
    #[error("{0}")]
    Other(String),
}

/// Signer backend capability.
///
/// Implementations wrap the actual cryptographic / vendor-protocol
/// logic (APDU exchanges, QR-signer firmware, a simulator in tests).
/// All operations may suspend for seconds pending human action on the
/// device and are expected to be cancel-safe: dropping the returned
/// future must leave the device in a disconnect-or-retry-safe state.
#[async_trait]
pub trait Signer: Send + Sync + 'static {
    /// Open a logical session to the device, performing the handshake.
    ///
    /// Returns the resulting status; `RequiresAppOpen` is not an error.
    async fn connect(
        &self,
        device: &DiscoveredDevice,
        chain: Chain,
    ) -> Result<ConnectionStatus, SignerError>;

    /// Re-query connection status for an open session
    async fn status(
        &self,
        device: &DiscoveredDevice,
        chain: Chain,
    ) -> Result<ConnectionStatus, SignerError>;

    /// Derive the address for `path` on `chain`.
    ///
    /// With `verify` set the device renders the address on its own
    /// screen during the call; the call itself never reports user
    /// confirmation, which is a separate explicit step.
    async fn derive_address(
        &self,
        device: &DiscoveredDevice,
        path: &DerivationPath,
        chain: Chain,
        verify: bool,
    ) -> Result<AddressResult, SignerError>;

    /// Resolve once the user acknowledges the pending operation on the
    /// device ("button pressed"), or fail with
    /// [`SignerError::DeviceRejected`] / [`SignerError::UserTimeout`]
    async fn await_confirmation(&self, device: &DiscoveredDevice) -> Result<(), SignerError>;

    /// Sign the transaction with the key at `path`
    async fn sign(
        &self,
        device: &DiscoveredDevice,
        path: &DerivationPath,
        transaction: &HardwareWalletTransaction,
        chain: Chain,
    ) -> Result<SignatureResult, SignerError>;

    /// Tear down any device-side session state
    async fn disconnect(&self, device: &DiscoveredDevice) {
        let _ = device;
    }
}
