// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction envelopes passed to signing devices
//!

use serde::{Deserialize, Serialize};

use crate::{chain::Chain, path::DerivationPath};

/// Human-auditable projection of a transaction payload.
///
/// Supplied by the caller, derived independently from the raw bytes;
/// used for UI display only and never a substitute for on-device
/// confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDisplayInfo {
    /// Operation label ("Send", "Swap", ...)
    pub tx_type: String,
    pub amount: Option<String>,
    pub recipient: Option<String>,
    pub fee: Option<String>,
    pub network: Option<String>,
}

/// Transaction (or message) pending an external signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareWalletTransaction {
    /// Raw payload to be signed, opaque to this layer
    pub raw_data: Vec<u8>,
    /// Optional display projection for user audit
    pub display_info: Option<TransactionDisplayInfo>,
}

impl HardwareWalletTransaction {
    pub fn new(raw_data: Vec<u8>) -> Self {
        Self {
            raw_data,
            display_info: None,
        }
    }

    pub fn with_display_info(mut self, info: TransactionDisplayInfo) -> Self {
        self.display_info = Some(info);
        self
    }
}

/// Signature produced by an external signer.
///
/// Opaque bytes plus the metadata a caller needs to assemble the fully
/// signed transaction. Produced once per signing session, never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResult {
    pub bytes: Vec<u8>,
    pub chain: Chain,
    pub path: DerivationPath,
}
