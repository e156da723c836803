// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Flow timing and behaviour configuration
//!

use std::time::Duration;

use coldsign_proto::{airgap::FRAME_INTERVAL, path::DerivationPath};

/// Setup flow configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetupConfig {
    /// Derivation path to pair; the chain default when unset
    pub derivation_path: Option<DerivationPath>,
}

/// Signing flow configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SigningConfig {
    /// Courtesy window for the user to physically attach the device
    pub discovery_timeout: Duration,

    /// Discovery / readiness poll interval
    pub poll_interval: Duration,

    /// Window for the user to open the required on-device app
    pub ready_timeout: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// Air-gap flow configuration
#[derive(Clone, Debug, PartialEq)]
pub struct AirGapConfig {
    /// Interval between animated outbound frames
    pub frame_interval: Duration,

    /// Transient pause shown between scan completion and `Complete`
    pub processing_delay: Duration,
}

impl Default for AirGapConfig {
    fn default() -> Self {
        Self {
            frame_interval: FRAME_INTERVAL,
            processing_delay: Duration::from_millis(500),
        }
    }
}
