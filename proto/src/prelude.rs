// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    account::{AccountIdentity, AddressResult, HardwareWalletAccount},
    airgap::{
        encode_frames, payload_checksum, AirGapDecoder, AirGapError, AirGapRequest,
        AirGapRequestKind, FrameCycle, MultiPartFrame, ScanOutcome, FRAMES_PER_SECOND,
        FRAME_CHUNK_SIZE, FRAME_INTERVAL, SINGLE_FRAME_LIMIT,
    },
    chain::Chain,
    device::{
        ConnectionStatus, ConnectionType, DeviceId, DeviceType, DiscoveredDevice, LedgerModel,
        TrezorModel,
    },
    path::{ChildIndex, DerivationPath, PathError, HARDENED},
    tx::{HardwareWalletTransaction, SignatureResult, TransactionDisplayInfo},
};
