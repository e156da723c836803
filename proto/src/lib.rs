// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / data definitions for external signer communication
//!
//! This crate provides the shared data model for talking to external
//! signing devices (USB / Bluetooth hardware wallets and air-gapped
//! QR signers): derivation paths, chain and device metadata, account
//! records, transaction envelopes, and the chunked optical-frame codec
//! used by the air-gap transport.
//!
//! The [`airgap::MultiPartFrame`] JSON shape is the only bit-level
//! contract that must be reproduced exactly for two implementations to
//! interoperate; everything else in this crate is host-side state.

pub mod account;
pub mod airgap;
pub mod chain;
pub mod device;
pub mod path;
pub mod prelude;
pub mod tx;
