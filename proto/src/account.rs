// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device-attested addresses and durable signer accounts
//!

use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{airgap::payload_checksum, chain::Chain, device::DeviceType, path::DerivationPath};

/// Address computed (and optionally displayed) by a device for a
/// derivation path.
///
/// Ephemeral: becomes authoritative only once the user has confirmed it
/// against the device's own screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressResult {
    pub address: String,
    pub public_key: Option<Vec<u8>>,
    pub path: DerivationPath,
}

/// Identity key for account de-duplication
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountIdentity {
    pub device_type: DeviceType,
    pub chain: Chain,
    pub derivation_path: DerivationPath,
}

/// Durable record linking a device, chain and derivation path to a
/// verified address.
///
/// Never silently mutated; a changed path or address is a new account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareWalletAccount {
    pub id: String,
    pub device_type: DeviceType,
    pub chain: Chain,
    pub derivation_path: DerivationPath,
    pub address: String,
    pub public_key: Option<Vec<u8>>,
}

impl HardwareWalletAccount {
    /// Build an account record from a device-attested address.
    ///
    /// The id is deterministic over the account identity, so re-adding
    /// the same device/chain/path maps onto the same record.
    pub fn new(device_type: DeviceType, chain: Chain, result: AddressResult) -> Self {
        let tag = format!("{}|{}|{}", device_type.display_name(), chain, result.path);
        Self {
            id: payload_checksum(tag.as_bytes()),
            device_type,
            chain,
            derivation_path: result.path,
            address: result.address,
            public_key: result.public_key,
        }
    }

    /// De-duplication identity: `(device_type, chain, derivation_path)`
    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            device_type: self.device_type,
            chain: self.chain,
            derivation_path: self.derivation_path.clone(),
        }
    }

    /// Public key as hex, where the device returned one
    pub fn public_key_hex(&self) -> Option<String> {
        self.public_key.as_ref().map(hex::encode)
    }
}

impl Display for HardwareWalletAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.device_type.display_name(),
            self.chain.symbol(),
            self.derivation_path,
            self.address,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LedgerModel;

    fn result(path: &str) -> AddressResult {
        AddressResult {
            address: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string(),
            public_key: Some(vec![0x02; 33]),
            path: path.parse().unwrap(),
        }
    }

    #[test]
    fn identity_ignores_address() {
        let a = HardwareWalletAccount::new(
            DeviceType::Ledger(LedgerModel::NanoX),
            Chain::Ethereum,
            result("m/44'/60'/0'/0/0"),
        );
        let b = HardwareWalletAccount::new(
            DeviceType::Ledger(LedgerModel::NanoX),
            Chain::Ethereum,
            AddressResult {
                address: "0x0000000000000000000000000000000000000000".to_string(),
                public_key: None,
                path: "m/44'/60'/0'/0/0".parse().unwrap(),
            },
        );

        // Same device / chain / path map onto the same record id even
        // when the attested address differs
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn identity_differs_per_path() {
        let a = HardwareWalletAccount::new(
            DeviceType::Ledger(LedgerModel::NanoX),
            Chain::Ethereum,
            result("m/44'/60'/0'/0/0"),
        );
        let b = HardwareWalletAccount::new(
            DeviceType::Ledger(LedgerModel::NanoX),
            Chain::Ethereum,
            result("m/44'/60'/0'/0/1"),
        );

        assert_ne!(a.identity(), b.identity());
        assert_ne!(a.id, b.id);
    }
}
