// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Supported chain metadata
//!

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::path::{purposes, ChildIndex, DerivationPath};

/// Chain identifier, carrying per-chain derivation constants
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Litecoin,
    Dogecoin,
    Ethereum,
    Polygon,
    Solana,
}

impl Chain {
    /// Ticker symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Litecoin => "LTC",
            Chain::Dogecoin => "DOGE",
            Chain::Ethereum => "ETH",
            Chain::Polygon => "MATIC",
            Chain::Solana => "SOL",
        }
    }

    /// Human readable chain name
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "Bitcoin",
            Chain::Litecoin => "Litecoin",
            Chain::Dogecoin => "Dogecoin",
            Chain::Ethereum => "Ethereum",
            Chain::Polygon => "Polygon",
            Chain::Solana => "Solana",
        }
    }

    /// SLIP-0044 coin type used in derivation paths.
    ///
    /// EVM chains share coin type 60, following common wallet practice.
    pub fn coin_type(&self) -> u32 {
        match self {
            Chain::Bitcoin => 0,
            Chain::Litecoin => 2,
            Chain::Dogecoin => 3,
            Chain::Ethereum | Chain::Polygon => 60,
            Chain::Solana => 501,
        }
    }

    /// Default account-zero derivation path for first-time setup
    pub fn default_derivation_path(&self) -> DerivationPath {
        let coin = self.coin_type();
        match self {
            // Native SegWit for the UTXO chains that support it
            Chain::Bitcoin | Chain::Litecoin => DerivationPath::new(vec![
                ChildIndex::hardened(purposes::BIP84),
                ChildIndex::hardened(coin),
                ChildIndex::hardened(0),
                ChildIndex::normal(0),
                ChildIndex::normal(0),
            ]),
            // Solana convention: four components, all hardened
            Chain::Solana => DerivationPath::new(vec![
                ChildIndex::hardened(purposes::BIP44),
                ChildIndex::hardened(coin),
                ChildIndex::hardened(0),
                ChildIndex::hardened(0),
            ]),
            _ => DerivationPath::new(vec![
                ChildIndex::hardened(purposes::BIP44),
                ChildIndex::hardened(coin),
                ChildIndex::hardened(0),
                ChildIndex::normal(0),
                ChildIndex::normal(0),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn default_paths_match_coin_types() {
        for chain in Chain::iter() {
            let path = chain.default_derivation_path();
            assert_eq!(path.coin_type(), Some(chain.coin_type()), "{chain}");
        }
    }

    #[test]
    fn chain_string_forms() {
        assert_eq!(Chain::Bitcoin.to_string(), "bitcoin");
        assert_eq!("ethereum".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert_eq!(
            serde_json::to_string(&Chain::Solana).unwrap(),
            "\"solana\""
        );
    }

    #[test]
    fn ethereum_default_path_is_bip44_account_zero() {
        let p = Chain::Ethereum.default_derivation_path();
        assert_eq!(p.to_string(), "m/44'/60'/0'/0/0");
    }
}
