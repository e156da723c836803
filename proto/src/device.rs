// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signer device descriptions and connection state
//!

use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::chain::Chain;

/// Ledger device models
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
pub enum LedgerModel {
    NanoS,
    NanoSP,
    NanoX,
    Stax,
}

impl LedgerModel {
    /// Marketing name for the model
    pub fn model_name(&self) -> &'static str {
        match self {
            LedgerModel::NanoS => "Nano S",
            LedgerModel::NanoSP => "Nano S Plus",
            LedgerModel::NanoX => "Nano X",
            LedgerModel::Stax => "Stax",
        }
    }
}

/// Trezor device models
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
pub enum TrezorModel {
    One,
    ModelT,
    Safe3,
}

impl TrezorModel {
    /// Marketing name for the model
    pub fn model_name(&self) -> &'static str {
        match self {
            TrezorModel::One => "Model One",
            TrezorModel::ModelT => "Model T",
            TrezorModel::Safe3 => "Safe 3",
        }
    }
}

/// Signer device type.
///
/// Manufacturer differences (display name, which on-device app must be
/// open for a given chain) are carried as data on the variant rather
/// than behind dynamic dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Ledger(LedgerModel),
    Trezor(TrezorModel),
}

impl DeviceType {
    /// Manufacturer name
    pub fn manufacturer(&self) -> &'static str {
        match self {
            DeviceType::Ledger(_) => "Ledger",
            DeviceType::Trezor(_) => "Trezor",
        }
    }

    /// Full display name ("Ledger Nano X")
    pub fn display_name(&self) -> String {
        match self {
            DeviceType::Ledger(m) => format!("Ledger {}", m.model_name()),
            DeviceType::Trezor(m) => format!("Trezor {}", m.model_name()),
        }
    }

    /// Name of the on-device app that must be open before operations on
    /// `chain` may run, or `None` where the device needs no app selection.
    ///
    /// Ledger devices run one app per chain; Trezor firmware is monolithic.
    pub fn required_app(&self, chain: Chain) -> Option<&'static str> {
        match self {
            DeviceType::Ledger(_) => Some(match chain {
                Chain::Bitcoin => "Bitcoin",
                Chain::Litecoin => "Litecoin",
                Chain::Dogecoin => "Dogecoin",
                Chain::Ethereum => "Ethereum",
                Chain::Polygon => "Polygon",
                Chain::Solana => "Solana",
            }),
            DeviceType::Trezor(_) => None,
        }
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Link-layer connection type
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Usb,
    Bluetooth,
}

/// Opaque link-layer device identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Device observed by the link layer during scanning.
///
/// Ephemeral: exists only while the link is visible and scanning is
/// active, and is looked up by [`DeviceId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub name: Option<String>,
    pub connection_type: ConnectionType,
}

/// Device listing form, used by discovery UIs
impl Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.name {
            Some(n) => n.clone(),
            None => self.device_type.display_name(),
        };
        write!(f, "{:16} ({}, {})", name, self.connection_type, self.id)
    }
}

/// Result of a connection handshake.
///
/// Produced fresh on each attempt, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Device is ready for address / signing operations
    Ready,
    /// Device reachable but the named app must be opened first
    RequiresAppOpen { app_name: String },
}

impl ConnectionStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionStatus::Ready)
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Ready => write!(f, "ready"),
            ConnectionStatus::RequiresAppOpen { app_name } => {
                write!(f, "requires app open: {app_name}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_app_per_manufacturer() {
        let ledger = DeviceType::Ledger(LedgerModel::NanoX);
        let trezor = DeviceType::Trezor(TrezorModel::ModelT);

        assert_eq!(ledger.required_app(Chain::Ethereum), Some("Ethereum"));
        assert_eq!(ledger.required_app(Chain::Bitcoin), Some("Bitcoin"));
        assert_eq!(trezor.required_app(Chain::Ethereum), None);
    }

    #[test]
    fn device_display() {
        let d = DiscoveredDevice {
            id: DeviceId::from("usb-0001"),
            device_type: DeviceType::Ledger(LedgerModel::NanoSP),
            name: None,
            connection_type: ConnectionType::Usb,
        };
        assert_eq!(d.to_string(), "Ledger Nano S Plus (USB, usb-0001)");
    }
}
