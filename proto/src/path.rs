// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP-32 derivation paths with the canonical `m/44'/60'/0'/0/0` string form
//!

use core::fmt::{self, Display};
use core::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Hardened derivation marker bit
pub const HARDENED: u32 = 0x8000_0000;

/// Standard BIP purposes (first path component)
pub mod purposes {
    /// Legacy (P2PKH)
    pub const BIP44: u32 = 44;
    /// SegWit compatible (P2SH-P2WPKH)
    pub const BIP49: u32 = 49;
    /// Native SegWit (P2WPKH)
    pub const BIP84: u32 = 84;
    /// Taproot (P2TR)
    pub const BIP86: u32 = 86;
}

/// Derivation path errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PathError {
    /// Missing `m` prefix
    #[error("derivation path must start with 'm'")]
    MissingPrefix,

    /// Empty component (`m//0`)
    #[error("empty component in derivation path")]
    EmptyComponent,

    /// Unparseable component
    #[error("invalid path component '{0}'")]
    InvalidComponent(String),

    /// Component index collides with the hardened bit
    #[error("component index {0} exceeds maximum (2^31 - 1)")]
    IndexOverflow(u32),
}

/// Single component of a derivation path
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChildIndex {
    pub index: u32,
    pub hardened: bool,
}

impl ChildIndex {
    /// Create a new path component
    pub const fn new(index: u32, hardened: bool) -> Self {
        Self { index, hardened }
    }

    /// Create a hardened path component
    pub const fn hardened(index: u32) -> Self {
        Self::new(index, true)
    }

    /// Create a non-hardened path component
    pub const fn normal(index: u32) -> Self {
        Self::new(index, false)
    }

    /// Full index including the hardened bit
    pub const fn full_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }
}

impl Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hardened {
            true => write!(f, "{}'", self.index),
            false => write!(f, "{}", self.index),
        }
    }
}

/// Ordered sequence of [`ChildIndex`] components.
///
/// Immutable value type; equality is structural. Parse with [`FromStr`],
/// render with [`Display`] for the canonical `m/44'/60'/0'/0/0` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    /// Create a path from components
    pub fn new(components: Vec<ChildIndex>) -> Self {
        Self(components)
    }

    /// Path components in order
    pub fn components(&self) -> &[ChildIndex] {
        &self.0
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the bare `m` path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Full indices (hardened bit applied) for device consumption
    pub fn full_indices(&self) -> Vec<u32> {
        self.0.iter().map(|c| c.full_index()).collect()
    }

    fn field(&self, n: usize) -> Option<u32> {
        self.0.get(n).map(|c| c.index)
    }

    /// BIP-44 purpose (first component), if present
    pub fn purpose(&self) -> Option<u32> {
        self.field(0)
    }

    /// SLIP-0044 coin type (second component), if present
    pub fn coin_type(&self) -> Option<u32> {
        self.field(1)
    }

    /// Account (third component), if present
    pub fn account(&self) -> Option<u32> {
        self.field(2)
    }

    /// Change (fourth component), if present
    pub fn change(&self) -> Option<u32> {
        self.field(3)
    }

    /// Address index (fifth component), if present
    pub fn address_index(&self) -> Option<u32> {
        self.field(4)
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for c in &self.0 {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');

        match parts.next() {
            Some("m") | Some("M") => (),
            _ => return Err(PathError::MissingPrefix),
        }

        let mut components = vec![];
        for p in parts {
            if p.is_empty() {
                return Err(PathError::EmptyComponent);
            }

            // Accept both `'` and `h` hardened markers
            let (digits, hardened) = match p.strip_suffix('\'').or_else(|| p.strip_suffix('h')) {
                Some(d) => (d, true),
                None => (p, false),
            };

            let index = digits
                .parse::<u32>()
                .map_err(|_| PathError::InvalidComponent(p.to_string()))?;
            if index >= HARDENED {
                return Err(PathError::IndexOverflow(index));
            }

            components.push(ChildIndex::new(index, hardened));
        }

        Ok(Self(components))
    }
}

/// Serialize as the canonical string form
impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Deserialize from the canonical string form
impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_round_trip() {
        let cases = ["m", "m/44'/60'/0'/0/0", "m/84'/0'/0'/0/1", "m/44'/501'/0'/0'"];
        for c in cases {
            let p: DerivationPath = c.parse().expect("parse failed");
            assert_eq!(p.to_string(), c);
        }
    }

    #[test]
    fn parse_alternate_hardened_marker() {
        let a: DerivationPath = "m/44h/60h/0h/0/0".parse().unwrap();
        let b: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(
            "44'/60'".parse::<DerivationPath>(),
            Err(PathError::MissingPrefix)
        );
        assert_eq!(
            "m//0".parse::<DerivationPath>(),
            Err(PathError::EmptyComponent)
        );
        assert_eq!(
            "m/abc".parse::<DerivationPath>(),
            Err(PathError::InvalidComponent("abc".to_string()))
        );
        assert_eq!(
            "m/2147483648".parse::<DerivationPath>(),
            Err(PathError::IndexOverflow(2147483648))
        );
    }

    #[test]
    fn bip44_accessors() {
        let p: DerivationPath = "m/44'/60'/2'/1/7".parse().unwrap();
        assert_eq!(p.purpose(), Some(44));
        assert_eq!(p.coin_type(), Some(60));
        assert_eq!(p.account(), Some(2));
        assert_eq!(p.change(), Some(1));
        assert_eq!(p.address_index(), Some(7));
    }

    #[test]
    fn full_indices_apply_hardened_bit() {
        let p: DerivationPath = "m/44'/0'/0'/0/0".parse().unwrap();
        assert_eq!(
            p.full_indices(),
            vec![44 | HARDENED, HARDENED, HARDENED, 0, 0]
        );
    }

    #[test]
    fn serde_uses_canonical_string() {
        let p: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"m/44'/60'/0'/0/0\"");
        let back: DerivationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
