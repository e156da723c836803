// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Derivation-path-scoped address derivation
//!
//! Validates paths against the target chain before the device is asked
//! to derive, so malformed requests fail fast and never reach the
//! device.

use log::debug;

use coldsign_proto::{account::AddressResult, chain::Chain, path::DerivationPath};

use crate::{session::Session, Error, Signer};

/// Check that `path` fits `chain`.
///
/// The SLIP-0044 coin type in the path must match the chain's; a path
/// without a coin-type component is rejected outright.
pub fn validate_path(path: &DerivationPath, chain: Chain) -> Result<(), Error> {
    let expected = chain.coin_type();
    match path.coin_type() {
        Some(c) if c == expected => Ok(()),
        other => Err(Error::ChainMismatch {
            chain,
            expected,
            coin_type: other,
        }),
    }
}

/// Ask the device to derive the address at `path` for the session's
/// chain.
///
/// With `verify` set the device renders the address on its own screen
/// during the call. The returned [`AddressResult`] is unverified until
/// the user explicitly confirms the match; this function never reports
/// confirmation.
pub async fn derive_address<S: Signer>(
    session: &Session<S>,
    path: &DerivationPath,
    chain: Chain,
    verify: bool,
) -> Result<AddressResult, Error> {
    validate_path(path, chain)?;

    debug!(
        "deriving address at {path} on {chain} (device: {}, verify: {verify})",
        session.device().id
    );

    session.derive_address(path, verify).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_matching_coin_type() {
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert!(validate_path(&path, Chain::Ethereum).is_ok());
        assert!(validate_path(&path, Chain::Polygon).is_ok());
    }

    #[test]
    fn validate_rejects_wrong_coin_type() {
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let err = validate_path(&path, Chain::Bitcoin).unwrap_err();
        assert!(matches!(
            err,
            Error::ChainMismatch {
                chain: Chain::Bitcoin,
                expected: 0,
                coin_type: Some(60),
            }
        ));
    }

    #[test]
    fn validate_rejects_short_path() {
        let path: DerivationPath = "m/44'".parse().unwrap();
        let err = validate_path(&path, Chain::Ethereum).unwrap_err();
        assert!(matches!(err, Error::ChainMismatch { coin_type: None, .. }));
    }
}
