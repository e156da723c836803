// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Account store tests

use std::sync::Arc;

use coldsign::store::{AccountStore, MemoryBackend, StoreOutcome};
use coldsign_proto::prelude::*;

mod helpers;
use helpers::init_logging;

fn account(chain: Chain, path: &str, address: &str) -> HardwareWalletAccount {
    HardwareWalletAccount::new(
        DeviceType::Ledger(LedgerModel::NanoX),
        chain,
        AddressResult {
            address: address.to_string(),
            public_key: None,
            path: path.parse().unwrap(),
        },
    )
}

#[tokio::test]
async fn store_rejects_duplicate_identity() -> anyhow::Result<()> {
    init_logging();

    let store = AccountStore::new_in_memory();

    let a = account(Chain::Ethereum, "m/44'/60'/0'/0/0", "0xaaa");
    let b = account(Chain::Ethereum, "m/44'/60'/0'/0/0", "0xbbb");

    assert_eq!(store.add_account(a).await?, StoreOutcome::Added);
    assert_eq!(store.add_account(b.clone()).await?, StoreOutcome::Updated);

    // Never two entries for the same (device, chain, path); the later
    // verification wins
    let all = store.all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].address, b.address);

    Ok(())
}

#[tokio::test]
async fn store_distinct_paths_are_distinct_accounts() -> anyhow::Result<()> {
    init_logging();

    let store = AccountStore::new_in_memory();

    store
        .add_account(account(Chain::Ethereum, "m/44'/60'/0'/0/0", "0xaaa"))
        .await?;
    store
        .add_account(account(Chain::Ethereum, "m/44'/60'/0'/0/1", "0xbbb"))
        .await?;
    store
        .add_account(account(Chain::Bitcoin, "m/84'/0'/0'/0/0", "bc1qcc"))
        .await?;

    assert_eq!(store.len().await, 3);
    assert_eq!(store.accounts(Chain::Ethereum).await.len(), 2);
    assert_eq!(store.accounts(Chain::Bitcoin).await.len(), 1);
    assert!(store.accounts(Chain::Solana).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn store_persists_through_backend() -> anyhow::Result<()> {
    init_logging();

    let backend = Arc::new(MemoryBackend::default());

    {
        let store = AccountStore::open(backend.clone()).await?;
        store
            .add_account(account(Chain::Ethereum, "m/44'/60'/0'/0/0", "0xaaa"))
            .await?;
    }

    // A store reopened over the same backend sees the records
    let store = AccountStore::open(backend).await?;
    assert_eq!(store.len().await, 1);
    let found = store.accounts(Chain::Ethereum).await;
    assert_eq!(found[0].address, "0xaaa");

    Ok(())
}
