// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Durable store of verified hardware wallet accounts
//!

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::RwLock;

use coldsign_proto::{account::HardwareWalletAccount, chain::Chain};

use crate::Error;

/// Persistence seam for account records (external collaborator).
///
/// Real applications back this with key-value or file storage; tests
/// and simple embedders use [`MemoryBackend`].
#[async_trait]
pub trait AccountBackend: Send + Sync + 'static {
    async fn load(&self) -> Result<Vec<HardwareWalletAccount>, Error>;
    async fn persist(&self, accounts: &[HardwareWalletAccount]) -> Result<(), Error>;
}

/// In-memory [`AccountBackend`]
#[derive(Default)]
pub struct MemoryBackend {
    accounts: std::sync::Mutex<Vec<HardwareWalletAccount>>,
}

#[async_trait]
impl AccountBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<HardwareWalletAccount>, Error> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn persist(&self, accounts: &[HardwareWalletAccount]) -> Result<(), Error> {
        *self.accounts.lock().unwrap() = accounts.to_vec();
        Ok(())
    }
}

/// Outcome of an [`AccountStore::add_account`] call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    /// New account appended
    Added,
    /// Existing account with the same identity replaced in place
    Updated,
}

/// Account store: the durable set of verified signer accounts.
///
/// No two accounts may share a `(device_type, chain, derivation_path)`
/// identity; adding a duplicate replaces the existing record rather
/// than appending.
pub struct AccountStore {
    backend: Arc<dyn AccountBackend>,
    accounts: RwLock<Vec<HardwareWalletAccount>>,
}

impl AccountStore {
    /// Open a store over the provided backend, loading existing records
    pub async fn open(backend: Arc<dyn AccountBackend>) -> Result<Self, Error> {
        let accounts = backend.load().await?;
        debug!("account store opened with {} accounts", accounts.len());
        Ok(Self {
            backend,
            accounts: RwLock::new(accounts),
        })
    }

    /// Open an empty in-memory store
    pub fn new_in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::default()),
            accounts: RwLock::new(vec![]),
        }
    }

    /// Add an account, replacing any existing record with the same
    /// identity
    pub async fn add_account(
        &self,
        account: HardwareWalletAccount,
    ) -> Result<StoreOutcome, Error> {
        let mut accounts = self.accounts.write().await;

        let identity = account.identity();
        let outcome = match accounts.iter_mut().find(|a| a.identity() == identity) {
            Some(existing) => {
                if existing.address != account.address {
                    warn!(
                        "account {} address changed on re-verification: {} -> {}",
                        account.id, existing.address, account.address
                    );
                }
                *existing = account;
                StoreOutcome::Updated
            }
            None => {
                debug!("account added: {account}");
                accounts.push(account);
                StoreOutcome::Added
            }
        };

        self.backend.persist(&accounts).await?;

        Ok(outcome)
    }

    /// Accounts for the given chain
    pub async fn accounts(&self, chain: Chain) -> Vec<HardwareWalletAccount> {
        self.accounts
            .read()
            .await
            .iter()
            .filter(|a| a.chain == chain)
            .cloned()
            .collect()
    }

    /// All accounts
    pub async fn all(&self) -> Vec<HardwareWalletAccount> {
        self.accounts.read().await.clone()
    }

    /// Look up an account by id
    pub async fn find(&self, id: &str) -> Option<HardwareWalletAccount> {
        self.accounts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// True when no accounts are stored
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}
