// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Logical sessions to connected signer devices
//!
//! [`SessionManager`] owns the signer backend and the set of open
//! sessions; sessions are 1:1 with a device id, and reconnecting to an
//! open device returns the existing session rather than a duplicate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::debug;

use coldsign_proto::{
    account::AddressResult,
    chain::Chain,
    device::{ConnectionStatus, DeviceId, DiscoveredDevice},
    path::DerivationPath,
    tx::{HardwareWalletTransaction, SignatureResult},
};

use crate::{flow::CancelToken, Error, Signer};

/// Open session to one device.
///
/// Holds the last observed [`ConnectionStatus`]; callers must see
/// `Ready` before attempting address or signing operations.
pub struct Session<S: Signer> {
    device: DiscoveredDevice,
    chain: Chain,
    signer: Arc<S>,
    status: StdMutex<ConnectionStatus>,
}

impl<S: Signer> Session<S> {
    /// Device this session is bound to
    pub fn device(&self) -> &DiscoveredDevice {
        &self.device
    }

    /// Chain the session was opened for
    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Last observed connection status
    pub fn status(&self) -> ConnectionStatus {
        self.status.lock().unwrap().clone()
    }

    /// Re-query the device and update the cached status
    pub async fn refresh_status(&self) -> Result<ConnectionStatus, Error> {
        let status = self.signer.status(&self.device, self.chain).await?;
        *self.status.lock().unwrap() = status.clone();
        Ok(status)
    }

    /// Poll once per `poll_interval` until the session reports `Ready`.
    ///
    /// This is a courtesy window for the user to open the required app;
    /// cancellation is re-checked every tick.
    pub async fn await_ready(
        &self,
        timeout: Duration,
        poll_interval: Duration,
        cancel: &CancelToken,
    ) -> Result<(), Error> {
        if self.status().is_ready() {
            return Ok(());
        }

        let ticks = (timeout.as_millis() / poll_interval.as_millis().max(1)) as u64;
        for _ in 0..ticks {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let status = self.refresh_status().await?;
            debug!("awaiting ready on {} (status: {status})", self.device.id);
            if status.is_ready() {
                return Ok(());
            }

            cancel.sleep(poll_interval).await?;
        }

        Err(Error::UserTimeout)
    }

    /// Derive the address for `path`, optionally rendering it on the
    /// device screen
    pub async fn derive_address(
        &self,
        path: &DerivationPath,
        verify: bool,
    ) -> Result<AddressResult, Error> {
        let r = self
            .signer
            .derive_address(&self.device, path, self.chain, verify)
            .await?;
        Ok(r)
    }

    /// Wait for the user to acknowledge the pending operation on-device
    pub async fn await_confirmation(&self) -> Result<(), Error> {
        self.signer.await_confirmation(&self.device).await?;
        Ok(())
    }

    /// Sign the transaction with the key at `path`
    pub async fn sign(
        &self,
        path: &DerivationPath,
        transaction: &HardwareWalletTransaction,
    ) -> Result<SignatureResult, Error> {
        let r = self
            .signer
            .sign(&self.device, path, transaction, self.chain)
            .await?;
        Ok(r)
    }
}

/// Manages sessions to signer devices, de-duplicated by device id
pub struct SessionManager<S: Signer> {
    signer: Arc<S>,
    sessions: StdMutex<HashMap<DeviceId, Arc<Session<S>>>>,
}

impl<S: Signer> SessionManager<S> {
    /// Create a session manager over the provided signer backend
    pub fn new(signer: Arc<S>) -> Self {
        Self {
            signer,
            sessions: StdMutex::new(HashMap::new()),
        }
    }

    /// Open a session to the device, or return the one already open
    /// for its id
    pub async fn connect(
        &self,
        device: &DiscoveredDevice,
        chain: Chain,
    ) -> Result<Arc<Session<S>>, Error> {
        if let Some(s) = self.sessions.lock().unwrap().get(&device.id) {
            debug!("reusing open session for {}", device.id);
            return Ok(s.clone());
        }

        debug!("connecting to {device}");
        let status = self.signer.connect(device, chain).await?;
        debug!("connected to {} (status: {status})", device.id);

        let session = Arc::new(Session {
            device: device.clone(),
            chain,
            signer: self.signer.clone(),
            status: StdMutex::new(status),
        });

        // A racing connect may have beaten us; the first session wins
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .entry(device.id.clone())
            .or_insert_with(|| session.clone());

        Ok(entry.clone())
    }

    /// Session for the device id, where one is open
    pub fn session(&self, id: &DeviceId) -> Option<Arc<Session<S>>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Close the session for the device id, if open
    pub async fn disconnect(&self, id: &DeviceId) {
        let session = self.sessions.lock().unwrap().remove(id);
        if let Some(s) = session {
            debug!("disconnecting {}", id);
            self.signer.disconnect(&s.device).await;
        }
    }
}
