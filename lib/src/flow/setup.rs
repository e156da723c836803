// Copyright (c) 2022-2023 The MobileCoin Foundation

//! First-time pairing flow
//!
//! Drives discovery, connection and address derivation into a guided
//! setup producing a verified [`HardwareWalletAccount`]. The address
//! verification gate is the core defence against address substitution:
//! the flow reaches `Complete` (and writes the account) only on the
//! user's explicit "address matches" confirmation, and that gate can
//! be neither skipped nor auto-confirmed.

use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};

use coldsign_proto::{
    account::{AddressResult, HardwareWalletAccount},
    chain::Chain,
    device::{ConnectionStatus, DeviceId, DiscoveredDevice},
};

use crate::{
    config::SetupConfig,
    deriver,
    flow::{with_cancel, CancelToken, FlowError},
    registry::DeviceRegistry,
    session::{Session, SessionManager},
    store::AccountStore,
    Error, Signer,
};

/// Setup flow states
#[derive(Clone, Debug, strum::Display)]
pub enum SetupState {
    /// Scanning; waiting for the user to pick a device
    Discovery,
    /// Connecting to the selected device
    Connecting { device: DiscoveredDevice },
    /// Advisory: the named on-device app must be opened to continue
    SelectApp {
        device: DiscoveredDevice,
        app_name: String,
    },
    /// Device derived (and displays) the address; awaiting the user's
    /// match / mismatch verdict
    VerifyAddress {
        device: DiscoveredDevice,
        address: AddressResult,
    },
    /// Account verified and stored
    Complete { account: HardwareWalletAccount },
    /// Terminal failure for this attempt
    Error { error: FlowError },
}

struct Inner {
    state: SetupState,
    device: Option<DiscoveredDevice>,
    pending: Option<AddressResult>,
}

/// First-time pairing flow for one chain.
///
/// Side effects are confined to registry scan start / stop and a
/// single [`AccountStore`] write on `Complete`.
pub struct SetupFlow<S: Signer> {
    registry: Arc<DeviceRegistry>,
    sessions: Arc<SessionManager<S>>,
    store: Arc<AccountStore>,
    chain: Chain,
    config: SetupConfig,
    inner: Mutex<Inner>,
    events: StdMutex<Option<mpsc::Sender<SetupState>>>,
    cancel: CancelToken,
}

impl<S: Signer> SetupFlow<S> {
    /// Create a setup flow; call [`SetupFlow::start`] to begin
    pub fn new(
        registry: Arc<DeviceRegistry>,
        sessions: Arc<SessionManager<S>>,
        store: Arc<AccountStore>,
        chain: Chain,
        config: SetupConfig,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
            chain,
            config,
            inner: Mutex::new(Inner {
                state: SetupState::Discovery,
                device: None,
                pending: None,
            }),
            events: StdMutex::new(None),
            cancel: CancelToken::new(),
        }
    }

    /// Begin the flow: starts scanning and returns the state stream
    pub async fn start(&self) -> Result<mpsc::Receiver<SetupState>, Error> {
        let (tx, rx) = mpsc::channel(16);
        *self.events.lock().unwrap() = Some(tx);

        self.registry.start_scanning().await?;

        let mut inner = self.inner.lock().await;
        self.publish(&mut inner, SetupState::Discovery).await;

        Ok(rx)
    }

    /// Current state snapshot
    pub async fn state(&self) -> SetupState {
        self.inner.lock().await.state.clone()
    }

    /// Cancellation handle for this flow
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// User selected a discovered device
    pub async fn select_device(&self, id: &DeviceId) {
        let mut inner = self.inner.lock().await;

        if !matches!(inner.state, SetupState::Discovery) {
            warn!("select_device ignored in state {}", inner.state);
            return;
        }

        let device = match self.registry.find(id) {
            Some(d) => d,
            None => {
                self.fail(&mut inner, &Error::NoDevice).await;
                return;
            }
        };

        inner.device = Some(device.clone());
        self.connect_and_verify(&mut inner, device).await;
    }

    /// User opened the required app and pressed continue
    pub async fn continue_to_verify(&self) {
        let mut inner = self.inner.lock().await;

        let device = match &inner.state {
            SetupState::SelectApp { device, .. } => device.clone(),
            state => {
                warn!("continue_to_verify ignored in state {state}");
                return;
            }
        };

        // Re-query so the session records the now-open app, then derive
        match with_cancel(&self.cancel, self.sessions.connect(&device, self.chain)).await {
            Ok(session) => {
                if let Ok(status) = session.refresh_status().await {
                    debug!("status after app select: {status}");
                }
                self.derive(&mut inner, device, &session).await;
            }
            Err(Error::Cancelled) => (),
            Err(e) => self.fail(&mut inner, &e).await,
        }
    }

    /// User confirmed the device-displayed address matches.
    ///
    /// The only transition that constructs and stores an account.
    pub async fn confirm_address(&self) {
        let mut inner = self.inner.lock().await;

        if !matches!(inner.state, SetupState::VerifyAddress { .. }) {
            warn!("confirm_address ignored in state {}", inner.state);
            return;
        }

        let (device, address) = match (inner.device.clone(), inner.pending.take()) {
            (Some(d), Some(a)) => (d, a),
            _ => {
                let state = inner.state.to_string();
                self.fail(&mut inner, &Error::InvalidState(state)).await;
                return;
            }
        };

        let account = HardwareWalletAccount::new(device.device_type, self.chain, address);
        match self.store.add_account(account.clone()).await {
            Ok(outcome) => {
                debug!("account stored ({outcome:?}): {account}");
                self.registry.stop_scanning().await;
                self.publish(&mut inner, SetupState::Complete { account })
                    .await;
            }
            Err(e) => self.fail(&mut inner, &e).await,
        }
    }

    /// User declared the device-displayed address different from ours.
    ///
    /// Fatal to this attempt; nothing is stored and the derived address
    /// is discarded.
    pub async fn reject_address(&self) {
        let mut inner = self.inner.lock().await;

        if !matches!(inner.state, SetupState::VerifyAddress { .. }) {
            warn!("reject_address ignored in state {}", inner.state);
            return;
        }

        inner.pending = None;
        self.fail(&mut inner, &Error::AddressMismatch).await;
    }

    /// Retry the connection to the same device after an error
    pub async fn retry_connection(&self) {
        let mut inner = self.inner.lock().await;

        if !matches!(inner.state, SetupState::Error { .. }) {
            warn!("retry_connection ignored in state {}", inner.state);
            return;
        }

        match inner.device.clone() {
            Some(device) => self.connect_and_verify(&mut inner, device).await,
            None => self.fail(&mut inner, &Error::NoDevice).await,
        }
    }

    /// Discard all session state and return to discovery.
    ///
    /// The device list is empty until the restarted scan repopulates
    /// it.
    pub async fn start_over(&self) {
        let mut inner = self.inner.lock().await;

        inner.device = None;
        inner.pending = None;

        self.registry.stop_scanning().await;
        match self.registry.start_scanning().await {
            Ok(()) => self.publish(&mut inner, SetupState::Discovery).await,
            Err(e) => self.fail(&mut inner, &e).await,
        }
    }

    /// Abandon the flow, interrupting any in-flight device operation
    pub async fn cancel(&self) {
        self.cancel.cancel();
        self.registry.stop_scanning().await;
    }

    async fn connect_and_verify(&self, inner: &mut Inner, device: DiscoveredDevice) {
        self.publish(
            inner,
            SetupState::Connecting {
                device: device.clone(),
            },
        )
        .await;

        let session =
            match with_cancel(&self.cancel, self.sessions.connect(&device, self.chain)).await {
                Ok(s) => s,
                Err(Error::Cancelled) => return,
                Err(e) => {
                    self.fail(inner, &e).await;
                    return;
                }
            };

        match session.status() {
            ConnectionStatus::Ready => self.derive(inner, device, &session).await,
            ConnectionStatus::RequiresAppOpen { app_name } => {
                self.publish(inner, SetupState::SelectApp { device, app_name })
                    .await
            }
        }
    }

    async fn derive(&self, inner: &mut Inner, device: DiscoveredDevice, session: &Session<S>) {
        let path = self
            .config
            .derivation_path
            .clone()
            .unwrap_or_else(|| self.chain.default_derivation_path());

        match with_cancel(
            &self.cancel,
            deriver::derive_address(session, &path, self.chain, true),
        )
        .await
        {
            Ok(address) => {
                inner.pending = Some(address.clone());
                self.publish(inner, SetupState::VerifyAddress { device, address })
                    .await;
            }
            Err(Error::Cancelled) => (),
            Err(e) => self.fail(inner, &e).await,
        }
    }

    async fn fail(&self, inner: &mut Inner, error: &Error) {
        self.publish(
            inner,
            SetupState::Error {
                error: FlowError::from(error),
            },
        )
        .await;
    }

    async fn publish(&self, inner: &mut Inner, state: SetupState) {
        debug!("setup state: {state}");
        inner.state = state.clone();

        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(state).await;
        }
    }
}
