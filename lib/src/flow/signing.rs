// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing flow for an existing account
//!
//! Reconnects to the account's device (waiting a bounded courtesy
//! window for the user to physically attach it), requests on-device
//! confirmation, and obtains the signature. Cancellation interrupts
//! any in-flight step within one poll interval, and a cancelled flow
//! never surfaces a signature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use coldsign_proto::{
    account::HardwareWalletAccount,
    chain::Chain,
    device::{DeviceType, DiscoveredDevice},
    tx::{HardwareWalletTransaction, SignatureResult, TransactionDisplayInfo},
};

use crate::{
    config::SigningConfig,
    flow::{with_cancel, CancelToken, FlowError},
    registry::DeviceRegistry,
    session::SessionManager,
    Error, Signer,
};

/// Signing flow states
#[derive(Clone, Debug, strum::Display)]
pub enum SigningState {
    /// Locating the account's device and opening a session
    Connecting { device_type: DeviceType },
    /// Session ready; transaction shown for audit, waiting for the
    /// on-device button press
    AwaitingConfirmation {
        display_info: Option<TransactionDisplayInfo>,
    },
    /// Device is signing
    Signing,
    /// Signature obtained
    Complete { result: SignatureResult },
    /// Terminal failure for this attempt
    Error { error: FlowError },
}

/// Signing flow for one account and one pending transaction.
///
/// The signature is produced once per run and delivered only through
/// the `Complete` state; nothing is cached for reuse.
pub struct SigningFlow<S: Signer> {
    shared: Arc<Shared<S>>,
}

struct Shared<S: Signer> {
    registry: Arc<DeviceRegistry>,
    sessions: Arc<SessionManager<S>>,
    account: HardwareWalletAccount,
    transaction: HardwareWalletTransaction,
    chain: Chain,
    config: SigningConfig,
    state: Mutex<SigningState>,
    events: StdMutex<Option<mpsc::Sender<SigningState>>>,
    cancel: CancelToken,
    task: Mutex<Option<JoinHandle<()>>>,
    scan_started: AtomicBool,
}

impl<S: Signer> SigningFlow<S> {
    /// Create a signing flow; call [`SigningFlow::start`] to begin
    pub fn new(
        registry: Arc<DeviceRegistry>,
        sessions: Arc<SessionManager<S>>,
        account: HardwareWalletAccount,
        transaction: HardwareWalletTransaction,
        chain: Chain,
        config: SigningConfig,
    ) -> Self {
        let device_type = account.device_type;
        Self {
            shared: Arc::new(Shared {
                registry,
                sessions,
                account,
                transaction,
                chain,
                config,
                state: Mutex::new(SigningState::Connecting { device_type }),
                events: StdMutex::new(None),
                cancel: CancelToken::new(),
                task: Mutex::new(None),
                scan_started: AtomicBool::new(false),
            }),
        }
    }

    /// Begin the flow and return the state stream
    pub async fn start(&self) -> mpsc::Receiver<SigningState> {
        let (tx, rx) = mpsc::channel(16);
        *self.shared.events.lock().unwrap() = Some(tx);

        let shared = self.shared.clone();
        *self.shared.task.lock().await = Some(tokio::spawn(Shared::run(shared)));

        rx
    }

    /// Current state snapshot
    pub async fn state(&self) -> SigningState {
        self.shared.state.lock().await.clone()
    }

    /// Cancellation handle for this flow
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    /// Abandon the flow; the in-flight step is interrupted and no
    /// partial result is surfaced
    pub async fn cancel(&self) {
        debug!("signing flow cancelled");
        self.shared.cancel.cancel();
    }

    /// Restart the whole sequence (including the discovery wait) after
    /// a terminal error
    pub async fn retry(&self) {
        if !matches!(*self.shared.state.lock().await, SigningState::Error { .. }) {
            warn!("retry ignored: signing flow not in error state");
            return;
        }

        let shared = self.shared.clone();
        *self.shared.task.lock().await = Some(tokio::spawn(Shared::run(shared)));
    }
}

impl<S: Signer> Shared<S> {
    async fn run(self: Arc<Self>) {
        match self.execute().await {
            Ok(()) => (),
            Err(Error::Cancelled) => debug!("signing flow abandoned"),
            Err(e) => self.fail(&e).await,
        }

        if self.scan_started.swap(false, Ordering::SeqCst) {
            self.registry.stop_scanning().await;
        }
    }

    async fn execute(&self) -> Result<(), Error> {
        self.publish(SigningState::Connecting {
            device_type: self.account.device_type,
        })
        .await;

        let device = self.wait_for_device().await?;

        let session =
            with_cancel(&self.cancel, self.sessions.connect(&device, self.chain)).await?;
        session
            .await_ready(
                self.config.ready_timeout,
                self.config.poll_interval,
                &self.cancel,
            )
            .await?;

        self.publish(SigningState::AwaitingConfirmation {
            display_info: self.transaction.display_info.clone(),
        })
        .await;

        with_cancel(&self.cancel, session.await_confirmation()).await?;

        self.publish(SigningState::Signing).await;

        let result = with_cancel(
            &self.cancel,
            session.sign(&self.account.derivation_path, &self.transaction),
        )
        .await?;

        self.publish(SigningState::Complete { result }).await;

        Ok(())
    }

    /// Locate the account's device.
    ///
    /// An already-discovered device short-circuits the wait entirely;
    /// otherwise scan and poll once per interval, re-checking
    /// cancellation each tick. This is a courtesy window for the user
    /// to attach the device, not a retry loop.
    async fn wait_for_device(&self) -> Result<DiscoveredDevice, Error> {
        let target = self.account.device_type;

        if let Some(d) = self.registry.find_by_type(target) {
            debug!("target device already discovered: {d}");
            return Ok(d);
        }

        self.registry.start_scanning().await?;
        self.scan_started.store(true, Ordering::SeqCst);

        let polls = self.config.discovery_timeout.as_secs().max(1);
        for i in 0..polls {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if let Some(d) = self.registry.find_by_type(target) {
                return Ok(d);
            }

            debug!("waiting for {}: {i}s", target.display_name());
            self.cancel.sleep(self.config.poll_interval).await?;
        }

        Err(Error::DeviceNotFound(polls))
    }

    async fn fail(&self, error: &Error) {
        self.publish(SigningState::Error {
            error: FlowError::from(error),
        })
        .await;
    }

    async fn publish(&self, state: SigningState) {
        debug!("signing state: {state}");
        *self.state.lock().await = state.clone();

        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(state).await;
        }
    }
}
