// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared test helpers: logging setup and mock link / signer backends

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use log::LevelFilter;
use simplelog::SimpleLogger;
use tokio::sync::{mpsc, Notify};

use coldsign::{
    registry::{DeviceRegistry, DeviceScanner, LinkEvent},
    Error, Signer, SignerError,
};
use coldsign_proto::prelude::*;

// Setup logging with an optional LOG_LEVEL env override
pub fn init_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

pub fn ledger_nano_x(id: &str) -> DiscoveredDevice {
    DiscoveredDevice {
        id: DeviceId::from(id),
        device_type: DeviceType::Ledger(LedgerModel::NanoX),
        name: Some("Nano X 1A2B".to_string()),
        connection_type: ConnectionType::Usb,
    }
}

pub fn trezor_model_t(id: &str) -> DiscoveredDevice {
    DiscoveredDevice {
        id: DeviceId::from(id),
        device_type: DeviceType::Trezor(TrezorModel::ModelT),
        name: None,
        connection_type: ConnectionType::Bluetooth,
    }
}

/// Scripted link-layer scanner.
///
/// Announces its initial device list when scanning starts; further
/// attach / detach events are injected by the test.
#[derive(Default)]
pub struct MockScanner {
    initial: StdMutex<Vec<DiscoveredDevice>>,
    events: StdMutex<Option<mpsc::Sender<LinkEvent>>>,
}

impl MockScanner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_devices(devices: Vec<DiscoveredDevice>) -> Arc<Self> {
        let s = Self::default();
        *s.initial.lock().unwrap() = devices;
        Arc::new(s)
    }

    /// Simulate a device appearing on the link
    pub async fn attach(&self, device: DiscoveredDevice) {
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.send(LinkEvent::Attached(device)).await.unwrap();
        }
    }

    /// Simulate a device leaving the link
    pub async fn detach(&self, id: DeviceId) {
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.send(LinkEvent::Detached(id)).await.unwrap();
        }
    }
}

#[async_trait]
impl DeviceScanner for MockScanner {
    async fn start(&self, events: mpsc::Sender<LinkEvent>) -> Result<(), Error> {
        let initial = self.initial.lock().unwrap().clone();
        *self.events.lock().unwrap() = Some(events.clone());

        for d in initial {
            events.send(LinkEvent::Attached(d)).await.unwrap();
        }

        Ok(())
    }

    async fn stop(&self) {
        *self.events.lock().unwrap() = None;
    }
}

/// Scripted signer backend standing in for a vendor device protocol
pub struct MockSigner {
    address: String,
    signature: Vec<u8>,
    status: StdMutex<ConnectionStatus>,
    connect_error: StdMutex<Option<SignerError>>,
    derive_error: StdMutex<Option<SignerError>>,
    sign_error: StdMutex<Option<SignerError>>,
    confirm_error: StdMutex<Option<SignerError>>,
    auto_confirm: AtomicBool,
    confirm: Notify,
}

impl Default for MockSigner {
    fn default() -> Self {
        Self {
            address: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string(),
            signature: vec![0xa1; 65],
            status: StdMutex::new(ConnectionStatus::Ready),
            connect_error: StdMutex::new(None),
            derive_error: StdMutex::new(None),
            sign_error: StdMutex::new(None),
            confirm_error: StdMutex::new(None),
            auto_confirm: AtomicBool::new(true),
            confirm: Notify::new(),
        }
    }
}

impl MockSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Status reported by subsequent connect / status calls
    pub fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn fail_connect(&self, e: Option<SignerError>) {
        *self.connect_error.lock().unwrap() = e;
    }

    pub fn fail_derive(&self, e: Option<SignerError>) {
        *self.derive_error.lock().unwrap() = e;
    }

    pub fn fail_sign(&self, e: Option<SignerError>) {
        *self.sign_error.lock().unwrap() = e;
    }

    pub fn fail_confirm(&self, e: Option<SignerError>) {
        *self.confirm_error.lock().unwrap() = e;
    }

    /// Require an explicit [`MockSigner::confirm`] for confirmation
    pub fn manual_confirm(&self) {
        self.auto_confirm.store(false, Ordering::SeqCst);
    }

    /// Simulate the on-device button press
    pub fn confirm(&self) {
        self.confirm.notify_one();
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn connect(
        &self,
        _device: &DiscoveredDevice,
        _chain: Chain,
    ) -> Result<ConnectionStatus, SignerError> {
        if let Some(e) = self.connect_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.status.lock().unwrap().clone())
    }

    async fn status(
        &self,
        _device: &DiscoveredDevice,
        _chain: Chain,
    ) -> Result<ConnectionStatus, SignerError> {
        Ok(self.status.lock().unwrap().clone())
    }

    async fn derive_address(
        &self,
        _device: &DiscoveredDevice,
        path: &DerivationPath,
        _chain: Chain,
        _verify: bool,
    ) -> Result<AddressResult, SignerError> {
        if let Some(e) = self.derive_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(AddressResult {
            address: self.address.clone(),
            public_key: Some(vec![0x02; 33]),
            path: path.clone(),
        })
    }

    async fn await_confirmation(&self, _device: &DiscoveredDevice) -> Result<(), SignerError> {
        if let Some(e) = self.confirm_error.lock().unwrap().clone() {
            return Err(e);
        }
        if self.auto_confirm.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.confirm.notified().await;
        Ok(())
    }

    async fn sign(
        &self,
        _device: &DiscoveredDevice,
        path: &DerivationPath,
        _transaction: &HardwareWalletTransaction,
        chain: Chain,
    ) -> Result<SignatureResult, SignerError> {
        if let Some(e) = self.sign_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(SignatureResult {
            bytes: self.signature.clone(),
            chain,
            path: path.clone(),
        })
    }
}

/// Poll until the registry sees the device, panicking after ~2s
pub async fn wait_discovered(registry: &DeviceRegistry, id: &DeviceId) -> DiscoveredDevice {
    for _ in 0..200 {
        if let Some(d) = registry.find(id) {
            return d;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("device {id} never discovered");
}

/// Next state off a flow stream, bounded so a stuck flow fails rather
/// than hangs. The bound exceeds the longest paused-clock wait (the
/// 30 s discovery window) so auto-advanced timers never trip it first.
pub async fn next<T>(rx: &mut mpsc::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(120), rx.recv())
        .await
        .expect("timed out waiting for state")
        .expect("state stream closed")
}
