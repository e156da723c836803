// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Registry of currently reachable signer devices
//!
//! Wraps a link-layer [`DeviceScanner`] (USB / Bluetooth driver,
//! supplied by the embedding application) and maintains the
//! de-duplicated set of visible devices, re-broadcasting
//! arrival / removal to any number of subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use log::debug;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use coldsign_proto::device::{DeviceId, DeviceType, DiscoveredDevice};

use crate::Error;

/// Raw link-layer event, produced by a [`DeviceScanner`]
#[derive(Clone, Debug)]
pub enum LinkEvent {
    Attached(DiscoveredDevice),
    Detached(DeviceId),
}

/// Registry event, broadcast to subscribers
#[derive(Clone, Debug)]
pub enum DeviceEvent {
    Discovered(DiscoveredDevice),
    Removed(DiscoveredDevice),
}

/// Link-layer discovery capability (external collaborator).
///
/// `start` begins delivering events on the provided channel until
/// `stop` is called; dropping the sender ends the forwarding task.
#[async_trait]
pub trait DeviceScanner: Send + Sync + 'static {
    async fn start(&self, events: mpsc::Sender<LinkEvent>) -> Result<(), Error>;
    async fn stop(&self);
}

/// Tracks reachable signer devices while scanning is active.
///
/// Explicitly constructed and shared by handle; the discovered set is
/// mutated only by the registry's own forwarding task in response to
/// link events, and read-shared by any number of flows.
pub struct DeviceRegistry {
    scanner: Arc<dyn DeviceScanner>,
    devices: Arc<StdMutex<HashMap<DeviceId, DiscoveredDevice>>>,
    events: broadcast::Sender<DeviceEvent>,
    scanning: AtomicBool,
    forward: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceRegistry {
    /// Create a registry over the provided scanner
    pub fn new(scanner: Arc<dyn DeviceScanner>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            scanner,
            devices: Arc::new(StdMutex::new(HashMap::new())),
            events,
            scanning: AtomicBool::new(false),
            forward: Mutex::new(None),
        }
    }

    /// Begin scanning; idempotent while a scan is active.
    ///
    /// Scanning has no persistent side effects and an empty discovered
    /// set is the steady state, not an error.
    pub async fn start_scanning(&self) -> Result<(), Error> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel(16);
        if let Err(e) = self.scanner.start(tx).await {
            self.scanning.store(false, Ordering::SeqCst);
            return Err(e);
        }

        debug!("device scan started");

        let devices = self.devices.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            while let Some(evt) = rx.recv().await {
                match evt {
                    LinkEvent::Attached(d) => {
                        let fresh = devices
                            .lock()
                            .unwrap()
                            .insert(d.id.clone(), d.clone())
                            .is_none();
                        if fresh {
                            debug!("device discovered: {d}");
                            let _ = events.send(DeviceEvent::Discovered(d));
                        }
                    }
                    LinkEvent::Detached(id) => {
                        let removed = devices.lock().unwrap().remove(&id);
                        if let Some(d) = removed {
                            debug!("device removed: {d}");
                            let _ = events.send(DeviceEvent::Removed(d));
                        }
                    }
                }
            }
        });

        *self.forward.lock().await = Some(task);

        Ok(())
    }

    /// Stop scanning and clear the discovered set.
    ///
    /// Discovered devices are ephemeral; they do not outlive scanning.
    pub async fn stop_scanning(&self) {
        if !self.scanning.swap(false, Ordering::SeqCst) {
            return;
        }

        self.scanner.stop().await;

        if let Some(task) = self.forward.lock().await.take() {
            task.abort();
        }

        self.devices.lock().unwrap().clear();

        debug!("device scan stopped");
    }

    /// True while a scan is active
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Point-in-time snapshot of the discovered set
    pub fn discovered_devices(&self) -> Vec<DiscoveredDevice> {
        self.devices.lock().unwrap().values().cloned().collect()
    }

    /// Look up a discovered device by id
    pub fn find(&self, id: &DeviceId) -> Option<DiscoveredDevice> {
        self.devices.lock().unwrap().get(id).cloned()
    }

    /// First discovered device of the given type, if any
    pub fn find_by_type(&self, device_type: DeviceType) -> Option<DiscoveredDevice> {
        self.devices
            .lock()
            .unwrap()
            .values()
            .find(|d| d.device_type == device_type)
            .cloned()
    }

    /// Subscribe to arrival / removal events
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}
