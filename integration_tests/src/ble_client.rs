//! BLE client for the label's write service and MTU probe service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Write service and its text characteristic
pub const WRITE_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
pub const TEXT_CHAR_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);

/// MTU update service and its probe characteristic
pub const MTU_SERVICE_UUID: Uuid = Uuid::from_u128(0x2e2b8dc3_06e0_4f93_9bb2_734091c356f0);
pub const PROBE_CHAR_UUID: Uuid = Uuid::from_u128(0x2e2b8dc3_06e0_4f93_9bb2_734091c356f3);

/// BLE client for one label device.
pub struct LabelClient {
    peripheral: Peripheral,
    text_char: Characteristic,
    probe_char: Characteristic,
    /// Probe notifications received so far
    notifications: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl LabelClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        // Only labels advertise the MTU service
        adapter
            .start_scan(ScanFilter {
                services: vec![MTU_SERVICE_UUID],
            })
            .await?;

        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;

        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();

        let text_char = characteristics
            .iter()
            .find(|c| c.uuid == TEXT_CHAR_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("Text characteristic not found"))?;

        let probe_char = characteristics
            .iter()
            .find(|c| c.uuid == PROBE_CHAR_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("Probe characteristic not found"))?;

        let notifications = Arc::new(Mutex::new(Vec::new()));

        // Collect probe notifications in the background
        let store = notifications.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                if data.uuid == PROBE_CHAR_UUID {
                    store.lock().await.push(data.value);
                }
            }
        });

        Ok(Self {
            peripheral,
            text_char,
            probe_char,
            notifications,
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            let peripherals = adapter.peripherals().await?;

            for peripheral in peripherals {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Services exposed by the device.
    pub fn service_uuids(&self) -> Vec<Uuid> {
        self.peripheral.services().iter().map(|s| s.uuid).collect()
    }

    /// Properties of the text characteristic.
    pub fn text_properties(&self) -> CharPropFlags {
        self.text_char.properties
    }

    /// Properties of the probe characteristic.
    pub fn probe_properties(&self) -> CharPropFlags {
        self.probe_char.properties
    }

    /// Write label text with response, so rejections surface as errors.
    pub async fn write_text(&self, text: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.text_char, text, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    /// Enable probe notifications (writes the CCC descriptor).
    pub async fn subscribe_probe(&self) -> Result<()> {
        self.peripheral.subscribe(&self.probe_char).await?;
        Ok(())
    }

    /// Probe notifications received since connecting.
    pub async fn notifications(&self) -> Vec<Vec<u8>> {
        self.notifications.lock().await.clone()
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Whether the link is still up.
    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }
}
