//! [`Central`] over btleplug, for Linux, macOS and Windows hosts

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central as _, CentralState, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bolt_proto::Uuid;

use crate::central::{AdapterState, Central};
use crate::Error;

pub struct BtleplugCentral {
    adapter: Adapter,
}

impl BtleplugCentral {
    /// Use the first Bluetooth adapter of the host
    pub async fn new() -> Result<Self, Error> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("no Bluetooth adapter found".into()))?;
        Ok(Self { adapter })
    }

    pub fn from_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }
}

fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic, Error> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(Error::CharacteristicNotFound(uuid))
}

#[async_trait]
impl Central for BtleplugCentral {
    type Peripheral = Peripheral;

    async fn state(&self) -> Result<AdapterState, Error> {
        Ok(match self.adapter.adapter_state().await? {
            CentralState::PoweredOn => AdapterState::PoweredOn,
            CentralState::PoweredOff => AdapterState::PoweredOff,
            _ => AdapterState::Unknown,
        })
    }

    async fn scan(&self, duration: Duration) -> Result<Vec<Peripheral>, Error> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(duration).await;
        let peripherals = self.adapter.peripherals().await;
        self.adapter.stop_scan().await?;

        let peripherals = peripherals?;
        for peripheral in &peripherals {
            if let Ok(Some(props)) = peripheral.properties().await {
                log::debug!(
                    "found {} {:?} rssi {:?}",
                    peripheral.address(),
                    props.local_name,
                    props.rssi
                );
            }
        }
        Ok(peripherals)
    }

    async fn connect(&self, peripheral: &Peripheral, timeout: Duration) -> Result<(), Error> {
        match tokio::time::timeout(timeout, peripheral.connect()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn discover_services(&self, peripheral: &Peripheral) -> Result<Vec<Uuid>, Error> {
        peripheral.discover_services().await?;
        Ok(peripheral
            .services()
            .iter()
            .filter(|s| s.primary)
            .map(|s| s.uuid)
            .collect())
    }

    async fn discover_characteristics(
        &self,
        peripheral: &Peripheral,
        service: Uuid,
    ) -> Result<Vec<Uuid>, Error> {
        peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service)
            .map(|s| s.characteristics.iter().map(|c| c.uuid).collect())
            .ok_or(Error::LockServiceNotFound)
    }

    async fn read(&self, peripheral: &Peripheral, characteristic: Uuid) -> Result<Vec<u8>, Error> {
        let characteristic = find_characteristic(peripheral, characteristic)?;
        Ok(peripheral.read(&characteristic).await?)
    }

    async fn write(&self, peripheral: &Peripheral, characteristic: Uuid, data: &[u8]) -> Result<(), Error> {
        let characteristic = find_characteristic(peripheral, characteristic)?;
        Ok(peripheral
            .write(&characteristic, data, WriteType::WithResponse)
            .await?)
    }

    async fn disconnect(&self, peripheral: &Peripheral) -> Result<(), Error> {
        Ok(peripheral.disconnect().await?)
    }
}
