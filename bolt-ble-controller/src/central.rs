//! BLE central capability consumed by the lock manager

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use bolt_proto::Uuid;

use crate::Error;

/// Power state of the local Bluetooth adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Unknown,
    PoweredOn,
    PoweredOff,
}

/// GATT client operations of a BLE central
///
/// Reads and writes address characteristics by UUID on a connected
/// peripheral whose services were discovered.
#[async_trait]
pub trait Central: Send + Sync + 'static {
    type Peripheral: Clone + Debug + Send + Sync + 'static;

    async fn state(&self) -> Result<AdapterState, Error>;

    /// Peripherals seen while scanning for `duration`
    async fn scan(&self, duration: Duration) -> Result<Vec<Self::Peripheral>, Error>;

    /// Connect, failing with [`Error::Timeout`] after `timeout`
    async fn connect(&self, peripheral: &Self::Peripheral, timeout: Duration) -> Result<(), Error>;

    /// UUIDs of the peripheral's primary services
    async fn discover_services(&self, peripheral: &Self::Peripheral) -> Result<Vec<Uuid>, Error>;

    async fn discover_characteristics(
        &self,
        peripheral: &Self::Peripheral,
        service: Uuid,
    ) -> Result<Vec<Uuid>, Error>;

    async fn read(&self, peripheral: &Self::Peripheral, characteristic: Uuid) -> Result<Vec<u8>, Error>;

    /// Write with response
    async fn write(
        &self,
        peripheral: &Self::Peripheral,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<(), Error>;

    async fn disconnect(&self, peripheral: &Self::Peripheral) -> Result<(), Error>;
}
