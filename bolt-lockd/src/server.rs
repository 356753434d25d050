//! GATT server seam

use bolt_proto::Uuid;

/// The peripheral's GATT server, implemented over the platform BLE stack
///
/// Incoming reads and writes are forwarded by the transport glue to
/// [`LockController::handle_read`](crate::LockController::handle_read) and
/// [`LockController::handle_write`](crate::LockController::handle_write).
pub trait GattServer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Advertise the lock service under `local_name`
    fn start_advertising(&mut self, local_name: &str) -> Result<(), Self::Error>;

    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Set a characteristic value and notify subscribed centrals
    fn update_value(&mut self, uuid: Uuid, value: &[u8]) -> Result<(), Self::Error>;
}
