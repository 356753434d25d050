//! Bolt lock daemon library
//!
//! The lock side of the protocol: configuration, the persistent key store
//! and the controller that authorizes every write to the lock service.
//!
//! The platform supplies three seams:
//! - [`Storage`] for the key store document
//! - [`Hardware`] for the bolt and other side effects
//! - [`GattServer`] for advertising and characteristic values
//!
//! and forwards GATT requests to [`LockController::handle_read`] and
//! [`LockController::handle_write`].

mod config;
mod controller;
mod error;
mod hardware;
mod server;
mod storage;
mod store;

pub use config::{ConfigError, Configuration};
pub use controller::{CentralId, Clock, LockController, SystemClock, WriteOutcome};
pub use error::{BoxError, LockError};
pub use hardware::{Hardware, HardwareError, ProcessHardware};
pub use server::GattServer;
pub use storage::{FileStorage, MemoryStorage, ReadOnly, Storage};
pub use store::{KeyStore, PendingKey};
