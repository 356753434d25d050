//! Bolt BLE Controller
//!
//! Central side of the Bolt lock protocol: discover locks, then set them up,
//! unlock them and manage their keys.
//!
//! # Example
//!
//! ```ignore
//! use bolt_ble_controller::{BtleplugCentral, LockManager, ManagerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = LockManager::new(BtleplugCentral::new().await?, ManagerConfig::default());
//!
//!     for lock in manager.scan(std::time::Duration::from_secs(5)).await? {
//!         println!("{} ({})", lock.identifier, lock.status);
//!     }
//!     Ok(())
//! }
//! ```

mod backend;
mod central;
mod error;
mod manager;
mod observable;

pub use backend::BtleplugCentral;
pub use central::{AdapterState, Central};
pub use error::Error;
pub use manager::{ConnectionState, LockLink, LockManager, LockRecord, ManagerConfig};
pub use observable::Observable;
