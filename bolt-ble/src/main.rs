//! Command line tool for Bolt locks
//!
//! Finds locks over BLE, sets them up, unlocks them and shares keys. Keys
//! are kept in `$BOLT_HOME/keys.json` (default `~/.bolt`).

mod args;
mod keys;

use std::path::Path;
use std::time::Duration;

use bolt_ble_controller::{BtleplugCentral, LockManager, LockRecord, ManagerConfig};
use bolt_proto::{Key, KeyData, KeyName, NewKeyInvitation, Uuid};
use btleplug::platform::Peripheral;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::args::PermissionKind;
use crate::keys::KeyRing;

#[derive(Parser)]
#[command(name = "bolt-ble")]
#[command(about = "Set up, unlock and share keys for Bolt locks")]
struct Cli {
    /// Seconds per scan
    #[arg(long, default_value = "5", global = true)]
    scan: u64,
    /// Give up looking for a lock after this many seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List nearby locks
    Scan,
    /// Install an owner key on a new lock
    Setup {
        lock: Uuid,
        /// Setup secret printed on the lock, hex
        secret: String,
    },
    Unlock {
        lock: Uuid,
    },
    /// Create an invitation for another device
    Share {
        lock: Uuid,
        #[arg(short, long, value_enum, default_value = "anytime")]
        permission: PermissionKind,
        #[arg(short, long)]
        name: Option<String>,
        /// Scheduled keys stop working at this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        expires: Option<String>,
        /// Scheduled keys work during these hours, e.g. 08:00-18:00
        #[arg(long)]
        hours: Option<String>,
        /// Scheduled keys work on these days, e.g. mon,tue,wed
        #[arg(long)]
        days: Option<String>,
    },
    /// Accept an invitation created with `share`
    Receive {
        token: String,
    },
    /// List the keys installed on a lock
    Keys {
        lock: Uuid,
    },
    /// Remove a key, or withdraw a pending invitation
    Remove {
        lock: Uuid,
        key: Uuid,
    },
    Homekit {
        lock: Uuid,
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Ask the lock to update its software
    Update {
        lock: Uuid,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Toggle {
    On,
    Off,
}

type Manager = LockManager<BtleplugCentral>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let key_path = keys::bolt_home()?.join(KeyRing::FILE_NAME);
    let mut ring = KeyRing::load(&key_path)?;

    let config = ManagerConfig {
        scan_duration: Duration::from_secs(cli.scan),
        ..ManagerConfig::default()
    };
    let manager = LockManager::new(BtleplugCentral::new().await?, config);
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Scan => {
            println!("Scanning for locks ({} seconds)...", cli.scan);
            let locks = manager.scan(manager.config().scan_duration).await?;
            println!("\nFound {} locks:", locks.len());
            for lock in locks {
                let marker = if ring.get(&lock.identifier).is_some() { " [KEY]" } else { "" };
                println!(
                    "  {} {} v{} ({}) {}{}",
                    lock.identifier,
                    lock.model.name(),
                    lock.package_version,
                    lock.status,
                    peripheral_address(&lock.peripheral),
                    marker
                );
            }
        }
        Commands::Setup { lock, secret } => {
            let secret = KeyData::from_hex(&secret).ok_or("setup secret must be 64 hex digits")?;
            let record = find(&manager, lock, timeout).await?;
            let key = manager.setup(&record.peripheral, &secret).await?;
            println!("Lock {lock} set up, owner key {}", key.identifier);
            save_key(&mut ring, &key_path, lock, key)?;
        }
        Commands::Unlock { lock } => {
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            manager.unlock(&record.peripheral, key).await?;
            println!("Unlocked {lock}");
        }
        Commands::Share {
            lock,
            permission,
            name,
            expires,
            hours,
            days,
        } => {
            let permission =
                args::permission(permission, expires.as_deref(), hours.as_deref(), days.as_deref())?;
            let name = match name {
                Some(name) => Some(KeyName::new(name).ok_or("key name must be 1 to 64 bytes")?),
                None => None,
            };
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            let invitation = manager
                .share_key(&record.peripheral, key, permission, name)
                .await?;
            println!("New key {} ({})", invitation.identifier, invitation.permission);
            println!("Pass this invitation to the new device:\n\n{}\n", invitation.to_token());
            println!("Shared secret: {}", invitation.shared_secret);
        }
        Commands::Receive { token } => {
            let invitation = NewKeyInvitation::from_token(&token)?;
            let record = find(&manager, invitation.lock, timeout).await?;
            let key = manager.receive_key(&record.peripheral, &invitation).await?;
            println!("Received key {} for lock {}", key.identifier, invitation.lock);
            save_key(&mut ring, &key_path, invitation.lock, key)?;
        }
        Commands::Keys { lock } => {
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            let entries = manager.list_keys(&record.peripheral, key).await?;
            println!("{} keys:", entries.len());
            for entry in entries {
                let name = entry.name.as_ref().map(KeyName::as_str).unwrap_or("-");
                let marker = if entry.identifier == key.identifier { " [THIS DEVICE]" } else { "" };
                println!("  {} {} {}{}", entry.identifier, entry.permission, name, marker);
            }
        }
        Commands::Remove { lock, key: target } => {
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            manager.remove_key(&record.peripheral, key, target).await?;
            println!("Removed key {target}");
            if target == key.identifier {
                ring.remove(&lock);
                ring.save(&key_path)?;
            }
        }
        Commands::Homekit { lock, state } => {
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            let enable = matches!(state, Toggle::On);
            manager.set_homekit(&record.peripheral, key, enable).await?;
            println!("HomeKit {}", if enable { "enabled" } else { "disabled" });
        }
        Commands::Update { lock } => {
            let key = ring.require(&lock)?;
            let record = find(&manager, lock, timeout).await?;
            manager.update(&record.peripheral, key).await?;
            println!("Update started on {lock}");
        }
    }

    Ok(())
}

async fn find(
    manager: &Manager,
    lock: Uuid,
    timeout: Duration,
) -> Result<LockRecord<Peripheral>, Box<dyn std::error::Error>> {
    println!("Looking for lock {lock}...");
    let record = tokio::time::timeout(timeout, manager.find(lock, manager.config().scan_duration))
        .await
        .map_err(|_| format!("lock {lock} not found"))??;
    log::debug!("found {lock} at {:?}", record.peripheral);
    Ok(record)
}

fn save_key(
    ring: &mut KeyRing,
    path: &Path,
    lock: Uuid,
    key: Key,
) -> Result<(), Box<dyn std::error::Error>> {
    ring.insert(lock, key);
    ring.save(path)?;
    println!("  Saved to: {}", path.display());
    Ok(())
}

fn peripheral_address(peripheral: &Peripheral) -> String {
    use btleplug::api::Peripheral as _;
    peripheral.address().to_string()
}
