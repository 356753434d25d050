//! Authorization state machine of the lock
//!
//! Each write goes through the same pipeline: status check, reassembly of
//! long writes, decoding, authentication, authorization, then a
//! copy-on-write commit of the key store followed by actuation.

use std::collections::HashMap;

use bolt_proto::ble::{self, AttError};
use bolt_proto::characteristic::{
    self, HomeKitEnableCommand, IdentifierValue, ListKeysCommand, ListKeysValue, ModelValue,
    NewKeyChildCommand, NewKeyParentCommand, PackageVersionValue, RemoveKeyCommand,
    SetupCommand, StatusValue, UnlockCommand, UpdateCommand, VersionValue,
};
use bolt_proto::{
    Authenticated, Characteristic, Key, KeyEntry, PACKAGE_VERSION, PROTOCOL_VERSION,
    Permission, Status, Uuid,
};
use chrono::{DateTime, Utc};

use crate::config::Configuration;
use crate::error::LockError;
use crate::hardware::{Hardware, HardwareError};
use crate::server::GattServer;
use crate::storage::Storage;
use crate::store::{KeyStore, PendingKey};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Transport handle of a connected central
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CentralId(pub u64);

/// Result of an accepted write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Part of a long write; more data is expected
    Pending,
    /// The command was executed
    Complete,
}

pub struct LockController<S, H, G> {
    config: Configuration,
    store: KeyStore,
    status: Status,
    storage: S,
    hardware: H,
    server: G,
    clock: Box<dyn Clock>,
    buffers: HashMap<(CentralId, Uuid), Vec<u8>>,
    directories: HashMap<CentralId, Vec<u8>>,
}

impl<S, H, G> LockController<S, H, G>
where
    S: Storage,
    H: Hardware,
    G: GattServer,
{
    /// Load the key store from `storage` and derive the initial status
    pub fn new(config: Configuration, storage: S, hardware: H, server: G) -> Result<Self, LockError> {
        let store = match storage.load().map_err(storage_error)? {
            Some(document) => KeyStore::from_json(&document).map_err(storage_error)?,
            None => KeyStore::default(),
        };
        let status = store.status();
        log::info!(
            "lock {} loaded {} keys, {} pending, status {}",
            config.identifier,
            store.keys().len(),
            store.pending().len(),
            status
        );
        Ok(Self {
            config,
            store,
            status,
            storage,
            hardware,
            server,
            clock: Box::new(SystemClock),
            buffers: HashMap::new(),
            directories: HashMap::new(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn server(&self) -> &G {
        &self.server
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Publish every readable value and start advertising
    pub fn start(&mut self) -> Result<(), LockError> {
        self.publish_information()?;
        let name = format!("Bolt {}", self.config.model.name());
        self.server
            .start_advertising(&name)
            .map_err(bluetooth_error)?;
        log::info!("advertising as {name:?}");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), LockError> {
        self.server.stop_advertising().map_err(bluetooth_error)
    }

    fn publish_information(&mut self) -> Result<(), LockError> {
        for uuid in ble::INFORMATION {
            let value = self.information(&uuid).expect("information characteristic");
            self.server
                .update_value(uuid, &value)
                .map_err(bluetooth_error)?;
        }
        Ok(())
    }

    fn information(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        Some(match *uuid {
            ble::IDENTIFIER_UUID => IdentifierValue(self.config.identifier).to_bytes(),
            ble::MODEL_UUID => ModelValue(self.config.model).to_bytes(),
            ble::VERSION_UUID => VersionValue(PROTOCOL_VERSION).to_bytes(),
            ble::PACKAGE_VERSION_UUID => PackageVersionValue(PACKAGE_VERSION).to_bytes(),
            ble::STATUS_UUID => StatusValue(self.status).to_bytes(),
            _ => return None,
        })
    }

    /// Value served to a read of `uuid` by `central`
    pub fn handle_read(&self, central: CentralId, uuid: &Uuid) -> Result<Vec<u8>, AttError> {
        if let Some(value) = self.information(uuid) {
            return Ok(value);
        }
        if *uuid == ble::LIST_KEYS_VALUE_UUID {
            return Ok(self.directories.get(&central).cloned().unwrap_or_default());
        }
        if ble::name(uuid).is_some() {
            return Err(AttError::ReadNotPermitted);
        }
        Err(AttError::AttributeNotFound)
    }

    /// Accept a (possibly partial) write of `uuid` at `offset`
    ///
    /// The command runs once exactly its fixed length has arrived.
    pub fn handle_write(
        &mut self,
        central: CentralId,
        uuid: &Uuid,
        offset: usize,
        data: &[u8],
    ) -> Result<WriteOutcome, AttError> {
        if let Err(e) = self.expire_pending() {
            log::warn!("failed to expire pending keys: {e}");
        }

        if ble::name(uuid).is_none() {
            return Err(AttError::AttributeNotFound);
        }
        if !ble::is_writable(self.status, uuid) {
            log::debug!(
                "{} not writable in {} status",
                ble::name(uuid).unwrap_or_default(),
                self.status
            );
            return Err(LockError::State(self.status).att_error());
        }
        let expected = characteristic::command_length(uuid).ok_or(AttError::WriteNotPermitted)?;

        let slot = (central, *uuid);
        let buffer = self.buffers.entry(slot).or_default();
        if offset == 0 {
            buffer.clear();
        }
        if offset != buffer.len() {
            self.buffers.remove(&slot);
            return Err(AttError::InvalidOffset);
        }
        if buffer.len() + data.len() > expected {
            self.buffers.remove(&slot);
            return Err(AttError::InvalidAttributeValueLength);
        }
        buffer.extend_from_slice(data);
        if buffer.len() < expected {
            return Ok(WriteOutcome::Pending);
        }

        let value = self.buffers.remove(&slot).unwrap_or_default();
        match self.execute(central, uuid, &value) {
            Ok(()) => Ok(WriteOutcome::Complete),
            Err(e) => {
                log::warn!(
                    "{} from central {} rejected: {e}",
                    ble::name(uuid).unwrap_or_default(),
                    central.0
                );
                Err(e.att_error())
            }
        }
    }

    /// Forget everything buffered for `central`
    pub fn disconnected(&mut self, central: CentralId) {
        self.buffers.retain(|(c, _), _| *c != central);
        self.directories.remove(&central);
    }

    /// Drop delegations that waited longer than the configured timeout
    pub fn expire_pending(&mut self) -> Result<usize, LockError> {
        let now = self.clock.now();
        let timeout = self.config.pending_key_timeout();
        if !self.store.has_expired(now, timeout) {
            return Ok(0);
        }
        let mut expired = 0;
        self.commit(|store| expired = store.expire(now, timeout))?;
        log::info!("expired {expired} pending keys");
        Ok(expired)
    }

    /// Erase all keys and regenerate the lock's identity and setup secret
    pub fn factory_reset(&mut self) -> Result<(), LockError> {
        let mut config = self.config.clone();
        config.regenerate();
        config.persist()?;
        self.storage.clear().map_err(storage_error)?;

        self.config = config;
        self.store = KeyStore::default();
        self.buffers.clear();
        self.directories.clear();
        log::warn!("factory reset, new identifier {}", self.config.identifier);

        self.refresh_status();
        if let Err(e) = self.publish_information() {
            log::warn!("failed to publish values after reset: {e}");
        }
        Ok(())
    }

    fn execute(&mut self, central: CentralId, uuid: &Uuid, value: &[u8]) -> Result<(), LockError> {
        match *uuid {
            ble::SETUP_UUID => self.setup(SetupCommand::from_bytes(value)?),
            ble::UNLOCK_UUID => self.unlock(UnlockCommand::from_bytes(value)?),
            ble::NEW_KEY_PARENT_UUID => self.new_key_parent(NewKeyParentCommand::from_bytes(value)?),
            ble::NEW_KEY_CHILD_UUID => self.new_key_child(NewKeyChildCommand::from_bytes(value)?),
            ble::HOMEKIT_ENABLE_UUID => self.homekit(HomeKitEnableCommand::from_bytes(value)?),
            ble::UPDATE_UUID => self.update(UpdateCommand::from_bytes(value)?),
            ble::LIST_KEYS_COMMAND_UUID => {
                self.list_keys(central, ListKeysCommand::from_bytes(value)?)
            }
            ble::REMOVE_KEY_UUID => self.remove_key(RemoveKeyCommand::from_bytes(value)?),
            _ => Err(LockError::State(self.status)),
        }
    }

    fn setup(&mut self, command: SetupCommand) -> Result<(), LockError> {
        if !command.authenticated_with(&self.config.setup_secret) {
            return Err(LockError::Authentication);
        }
        self.accept_nonce(&command)?;

        let key = Key {
            identifier: command.identifier,
            data: command.decrypt(&self.config.setup_secret),
            permission: Permission::Owner,
            name: None,
        };
        self.commit(|store| store.insert_key(key))?;
        log::info!("lock set up with owner key {}", command.identifier);
        Ok(())
    }

    fn unlock(&mut self, command: UnlockCommand) -> Result<(), LockError> {
        let key = self.authenticate(&command)?;
        let now = self.clock.now().with_timezone(&self.config.time_zone());
        if !key.permission.can_unlock(&now) {
            return Err(LockError::Authorization("outside of schedule"));
        }
        self.hardware.unlock()?;
        log::info!("unlocked by key {}", key.identifier);
        Ok(())
    }

    fn new_key_parent(&mut self, command: NewKeyParentCommand) -> Result<(), LockError> {
        let parent = self.authenticate(&command)?;
        require_administrator(&parent)?;
        if command.permission == Permission::Owner {
            return Err(LockError::Validation("owner keys cannot be delegated".into()));
        }
        if self.store.contains(&command.child) {
            return Err(LockError::Validation(format!(
                "key {} already exists",
                command.child
            )));
        }
        let shared_secret = command.decrypt(&parent.data)?;

        let pending = PendingKey {
            identifier: command.child,
            parent: parent.identifier,
            permission: command.permission,
            name: command.name,
            shared_secret,
            created: self.clock.now(),
        };
        log::info!(
            "key {} delegated by {} as {}",
            pending.identifier,
            parent.identifier,
            pending.permission
        );
        self.commit(|store| store.insert_pending(pending))
    }

    fn new_key_child(&mut self, command: NewKeyChildCommand) -> Result<(), LockError> {
        let pending = self
            .store
            .pending_key(&command.child)
            .cloned()
            .ok_or(LockError::Authentication)?;
        if !command.authenticated_with(&pending.shared_secret.key_data()) {
            return Err(LockError::Authentication);
        }
        self.accept_nonce(&command)?;

        let key = Key {
            identifier: pending.identifier,
            data: command.decrypt(&pending.shared_secret),
            permission: pending.permission,
            name: pending.name,
        };
        self.commit(|store| {
            store.remove_pending(&key.identifier);
            store.insert_key(key);
        })?;
        log::info!("key {} installed", command.child);
        Ok(())
    }

    fn homekit(&mut self, command: HomeKitEnableCommand) -> Result<(), LockError> {
        let key = self.authenticate(&command)?;
        require_administrator(&key)?;

        let mut config = self.config.clone();
        config.homekit = command.enable;
        config.persist()?;
        if let Err(e) = self.hardware.set_homekit(command.enable) {
            if let Err(rollback) = self.config.persist() {
                log::error!("failed to restore configuration after {e}: {rollback}");
            }
            return Err(e.into());
        }
        self.config = config;
        log::info!("homekit set to {} by key {}", command.enable, key.identifier);
        Ok(())
    }

    fn update(&mut self, command: UpdateCommand) -> Result<(), LockError> {
        let key = self.authenticate(&command)?;
        require_administrator(&key)?;
        log::info!("update requested by key {}", key.identifier);
        self.hardware.update()?;
        Ok(())
    }

    fn list_keys(&mut self, central: CentralId, command: ListKeysCommand) -> Result<(), LockError> {
        let key = self.authenticate(&command)?;
        require_administrator(&key)?;

        let entries: Vec<KeyEntry> = self.store.keys().iter().map(Key::entry).collect();
        let value = ListKeysValue::new(command.nonce, &key.data, &entries)?;
        self.directories.insert(central, value.to_bytes());
        log::debug!("listed {} keys for {}", entries.len(), key.identifier);
        Ok(())
    }

    fn remove_key(&mut self, command: RemoveKeyCommand) -> Result<(), LockError> {
        let key = self.authenticate(&command)?;
        require_administrator(&key)?;
        let target = command.target;

        if let Some(removed) = self.store.key(&target) {
            match removed.permission {
                Permission::Owner if key.permission != Permission::Owner => {
                    return Err(LockError::Authorization("only an owner can remove an owner"));
                }
                Permission::Owner if self.store.owner_count() == 1 => {
                    return Err(LockError::Authorization("cannot remove the last owner key"));
                }
                Permission::Admin if key.permission != Permission::Owner => {
                    return Err(LockError::Authorization("only an owner can remove an admin"));
                }
                _ => {}
            }
            self.commit(|store| {
                store.remove_key(&target);
            })?;
        } else if self.store.pending_key(&target).is_some() {
            self.commit(|store| {
                store.remove_pending(&target);
            })?;
        } else {
            return Err(LockError::NotFound(target));
        }
        log::info!("key {target} removed by {}", key.identifier);
        Ok(())
    }

    /// Verify the command's tag against its key and consume its nonce
    fn authenticate<A: Authenticated>(&mut self, command: &A) -> Result<Key, LockError> {
        let key = self
            .store
            .key(&command.identifier())
            .cloned()
            .ok_or(LockError::Authentication)?;
        if !command.authenticated_with(&key.data) {
            return Err(LockError::Authentication);
        }
        self.accept_nonce(command)?;
        Ok(key)
    }

    /// Reject a nonce already in the window, otherwise persist it before
    /// the command takes effect
    fn accept_nonce<A: Authenticated>(&mut self, command: &A) -> Result<(), LockError> {
        let nonce = *command.nonce();
        if self.store.replay().contains(&nonce) {
            log::warn!("replayed nonce for {}", command.identifier());
            return Err(LockError::Authentication);
        }
        let capacity = self.config.replay_window;
        self.commit(|store| store.record_nonce(nonce, capacity))
    }

    /// Apply `change` to a copy of the store, persist it, then swap it in
    fn commit(&mut self, change: impl FnOnce(&mut KeyStore)) -> Result<(), LockError> {
        let mut next = self.store.clone();
        change(&mut next);
        let document = next.to_json().map_err(storage_error)?;
        self.storage.save(&document).map_err(storage_error)?;
        self.store = next;
        self.refresh_status();
        Ok(())
    }

    fn refresh_status(&mut self) {
        let status = self.store.status();
        if status == self.status {
            return;
        }
        log::info!("status {} -> {}", self.status, status);
        self.status = status;
        if let Err(e) = self
            .server
            .update_value(ble::STATUS_UUID, &StatusValue(status).to_bytes())
        {
            log::warn!("failed to notify status: {e}");
        }
    }
}

fn require_administrator(key: &Key) -> Result<(), LockError> {
    if !key.permission.is_administrator() {
        return Err(LockError::Authorization("administrator key required"));
    }
    Ok(())
}

fn storage_error(e: impl std::error::Error + Send + Sync + 'static) -> LockError {
    LockError::Storage(Box::new(e))
}

fn bluetooth_error(e: impl std::error::Error) -> LockError {
    LockError::Hardware(HardwareError::Bluetooth(e.to_string()))
}
