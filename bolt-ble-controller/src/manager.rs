//! Discovery and administration of locks
//!
//! Every operation connects, validates the lock service, runs, and
//! disconnects. Operations are queued so only one connection is open at a
//! time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bolt_proto::ble;
use bolt_proto::characteristic::{
    HomeKitEnableCommand, IdentifierValue, ListKeysCommand, ListKeysValue, ModelValue,
    NewKeyChildCommand, NewKeyParentCommand, PackageVersionValue, RemoveKeyCommand,
    SetupCommand, StatusValue, UnlockCommand, UpdateCommand, VersionValue,
};
use bolt_proto::{
    Characteristic, CodecError, Key, KeyData, KeyEntry, KeyName, Model, NewKeyInvitation,
    PackageVersion, Permission, SharedSecret, Status, Uuid,
};
use tokio::sync::Mutex;

use crate::central::{AdapterState, Central};
use crate::observable::Observable;
use crate::Error;

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Give up connecting to a peripheral after this long
    pub connect_timeout: Duration,
    /// Scan duration used when the caller has no preference
    pub scan_duration: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            scan_duration: Duration::from_secs(5),
        }
    }
}

/// A lock found by the last scan
#[derive(Debug, Clone)]
pub struct LockRecord<P> {
    pub peripheral: P,
    pub identifier: Uuid,
    pub model: Model,
    pub version: u64,
    pub package_version: PackageVersion,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Typed access to the characteristics of a connected lock
pub struct LockLink<C: Central> {
    central: Arc<C>,
    peripheral: C::Peripheral,
}

impl<C: Central> Clone for LockLink<C> {
    fn clone(&self) -> Self {
        Self {
            central: self.central.clone(),
            peripheral: self.peripheral.clone(),
        }
    }
}

impl<C: Central> LockLink<C> {
    pub fn peripheral(&self) -> &C::Peripheral {
        &self.peripheral
    }

    pub async fn read<T: Characteristic>(&self) -> Result<T, Error> {
        let data = self.central.read(&self.peripheral, T::UUID).await?;
        T::from_bytes(&data).map_err(|e| {
            log::debug!("invalid {} value: {e}", T::NAME);
            Error::InvalidCharacteristicValue(T::UUID)
        })
    }

    pub async fn write<T: Characteristic>(&self, value: &T) -> Result<(), Error> {
        log::debug!("writing {}", T::NAME);
        self.central
            .write(&self.peripheral, T::UUID, &value.to_bytes())
            .await
    }

    pub async fn status(&self) -> Result<Status, Error> {
        Ok(self.read::<StatusValue>().await?.0)
    }

    /// Fail with [`Error::InvalidStatus`] unless the lock is in one of `allowed`
    pub async fn require_status(&self, allowed: &[Status]) -> Result<Status, Error> {
        let status = self.status().await?;
        if !allowed.contains(&status) {
            return Err(Error::InvalidStatus(status));
        }
        Ok(status)
    }
}

/// Disconnects when dropped unless [`finish`](Self::finish) ran first, so a
/// cancelled operation does not leave the link open
struct Connection<C: Central> {
    central: Arc<C>,
    peripheral: Option<C::Peripheral>,
}

impl<C: Central> Connection<C> {
    async fn finish(mut self) {
        if let Some(peripheral) = self.peripheral.take() {
            if let Err(e) = self.central.disconnect(&peripheral).await {
                log::warn!("disconnect from {peripheral:?} failed: {e}");
            }
        }
    }
}

impl<C: Central> Drop for Connection<C> {
    fn drop(&mut self) {
        let Some(peripheral) = self.peripheral.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let central = self.central.clone();
            runtime.spawn(async move {
                let _ = central.disconnect(&peripheral).await;
            });
        }
    }
}

pub struct LockManager<C: Central> {
    central: Arc<C>,
    config: ManagerConfig,
    queue: Mutex<()>,
    /// Whether a scan is running
    pub scanning: Observable<bool>,
    /// Locks found by the current or last scan
    pub locks: Observable<Vec<LockRecord<C::Peripheral>>>,
    pub connection: Observable<ConnectionState>,
}

impl<C: Central> LockManager<C> {
    pub fn new(central: C, config: ManagerConfig) -> Self {
        Self {
            central: Arc::new(central),
            config,
            queue: Mutex::new(()),
            scanning: Observable::new(false),
            locks: Observable::new(Vec::new()),
            connection: Observable::new(ConnectionState::Disconnected),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn central(&self) -> &C {
        &self.central
    }

    /// Scan for `duration` and probe every peripheral for the lock service
    ///
    /// Peripherals that fail to connect or expose a malformed lock service
    /// are logged and skipped.
    pub async fn scan(&self, duration: Duration) -> Result<Vec<LockRecord<C::Peripheral>>, Error> {
        let _queue = self.queue.lock().await;
        if self.central.state().await? != AdapterState::PoweredOn {
            return Err(Error::PoweredOff);
        }

        self.locks.set(Vec::new());
        self.scanning.set(true);
        let result = self.scan_queued(duration).await;
        self.scanning.set(false);
        result
    }

    async fn scan_queued(&self, duration: Duration) -> Result<Vec<LockRecord<C::Peripheral>>, Error> {
        let peripherals = self.central.scan(duration).await?;
        log::debug!("scan found {} peripherals", peripherals.len());

        let mut found = Vec::new();
        for peripheral in peripherals {
            match self.probe(&peripheral).await {
                Ok(Some(record)) => {
                    log::info!("found lock {} ({})", record.identifier, record.status);
                    self.locks.modify(|locks| locks.push(record.clone()));
                    found.push(record);
                }
                Ok(None) => log::trace!("{peripheral:?} is not a lock"),
                Err(e) => log::warn!("skipping {peripheral:?}: {e}"),
            }
        }
        Ok(found)
    }

    async fn probe(&self, peripheral: &C::Peripheral) -> Result<Option<LockRecord<C::Peripheral>>, Error> {
        self.central
            .connect(peripheral, self.config.connect_timeout)
            .await?;
        let connection = Connection {
            central: self.central.clone(),
            peripheral: Some(peripheral.clone()),
        };
        let result = self.describe(peripheral).await;
        connection.finish().await;
        result
    }

    async fn describe(&self, peripheral: &C::Peripheral) -> Result<Option<LockRecord<C::Peripheral>>, Error> {
        let services = self.central.discover_services(peripheral).await?;
        if !services.contains(&ble::SERVICE_UUID) {
            return Ok(None);
        }
        let characteristics = self
            .central
            .discover_characteristics(peripheral, ble::SERVICE_UUID)
            .await?;
        validate_service(&characteristics)?;

        let link = LockLink {
            central: self.central.clone(),
            peripheral: peripheral.clone(),
        };
        Ok(Some(LockRecord {
            peripheral: peripheral.clone(),
            identifier: link.read::<IdentifierValue>().await?.0,
            model: link.read::<ModelValue>().await?.0,
            version: link.read::<VersionValue>().await?.0,
            package_version: link.read::<PackageVersionValue>().await?.0,
            status: link.status().await?,
        }))
    }

    /// Scan until the lock `identifier` shows up
    ///
    /// Never gives up on its own; wrap in `tokio::time::timeout` to bound it.
    pub async fn find(&self, identifier: Uuid, duration: Duration) -> Result<LockRecord<C::Peripheral>, Error> {
        loop {
            let locks = self.scan(duration).await?;
            if let Some(lock) = locks.into_iter().find(|l| l.identifier == identifier) {
                return Ok(lock);
            }
            log::debug!("lock {identifier} not found yet");
        }
    }

    /// Connect to `peripheral`, check that the lock service offers every
    /// `required` characteristic, run `action`, and disconnect
    pub async fn lock_action<T, F, Fut>(
        &self,
        peripheral: &C::Peripheral,
        required: &[Uuid],
        action: F,
    ) -> Result<T, Error>
    where
        F: FnOnce(LockLink<C>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let _queue = self.queue.lock().await;

        self.connection.set(ConnectionState::Connecting);
        if let Err(e) = self
            .central
            .connect(peripheral, self.config.connect_timeout)
            .await
        {
            self.connection.set(ConnectionState::Disconnected);
            return Err(e);
        }
        self.connection.set(ConnectionState::Connected);
        let connection = Connection {
            central: self.central.clone(),
            peripheral: Some(peripheral.clone()),
        };

        let result = async {
            let services = self.central.discover_services(peripheral).await?;
            if !services.contains(&ble::SERVICE_UUID) {
                return Err(Error::LockServiceNotFound);
            }
            let characteristics = self
                .central
                .discover_characteristics(peripheral, ble::SERVICE_UUID)
                .await?;
            if let Some(missing) = required.iter().find(|uuid| !characteristics.contains(uuid)) {
                return Err(Error::CharacteristicNotFound(*missing));
            }
            action(LockLink {
                central: self.central.clone(),
                peripheral: peripheral.clone(),
            })
            .await
        }
        .await;

        connection.finish().await;
        self.connection.set(ConnectionState::Disconnected);
        result
    }

    /// Install a fresh owner key on a lock in Setup status
    pub async fn setup(&self, peripheral: &C::Peripheral, setup_secret: &KeyData) -> Result<Key, Error> {
        let key = Key::new_owner();
        let command = SetupCommand::new(setup_secret, &key);
        self.lock_action(peripheral, &[ble::STATUS_UUID, ble::SETUP_UUID], |link| async move {
            link.require_status(&[Status::Setup]).await?;
            link.write(&command).await?;
            Ok(key)
        })
        .await
    }

    pub async fn unlock(&self, peripheral: &C::Peripheral, key: &Key) -> Result<(), Error> {
        let command = UnlockCommand::new(key.identifier, &key.data);
        self.lock_action(peripheral, &[ble::UNLOCK_UUID], |link| async move {
            link.write(&command).await
        })
        .await
    }

    /// First half of a delegation: reserve a key on the lock for another device
    ///
    /// The returned invitation carries the shared secret and must be passed
    /// to the new key's device out-of-band.
    pub async fn share_key(
        &self,
        peripheral: &C::Peripheral,
        parent: &Key,
        permission: Permission,
        name: Option<KeyName>,
    ) -> Result<NewKeyInvitation, Error> {
        let identifier = Uuid::new_v4();
        let shared_secret = SharedSecret::random();
        let command = NewKeyParentCommand::new(
            parent.identifier,
            &parent.data,
            identifier,
            permission.clone(),
            name.clone(),
            &shared_secret,
        );
        let required = [
            ble::IDENTIFIER_UUID,
            ble::STATUS_UUID,
            ble::NEW_KEY_PARENT_UUID,
        ];
        self.lock_action(peripheral, &required, |link| async move {
            link.require_status(&[Status::Unlock, Status::NewKey]).await?;
            let lock = link.read::<IdentifierValue>().await?.0;
            link.write(&command).await?;
            Ok(NewKeyInvitation {
                lock,
                identifier,
                permission,
                name,
                shared_secret,
                created: chrono::Utc::now(),
            })
        })
        .await
    }

    /// Second half of a delegation: claim the key reserved by `invitation`
    pub async fn receive_key(&self, peripheral: &C::Peripheral, invitation: &NewKeyInvitation) -> Result<Key, Error> {
        let key = Key {
            identifier: invitation.identifier,
            data: KeyData::random(),
            permission: invitation.permission.clone(),
            name: invitation.name.clone(),
        };
        let command = NewKeyChildCommand::new(key.identifier, &key.data, &invitation.shared_secret);
        let lock = invitation.lock;
        let required = [
            ble::IDENTIFIER_UUID,
            ble::STATUS_UUID,
            ble::NEW_KEY_CHILD_UUID,
        ];
        self.lock_action(peripheral, &required, |link| async move {
            if link.read::<IdentifierValue>().await?.0 != lock {
                return Err(Error::NoLock);
            }
            link.require_status(&[Status::NewKey]).await?;
            match link.write(&command).await {
                Ok(()) => Ok(key),
                Err(Error::Rejected(ble::AttError::InsufficientAuthentication)) => {
                    Err(Error::InvalidSharedSecret)
                }
                // the platform hid the ATT code; a lock still waiting for
                // the child half after the write refused the shared secret
                Err(Error::Transport(reason)) => match link.read::<StatusValue>().await {
                    Ok(StatusValue(Status::NewKey)) => {
                        log::debug!("child half failed with {reason:?}, lock still waiting");
                        Err(Error::InvalidSharedSecret)
                    }
                    _ => Err(Error::Transport(reason)),
                },
                Err(e) => Err(e),
            }
        })
        .await
    }

    pub async fn set_homekit(&self, peripheral: &C::Peripheral, key: &Key, enable: bool) -> Result<(), Error> {
        let command = HomeKitEnableCommand::new(key.identifier, &key.data, enable);
        self.lock_action(peripheral, &[ble::HOMEKIT_ENABLE_UUID], |link| async move {
            link.write(&command).await
        })
        .await
    }

    pub async fn update(&self, peripheral: &C::Peripheral, key: &Key) -> Result<(), Error> {
        let command = UpdateCommand::new(key.identifier, &key.data);
        self.lock_action(peripheral, &[ble::UPDATE_UUID], |link| async move {
            link.write(&command).await
        })
        .await
    }

    /// Fetch and decrypt the lock's key directory
    pub async fn list_keys(&self, peripheral: &C::Peripheral, key: &Key) -> Result<Vec<KeyEntry>, Error> {
        let command = ListKeysCommand::new(key.identifier, &key.data);
        let data = key.data.clone();
        let required = [ble::LIST_KEYS_COMMAND_UUID, ble::LIST_KEYS_VALUE_UUID];
        self.lock_action(peripheral, &required, |link| async move {
            link.write(&command).await?;
            let value = link.read::<ListKeysValue>().await?;
            if value.nonce != command.nonce {
                return Err(Error::Authentication);
            }
            value.decrypt(&data).map_err(|e| match e {
                CodecError::Unauthenticated => Error::Authentication,
                _ => Error::InvalidCharacteristicValue(ble::LIST_KEYS_VALUE_UUID),
            })
        })
        .await
    }

    pub async fn remove_key(&self, peripheral: &C::Peripheral, key: &Key, target: Uuid) -> Result<(), Error> {
        let command = RemoveKeyCommand::new(key.identifier, &key.data, target);
        self.lock_action(peripheral, &[ble::REMOVE_KEY_UUID], |link| async move {
            link.write(&command).await
        })
        .await
    }
}

/// The lock service must expose exactly the known characteristics
fn validate_service(characteristics: &[Uuid]) -> Result<(), Error> {
    if let Some(missing) = ble::CHARACTERISTICS
        .iter()
        .find(|uuid| !characteristics.contains(uuid))
    {
        return Err(Error::CharacteristicNotFound(*missing));
    }
    if let Some(unknown) = characteristics
        .iter()
        .find(|uuid| !ble::CHARACTERISTICS.contains(uuid))
    {
        log::debug!("unexpected characteristic {unknown}");
        return Err(Error::LockServiceNotFound);
    }
    Ok(())
}
