//! Keys and pending delegations held by the lock

use std::collections::VecDeque;

use bolt_proto::{Key, KeyName, Nonce, Permission, SharedSecret, Status, Uuid};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A delegation waiting for the child half of the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingKey {
    /// Identifier the new key will have
    pub identifier: Uuid,
    /// Administrator key that started the delegation
    pub parent: Uuid,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<KeyName>,
    pub shared_secret: SharedSecret,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
}

impl PendingKey {
    /// A deadline past the end of representable time never arrives
    pub fn expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.created
            .checked_add_signed(timeout)
            .is_some_and(|deadline| now >= deadline)
    }
}

/// Nonces of recently accepted commands, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayWindow {
    nonces: VecDeque<Nonce>,
}

impl ReplayWindow {
    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.nonces.contains(nonce)
    }

    /// Remember `nonce`, forgetting the oldest beyond `capacity`
    pub fn record(&mut self, nonce: Nonce, capacity: usize) {
        self.nonces.push_back(nonce);
        while self.nonces.len() > capacity.max(1) {
            self.nonces.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}

/// The persisted document: installed keys, pending delegations and the
/// replay window, so a captured command stays dead across restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStore {
    #[serde(default)]
    keys: Vec<Key>,
    #[serde(default)]
    pending: Vec<PendingKey>,
    #[serde(default, skip_serializing_if = "ReplayWindow::is_empty")]
    replay: ReplayWindow,
}

impl KeyStore {
    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Setup until an owner key exists, NewKey while delegations are pending
    pub fn status(&self) -> Status {
        if self.keys.is_empty() {
            Status::Setup
        } else if self.pending.is_empty() {
            Status::Unlock
        } else {
            Status::NewKey
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn pending(&self) -> &[PendingKey] {
        &self.pending
    }

    pub fn key(&self, identifier: &Uuid) -> Option<&Key> {
        self.keys.iter().find(|k| k.identifier == *identifier)
    }

    pub fn pending_key(&self, identifier: &Uuid) -> Option<&PendingKey> {
        self.pending.iter().find(|p| p.identifier == *identifier)
    }

    /// Whether `identifier` is taken by a key or a pending delegation
    pub fn contains(&self, identifier: &Uuid) -> bool {
        self.key(identifier).is_some() || self.pending_key(identifier).is_some()
    }

    pub fn owner_count(&self) -> usize {
        self.keys
            .iter()
            .filter(|k| k.permission == Permission::Owner)
            .count()
    }

    /// Add a key, replacing any key with the same identifier
    pub fn insert_key(&mut self, key: Key) {
        self.keys.retain(|k| k.identifier != key.identifier);
        self.keys.push(key);
    }

    pub fn remove_key(&mut self, identifier: &Uuid) -> Option<Key> {
        let index = self.keys.iter().position(|k| k.identifier == *identifier)?;
        Some(self.keys.remove(index))
    }

    pub fn insert_pending(&mut self, pending: PendingKey) {
        self.pending.retain(|p| p.identifier != pending.identifier);
        self.pending.push(pending);
    }

    pub fn remove_pending(&mut self, identifier: &Uuid) -> Option<PendingKey> {
        let index = self.pending.iter().position(|p| p.identifier == *identifier)?;
        Some(self.pending.remove(index))
    }

    /// Drop delegations older than `timeout`, returning how many were dropped
    pub fn expire(&mut self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| !p.expired(now, timeout));
        before - self.pending.len()
    }

    pub fn has_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.pending.iter().any(|p| p.expired(now, timeout))
    }

    pub fn replay(&self) -> &ReplayWindow {
        &self.replay
    }

    pub fn record_nonce(&mut self, nonce: Nonce, capacity: usize) {
        self.replay.record(nonce, capacity);
    }
}
