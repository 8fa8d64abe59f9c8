// src/host/mod.rs
//! Capabilities the hosting system lends to token actions.
//!
//! The ledger never proves identities, delivers messages or bills storage on
//! its own. It asks the host through these traits, so the same actions run
//! inside a chain node, a service or a test with [`LocalHost`].

mod local;

pub use local::LocalHost;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Action, SymbolCode, TokenError};

pub trait AuthorizationGate: Send + Sync {
    /// Fails with [`TokenError::Unauthorized`] unless the current caller has
    /// proven control of `identity`.
    fn require_auth(&self, identity: Uuid) -> Result<(), TokenError>;

    /// Whether `identity` names an existing account on the host.
    fn is_account(&self, identity: Uuid) -> bool;
}

pub trait NotificationFanout: Send + Sync {
    fn notify(&self, notification: &Notification);
}

pub trait StorageCostPolicy: Send + Sync {
    fn on_storage(&self, event: &StorageEvent);
}

/// Everything a [`crate::Token`] needs from its host.
pub trait Host: AuthorizationGate + NotificationFanout + StorageCostPolicy {}

impl<T> Host for T where T: AuthorizationGate + NotificationFanout + StorageCostPolicy {}

/// A party informed of a committed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub action: Action,
    pub party: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Supply,
    Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageChange {
    Allocated,
    Released,
}

/// A row was created or dropped on behalf of `payer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub change: StorageChange,
    pub payer: Uuid,
    pub table: Table,
    /// Row scope: the contract for supply rows, the holder for balance rows.
    pub scope: Uuid,
    pub code: SymbolCode,
}
