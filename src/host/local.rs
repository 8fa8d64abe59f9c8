// src/host/local.rs
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::{AuthorizationGate, Notification, NotificationFanout, StorageChange, StorageCostPolicy, StorageEvent};
use crate::TokenError;

#[derive(Default)]
struct LocalState {
    signers: HashSet<Uuid>,
    accounts: HashSet<Uuid>,
    notifications: Vec<Notification>,
    rows: HashMap<Uuid, i64>,
}

/// In-process host: a signer set standing in for verified signatures, a
/// registry of known accounts, a log of delivered notifications and a count
/// of rows each payer is currently charged for.
#[derive(Default)]
pub struct LocalHost {
    state: Mutex<LocalState>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_account(&self, account: Uuid) {
        self.state().accounts.insert(account);
    }

    /// Registers and returns a fresh account.
    pub fn new_account(&self) -> Uuid {
        let account = Uuid::now_v7();
        self.register_account(account);
        account
    }

    /// Replaces the identities the next calls are authorized by.
    pub fn sign_as(&self, signers: impl IntoIterator<Item = Uuid>) {
        let mut state = self.state();
        state.signers.clear();
        state.signers.extend(signers);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state().notifications)
    }

    /// Number of rows `payer` is currently charged for.
    pub fn rows_paid_by(&self, payer: Uuid) -> i64 {
        self.state().rows.get(&payer).copied().unwrap_or(0)
    }
}

impl AuthorizationGate for LocalHost {
    fn require_auth(&self, identity: Uuid) -> Result<(), TokenError> {
        if self.state().signers.contains(&identity) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized(identity))
        }
    }

    fn is_account(&self, identity: Uuid) -> bool {
        self.state().accounts.contains(&identity)
    }
}

impl NotificationFanout for LocalHost {
    fn notify(&self, notification: &Notification) {
        self.state().notifications.push(*notification);
    }
}

impl StorageCostPolicy for LocalHost {
    fn on_storage(&self, event: &StorageEvent) {
        let mut state = self.state();
        let rows = state.rows.entry(event.payer).or_insert(0);
        match event.change {
            StorageChange::Allocated => *rows += 1,
            StorageChange::Released => *rows -= 1,
        }
    }
}
