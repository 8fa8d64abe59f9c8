// src/context.rs
use std::collections::BTreeMap;

use uuid::Uuid;

use crate::host::{Notification, StorageChange, StorageEvent, Table};
use crate::plan::{ExecutionPlan, Operation};
use crate::{Action, BalanceRecord, SupplyRecord, SymbolCode, TokenAdapter, TokenError};

/// A row as first read from storage and as the action has left it so far.
struct Staged<T> {
    original: Option<T>,
    current: Option<T>,
}

/// Staging area of one token action.
///
/// Reads go through to the adapter once per key; every later read and write
/// of that key sees the staged copy. Nothing reaches storage until the whole
/// action succeeded and the context is turned into an [`ExecutionPlan`].
pub(crate) struct ActionContext<'a> {
    adapter: &'a dyn TokenAdapter,
    contract: Uuid,
    supply: BTreeMap<SymbolCode, Staged<SupplyRecord>>,
    balances: BTreeMap<(Uuid, SymbolCode), Staged<BalanceRecord>>,
    notifications: Vec<Notification>,
}

/// What a successful action leaves behind for commit and delivery.
pub(crate) struct Outcome {
    pub plan: ExecutionPlan,
    pub notifications: Vec<Notification>,
    pub storage_events: Vec<StorageEvent>,
}

impl<'a> ActionContext<'a> {
    pub fn new(adapter: &'a dyn TokenAdapter, contract: Uuid) -> Self {
        Self {
            adapter,
            contract,
            supply: BTreeMap::new(),
            balances: BTreeMap::new(),
            notifications: Vec::new(),
        }
    }

    pub async fn supply(&mut self, code: SymbolCode) -> Result<Option<SupplyRecord>, TokenError> {
        if let Some(staged) = self.supply.get(&code) {
            return Ok(staged.current.clone());
        }

        let record = self.adapter.get_supply_record(code).await?;
        self.supply.insert(
            code,
            Staged {
                original: record.clone(),
                current: record.clone(),
            },
        );
        Ok(record)
    }

    pub async fn balance(
        &mut self,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<Option<BalanceRecord>, TokenError> {
        if let Some(staged) = self.balances.get(&(owner, code)) {
            return Ok(staged.current.clone());
        }

        let record = self.adapter.get_balance_record(owner, code).await?;
        self.balances.insert(
            (owner, code),
            Staged {
                original: record.clone(),
                current: record.clone(),
            },
        );
        Ok(record)
    }

    /// A key never read is staged as a new row; the adapter rejects the
    /// insert if storage already holds it.
    pub fn put_supply(&mut self, record: SupplyRecord) {
        let code = record.code();
        tracing::trace!(code = %code, supply = %record.supply, "staging supply row");
        self.supply
            .entry(code)
            .or_insert(Staged {
                original: None,
                current: None,
            })
            .current = Some(record);
    }

    /// A key never read is staged as a new row; the adapter rejects the
    /// insert if storage already holds it.
    pub fn put_balance(&mut self, record: BalanceRecord) {
        let key = (record.owner, record.code());
        tracing::trace!(owner = %record.owner, balance = %record.balance, "staging balance row");
        self.balances
            .entry(key)
            .or_insert(Staged {
                original: None,
                current: None,
            })
            .current = Some(record);
    }

    pub fn erase_balance(&mut self, owner: Uuid, code: SymbolCode) {
        tracing::trace!(owner = %owner, code = %code, "staging balance erase");
        if let Some(staged) = self.balances.get_mut(&(owner, code)) {
            staged.current = None;
        }
    }

    /// Queues `party` to hear about `action`, once per action.
    pub fn notify(&mut self, action: Action, party: Uuid) {
        let notification = Notification { action, party };
        if !self.notifications.contains(&notification) {
            self.notifications.push(notification);
        }
    }

    /// Diffs staged rows against what storage held and turns the difference
    /// into writes and storage-cost events.
    pub fn into_outcome(self) -> Outcome {
        let mut plan = ExecutionPlan::new();
        let mut storage_events = Vec::new();

        for (code, staged) in self.supply {
            match (staged.original, staged.current) {
                (None, Some(record)) => {
                    storage_events.push(StorageEvent {
                        change: StorageChange::Allocated,
                        payer: self.contract,
                        table: Table::Supply,
                        scope: self.contract,
                        code,
                    });
                    plan.add(Operation::InsertSupply(record));
                }
                (Some(before), Some(after)) if before != after => {
                    plan.add(Operation::UpdateSupply {
                        previous: before,
                        record: after,
                    });
                }
                // supply rows are never erased
                _ => {}
            }
        }

        for ((owner, code), staged) in self.balances {
            let event = |change, payer| StorageEvent {
                change,
                payer,
                table: Table::Balance,
                scope: owner,
                code,
            };

            match (staged.original, staged.current) {
                (None, Some(record)) => {
                    storage_events.push(event(StorageChange::Allocated, record.payer));
                    plan.add(Operation::InsertBalance(record));
                }
                (Some(before), Some(after)) if before != after => {
                    if before.payer != after.payer {
                        storage_events.push(event(StorageChange::Released, before.payer));
                        storage_events.push(event(StorageChange::Allocated, after.payer));
                    }
                    plan.add(Operation::UpdateBalance {
                        previous: before,
                        record: after,
                    });
                }
                (Some(before), None) => {
                    storage_events.push(event(StorageChange::Released, before.payer));
                    plan.add(Operation::EraseBalance { owner, code });
                }
                _ => {}
            }
        }

        Outcome {
            plan,
            notifications: self.notifications,
            storage_events,
        }
    }
}
