// src/adapters/memory.rs
use crate::{BalanceRecord, ExecutionPlan, Operation, SupplyRecord, SymbolCode, TokenAdapter, TokenError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
struct MemoryStore {
    supply: BTreeMap<SymbolCode, SupplyRecord>,
    balances: BTreeMap<(Uuid, SymbolCode), BalanceRecord>,
}

impl MemoryStore {
    fn apply(&mut self, op: &Operation) -> Result<(), TokenError> {
        match op {
            Operation::InsertSupply(record) => {
                if self.supply.contains_key(&record.code()) {
                    return Err(TokenError::Storage(format!(
                        "supply row {} already exists",
                        record.code()
                    )));
                }
                self.supply.insert(record.code(), record.clone());
            }
            Operation::UpdateSupply { previous, record } => {
                match self.supply.get_mut(&record.code()) {
                    Some(stored) if *stored == *previous => *stored = record.clone(),
                    Some(_) => {
                        return Err(TokenError::Storage(format!(
                            "supply row {} changed since it was read",
                            record.code()
                        )));
                    }
                    None => {
                        return Err(TokenError::Storage(format!(
                            "supply row {} not found",
                            record.code()
                        )));
                    }
                }
            }
            Operation::InsertBalance(record) => {
                let key = (record.owner, record.code());
                if self.balances.contains_key(&key) {
                    return Err(TokenError::Storage(format!(
                        "balance row {} of {} already exists",
                        record.code(),
                        record.owner
                    )));
                }
                self.balances.insert(key, record.clone());
            }
            Operation::UpdateBalance { previous, record } => {
                match self.balances.get_mut(&(record.owner, record.code())) {
                    Some(stored) if *stored == *previous => *stored = record.clone(),
                    Some(_) => {
                        return Err(TokenError::Storage(format!(
                            "balance row {} of {} changed since it was read",
                            record.code(),
                            record.owner
                        )));
                    }
                    None => {
                        return Err(TokenError::Storage(format!(
                            "balance row {} of {} not found",
                            record.code(),
                            record.owner
                        )));
                    }
                }
            }
            Operation::EraseBalance { owner, code } => {
                if self.balances.remove(&(*owner, *code)).is_none() {
                    return Err(TokenError::Storage(format!(
                        "balance row {} of {} not found",
                        code, owner
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Keeps both tables in process. A plan is applied to a copy of the store
/// which replaces the live one only if every operation succeeded.
#[derive(Default)]
pub struct MemoryAdapter {
    store: Mutex<MemoryStore>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, MemoryStore>, TokenError> {
        self.store
            .lock()
            .map_err(|e| TokenError::Storage(e.to_string()))
    }

    /// Snapshot of every supply row, ordered by symbol code.
    pub fn supply_records(&self) -> Result<Vec<SupplyRecord>, TokenError> {
        Ok(self.store()?.supply.values().cloned().collect())
    }

    /// Snapshot of every balance row, ordered by owner then symbol code.
    pub fn balance_records(&self) -> Result<Vec<BalanceRecord>, TokenError> {
        Ok(self.store()?.balances.values().cloned().collect())
    }
}

#[async_trait]
impl TokenAdapter for MemoryAdapter {
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), TokenError> {
        let mut store = self.store()?;

        let mut next = store.clone();
        for op in plan.operations() {
            next.apply(op)?;
        }

        *store = next;
        Ok(())
    }

    async fn get_supply_record(&self, code: SymbolCode) -> Result<Option<SupplyRecord>, TokenError> {
        Ok(self.store()?.supply.get(&code).cloned())
    }

    async fn get_balance_record(
        &self,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<Option<BalanceRecord>, TokenError> {
        Ok(self.store()?.balances.get(&(owner, code)).cloned())
    }
}
