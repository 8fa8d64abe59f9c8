// src/plan.rs
use uuid::Uuid;

use crate::{BalanceRecord, SupplyRecord, SymbolCode};

/// One keyed-table write. A plan holds at most one operation per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    InsertSupply(SupplyRecord),
    /// Applies only while the stored row still equals `previous`.
    UpdateSupply {
        previous: SupplyRecord,
        record: SupplyRecord,
    },
    InsertBalance(BalanceRecord),
    /// Applies only while the stored row still equals `previous`.
    UpdateBalance {
        previous: BalanceRecord,
        record: BalanceRecord,
    },
    EraseBalance { owner: Uuid, code: SymbolCode },
}

/// The writes of one token action, applied by a [`crate::TokenAdapter`] as a
/// single atomic unit.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    operations: Vec<Operation>,
}

impl ExecutionPlan {
    pub(crate) fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
