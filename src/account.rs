// src/account.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ActionContext;
use crate::{Asset, SymbolCode, TokenError};

/// Holding of one owner in one token. `payer` is the identity charged for
/// keeping the row in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub owner: Uuid,
    pub balance: Asset,
    pub payer: Uuid,
}

impl BalanceRecord {
    pub fn new(owner: Uuid, balance: Asset, payer: Uuid) -> Self {
        Self {
            owner,
            balance,
            payer,
        }
    }

    pub fn code(&self) -> SymbolCode {
        self.balance.symbol.code()
    }
}

/// Keyed store of [`BalanceRecord`]s, one per (owner, symbol code).
pub(crate) struct AccountLedger;

impl AccountLedger {
    pub async fn find(
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<Option<BalanceRecord>, TokenError> {
        ctx.balance(owner, code).await
    }

    pub async fn get(
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<BalanceRecord, TokenError> {
        ctx.balance(owner, code)
            .await?
            .ok_or_else(|| TokenError::not_found(format!("no {} balance found for {}", code, owner)))
    }

    /// Inserts a fresh row. The key must have been checked absent.
    pub fn create(ctx: &mut ActionContext<'_>, owner: Uuid, balance: Asset, payer: Uuid) {
        ctx.put_balance(BalanceRecord::new(owner, balance, payer));
    }

    /// Adds `asset` to the owner's row. A missing row is created and charged
    /// to `storage_payer` only when `allow_create` is set.
    pub async fn credit(
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        asset: &Asset,
        storage_payer: Uuid,
        allow_create: bool,
    ) -> Result<(), TokenError> {
        match ctx.balance(owner, asset.symbol.code()).await? {
            None if !allow_create => Err(TokenError::validation(format!(
                "destination {} has no {} balance",
                owner,
                asset.symbol.code()
            ))),
            None => {
                Self::create(ctx, owner, *asset, storage_payer);
                Ok(())
            }
            Some(mut record) => {
                record.balance = record.balance.checked_add(asset)?;
                ctx.put_balance(record);
                Ok(())
            }
        }
    }

    /// Removes `asset` from the owner's row. A row debited to exactly zero is
    /// erased; otherwise the owner takes over paying for it.
    pub async fn debit(ctx: &mut ActionContext<'_>, owner: Uuid, asset: &Asset) -> Result<(), TokenError> {
        let mut record = Self::get(ctx, owner, asset.symbol.code()).await?;
        if record.balance.symbol != asset.symbol {
            return Err(TokenError::validation(format!(
                "cannot debit {} from a {} balance",
                asset, record.balance.symbol
            )));
        }

        if asset.amount > record.balance.amount {
            return Err(TokenError::invariant(format!(
                "overdrawn balance: {} holds {}, debit of {}",
                owner, record.balance, asset
            )));
        }

        if asset.amount == record.balance.amount {
            ctx.erase_balance(owner, record.code());
        } else {
            record.balance = record.balance.checked_sub(asset)?;
            record.payer = owner;
            ctx.put_balance(record);
        }
        Ok(())
    }

    pub fn erase(ctx: &mut ActionContext<'_>, owner: Uuid, code: SymbolCode) {
        ctx.erase_balance(owner, code);
    }
}
