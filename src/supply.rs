// src/supply.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ActionContext;
use crate::{Asset, Symbol, SymbolCode, TokenError};

/// Per-symbol bookkeeping: units in circulation, the cap and who may issue.
///
/// Invariants:
/// - `supply.symbol == max_supply.symbol`
/// - `0 <= supply.amount <= max_supply.amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub supply: Asset,
    pub max_supply: Asset,
    pub issuer: Uuid,
}

impl SupplyRecord {
    pub fn new(max_supply: Asset, issuer: Uuid) -> Self {
        Self {
            supply: Asset::zero(max_supply.symbol),
            max_supply,
            issuer,
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.supply.symbol
    }

    pub fn code(&self) -> SymbolCode {
        self.supply.symbol.code()
    }

    /// Units that can still be issued.
    pub fn headroom(&self) -> i64 {
        self.max_supply.amount - self.supply.amount
    }

    pub fn check_invariants(&self) -> Result<(), TokenError> {
        if self.supply.symbol != self.max_supply.symbol {
            return Err(TokenError::invariant(format!(
                "supply symbol {} differs from max supply symbol {}",
                self.supply.symbol, self.max_supply.symbol
            )));
        }
        if self.supply.amount < 0 {
            return Err(TokenError::invariant(format!(
                "supply of {} would be negative",
                self.code()
            )));
        }
        if self.supply.amount > self.max_supply.amount {
            return Err(TokenError::invariant(format!(
                "supply {} would exceed max supply {}",
                self.supply, self.max_supply
            )));
        }
        Ok(())
    }
}

/// Keyed store of [`SupplyRecord`]s, one per symbol code.
pub(crate) struct SupplyLedger;

impl SupplyLedger {
    pub async fn find(
        ctx: &mut ActionContext<'_>,
        code: SymbolCode,
    ) -> Result<Option<SupplyRecord>, TokenError> {
        ctx.supply(code).await
    }

    pub async fn get(ctx: &mut ActionContext<'_>, code: SymbolCode) -> Result<SupplyRecord, TokenError> {
        ctx.supply(code)
            .await?
            .ok_or_else(|| TokenError::not_found(format!("token {} does not exist", code)))
    }

    pub async fn create_supply(
        ctx: &mut ActionContext<'_>,
        max_supply: Asset,
        issuer: Uuid,
    ) -> Result<SupplyRecord, TokenError> {
        let symbol = max_supply.symbol;
        if !symbol.is_valid() {
            return Err(TokenError::validation(format!("invalid symbol {}", symbol)));
        }
        if !max_supply.is_valid() || max_supply.amount <= 0 {
            return Err(TokenError::validation(format!(
                "max supply must be positive: {}",
                max_supply
            )));
        }
        if ctx.supply(symbol.code()).await?.is_some() {
            return Err(TokenError::Duplicate(format!(
                "token with symbol {} already exists",
                symbol.code()
            )));
        }

        let record = SupplyRecord::new(max_supply, issuer);
        ctx.put_supply(record.clone());
        Ok(record)
    }

    pub async fn increase_supply(
        ctx: &mut ActionContext<'_>,
        quantity: &Asset,
    ) -> Result<SupplyRecord, TokenError> {
        let mut record = Self::get(ctx, quantity.symbol.code()).await?;
        if quantity.amount > record.headroom() {
            return Err(TokenError::invariant(format!(
                "issuing {} would exceed max supply {}",
                quantity, record.max_supply
            )));
        }

        record.supply = record.supply.checked_add(quantity)?;
        record.check_invariants()?;
        ctx.put_supply(record.clone());
        Ok(record)
    }

    pub async fn decrease_supply(
        ctx: &mut ActionContext<'_>,
        quantity: &Asset,
    ) -> Result<SupplyRecord, TokenError> {
        let mut record = Self::get(ctx, quantity.symbol.code()).await?;
        if quantity.amount > record.supply.amount {
            return Err(TokenError::invariant(format!(
                "retiring {} exceeds supply {}",
                quantity, record.supply
            )));
        }

        record.supply = record.supply.checked_sub(quantity)?;
        record.check_invariants()?;
        ctx.put_supply(record.clone());
        Ok(record)
    }
}
