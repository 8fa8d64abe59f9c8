// src/token.rs
use std::fmt;
use std::sync::Arc;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountLedger;
use crate::context::ActionContext;
use crate::supply::SupplyLedger;
use crate::{
    Asset, BalanceRecord, Host, SupplyRecord, Symbol, SymbolCode, TokenAdapter, TokenConfig,
    TokenError,
};

/// The token actions, as named to callers and in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Issue,
    IssueFree,
    Burn,
    Signup,
    Transfer,
    TransferFree,
    Open,
    Close,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Issue => "issue",
            Self::IssueFree => "issuefree",
            Self::Burn => "burn",
            Self::Signup => "signup",
            Self::Transfer => "transfer",
            Self::TransferFree => "transferfree",
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    /// Units the action put in motion. `create` only sets a cap.
    fn moved_quantity(self, quantity: &Asset) -> Option<&Asset> {
        match self {
            Self::Create => None,
            _ if quantity.amount > 0 => Some(quantity),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who pays for a balance row a delivery has to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// The sender pays for a missing destination row.
    PayRam,
    /// The destination row must already exist.
    Free,
}

impl Delivery {
    fn transfer_action(self) -> Action {
        match self {
            Self::PayRam => Action::Transfer,
            Self::Free => Action::TransferFree,
        }
    }
}

/// The token ledger: validates actions against the supply and balance
/// tables and commits them through a [`TokenAdapter`].
pub struct Token {
    adapter: Arc<dyn TokenAdapter>,
    host: Arc<dyn Host>,
    config: TokenConfig,
}

impl Token {
    pub fn new(config: TokenConfig, adapter: Box<dyn TokenAdapter>, host: Arc<dyn Host>) -> Self {
        Self {
            adapter: adapter.into(),
            host,
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Get adapter reference
    pub fn adapter(&self) -> &dyn TokenAdapter {
        self.adapter.as_ref()
    }

    fn context(&self) -> ActionContext<'_> {
        ActionContext::new(self.adapter.as_ref(), self.config.contract)
    }

    // ==================== Actions ====================

    /// Registers a new symbol. Only the ledger contract may do this.
    pub async fn create(&self, issuer: Uuid, max_supply: Asset) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self.do_create(&mut ctx, issuer, max_supply).await;
        self.finish(Action::Create, &max_supply, ctx, result).await
    }

    /// Mints `quantity` to the issuer and forwards it to `to` with a
    /// transfer, creating `to`'s row at the issuer's cost if needed.
    pub async fn issue(&self, to: Uuid, quantity: Asset, memo: &str) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self
            .do_issue(&mut ctx, to, quantity, memo, Delivery::PayRam)
            .await;
        self.finish(Action::Issue, &quantity, ctx, result).await
    }

    /// Like [`Self::issue`], but `to` must already hold a row.
    pub async fn issuefree(&self, to: Uuid, quantity: Asset, memo: &str) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self
            .do_issue(&mut ctx, to, quantity, memo, Delivery::Free)
            .await;
        self.finish(Action::IssueFree, &quantity, ctx, result).await
    }

    /// Retires `quantity` from `from`'s balance and from the supply.
    pub async fn burn(&self, from: Uuid, quantity: Asset, memo: &str) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self.do_burn(&mut ctx, from, quantity, memo).await;
        self.finish(Action::Burn, &quantity, ctx, result).await
    }

    /// Opens a zero balance row for `owner`, paid by `owner`. Only a zero
    /// quantity is accepted.
    pub async fn signup(&self, owner: Uuid, quantity: Asset) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self.do_signup(&mut ctx, owner, quantity).await;
        self.finish(Action::Signup, &quantity, ctx, result).await
    }

    pub async fn transfer(&self, from: Uuid, to: Uuid, quantity: Asset, memo: &str) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self
            .do_transfer(&mut ctx, from, to, quantity, memo, Delivery::PayRam)
            .await;
        self.finish(Action::Transfer, &quantity, ctx, result).await
    }

    /// Like [`Self::transfer`], but `to` must already hold a row.
    pub async fn transferfree(
        &self,
        from: Uuid,
        to: Uuid,
        quantity: Asset,
        memo: &str,
    ) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self
            .do_transfer(&mut ctx, from, to, quantity, memo, Delivery::Free)
            .await;
        self.finish(Action::TransferFree, &quantity, ctx, result).await
    }

    /// Ensures `owner` holds a row for `symbol`, charging `ram_payer` if one
    /// has to be created.
    pub async fn open(&self, owner: Uuid, symbol: Symbol, ram_payer: Uuid) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self.do_open(&mut ctx, owner, symbol, ram_payer).await;
        self.finish(Action::Open, &Asset::zero(symbol), ctx, result).await
    }

    /// Drops `owner`'s empty row for `symbol`.
    pub async fn close(&self, owner: Uuid, symbol: Symbol) -> Result<(), TokenError> {
        let mut ctx = self.context();
        let result = self.do_close(&mut ctx, owner, symbol).await;
        self.finish(Action::Close, &Asset::zero(symbol), ctx, result).await
    }

    // ==================== Queries ====================

    pub async fn get_supply(&self, code: SymbolCode) -> Result<Asset, TokenError> {
        Ok(self.get_stats(code).await?.supply)
    }

    pub async fn get_balance(&self, owner: Uuid, code: SymbolCode) -> Result<Asset, TokenError> {
        Ok(self.get_account(owner, code).await?.balance)
    }

    pub async fn get_stats(&self, code: SymbolCode) -> Result<SupplyRecord, TokenError> {
        SupplyLedger::get(&mut self.context(), code).await
    }

    pub async fn get_account(&self, owner: Uuid, code: SymbolCode) -> Result<BalanceRecord, TokenError> {
        AccountLedger::get(&mut self.context(), owner, code).await
    }

    // ==================== Internals ====================

    async fn finish(
        &self,
        action: Action,
        quantity: &Asset,
        ctx: ActionContext<'_>,
        result: Result<(), TokenError>,
    ) -> Result<(), TokenError> {
        let result = match result {
            Ok(()) => {
                let outcome = ctx.into_outcome();
                match self.adapter.execute_plan(&outcome.plan).await {
                    Ok(()) => {
                        tracing::debug!(
                            action = action.as_str(),
                            quantity = %quantity,
                            writes = outcome.plan.len(),
                            "token action committed"
                        );
                        for event in &outcome.storage_events {
                            self.host.on_storage(event);
                        }
                        for notification in &outcome.notifications {
                            self.host.notify(notification);
                        }
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            tracing::debug!(
                action = action.as_str(),
                quantity = %quantity,
                error = %err,
                "token action rejected"
            );
        } else if let Some(moved) = action.moved_quantity(quantity) {
            histogram!("token.action.quantity", "symbol" => moved.symbol.code().to_string())
                .record(moved.amount as f64);
        }

        let status = if result.is_ok() { "success" } else { "failed" };
        counter!("token.actions.total",
            "action" => action.as_str(),
            "status" => status
        )
        .increment(1);

        result
    }

    fn check_memo(&self, memo: &str) -> Result<(), TokenError> {
        if memo.len() > self.config.max_memo_len {
            return Err(TokenError::validation(format!(
                "memo has {} bytes, limit is {}",
                memo.len(),
                self.config.max_memo_len
            )));
        }
        Ok(())
    }

    fn check_quantity(quantity: &Asset, supply: &SupplyRecord) -> Result<(), TokenError> {
        if !quantity.is_valid() {
            return Err(TokenError::validation(format!("invalid quantity {}", quantity)));
        }
        if quantity.amount <= 0 {
            return Err(TokenError::validation(format!(
                "quantity must be positive: {}",
                quantity
            )));
        }
        Self::check_symbol(quantity.symbol, supply)
    }

    fn check_symbol(symbol: Symbol, supply: &SupplyRecord) -> Result<(), TokenError> {
        if symbol != supply.symbol() {
            return Err(TokenError::validation(format!(
                "symbol precision mismatch: got {}, token is {}",
                symbol,
                supply.symbol()
            )));
        }
        Ok(())
    }

    fn check_symbol_valid(symbol: Symbol) -> Result<(), TokenError> {
        if !symbol.is_valid() {
            return Err(TokenError::validation(format!("invalid symbol name {}", symbol)));
        }
        Ok(())
    }

    async fn do_create(
        &self,
        ctx: &mut ActionContext<'_>,
        issuer: Uuid,
        max_supply: Asset,
    ) -> Result<(), TokenError> {
        self.host.require_auth(self.config.contract)?;

        Self::check_symbol_valid(max_supply.symbol)?;
        if !max_supply.is_valid() {
            return Err(TokenError::validation(format!("invalid supply {}", max_supply)));
        }
        if max_supply.amount <= 0 {
            return Err(TokenError::validation("max supply must be positive"));
        }

        SupplyLedger::create_supply(ctx, max_supply, issuer).await?;
        Ok(())
    }

    async fn do_issue(
        &self,
        ctx: &mut ActionContext<'_>,
        to: Uuid,
        quantity: Asset,
        memo: &str,
        delivery: Delivery,
    ) -> Result<(), TokenError> {
        Self::check_symbol_valid(quantity.symbol)?;
        self.check_memo(memo)?;

        let code = quantity.symbol.code();
        let stats = SupplyLedger::find(ctx, code).await?.ok_or_else(|| {
            TokenError::not_found(format!(
                "token {} does not exist, create it before issuing",
                code
            ))
        })?;

        self.host.require_auth(stats.issuer)?;
        Self::check_quantity(&quantity, &stats)?;
        if quantity.amount > stats.headroom() {
            return Err(TokenError::invariant(format!(
                "quantity {} exceeds available supply",
                quantity
            )));
        }

        SupplyLedger::increase_supply(ctx, &quantity).await?;
        AccountLedger::credit(ctx, stats.issuer, &quantity, stats.issuer, true).await?;

        if to != stats.issuer {
            self.do_transfer(ctx, stats.issuer, to, quantity, memo, delivery)
                .await?;
        }
        Ok(())
    }

    async fn do_burn(
        &self,
        ctx: &mut ActionContext<'_>,
        from: Uuid,
        quantity: Asset,
        memo: &str,
    ) -> Result<(), TokenError> {
        Self::check_symbol_valid(quantity.symbol)?;
        self.check_memo(memo)?;

        let code = quantity.symbol.code();
        let stats = SupplyLedger::find(ctx, code).await?.ok_or_else(|| {
            TokenError::not_found(format!(
                "token {} does not exist, create it before burning",
                code
            ))
        })?;

        self.host.require_auth(from)?;
        ctx.notify(Action::Burn, from);
        Self::check_quantity(&quantity, &stats)?;
        if quantity.amount > stats.supply.amount {
            return Err(TokenError::invariant(format!(
                "quantity {} exceeds available supply {}",
                quantity, stats.supply
            )));
        }

        SupplyLedger::decrease_supply(ctx, &quantity).await?;
        AccountLedger::debit(ctx, from, &quantity).await
    }

    async fn do_signup(
        &self,
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        quantity: Asset,
    ) -> Result<(), TokenError> {
        Self::check_symbol_valid(quantity.symbol)?;

        let code = quantity.symbol.code();
        let stats = SupplyLedger::find(ctx, code).await?.ok_or_else(|| {
            TokenError::not_found(format!(
                "token {} does not exist, create it before signing up",
                code
            ))
        })?;

        self.host.require_auth(owner)?;
        ctx.notify(Action::Signup, owner);

        if AccountLedger::find(ctx, owner, code).await?.is_some() {
            return Err(TokenError::Duplicate(format!(
                "{} has already signed up for {}",
                owner, code
            )));
        }

        if !quantity.is_valid() {
            return Err(TokenError::validation(format!("invalid quantity {}", quantity)));
        }
        if quantity.amount != 0 {
            return Err(TokenError::validation(format!(
                "quantity {} exceeds signup allowance",
                quantity
            )));
        }
        Self::check_symbol(quantity.symbol, &stats)?;
        if quantity.amount > stats.headroom() {
            return Err(TokenError::invariant(format!(
                "quantity {} exceeds available supply",
                quantity
            )));
        }

        SupplyLedger::increase_supply(ctx, &quantity).await?;
        AccountLedger::credit(ctx, owner, &quantity, owner, true).await
    }

    async fn do_transfer(
        &self,
        ctx: &mut ActionContext<'_>,
        from: Uuid,
        to: Uuid,
        quantity: Asset,
        memo: &str,
        delivery: Delivery,
    ) -> Result<(), TokenError> {
        self.host.require_auth(from)?;

        if from == to {
            return Err(TokenError::validation("cannot transfer to self"));
        }
        if !self.host.is_account(to) {
            return Err(TokenError::validation(format!(
                "destination account {} does not exist",
                to
            )));
        }

        let code = quantity.symbol.code();
        let stats = SupplyLedger::find(ctx, code).await?.ok_or_else(|| {
            TokenError::not_found(format!(
                "token {} does not exist, create it before transferring",
                code
            ))
        })?;

        let action = delivery.transfer_action();
        ctx.notify(action, from);
        ctx.notify(action, to);

        Self::check_quantity(&quantity, &stats)?;
        self.check_memo(memo)?;

        AccountLedger::debit(ctx, from, &quantity).await?;
        AccountLedger::credit(ctx, to, &quantity, from, delivery == Delivery::PayRam).await
    }

    async fn do_open(
        &self,
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        symbol: Symbol,
        ram_payer: Uuid,
    ) -> Result<(), TokenError> {
        self.host.require_auth(ram_payer)?;

        let code = symbol.code();
        let stats = SupplyLedger::find(ctx, code)
            .await?
            .ok_or_else(|| TokenError::not_found(format!("symbol {} does not exist", code)))?;
        Self::check_symbol(symbol, &stats)?;

        if AccountLedger::find(ctx, owner, code).await?.is_none() {
            AccountLedger::create(ctx, owner, Asset::zero(symbol), ram_payer);
        }
        Ok(())
    }

    async fn do_close(
        &self,
        ctx: &mut ActionContext<'_>,
        owner: Uuid,
        symbol: Symbol,
    ) -> Result<(), TokenError> {
        self.host.require_auth(owner)?;

        let code = symbol.code();
        let row = AccountLedger::find(ctx, owner, code).await?.ok_or_else(|| {
            TokenError::not_found(format!(
                "{} balance row of {} already deleted or never existed",
                code, owner
            ))
        })?;
        if row.balance.amount != 0 {
            return Err(TokenError::validation(format!(
                "cannot close because the balance is not zero: {}",
                row.balance
            )));
        }

        AccountLedger::erase(ctx, owner, code);
        Ok(())
    }
}
