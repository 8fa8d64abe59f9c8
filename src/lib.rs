// src/lib.rs
//! A fungible token ledger.
//!
//! One supply row per symbol tracks units in circulation against a cap and
//! names the issuer. One balance row per (owner, symbol) tracks holdings.
//! Nine actions move the two tables between valid states:
//!
//! - **create**: register a symbol with its max supply and issuer
//! - **issue** / **issuefree**: mint to the issuer, optionally forwarding
//!   to another holder
//! - **burn**: retire units from a holder
//! - **signup**: open a zero row paid by its owner
//! - **transfer** / **transferfree**: move units between holders
//! - **open** / **close**: create or drop an empty row
//!
//! Every action is staged in memory and committed through a
//! [`TokenAdapter`] as one [`ExecutionPlan`]; a failed check leaves storage
//! untouched.
//!
//! ```rust,ignore
//! let host = Arc::new(LocalHost::new());
//! let token = Token::new(TokenConfig::new(contract), Box::new(MemoryAdapter::new()), host.clone());
//!
//! host.sign_as([contract]);
//! token.create(issuer, "1000.00 XYZ".parse()?).await?;
//!
//! host.sign_as([issuer]);
//! token.issue(issuer, "100.00 XYZ".parse()?, "").await?;
//! ```

pub mod account;
pub mod adapters;
pub mod asset;
pub mod config;
mod context;
pub mod error;
pub mod host;
pub mod plan;
pub mod supply;
pub mod token;

pub use account::BalanceRecord;
pub use asset::{Asset, MAX_AMOUNT, Symbol, SymbolCode};
pub use config::TokenConfig;
pub use error::{ErrorKind, TokenError};
pub use host::{Host, LocalHost};
pub use plan::{ExecutionPlan, Operation};
pub use supply::SupplyRecord;
pub use token::{Action, Token};

use async_trait::async_trait;
use uuid::Uuid;

/// Keyed storage of the supply and balance tables.
#[async_trait]
pub trait TokenAdapter: Send + Sync {
    /// Apply the complete plan atomically.
    /// Implementors MUST:
    /// 1. Reject an insert over an existing key, an update or erase of a
    ///    missing key, or an update whose `previous` row no longer matches
    ///    storage, with [`TokenError::Storage`]
    /// 2. Apply either every operation or none of them
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), TokenError>;

    // READ OPERATIONS
    async fn get_supply_record(&self, code: SymbolCode) -> Result<Option<SupplyRecord>, TokenError>;
    async fn get_balance_record(
        &self,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<Option<BalanceRecord>, TokenError>;
}
