// src/adapters/postgres.rs
use crate::{
    Asset, BalanceRecord, ExecutionPlan, Operation, SupplyRecord, Symbol, SymbolCode, TokenAdapter,
    TokenError,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

pub trait PostgresTokenAdapter {
    fn get_pool(&self) -> sqlx::PgPool;
}

#[async_trait::async_trait]
pub trait PostgresSchemaTokenAdapter {
    /// Create the `token_supply` and `token_balances` tables if missing.
    async fn init_token_schema(&self) -> Result<(), TokenError>;
}

#[async_trait::async_trait]
impl<T> PostgresSchemaTokenAdapter for T
where
    T: PostgresTokenAdapter + Send + Sync,
{
    async fn init_token_schema(&self) -> Result<(), TokenError> {
        let mut tx = self
            .get_pool()
            .begin()
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))?;

        // Supply table, scoped to the contract
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS token_supply (
                code BIGINT PRIMARY KEY,
                decimals SMALLINT NOT NULL,
                supply BIGINT NOT NULL CHECK (supply >= 0),
                max_supply BIGINT NOT NULL CHECK (max_supply > 0),
                issuer UUID NOT NULL,
                CHECK (supply <= max_supply)
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| TokenError::Storage(e.to_string()))?;

        // Balance table, scoped to the owner
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS token_balances (
                owner UUID NOT NULL,
                code BIGINT NOT NULL REFERENCES token_supply(code),
                decimals SMALLINT NOT NULL,
                balance BIGINT NOT NULL CHECK (balance >= 0),
                payer UUID NOT NULL,
                PRIMARY KEY (owner, code)
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| TokenError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_token_balances_payer
            ON token_balances(payer)
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| TokenError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
trait PostgresInternalTokenAdapter {
    async fn apply_internal_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        op: &Operation,
    ) -> Result<(), TokenError>;
}

fn expect_one_row(rows_affected: u64, what: impl FnOnce() -> String) -> Result<(), TokenError> {
    if rows_affected != 1 {
        return Err(TokenError::Storage(format!(
            "{} not found or changed since it was read",
            what()
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl<T> PostgresInternalTokenAdapter for T
where
    T: PostgresTokenAdapter + Send + Sync,
{
    async fn apply_internal_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        op: &Operation,
    ) -> Result<(), TokenError> {
        match op {
            Operation::InsertSupply(record) => {
                sqlx::query(
                    r#"
                    INSERT INTO token_supply (code, decimals, supply, max_supply, issuer)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(record.code().raw() as i64)
                .bind(record.symbol().precision() as i16)
                .bind(record.supply.amount)
                .bind(record.max_supply.amount)
                .bind(record.issuer)
                .execute(&mut **tx)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;
            }
            Operation::UpdateSupply { previous, record } => {
                let result = sqlx::query(
                    r#"
                    UPDATE token_supply
                    SET supply = $2, max_supply = $3, issuer = $4
                    WHERE code = $1 AND supply = $5 AND max_supply = $6 AND issuer = $7
                    "#,
                )
                .bind(record.code().raw() as i64)
                .bind(record.supply.amount)
                .bind(record.max_supply.amount)
                .bind(record.issuer)
                .bind(previous.supply.amount)
                .bind(previous.max_supply.amount)
                .bind(previous.issuer)
                .execute(&mut **tx)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;

                expect_one_row(result.rows_affected(), || {
                    format!("supply row {}", record.code())
                })?;
            }
            Operation::InsertBalance(record) => {
                sqlx::query(
                    r#"
                    INSERT INTO token_balances (owner, code, decimals, balance, payer)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(record.owner)
                .bind(record.code().raw() as i64)
                .bind(record.balance.symbol.precision() as i16)
                .bind(record.balance.amount)
                .bind(record.payer)
                .execute(&mut **tx)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;
            }
            Operation::UpdateBalance { previous, record } => {
                let result = sqlx::query(
                    r#"
                    UPDATE token_balances
                    SET balance = $3, payer = $4
                    WHERE owner = $1 AND code = $2 AND balance = $5 AND payer = $6
                    "#,
                )
                .bind(record.owner)
                .bind(record.code().raw() as i64)
                .bind(record.balance.amount)
                .bind(record.payer)
                .bind(previous.balance.amount)
                .bind(previous.payer)
                .execute(&mut **tx)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;

                expect_one_row(result.rows_affected(), || {
                    format!("balance row {} of {}", record.code(), record.owner)
                })?;
            }
            Operation::EraseBalance { owner, code } => {
                let result = sqlx::query(
                    r#"
                    DELETE FROM token_balances
                    WHERE owner = $1 AND code = $2
                    "#,
                )
                .bind(*owner)
                .bind(code.raw() as i64)
                .execute(&mut **tx)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;

                expect_one_row(result.rows_affected(), || {
                    format!("balance row {} of {}", code, owner)
                })?;
            }
        }
        Ok(())
    }
}

fn symbol_from_row(row: &PgRow) -> Result<Symbol, TokenError> {
    let code = row
        .try_get::<i64, _>("code")
        .map_err(|e| TokenError::Storage(e.to_string()))?;
    let decimals = row
        .try_get::<i16, _>("decimals")
        .map_err(|e| TokenError::Storage(e.to_string()))?;

    let symbol = Symbol::from_parts(SymbolCode::from_raw(code as u64), decimals as u8);
    if !symbol.is_valid() {
        return Err(TokenError::Storage(format!(
            "stored symbol {} with precision {} is invalid",
            code, decimals
        )));
    }
    Ok(symbol)
}

#[async_trait::async_trait]
impl<T> TokenAdapter for T
where
    T: PostgresTokenAdapter + Send + Sync,
{
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), TokenError> {
        let mut tx = self
            .get_pool()
            .begin()
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))?;

        for op in plan.operations() {
            // dropping tx on error rolls the whole plan back
            self.apply_internal_tx(&mut tx, op).await?;
        }

        tx.commit()
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_supply_record(&self, code: SymbolCode) -> Result<Option<SupplyRecord>, TokenError> {
        let row = sqlx::query(
            r#"
            SELECT code, decimals, supply, max_supply, issuer
            FROM token_supply
            WHERE code = $1
            "#,
        )
        .bind(code.raw() as i64)
        .fetch_optional(&self.get_pool())
        .await
        .map_err(|e| TokenError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let symbol = symbol_from_row(&row)?;
        Ok(Some(SupplyRecord {
            supply: Asset::new(
                row.try_get("supply")
                    .map_err(|e| TokenError::Storage(e.to_string()))?,
                symbol,
            ),
            max_supply: Asset::new(
                row.try_get("max_supply")
                    .map_err(|e| TokenError::Storage(e.to_string()))?,
                symbol,
            ),
            issuer: row
                .try_get("issuer")
                .map_err(|e| TokenError::Storage(e.to_string()))?,
        }))
    }

    async fn get_balance_record(
        &self,
        owner: Uuid,
        code: SymbolCode,
    ) -> Result<Option<BalanceRecord>, TokenError> {
        let row = sqlx::query(
            r#"
            SELECT owner, code, decimals, balance, payer
            FROM token_balances
            WHERE owner = $1 AND code = $2
            "#,
        )
        .bind(owner)
        .bind(code.raw() as i64)
        .fetch_optional(&self.get_pool())
        .await
        .map_err(|e| TokenError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(BalanceRecord {
            owner: row
                .try_get("owner")
                .map_err(|e| TokenError::Storage(e.to_string()))?,
            balance: Asset::new(
                row.try_get("balance")
                    .map_err(|e| TokenError::Storage(e.to_string()))?,
                symbol_from_row(&row)?,
            ),
            payer: row
                .try_get("payer")
                .map_err(|e| TokenError::Storage(e.to_string()))?,
        }))
    }
}

/// Postgres storage for both token tables.
pub struct PostgresAdapter {
    pool: sqlx::PgPool,
}

impl PostgresAdapter {
    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), TokenError> {
        self.init_token_schema().await
    }
}

impl PostgresTokenAdapter for PostgresAdapter {
    fn get_pool(&self) -> sqlx::PgPool {
        self.pool.clone()
    }
}
