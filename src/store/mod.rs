//! Storage contracts for markets and the coin ledger.
//!
//! Both traits are object safe so the engines can hold `Arc<dyn ...>` and run unchanged against
//! the SQL store or the in-memory store.

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::types::{
    Account, Market, MarketFilter, MarketPrune, NewWager, Wager, WagerFilter, WagerStatus,
};

pub use memory::MemoryStore;

#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn get_market(&self, external_id: &str) -> Result<Option<Market>>;

    /// Markets matching `filter`, ordered by start time (unscheduled last).
    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>>;

    /// Insert or overwrite every non-key field of the market with this external id.
    async fn upsert_market(&self, market: &Market) -> Result<()>;

    /// Delete the markets selected by `prune`. Returns how many rows went away.
    async fn delete_markets(&self, prune: &MarketPrune) -> Result<u64>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn open_account(&self, starting_balance: Decimal) -> Result<Account>;

    async fn get_account(&self, user_id: i64) -> Result<Option<Account>>;

    /// Atomically add `delta` to the balance. A negative delta larger than the balance is
    /// refused with `InsufficientBalance` and changes nothing.
    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Account>;

    /// Debit the stake and insert the pending wager as one unit. The balance check is repeated
    /// inside the unit, so a concurrent debit cannot push the balance below zero.
    async fn create_wager(&self, wager: NewWager) -> Result<(Wager, Account)>;

    async fn get_wager(&self, wager_id: i64) -> Result<Option<Wager>>;

    async fn list_wagers(&self, filter: &WagerFilter) -> Result<Vec<Wager>>;

    /// Move a wager from `from` to `to` and apply `credit` to its owner, all or nothing.
    /// Returns `false` without touching anything when the wager is no longer in `from`.
    async fn transition_wager_status(
        &self,
        wager_id: i64,
        from: WagerStatus,
        to: WagerStatus,
        credit: Option<Decimal>,
    ) -> Result<bool>;
}
