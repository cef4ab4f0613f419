//! In-memory store used by tests and by processes started without a database.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{LedgerStore, MarketStore};
use crate::error::{Error, Result, WagerRejection};
use crate::types::{
    Account, Market, MarketFilter, MarketPrune, NewWager, Wager, WagerFilter, WagerStatus,
};

#[derive(Default)]
struct Ledger {
    accounts: HashMap<i64, Account>,
    wagers: BTreeMap<i64, Wager>,
    next_account_id: i64,
    next_wager_id: i64,
}

impl Ledger {
    fn account_mut(&mut self, user_id: i64) -> Result<&mut Account> {
        self.accounts
            .get_mut(&user_id)
            .ok_or(Error::AccountNotFound(user_id))
    }
}

/// Markets live in a concurrent map; every ledger mutation runs under one lock, which makes
/// each balance/wager unit linearizable.
#[derive(Default)]
pub struct MemoryStore {
    markets: DashMap<String, Market>,
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_start_time(a: &Market, b: &Market) -> Ordering {
    match (a.start_time, b.start_time) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.external_id.cmp(&b.external_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.external_id.cmp(&b.external_id),
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_market(&self, external_id: &str) -> Result<Option<Market>> {
        Ok(self.markets.get(external_id).map(|entry| entry.value().clone()))
    }

    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let mut markets: Vec<Market> = self
            .markets
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        markets.sort_by(by_start_time);
        if let Some(limit) = filter.limit {
            markets.truncate(limit);
        }
        Ok(markets)
    }

    async fn upsert_market(&self, market: &Market) -> Result<()> {
        self.markets.insert(market.external_id.clone(), market.clone());
        Ok(())
    }

    async fn delete_markets(&self, prune: &MarketPrune) -> Result<u64> {
        let before = self.markets.len();
        self.markets.retain(|id, _| !prune.should_delete(id));
        Ok((before - self.markets.len()) as u64)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn open_account(&self, starting_balance: Decimal) -> Result<Account> {
        let mut ledger = self.ledger.lock().await;
        ledger.next_account_id += 1;
        let account = Account {
            id: ledger.next_account_id,
            coin_balance: starting_balance.max(Decimal::ZERO),
        };
        ledger.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, user_id: i64) -> Result<Option<Account>> {
        Ok(self.ledger.lock().await.accounts.get(&user_id).cloned())
    }

    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Account> {
        let mut ledger = self.ledger.lock().await;
        let account = ledger.account_mut(user_id)?;
        let next = account
            .coin_balance
            .checked_add(delta)
            .ok_or_else(|| Error::Overflow(format!("balance of account {}", user_id)))?;
        if next < Decimal::ZERO {
            return Err(WagerRejection::InsufficientBalance {
                available: account.coin_balance,
                requested: -delta,
            }
            .into());
        }
        account.coin_balance = next;
        Ok(account.clone())
    }

    async fn create_wager(&self, wager: NewWager) -> Result<(Wager, Account)> {
        let mut ledger = self.ledger.lock().await;

        let account = ledger.account_mut(wager.user_id)?;
        if account.coin_balance < wager.stake_amount {
            return Err(WagerRejection::InsufficientBalance {
                available: account.coin_balance,
                requested: wager.stake_amount,
            }
            .into());
        }
        account.coin_balance -= wager.stake_amount;
        let account = account.clone();

        ledger.next_wager_id += 1;
        let created = Wager {
            id: ledger.next_wager_id,
            user_id: wager.user_id,
            market_id: wager.market_id,
            market_name: wager.market_name,
            stake_amount: wager.stake_amount,
            odds: wager.odds,
            selected_side: wager.selected_side,
            status: WagerStatus::Pending,
            placed_at: Utc::now(),
            settled_at: None,
        };
        ledger.wagers.insert(created.id, created.clone());

        Ok((created, account))
    }

    async fn get_wager(&self, wager_id: i64) -> Result<Option<Wager>> {
        Ok(self.ledger.lock().await.wagers.get(&wager_id).cloned())
    }

    async fn list_wagers(&self, filter: &WagerFilter) -> Result<Vec<Wager>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .wagers
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect())
    }

    async fn transition_wager_status(
        &self,
        wager_id: i64,
        from: WagerStatus,
        to: WagerStatus,
        credit: Option<Decimal>,
    ) -> Result<bool> {
        let mut ledger = self.ledger.lock().await;

        let (user_id, current) = match ledger.wagers.get(&wager_id) {
            Some(w) => (w.user_id, w.status),
            None => return Err(Error::WagerNotFound(wager_id)),
        };
        if current != from {
            return Ok(false);
        }

        // Credit first so a missing account or an overflow leaves the wager untouched.
        if let Some(amount) = credit {
            let account = ledger.account_mut(user_id)?;
            account.coin_balance = account
                .coin_balance
                .checked_add(amount)
                .ok_or_else(|| Error::Overflow(format!("balance of account {}", user_id)))?;
        }
        if let Some(wager) = ledger.wagers.get_mut(&wager_id) {
            wager.status = to;
            wager.settled_at = Some(Utc::now());
        }
        Ok(true)
    }
}
