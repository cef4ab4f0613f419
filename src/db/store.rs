//! `MarketStore` and `LedgerStore` over sea-orm.
//!
//! Balance changes are single conditional `UPDATE` statements
//! (`coin_balance = coin_balance - x ... AND coin_balance >= x`), so two requests racing on the
//! same account serialize on the row instead of overwriting each other. Wager settlement uses
//! the same trick on `status`, and every multi-row unit runs in one transaction.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use super::main::Db;
use super::models::{account, market, wager};
use crate::error::{Error, Result, WagerRejection};
use crate::store::{LedgerStore, MarketStore};
use crate::types::{
    Account, Market, MarketFilter, MarketPrune, NewWager, Wager, WagerFilter, WagerStatus,
};

impl From<market::Model> for Market {
    fn from(row: market::Model) -> Self {
        Market {
            external_id: row.external_id,
            name: row.name,
            side_a: row.side_a,
            side_b: row.side_b,
            odds_a: row.odds_a,
            odds_b: row.odds_b,
            odds_draw: row.odds_draw,
            start_time: row.start_time,
        }
    }
}

impl From<account::Model> for Account {
    fn from(row: account::Model) -> Self {
        Account {
            id: row.id,
            coin_balance: row.coin_balance,
        }
    }
}

impl TryFrom<wager::Model> for Wager {
    type Error = Error;

    fn try_from(row: wager::Model) -> Result<Self> {
        let status = row.status.parse::<WagerStatus>().map_err(Error::Database)?;
        Ok(Wager {
            id: row.id,
            user_id: row.user_id,
            market_id: row.market_id,
            market_name: row.market_name,
            stake_amount: row.stake_amount,
            odds: row.odds,
            selected_side: row.selected_side,
            status,
            placed_at: row.placed_at,
            settled_at: row.settled_at,
        })
    }
}

fn market_active_model(market: &Market) -> market::ActiveModel {
    market::ActiveModel {
        external_id: ActiveValue::Set(market.external_id.clone()),
        name: ActiveValue::Set(market.name.clone()),
        side_a: ActiveValue::Set(market.side_a.clone()),
        side_b: ActiveValue::Set(market.side_b.clone()),
        odds_a: ActiveValue::Set(market.odds_a),
        odds_b: ActiveValue::Set(market.odds_b),
        odds_draw: ActiveValue::Set(market.odds_draw),
        start_time: ActiveValue::Set(market.start_time),
        updated_at: ActiveValue::Set(Utc::now()),
    }
}

/// Add `delta` to one account's balance, refusing to go below zero. Runs on whatever
/// connection or transaction it is given.
async fn apply_balance_delta<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    delta: Decimal,
) -> Result<Account> {
    let mut update = account::Entity::update_many()
        .col_expr(
            account::Column::CoinBalance,
            Expr::col(account::Column::CoinBalance).add(delta),
        )
        .filter(account::Column::Id.eq(user_id));
    if delta < Decimal::ZERO {
        update = update.filter(account::Column::CoinBalance.gte(-delta));
    }

    let result = update.exec(conn).await?;
    let row = account::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or(Error::AccountNotFound(user_id))?;

    if result.rows_affected == 0 {
        return Err(WagerRejection::InsufficientBalance {
            available: row.coin_balance,
            requested: -delta,
        }
        .into());
    }
    Ok(row.into())
}

#[async_trait]
impl MarketStore for Db {
    async fn get_market(&self, external_id: &str) -> Result<Option<Market>> {
        let row = market::Entity::find_by_id(external_id.to_string())
            .one(self.connection())
            .await?;
        Ok(row.map(Market::from))
    }

    async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let mut query = market::Entity::find();

        if let Some(after) = filter.starting_after {
            query = query.filter(
                Condition::any()
                    .add(market::Column::StartTime.is_null())
                    .add(market::Column::StartTime.gte(after)),
            );
        }
        if let Some(party) = &filter.party {
            query = query.filter(
                Condition::any()
                    .add(market::Column::SideA.contains(party.as_str()))
                    .add(market::Column::SideB.contains(party.as_str())),
            );
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit as u64);
        }

        let rows = query
            .order_by(Expr::col(market::Column::StartTime).is_null(), Order::Asc)
            .order_by_asc(market::Column::StartTime)
            .order_by_asc(market::Column::ExternalId)
            .all(self.connection())
            .await?;

        Ok(rows.into_iter().map(Market::from).collect())
    }

    async fn upsert_market(&self, market: &Market) -> Result<()> {
        market::Entity::insert(market_active_model(market))
            .on_conflict(
                OnConflict::column(market::Column::ExternalId)
                    .update_columns([
                        market::Column::Name,
                        market::Column::SideA,
                        market::Column::SideB,
                        market::Column::OddsA,
                        market::Column::OddsB,
                        market::Column::OddsDraw,
                        market::Column::StartTime,
                        market::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await?;
        Ok(())
    }

    async fn delete_markets(&self, prune: &MarketPrune) -> Result<u64> {
        let mut delete = market::Entity::delete_many()
            .filter(market::Column::ExternalId.starts_with(prune.namespace.as_str()));
        if !prune.keep.is_empty() {
            delete = delete.filter(market::Column::ExternalId.is_not_in(prune.keep.clone()));
        }
        let result = delete.exec(self.connection()).await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl LedgerStore for Db {
    async fn open_account(&self, starting_balance: Decimal) -> Result<Account> {
        let row = account::ActiveModel {
            id: ActiveValue::NotSet,
            coin_balance: ActiveValue::Set(starting_balance.max(Decimal::ZERO)),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(self.connection())
        .await?;
        Ok(row.into())
    }

    async fn get_account(&self, user_id: i64) -> Result<Option<Account>> {
        let row = account::Entity::find_by_id(user_id)
            .one(self.connection())
            .await?;
        Ok(row.map(Account::from))
    }

    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Account> {
        let txn = self.connection().begin().await?;
        let account = apply_balance_delta(&txn, user_id, delta).await?;
        txn.commit().await?;
        Ok(account)
    }

    async fn create_wager(&self, new: NewWager) -> Result<(Wager, Account)> {
        let txn = self.connection().begin().await?;

        // Dropping `txn` on any early return rolls the debit back.
        let account = apply_balance_delta(&txn, new.user_id, -new.stake_amount)
            .await
            .map_err(|e| match e {
                Error::Rejected(WagerRejection::InsufficientBalance { available, .. }) => {
                    WagerRejection::InsufficientBalance {
                        available,
                        requested: new.stake_amount,
                    }
                    .into()
                }
                other => other,
            })?;

        let row = wager::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(new.user_id),
            market_id: ActiveValue::Set(new.market_id),
            market_name: ActiveValue::Set(new.market_name),
            stake_amount: ActiveValue::Set(new.stake_amount),
            odds: ActiveValue::Set(new.odds),
            selected_side: ActiveValue::Set(new.selected_side),
            status: ActiveValue::Set(WagerStatus::Pending.as_str().to_string()),
            placed_at: ActiveValue::Set(Utc::now()),
            settled_at: ActiveValue::Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok((Wager::try_from(row)?, account))
    }

    async fn get_wager(&self, wager_id: i64) -> Result<Option<Wager>> {
        wager::Entity::find_by_id(wager_id)
            .one(self.connection())
            .await?
            .map(Wager::try_from)
            .transpose()
    }

    async fn list_wagers(&self, filter: &WagerFilter) -> Result<Vec<Wager>> {
        let mut query = wager::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(wager::Column::UserId.eq(user_id));
        }
        if let Some(market_id) = &filter.market_id {
            query = query.filter(wager::Column::MarketId.eq(market_id.as_str()));
        }
        if let Some(name) = &filter.market_name {
            query = query.filter(wager::Column::MarketName.eq(name.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(wager::Column::Status.eq(status.as_str()));
        }

        query
            .order_by_asc(wager::Column::Id)
            .all(self.connection())
            .await?
            .into_iter()
            .map(Wager::try_from)
            .collect()
    }

    async fn transition_wager_status(
        &self,
        wager_id: i64,
        from: WagerStatus,
        to: WagerStatus,
        credit: Option<Decimal>,
    ) -> Result<bool> {
        let txn = self.connection().begin().await?;

        let moved = wager::Entity::update_many()
            .col_expr(wager::Column::Status, Expr::value(to.as_str()))
            .col_expr(wager::Column::SettledAt, Expr::value(Utc::now()))
            .filter(wager::Column::Id.eq(wager_id))
            .filter(wager::Column::Status.eq(from.as_str()))
            .exec(&txn)
            .await?;

        let row = wager::Entity::find_by_id(wager_id)
            .one(&txn)
            .await?
            .ok_or(Error::WagerNotFound(wager_id))?;

        if moved.rows_affected == 0 {
            return Ok(false);
        }

        if let Some(amount) = credit {
            apply_balance_delta(&txn, row.user_id, amount).await?;
        }

        txn.commit().await?;
        Ok(true)
    }
}
