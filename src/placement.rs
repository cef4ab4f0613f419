//! Wager placement: validate, then debit and record in one unit.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::constants::{COIN_SCALE, DRAW_LABEL, ODDS_SCALE};
use crate::error::{Error, Result, WagerRejection};
use crate::notify::{Event, EventSink};
use crate::store::{LedgerStore, MarketStore};
use crate::types::{Account, Market, NewWager, Wager, WagerFilter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceWager {
    pub user_id: i64,
    /// External id of the market.
    pub market_id: String,
    pub stake_amount: Decimal,
    pub selected_side: String,
}

pub struct WagerDesk {
    markets: Arc<dyn MarketStore>,
    ledger: Arc<dyn LedgerStore>,
    events: EventSink,
}

impl WagerDesk {
    pub fn new(
        markets: Arc<dyn MarketStore>,
        ledger: Arc<dyn LedgerStore>,
        events: EventSink,
    ) -> Self {
        Self {
            markets,
            ledger,
            events,
        }
    }

    /// Place a wager at the market's current odds.
    ///
    /// Checks run in a fixed order and stop at the first failure: stake, market, side, odds,
    /// account, balance. None of them writes anything. The debit and the wager insert then
    /// commit together; the store re-checks the balance inside that unit, so a concurrent
    /// placement that drained the account still surfaces as `InsufficientBalance`.
    ///
    /// Stakes must fit the ledger's coin scale exactly. Odds are locked at the scale the
    /// markets table stores.
    pub async fn place(&self, request: PlaceWager) -> Result<Wager> {
        let stake = request.stake_amount.normalize();
        if stake <= Decimal::ZERO {
            return Err(WagerRejection::NonPositiveStake(request.stake_amount).into());
        }
        if stake.scale() > COIN_SCALE {
            return Err(WagerRejection::StakeTooPrecise {
                stake,
                max_scale: COIN_SCALE,
            }
            .into());
        }

        let market = self
            .markets
            .get_market(&request.market_id)
            .await?
            .ok_or_else(|| Error::MarketNotFound(request.market_id.clone()))?;

        let (side, odds) = resolve_side(&market, &request.selected_side)?;
        let odds = odds.round_dp(ODDS_SCALE);
        if odds <= Decimal::ZERO {
            return Err(WagerRejection::InvalidOdds {
                market: market.external_id.clone(),
                side,
            }
            .into());
        }

        let account = self
            .ledger
            .get_account(request.user_id)
            .await?
            .ok_or(Error::AccountNotFound(request.user_id))?;
        if account.coin_balance < stake {
            return Err(WagerRejection::InsufficientBalance {
                available: account.coin_balance,
                requested: stake,
            }
            .into());
        }

        let (wager, account) = self
            .ledger
            .create_wager(NewWager {
                user_id: request.user_id,
                market_id: market.external_id.clone(),
                market_name: market.name.clone(),
                stake_amount: stake,
                odds,
                selected_side: side,
            })
            .await?;

        info!(
            "🎯 Wager {} placed: user {} staked {} on {} @ {} ({}), balance {}",
            wager.id,
            wager.user_id,
            wager.stake_amount,
            wager.selected_side,
            wager.odds,
            wager.market_name,
            account.coin_balance
        );

        self.events.emit(Event::WagersChanged {
            user_id: Some(wager.user_id),
        });
        self.events.emit(Event::BalancesChanged {
            user_id: Some(wager.user_id),
        });

        Ok(wager)
    }

    pub async fn account(&self, user_id: i64) -> Result<Account> {
        self.ledger
            .get_account(user_id)
            .await?
            .ok_or(Error::AccountNotFound(user_id))
    }

    /// Every wager the user has placed, oldest first.
    pub async fn wagers_for(&self, user_id: i64) -> Result<Vec<Wager>> {
        self.ledger.list_wagers(&WagerFilter::for_user(user_id)).await
    }
}

fn resolve_side(market: &Market, requested: &str) -> Result<(String, Decimal)> {
    let requested = requested.trim();
    if let Some((label, odds)) = market.price_for(requested) {
        return Ok((label.to_string(), odds));
    }

    let rejection = if requested.eq_ignore_ascii_case(DRAW_LABEL) && !market.supports_draw() {
        WagerRejection::DrawUnavailable(market.external_id.clone())
    } else {
        WagerRejection::UnknownSide {
            market: market.external_id.clone(),
            side: requested.to_string(),
        }
    };
    Err(rejection.into())
}
