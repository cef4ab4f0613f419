use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DRAW_LABEL;

/// A wagering opportunity on one upstream sporting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub external_id: String,
    pub name: String,
    pub side_a: String,
    pub side_b: String,
    pub odds_a: Decimal,
    pub odds_b: Decimal,
    pub odds_draw: Option<Decimal>,
    pub start_time: Option<DateTime<Utc>>,
}

impl Market {
    pub fn display_name(side_a: &str, side_b: &str) -> String {
        format!("{} vs {}", side_a, side_b)
    }

    pub fn supports_draw(&self) -> bool {
        self.odds_draw.is_some()
    }

    /// Canonical side label and the odds offered for it, if `side` names an outcome of this
    /// market. "draw" matches case-insensitively and only when a draw price exists.
    pub fn price_for(&self, side: &str) -> Option<(&str, Decimal)> {
        if side == self.side_a {
            Some((self.side_a.as_str(), self.odds_a))
        } else if side == self.side_b {
            Some((self.side_b.as_str(), self.odds_b))
        } else if side.eq_ignore_ascii_case(DRAW_LABEL) {
            self.odds_draw.map(|odds| (DRAW_LABEL, odds))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub coin_balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerStatus {
    Pending,
    Won,
    Lost,
}

impl WagerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerStatus::Pending => "pending",
            WagerStatus::Won => "won",
            WagerStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WagerStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WagerStatus::Pending),
            "won" => Ok(WagerStatus::Won),
            "lost" => Ok(WagerStatus::Lost),
            other => Err(format!("unknown wager status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    pub id: i64,
    pub user_id: i64,
    /// External id of the market the wager was placed against; settlement joins on this.
    pub market_id: String,
    /// Market name at placement time. Display only.
    pub market_name: String,
    pub stake_amount: Decimal,
    pub odds: Decimal,
    pub selected_side: String,
    pub status: WagerStatus,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Wager {
    /// Stake times locked odds, or `None` if the product does not fit in a `Decimal`.
    pub fn payout(&self) -> Option<Decimal> {
        self.stake_amount.checked_mul(self.odds)
    }
}

/// A validated wager ready to be written together with the stake debit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWager {
    pub user_id: i64,
    pub market_id: String,
    pub market_name: String,
    pub stake_amount: Decimal,
    pub odds: Decimal,
    pub selected_side: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketFilter {
    /// Only markets starting at or after this instant; markets without a start time are kept.
    pub starting_after: Option<DateTime<Utc>>,
    /// Case-insensitive substring match against either side.
    pub party: Option<String>,
    pub limit: Option<usize>,
}

impl MarketFilter {
    pub fn matches(&self, market: &Market) -> bool {
        if let (Some(after), Some(start)) = (self.starting_after, market.start_time) {
            if start < after {
                return false;
            }
        }
        if let Some(party) = &self.party {
            let needle = party.to_lowercase();
            if !market.side_a.to_lowercase().contains(&needle)
                && !market.side_b.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Which markets a prune may remove: those inside `namespace` whose id is not in `keep`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPrune {
    pub namespace: String,
    pub keep: Vec<String>,
}

impl MarketPrune {
    pub fn should_delete(&self, external_id: &str) -> bool {
        external_id.starts_with(&self.namespace) && !self.keep.iter().any(|k| k == external_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WagerFilter {
    pub user_id: Option<i64>,
    pub market_id: Option<String>,
    pub market_name: Option<String>,
    pub status: Option<WagerStatus>,
}

impl WagerFilter {
    pub fn pending_for_market(market_id: &str) -> Self {
        Self {
            market_id: Some(market_id.to_string()),
            status: Some(WagerStatus::Pending),
            ..Default::default()
        }
    }

    /// Wagers recorded under a market name, optionally narrowed to one status.
    pub fn by_market_name(market_name: &str, status: Option<WagerStatus>) -> Self {
        Self {
            market_name: Some(market_name.to_string()),
            status,
            ..Default::default()
        }
    }

    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, wager: &Wager) -> bool {
        self.user_id.map_or(true, |id| wager.user_id == id)
            && self.market_id.as_deref().map_or(true, |id| wager.market_id == id)
            && self
                .market_name
                .as_deref()
                .map_or(true, |name| wager.market_name == name)
            && self.status.map_or(true, |status| wager.status == status)
    }
}
