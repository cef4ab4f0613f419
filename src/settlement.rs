//! Settles pending wagers against reported final scores.

use std::cmp::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::DRAW_LABEL;
use crate::error::{Error, Result};
use crate::feed::{OddsFeed, RawResult};
use crate::notify::{Event, EventSink};
use crate::store::{LedgerStore, MarketStore};
use crate::types::{Market, WagerFilter, WagerStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    /// Completed results that matched a local market and carried usable scores.
    pub events_processed: usize,
    pub wagers_resolved: usize,
    pub wagers_won: usize,
    pub wagers_lost: usize,
    /// Winning wagers left pending because their payout does not fit in a balance.
    pub wagers_held: usize,
}

/// Winning label for `result` on `market`: a side name or [`DRAW_LABEL`]. `None` when either
/// side's score is missing or not a number.
pub fn winning_label(market: &Market, result: &RawResult) -> Option<String> {
    let score_a = parse_score(result.score_for(&market.side_a)?)?;
    let score_b = parse_score(result.score_for(&market.side_b)?)?;

    let label = match score_a.cmp(&score_b) {
        Ordering::Greater => market.side_a.clone(),
        Ordering::Less => market.side_b.clone(),
        Ordering::Equal => DRAW_LABEL.to_string(),
    };
    Some(label)
}

fn parse_score(raw: &str) -> Option<Decimal> {
    raw.trim().parse::<Decimal>().ok()
}

pub struct SettlementEngine {
    markets: Arc<dyn MarketStore>,
    ledger: Arc<dyn LedgerStore>,
    events: EventSink,
}

impl SettlementEngine {
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

    /// Fetch completed results and settle them. Feed errors are returned untouched so the
    /// caller can log the round as skipped; nothing has been written at that point.
    pub async fn resolve(&self, feed: &dyn OddsFeed) -> Result<SettlementReport> {
        let results = feed.fetch_completed_events().await?;
        self.settle(&results).await
    }

    /// Settle every pending wager on the markets these results finish. Safe to repeat: a wager
    /// only moves out of `pending` once, and only that move carries the credit.
    pub async fn settle(&self, results: &[RawResult]) -> Result<SettlementReport> {
        let mut report = SettlementReport::default();

        for result in results.iter().filter(|r| r.completed) {
            let external_id = result.external_id();
            let Some(market) = self.markets.get_market(&external_id).await? else {
                debug!("No local market for result {}", external_id);
                continue;
            };
            let Some(winner) = winning_label(&market, result) else {
                warn!("Result {} has unusable scores, leaving wagers pending", external_id);
                continue;
            };
            report.events_processed += 1;

            let pending = self
                .ledger
                .list_wagers(&WagerFilter::pending_for_market(&market.external_id))
                .await?;

            for wager in pending {
                let (status, credit) = if wager.selected_side != winner {
                    (WagerStatus::Lost, None)
                } else if let Some(payout) = wager.payout() {
                    (WagerStatus::Won, Some(payout))
                } else {
                    warn!("Wager {} payout overflows, leaving it pending", wager.id);
                    report.wagers_held += 1;
                    continue;
                };

                let applied = match self
                    .ledger
                    .transition_wager_status(wager.id, WagerStatus::Pending, status, credit)
                    .await
                {
                    Ok(applied) => applied,
                    Err(Error::Overflow(reason)) => {
                        warn!("Wager {} credit refused ({}), leaving it pending", wager.id, reason);
                        report.wagers_held += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if !applied {
                    debug!("Wager {} already settled elsewhere", wager.id);
                    continue;
                }

                report.wagers_resolved += 1;
                match status {
                    WagerStatus::Won => report.wagers_won += 1,
                    _ => report.wagers_lost += 1,
                }
                debug!(
                    "Wager {} on {} -> {} (user {}, credit {:?})",
                    wager.id, market.name, status, wager.user_id, credit
                );
            }

            info!("Settled {} ({}): winner {}", market.name, external_id, winner);
        }

        if report.wagers_resolved > 0 {
            self.events.emit(Event::WagersChanged { user_id: None });
            self.events.emit(Event::BalancesChanged { user_id: None });
        }

        info!(
            "Settlement pass: events={} resolved={} won={} lost={} held={}",
            report.events_processed,
            report.wagers_resolved,
            report.wagers_won,
            report.wagers_lost,
            report.wagers_held
        );
        Ok(report)
    }
}
