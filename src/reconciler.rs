//! Turns odds feed snapshots into market table mutations.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{DRAW_LABEL, FEED_ID_PREFIX, H2H_MARKET_KEY, ODDS_SCALE};
use crate::error::Result;
use crate::feed::{OddsFeed, RawEvent};
use crate::notify::{Event, EventSink};
use crate::state::RefreshGate;
use crate::store::MarketStore;
use crate::types::{Market, MarketFilter, MarketPrune};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub fetched: usize,
    pub upserted: usize,
    pub skipped_missing_odds: usize,
    pub pruned: u64,
    /// Markets in the store after the pass.
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sync", rename_all = "snake_case")]
pub enum SyncStatus {
    Synced(ReconcileReport),
    /// Cooldown still running; the store was served as is.
    Skipped,
    /// The feed failed; the store was served as is.
    Degraded { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketListing {
    pub markets: Vec<Market>,
    pub sync: SyncStatus,
}

/// Highest `h2h` price any bookmaker quotes for `outcome`, at the stored odds scale.
pub fn best_price(event: &RawEvent, outcome: &str) -> Option<Decimal> {
    event
        .quotes
        .iter()
        .filter(|q| q.market == H2H_MARKET_KEY && q.outcome == outcome)
        .map(|q| q.price)
        .max()
        .map(|price| price.round_dp(ODDS_SCALE))
}

/// A tradeable market for `event`, or `None` if either side lacks a price.
pub fn market_from_event(event: &RawEvent) -> Option<Market> {
    let odds_a = best_price(event, &event.side_a)?;
    let odds_b = best_price(event, &event.side_b)?;

    Some(Market {
        external_id: event.external_id(),
        name: Market::display_name(&event.side_a, &event.side_b),
        side_a: event.side_a.clone(),
        side_b: event.side_b.clone(),
        odds_a,
        odds_b,
        odds_draw: best_price(event, DRAW_LABEL),
        start_time: event.start_time,
    })
}

pub struct MarketReconciler {
    store: Arc<dyn MarketStore>,
    events: EventSink,
}

impl MarketReconciler {
    pub fn new(store: Arc<dyn MarketStore>, events: EventSink) -> Self {
        Self { store, events }
    }

    /// Upsert every fully priced event and prune feed markets missing from a non-empty
    /// snapshot. Applying the same snapshot twice leaves the store as applying it once.
    pub async fn reconcile(&self, snapshot: &[RawEvent]) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            fetched: snapshot.len(),
            ..Default::default()
        };

        for event in snapshot {
            match market_from_event(event) {
                Some(market) => {
                    self.store.upsert_market(&market).await?;
                    report.upserted += 1;
                }
                None => {
                    debug!("Skipping {}: no price for one side", event.external_id());
                    report.skipped_missing_odds += 1;
                }
            }
        }

        // Every id the feed still lists stays, priced or not. An empty snapshot looks exactly
        // like an outage, so it never prunes.
        if !snapshot.is_empty() {
            let prune = MarketPrune {
                namespace: FEED_ID_PREFIX.to_string(),
                keep: snapshot.iter().map(RawEvent::external_id).collect(),
            };
            report.pruned = self.store.delete_markets(&prune).await?;
        }

        report.active = self.store.list_markets(&MarketFilter::default()).await?.len();

        if report.upserted > 0 || report.pruned > 0 {
            self.events.emit(Event::MarketsChanged);
        }

        info!(
            "Reconciled markets: fetched={} upserted={} skipped={} pruned={} active={}",
            report.fetched,
            report.upserted,
            report.skipped_missing_odds,
            report.pruned,
            report.active
        );
        Ok(report)
    }
}

/// Cooldown-gated refresh in front of the reconciler.
pub struct MarketSync {
    feed: Arc<dyn OddsFeed>,
    reconciler: MarketReconciler,
    store: Arc<dyn MarketStore>,
    gate: Arc<RefreshGate>,
}

impl MarketSync {
    pub fn new(
        feed: Arc<dyn OddsFeed>,
        store: Arc<dyn MarketStore>,
        gate: Arc<RefreshGate>,
        events: EventSink,
    ) -> Self {
        Self {
            feed,
            reconciler: MarketReconciler::new(store.clone(), events),
            store,
            gate,
        }
    }

    /// Fetch and reconcile if the cooldown allows. Feed and store failures are reported as
    /// `Degraded` and never propagate.
    pub async fn refresh(&self) -> SyncStatus {
        if !self.gate.try_acquire() {
            debug!("Market sync skipped, next fetch in {:?}", self.gate.remaining());
            return SyncStatus::Skipped;
        }

        let snapshot = match self.feed.fetch_active_markets().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Market sync degraded: {}", e);
                return SyncStatus::Degraded { reason: e.to_string() };
            }
        };

        match self.reconciler.reconcile(&snapshot).await {
            Ok(report) => SyncStatus::Synced(report),
            Err(e) => {
                warn!("Market reconciliation failed: {}", e);
                SyncStatus::Degraded { reason: e.to_string() }
            }
        }
    }

    /// The read path: refresh if due, then serve whatever the store holds.
    pub async fn refresh_and_list(&self, filter: &MarketFilter) -> Result<MarketListing> {
        let sync = self.refresh().await;
        let markets = self.store.list_markets(filter).await?;
        Ok(MarketListing { markets, sync })
    }
}
