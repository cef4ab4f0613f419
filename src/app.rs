use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::{Config, SyncConfig};
use crate::db::Db;
use crate::error::{Error, Result};
use crate::feed::{OddsApiClient, OddsFeed};
use crate::notify::{BroadcastNotifier, Event, EventSink, LogNotifier};
use crate::placement::WagerDesk;
use crate::reconciler::{MarketSync, SyncStatus};
use crate::settlement::{SettlementEngine, SettlementReport};
use crate::state::RefreshGate;
use crate::store::{LedgerStore, MarketStore, MemoryStore};

/// Every component wired to one set of stores, one feed and one event sink.
pub struct Platform {
    pub sync: MarketSync,
    pub settlement: SettlementEngine,
    pub desk: WagerDesk,
    feed: Arc<dyn OddsFeed>,
    gate: Arc<RefreshGate>,
    broadcast: Arc<BroadcastNotifier>,
}

impl Platform {
    pub fn new(
        markets: Arc<dyn MarketStore>,
        ledger: Arc<dyn LedgerStore>,
        feed: Arc<dyn OddsFeed>,
        sync_config: &SyncConfig,
    ) -> Self {
        let broadcast = Arc::new(BroadcastNotifier::new());
        let events = EventSink::new()
            .with(Arc::new(LogNotifier))
            .with(broadcast.clone());
        let gate = Arc::new(RefreshGate::new(sync_config.refresh_cooldown));

        Self {
            sync: MarketSync::new(feed.clone(), markets.clone(), gate.clone(), events.clone()),
            settlement: SettlementEngine::new(markets.clone(), ledger.clone(), events.clone()),
            desk: WagerDesk::new(markets, ledger, events),
            feed,
            gate,
            broadcast,
        }
    }

    /// Real-time change notifications for listeners outside the core.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.broadcast.subscribe()
    }

    /// One resolution round. Feed failures mean "nothing settled this round".
    pub async fn resolve_once(&self) -> Result<Option<SettlementReport>> {
        match self.settlement.resolve(self.feed.as_ref()).await {
            Ok(report) => Ok(Some(report)),
            Err(e) if e.is_feed() => {
                warn!("Resolution skipped: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_loop(&self) {
        // A zero cooldown still needs a tick period.
        let period = self.gate.cooldown().max(Duration::from_secs(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sync.refresh().await {
                SyncStatus::Synced(report) => {
                    info!("🔄 Markets synced: {} active", report.active)
                }
                SyncStatus::Skipped => {}
                SyncStatus::Degraded { reason } => warn!("Markets served stale: {}", reason),
            }
        }
    }

    async fn resolve_loop(&self, every: Duration) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.resolve_once().await {
                error!("Resolution round failed: {}", e);
            }
        }
    }
}

async fn open_stores(config: &Config) -> Result<(Arc<dyn MarketStore>, Arc<dyn LedgerStore>)> {
    match &config.database_url {
        Some(url) => {
            let db = Arc::new(Db::new(url).await?);
            db.create_tables().await?;
            let markets: Arc<dyn MarketStore> = db.clone();
            let ledger: Arc<dyn LedgerStore> = db;
            Ok((markets, ledger))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            let markets: Arc<dyn MarketStore> = store.clone();
            let ledger: Arc<dyn LedgerStore> = store;
            Ok((markets, ledger))
        }
    }
}

pub async fn run(config: Config) -> Result<()> {
    info!("🎲 Started");
    info!("================================");

    info!(
        "Sport: {} (regions {}, markets {})",
        config.feed.sport, config.feed.regions, config.feed.markets
    );
    info!(
        "Refresh cooldown {:?}, resolution every {:?}",
        config.sync.refresh_cooldown, config.sync.resolve_interval
    );
    if config.feed.api_key.is_none() {
        warn!("ODDS_API_KEY not set, every sync round will be skipped");
    }

    let (markets, ledger) = open_stores(&config).await?;
    let feed: Arc<dyn OddsFeed> = Arc::new(OddsApiClient::new(config.feed.clone())?);
    let platform = Arc::new(Platform::new(markets, ledger, feed, &config.sync));

    let refresh = {
        let platform = platform.clone();
        tokio::spawn(async move { platform.refresh_loop().await })
    };
    let resolve = {
        let platform = platform.clone();
        let every = config.sync.resolve_interval;
        tokio::spawn(async move { platform.resolve_loop(every).await })
    };

    tokio::try_join!(refresh, resolve)
        .map_err(|e| Error::Task(e.to_string()))?;

    Ok(())
}
