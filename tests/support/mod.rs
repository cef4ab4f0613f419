#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use stakehouse::error::{Error, Result};
use stakehouse::feed::{OddsFeed, Quote, RawEvent, RawResult, ScoreEntry};
use stakehouse::notify::{Event, EventSink, Notifier};
use stakehouse::store::{LedgerStore, MarketStore, MemoryStore};
use stakehouse::types::Market;

/// Feed double serving whatever the test put in it, counting every call.
#[derive(Default)]
pub struct ScriptedFeed {
    events: Mutex<Vec<RawEvent>>,
    results: Mutex<Vec<RawResult>>,
    failing: AtomicBool,
    pub market_fetches: AtomicUsize,
    pub result_fetches: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_events(&self, events: Vec<RawEvent>) {
        *self.events.lock().expect("lock feed events") = events;
    }

    pub fn set_results(&self, results: Vec<RawResult>) {
        *self.results.lock().expect("lock feed results") = results;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::FeedUnavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OddsFeed for ScriptedFeed {
    async fn fetch_active_markets(&self) -> Result<Vec<RawEvent>> {
        self.market_fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.events.lock().expect("lock feed events").clone())
    }

    async fn fetch_completed_events(&self) -> Result<Vec<RawResult>> {
        self.result_fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .results
            .lock()
            .expect("lock feed results")
            .iter()
            .filter(|r| r.completed)
            .cloned()
            .collect())
    }
}

/// Thread-safe event collector for notification assertions.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock notifier events").clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("lock notifier events").clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &Event) -> Result<()> {
        self.events
            .lock()
            .expect("lock notifier events")
            .push(event.clone());
        Ok(())
    }
}

/// One in-memory store serving as both market and ledger store, plus a recorded event sink.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            notifier: RecordingNotifier::new(),
        }
    }

    pub fn markets(&self) -> Arc<dyn MarketStore> {
        self.store.clone()
    }

    pub fn ledger(&self) -> Arc<dyn LedgerStore> {
        self.store.clone()
    }

    pub fn events(&self) -> EventSink {
        EventSink::new().with(Arc::new(self.notifier.clone()))
    }

    pub async fn balance(&self, user_id: i64) -> Decimal {
        self.store
            .get_account(user_id)
            .await
            .expect("read account")
            .expect("account exists")
            .coin_balance
    }
}

pub fn quote(outcome: &str, price: Decimal) -> Quote {
    quote_from("book1", outcome, price)
}

pub fn quote_from(bookmaker: &str, outcome: &str, price: Decimal) -> Quote {
    Quote {
        bookmaker: bookmaker.into(),
        market: "h2h".into(),
        outcome: outcome.into(),
        price,
    }
}

pub fn event(id: &str, side_a: &str, side_b: &str, quotes: Vec<Quote>) -> RawEvent {
    RawEvent {
        id: id.into(),
        side_a: side_a.into(),
        side_b: side_b.into(),
        start_time: None,
        quotes,
    }
}

/// The Red/Blue event at 2.0 / 1.8, which reconciles to market `odds_1`.
pub fn red_blue_event() -> RawEvent {
    event(
        "1",
        "Red",
        "Blue",
        vec![quote("Red", dec!(2.0)), quote("Blue", dec!(1.8))],
    )
}

pub fn red_blue_market() -> Market {
    Market {
        external_id: "odds_1".into(),
        name: "Red vs Blue".into(),
        side_a: "Red".into(),
        side_b: "Blue".into(),
        odds_a: dec!(2.0),
        odds_b: dec!(1.8),
        odds_draw: None,
        start_time: None,
    }
}

pub fn result(id: &str, side_a: &str, side_b: &str, scores: &[(&str, &str)]) -> RawResult {
    RawResult {
        id: id.into(),
        completed: true,
        side_a: side_a.into(),
        side_b: side_b.into(),
        scores: scores
            .iter()
            .map(|(name, score)| ScoreEntry {
                name: name.to_string(),
                score: score.to_string(),
            })
            .collect(),
    }
}
