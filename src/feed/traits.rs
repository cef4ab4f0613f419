use async_trait::async_trait;

use super::models::{RawEvent, RawResult};
use crate::error::Result;

/// Source of market snapshots and final results.
///
/// Both calls fail with `FeedUnavailable` or `FeedMisconfigured`; callers treat either as
/// "nothing synced this round". Implementations do not retry.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Every currently offered event, with its bookmaker quotes.
    async fn fetch_active_markets(&self) -> Result<Vec<RawEvent>>;

    /// Results whose `completed` flag is set.
    async fn fetch_completed_events(&self) -> Result<Vec<RawResult>>;
}
