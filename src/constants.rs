pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4";

/// Prefix marking markets owned by the odds feed. Pruning never touches ids outside it.
pub const FEED_ID_PREFIX: &str = "odds_";

/// Bookmaker market key for head-to-head (moneyline) prices.
pub const H2H_MARKET_KEY: &str = "h2h";

/// Outcome label used by the feed, the markets table and wagers for a tied result.
pub const DRAW_LABEL: &str = "Draw";

/// Decimal places kept for coin amounts (`decimal(20, 8)` columns).
pub const COIN_SCALE: u32 = 8;

/// Decimal places kept for decimal odds (`decimal(10, 4)` columns).
pub const ODDS_SCALE: u32 = 4;

pub const DEFAULT_SPORT: &str = "soccer_epl";
pub const DEFAULT_REGIONS: &str = "uk";
pub const DEFAULT_MARKETS: &str = "h2h";
pub const DEFAULT_SCORES_DAYS_FROM: u32 = 3;

pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_RESOLVE_INTERVAL_SECS: u64 = 300;

/// Capacity of the real-time notification channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
