use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wager rejected: {0}")]
    Rejected(#[from] WagerRejection),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Wager not found: {0}")]
    WagerNotFound(i64),

    #[error("Odds feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Odds feed misconfigured: {0}")]
    FeedMisconfigured(String),

    #[error("Conflicting update, retry: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Coin amount out of range: {0}")]
    Overflow(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Reasons a wager request is refused before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WagerRejection {
    #[error("stake must be a positive amount, got {0}")]
    NonPositiveStake(Decimal),

    #[error("stake {stake} has more than {max_scale} decimal places")]
    StakeTooPrecise { stake: Decimal, max_scale: u32 },

    #[error("'{side}' is not a side of market {market}")]
    UnknownSide { market: String, side: String },

    #[error("market {0} does not offer a draw")]
    DrawUnavailable(String),

    #[error("market {market} has no usable odds for '{side}'")]
    InvalidOdds { market: String, side: String },

    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: Decimal, requested: Decimal },
}

impl Error {
    /// Feed failures degrade a sync round instead of failing the caller.
    pub fn is_feed(&self) -> bool {
        matches!(self, Error::FeedUnavailable(_) | Error::FeedMisconfigured(_))
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(e: sea_orm::DbErr) -> Self {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("deadlock")
            || lower.contains("lock wait timeout")
            || lower.contains("database is locked")
        {
            Error::Conflict(msg)
        } else {
            Error::Database(msg)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::FeedUnavailable(e.to_string())
    }
}
