use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::FEED_ID_PREFIX;
use crate::error::Result;

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEventDto {
    pub id: String,
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerDto {
    pub key: String,
    #[serde(default)]
    pub markets: Vec<BookmakerMarketDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerMarketDto {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeDto {
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreEventDto {
    pub id: String,
    #[serde(default)]
    pub completed: bool,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub scores: Option<Vec<ScoreDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreDto {
    pub name: String,
    /// Usually a string ("3"), occasionally a bare number.
    #[serde(default)]
    pub score: Option<serde_json::Value>,
}

// ============================================================================
// Validated feed entries
// ============================================================================

/// One bookmaker's decimal price for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub bookmaker: String,
    pub market: String,
    pub outcome: String,
    pub price: Decimal,
}

/// An upcoming event with every usable quote the feed returned for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub id: String,
    pub side_a: String,
    pub side_b: String,
    pub start_time: Option<DateTime<Utc>>,
    pub quotes: Vec<Quote>,
}

impl RawEvent {
    pub fn external_id(&self) -> String {
        format!("{}{}", FEED_ID_PREFIX, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub name: String,
    /// Kept as reported; settlement decides whether it is numeric.
    pub score: String,
}

/// A reported result. Only `completed` results are ever settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResult {
    pub id: String,
    pub completed: bool,
    pub side_a: String,
    pub side_b: String,
    pub scores: Vec<ScoreEntry>,
}

impl RawResult {
    pub fn external_id(&self) -> String {
        format!("{}{}", FEED_ID_PREFIX, self.id)
    }

    pub fn score_for(&self, party: &str) -> Option<&str> {
        self.scores
            .iter()
            .find(|entry| entry.name == party)
            .map(|entry| entry.score.as_str())
    }
}

fn required(field: &str, value: String) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("empty {}", field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Decimal price from a JSON float; NaN, infinities and non-positive prices are unusable.
fn usable_price(raw: Option<f64>) -> Option<Decimal> {
    let price = raw.filter(|p| p.is_finite() && *p > 0.0)?;
    Decimal::from_f64(price).filter(|d| *d > Decimal::ZERO)
}

impl TryFrom<OddsEventDto> for RawEvent {
    type Error = String;

    fn try_from(dto: OddsEventDto) -> std::result::Result<Self, Self::Error> {
        let id = required("id", dto.id)?;
        let side_a = required("home_team", dto.home_team)?;
        let side_b = required("away_team", dto.away_team)?;

        let quotes = dto
            .bookmakers
            .into_iter()
            .flat_map(|bookmaker| {
                let bookmaker_key = bookmaker.key;
                bookmaker.markets.into_iter().flat_map(move |market| {
                    let bookmaker_key = bookmaker_key.clone();
                    let market_key = market.key;
                    market.outcomes.into_iter().filter_map(move |outcome| {
                        Some(Quote {
                            bookmaker: bookmaker_key.clone(),
                            market: market_key.clone(),
                            price: usable_price(outcome.price)?,
                            outcome: outcome.name,
                        })
                    })
                })
            })
            .collect();

        Ok(RawEvent {
            id,
            side_a,
            side_b,
            start_time: dto.commence_time,
            quotes,
        })
    }
}

impl TryFrom<ScoreEventDto> for RawResult {
    type Error = String;

    fn try_from(dto: ScoreEventDto) -> std::result::Result<Self, Self::Error> {
        let id = required("id", dto.id)?;
        let side_a = required("home_team", dto.home_team)?;
        let side_b = required("away_team", dto.away_team)?;

        let scores = dto
            .scores
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let score = match entry.score? {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some(ScoreEntry {
                    name: entry.name,
                    score,
                })
            })
            .collect();

        Ok(RawResult {
            id,
            completed: dto.completed,
            side_a,
            side_b,
            scores,
        })
    }
}

/// Decode a JSON array entry by entry. Entries that do not fit `Dto` or fail validation are
/// logged and dropped; only a body that is not an array at all is an error.
fn parse_entries<Dto, T>(body: &str, kind: &str) -> Result<Vec<T>>
where
    Dto: serde::de::DeserializeOwned,
    T: TryFrom<Dto, Error = String>,
{
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let mut parsed = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let result = serde_json::from_value::<Dto>(entry)
            .map_err(|e| e.to_string())
            .and_then(<T as TryFrom<Dto>>::try_from);
        match result {
            Ok(item) => parsed.push(item),
            Err(reason) => warn!("Skipping malformed {} entry #{}: {}", kind, index, reason),
        }
    }

    Ok(parsed)
}

pub fn parse_events(body: &str) -> Result<Vec<RawEvent>> {
    parse_entries::<OddsEventDto, RawEvent>(body, "odds")
}

pub fn parse_results(body: &str) -> Result<Vec<RawResult>> {
    parse_entries::<ScoreEventDto, RawResult>(body, "score")
}
