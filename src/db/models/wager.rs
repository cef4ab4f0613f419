use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "wagers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,

    pub user_id: i64,

    /// External id of the market; the settlement join key.
    pub market_id: String,

    pub market_name: String,

    pub stake_amount: Decimal,

    pub odds: Decimal,

    pub selected_side: String,

    /// One of `pending`, `won`, `lost`.
    pub status: String,

    pub placed_at: DateTime<Utc>,

    #[sea_orm(nullable)]
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
