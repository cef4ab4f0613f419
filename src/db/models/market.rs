use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "markets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub external_id: String,

    pub name: String,

    pub side_a: String,

    pub side_b: String,

    pub odds_a: Decimal,

    pub odds_b: Decimal,

    #[sea_orm(nullable)]
    pub odds_draw: Option<Decimal>,

    #[sea_orm(nullable)]
    pub start_time: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
