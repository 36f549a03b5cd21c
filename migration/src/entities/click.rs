//! Click record entity, one row per accepted non-duplicate click.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clicks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ts: DateTimeUtc,
    pub tracker_id: String,
    pub campaign_id: Option<String>,
    pub channel_id: Option<String>,
    pub target_id: Option<String>,
    pub visitor_id: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ua: Option<String>,
    pub lang: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referer: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub props: Option<Json>,
    pub suspected_bot: bool,
    pub is_bot: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
