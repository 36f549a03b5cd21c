//! Behavioral event entity, bulk-inserted per accepted batch.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Batch-assigned ingestion timestamp, shared by every event of a batch
    pub ts: DateTimeUtc,
    pub site_id: String,
    pub event_type: String,
    pub visitor_id: Option<String>,
    pub session_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ua: Option<String>,
    pub lang: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub props: Option<Json>,
    pub suspected_bot: bool,
    pub is_bot: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
