//! Tracking token entity
//!
//! A token maps an opaque 8-char short code to a tracking identity
//! (tracker / campaign / channel / target). Rows are immutable once
//! created; deleting one revokes the link without touching recorded
//! telemetry.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub short_code: String,
    pub tracker_id: String,
    pub campaign_id: Option<String>,
    pub channel_id: Option<String>,
    pub target_id: String,
    /// "js" or "302"
    pub mode: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
