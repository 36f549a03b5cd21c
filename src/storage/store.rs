//! sea-orm backed implementation of the persistence collaborators.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;
use uuid::Uuid;

use migration::entities::{click, event, site, target, token};

use super::{
    ClickSink, EventSink, NewClick, NewEvent, NewToken, ResolvedSite, ResolvedToken, SiteResolver,
    TargetResolver, TokenResolver, TokenStore,
};
use crate::errors::Result;
use crate::security::generate_short_code;

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_resolved(model: token::Model) -> ResolvedToken {
    ResolvedToken {
        id: model.id,
        short_code: model.short_code,
        tracker_id: model.tracker_id,
        campaign_id: model.campaign_id,
        channel_id: model.channel_id,
        target_id: model.target_id,
        mode: model.mode,
    }
}

#[async_trait]
impl TokenResolver for SeaOrmStore {
    async fn resolve_token(&self, short_code: &str) -> Result<Option<ResolvedToken>> {
        let found = token::Entity::find()
            .filter(token::Column::ShortCode.eq(short_code))
            .one(&self.db)
            .await?;
        Ok(found.map(to_resolved))
    }
}

#[async_trait]
impl SiteResolver for SeaOrmStore {
    async fn resolve_site(&self, site_key: &str) -> Result<Option<ResolvedSite>> {
        let found = site::Entity::find()
            .filter(site::Column::SiteKey.eq(site_key))
            .one(&self.db)
            .await?;
        Ok(found.map(|model| ResolvedSite {
            id: model.id,
            site_key: model.site_key,
            domain: model.domain,
        }))
    }
}

#[async_trait]
impl TargetResolver for SeaOrmStore {
    async fn target_url(&self, target_id: &str) -> Result<Option<String>> {
        let found = target::Entity::find_by_id(target_id.to_string())
            .one(&self.db)
            .await?;
        Ok(found.map(|model| model.url))
    }
}

#[async_trait]
impl ClickSink for SeaOrmStore {
    async fn insert_click(&self, new: NewClick) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let model = click::ActiveModel {
            id: Set(id.clone()),
            ts: Set(new.ts),
            tracker_id: Set(new.tracker_id),
            campaign_id: Set(new.campaign_id),
            channel_id: Set(new.channel_id),
            target_id: Set(new.target_id),
            visitor_id: Set(new.visitor_id),
            ip: Set(new.ip),
            country: Set(new.country),
            ua: Set(new.ua),
            lang: Set(new.lang),
            referer: Set(new.referer),
            props: Set(new.props),
            suspected_bot: Set(new.suspected_bot),
            is_bot: Set(new.is_bot),
            created_at: Set(Utc::now()),
        };
        click::Entity::insert(model).exec(&self.db).await?;
        debug!("Recorded click {}", id);
        Ok(id)
    }
}

#[async_trait]
impl EventSink for SeaOrmStore {
    async fn insert_events(&self, events: Vec<NewEvent>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let count = events.len();
        let now = Utc::now();
        let models: Vec<event::ActiveModel> = events
            .into_iter()
            .map(|new| event::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                ts: Set(new.ts),
                site_id: Set(new.site_id),
                event_type: Set(new.event_type),
                visitor_id: Set(new.visitor_id),
                session_id: Set(new.session_id),
                url: Set(new.url),
                title: Set(new.title),
                referrer: Set(new.referrer),
                ip: Set(new.ip),
                country: Set(new.country),
                ua: Set(new.ua),
                lang: Set(new.lang),
                props: Set(new.props),
                suspected_bot: Set(new.suspected_bot),
                is_bot: Set(new.is_bot),
                created_at: Set(now),
            })
            .collect();

        // 单条多行 INSERT，整批要么全部落库要么整体失败
        event::Entity::insert_many(models).exec(&self.db).await?;
        debug!("Recorded event batch of {}", count);
        Ok(count)
    }
}

#[async_trait]
impl TokenStore for SeaOrmStore {
    async fn create_token(&self, new: NewToken) -> Result<ResolvedToken> {
        let resolved = ResolvedToken {
            id: Uuid::new_v4().to_string(),
            short_code: generate_short_code(),
            tracker_id: new.tracker_id,
            campaign_id: new.campaign_id,
            channel_id: new.channel_id,
            target_id: new.target_id,
            mode: new.mode,
        };
        let model = token::ActiveModel {
            id: Set(resolved.id.clone()),
            short_code: Set(resolved.short_code.clone()),
            tracker_id: Set(resolved.tracker_id.clone()),
            campaign_id: Set(resolved.campaign_id.clone()),
            channel_id: Set(resolved.channel_id.clone()),
            target_id: Set(resolved.target_id.clone()),
            mode: Set(resolved.mode.clone()),
            created_at: Set(Utc::now()),
        };
        token::Entity::insert(model).exec(&self.db).await?;
        Ok(resolved)
    }

    async fn list_tokens(&self, tracker_id: Option<&str>) -> Result<Vec<ResolvedToken>> {
        let mut query = token::Entity::find().order_by_desc(token::Column::CreatedAt);
        if let Some(tracker) = tracker_id {
            query = query.filter(token::Column::TrackerId.eq(tracker));
        }
        let rows = query.all(&self.db).await?;
        Ok(rows.into_iter().map(to_resolved).collect())
    }

    async fn delete_token(&self, id: &str) -> Result<bool> {
        let result = token::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
