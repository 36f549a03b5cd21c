//! 初始追踪表迁移
//!
//! 创建 trackers / campaigns / channels / targets / sites / tokens
//! 以及不可变的 clicks / events 遥测表。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 trackers 表
        manager
            .create_table(
                Table::create()
                    .table(Trackers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Trackers::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Trackers::Kind).string_len(10).not_null())
                    .col(ColumnDef::new(Trackers::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Trackers::Mode)
                            .string_len(10)
                            .not_null()
                            .default("302"),
                    )
                    .col(
                        ColumnDef::new(Trackers::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Trackers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Trackers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 campaigns 表
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::TrackerId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaigns_tracker")
                    .table(Campaigns::Table)
                    .col(Campaigns::TrackerId)
                    .to_owned(),
            )
            .await?;

        // 创建 channels 表
        manager
            .create_table(
                Table::create()
                    .table(Channels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Channels::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Channels::TrackerId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Channels::CampaignId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Channels::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Channels::Source).string_len(255).null())
                    .col(ColumnDef::new(Channels::Medium).string_len(255).null())
                    .col(ColumnDef::new(Channels::Tags).json_binary().null())
                    .col(
                        ColumnDef::new(Channels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Channels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_channels_tracker")
                    .table(Channels::Table)
                    .col(Channels::TrackerId)
                    .to_owned(),
            )
            .await?;

        // 创建 targets 表
        manager
            .create_table(
                Table::create()
                    .table(Targets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Targets::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Targets::TrackerId).string_len(36).not_null())
                    .col(ColumnDef::new(Targets::Url).text().not_null())
                    .col(
                        ColumnDef::new(Targets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 sites 表
        manager
            .create_table(
                Table::create()
                    .table(Sites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sites::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sites::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Sites::Domain).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Sites::SiteKey)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Sites::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Sites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sites::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 tokens 表
        manager
            .create_table(
                Table::create()
                    .table(Tokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tokens::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tokens::ShortCode)
                            .string_len(8)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tokens::TrackerId).string_len(36).not_null())
                    .col(ColumnDef::new(Tokens::CampaignId).string_len(36).null())
                    .col(ColumnDef::new(Tokens::ChannelId).string_len(36).null())
                    .col(ColumnDef::new(Tokens::TargetId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Tokens::Mode)
                            .string_len(10)
                            .not_null()
                            .default("302"),
                    )
                    .col(
                        ColumnDef::new(Tokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tokens_tracker")
                    .table(Tokens::Table)
                    .col(Tokens::TrackerId)
                    .to_owned(),
            )
            .await?;

        // 创建 clicks 表
        manager
            .create_table(
                Table::create()
                    .table(Clicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clicks::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Clicks::Ts)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Clicks::TrackerId).string_len(36).not_null())
                    .col(ColumnDef::new(Clicks::CampaignId).string_len(36).null())
                    .col(ColumnDef::new(Clicks::ChannelId).string_len(36).null())
                    .col(ColumnDef::new(Clicks::TargetId).string_len(36).null())
                    .col(ColumnDef::new(Clicks::VisitorId).string_len(255).null())
                    .col(ColumnDef::new(Clicks::Ip).string_len(45).null())
                    .col(ColumnDef::new(Clicks::Country).string_len(2).null())
                    .col(ColumnDef::new(Clicks::Ua).text().null())
                    .col(ColumnDef::new(Clicks::Lang).string_len(50).null())
                    .col(ColumnDef::new(Clicks::Referer).text().null())
                    .col(ColumnDef::new(Clicks::Props).json_binary().null())
                    .col(
                        ColumnDef::new(Clicks::SuspectedBot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Clicks::IsBot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Clicks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 点击时间序列索引（按 tracker / channel 维度查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clicks_tracker_ts")
                    .table(Clicks::Table)
                    .col(Clicks::TrackerId)
                    .col(Clicks::Ts)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clicks_channel_ts")
                    .table(Clicks::Table)
                    .col(Clicks::ChannelId)
                    .col(Clicks::Ts)
                    .to_owned(),
            )
            .await?;

        // 创建 events 表
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Events::Ts)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::SiteId).string_len(36).not_null())
                    .col(ColumnDef::new(Events::EventType).string_len(50).not_null())
                    .col(ColumnDef::new(Events::VisitorId).string_len(255).null())
                    .col(ColumnDef::new(Events::SessionId).string_len(255).null())
                    .col(ColumnDef::new(Events::Url).text().null())
                    .col(ColumnDef::new(Events::Title).text().null())
                    .col(ColumnDef::new(Events::Referrer).text().null())
                    .col(ColumnDef::new(Events::Ip).string_len(45).null())
                    .col(ColumnDef::new(Events::Country).string_len(2).null())
                    .col(ColumnDef::new(Events::Ua).text().null())
                    .col(ColumnDef::new(Events::Lang).string_len(50).null())
                    .col(ColumnDef::new(Events::Props).json_binary().null())
                    .col(
                        ColumnDef::new(Events::SuspectedBot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Events::IsBot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_site_ts")
                    .table(Events::Table)
                    .col(Events::SiteId)
                    .col(Events::Ts)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_type_ts")
                    .table(Events::Table)
                    .col(Events::EventType)
                    .col(Events::Ts)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clicks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Targets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Channels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trackers::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Trackers {
    Table,
    Id,
    Kind,
    Name,
    Mode,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    TrackerId,
    Name,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Channels {
    Table,
    Id,
    TrackerId,
    CampaignId,
    Name,
    Source,
    Medium,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Targets {
    Table,
    Id,
    TrackerId,
    Url,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sites {
    Table,
    Id,
    Name,
    Domain,
    SiteKey,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tokens {
    Table,
    Id,
    ShortCode,
    TrackerId,
    CampaignId,
    ChannelId,
    TargetId,
    Mode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Clicks {
    Table,
    Id,
    Ts,
    TrackerId,
    CampaignId,
    ChannelId,
    TargetId,
    VisitorId,
    Ip,
    Country,
    Ua,
    Lang,
    Referer,
    Props,
    SuspectedBot,
    IsBot,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Ts,
    SiteId,
    EventType,
    VisitorId,
    SessionId,
    Url,
    Title,
    Referrer,
    Ip,
    Country,
    Ua,
    Lang,
    Props,
    SuspectedBot,
    IsBot,
    CreatedAt,
}
