pub mod campaign;
pub mod channel;
pub mod click;
pub mod event;
pub mod site;
pub mod target;
pub mod token;
pub mod tracker;

pub use campaign::Entity as CampaignEntity;
pub use channel::Entity as ChannelEntity;
pub use click::Entity as ClickEntity;
pub use event::Entity as EventEntity;
pub use site::Entity as SiteEntity;
pub use target::Entity as TargetEntity;
pub use token::Entity as TokenEntity;
pub use tracker::Entity as TrackerEntity;
