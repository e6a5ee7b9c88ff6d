//! Services for fetching, aggregating and summarising coding stats

pub mod aggregator;
pub mod format;
pub mod gateway;
pub mod insights;

pub use aggregator::Aggregator;
pub use format::{format_duration, format_percentage};
pub use gateway::{HttpUpstream, StatsGateway, UpstreamClient};
pub use insights::{AchievementRules, ProductivityLevel, StatsReport};
