use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{MapPoolDefinition, QueueDefinition, RatingJournalRow, RecentMapRow};

/// Read-only view onto the relational store backing the matchmaker: queue
/// and map-pool definitions, rating history, and per-player recent maps.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn list_enabled_queues(&self) -> Result<Vec<QueueDefinition>, StoreError>;

    async fn list_map_pools(&self) -> Result<Vec<MapPoolDefinition>, StoreError>;

    async fn recent_rating_journal(
        &self,
        rating_type: &str,
        limit: u32,
    ) -> Result<Vec<RatingJournalRow>, StoreError>;

    /// The most recent `limit` map ids played by each of `player_ids` in `queue_id`,
    /// within the last `since_hours` hours, ordered by recency per player.
    async fn recent_map_ids(
        &self,
        queue_id: &str,
        player_ids: &[String],
        since_hours: i64,
        limit: u32,
    ) -> Result<Vec<RecentMapRow>, StoreError>;
}
