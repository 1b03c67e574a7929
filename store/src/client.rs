use async_trait::async_trait;
use pocketbase::{PocketBaseClient, Record};
use serde::Deserialize;
use tracing::warn;

use crate::error::StoreError;
use crate::r#trait::QueueStore;
use crate::types::{
    MapPoolDefinition, MapPoolEntryRow, QueueDefinition, QueueMapPoolAssoc, RatingJournalRow,
    RecentMapRow,
};

pub struct PocketBaseQueueStore {
    client: PocketBaseClient,
}

impl PocketBaseQueueStore {
    pub fn new(client: PocketBaseClient) -> Self {
        Self { client }
    }

    fn parse_record<T: for<'de> Deserialize<'de>>(record: &Record) -> Result<T, StoreError> {
        let value = serde_json::to_value(&record.fields)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Deserialize)]
struct QueueRow {
    technical_name: String,
    team_size: u32,
    #[serde(default)]
    params: Option<serde_json::Value>,
    featured_mod: String,
    rating_type: String,
}

#[derive(Deserialize)]
struct QueueMapPoolRow {
    pool_id: String,
    min_rating: f64,
    max_rating: f64,
}

#[derive(Deserialize)]
struct MapPoolEntryRowRaw {
    weight: u32,
    #[serde(default)]
    map_params: Option<serde_json::Value>,
    #[serde(default)]
    map_id: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RatingJournalRowRaw {
    mean_before: f64,
    deviation_before: f64,
}

#[derive(Deserialize)]
struct RecentMapRowRaw {
    player_id: String,
    map_id: String,
}

#[async_trait]
impl QueueStore for PocketBaseQueueStore {
    async fn list_enabled_queues(&self) -> Result<Vec<QueueDefinition>, StoreError> {
        let rows = self
            .client
            .list_records("matchmaker_queue", Some("enabled=true"), None)
            .await?;

        let mut queues = Vec::with_capacity(rows.len());
        for record in rows {
            let row: QueueRow = match Self::parse_record(&record) {
                Ok(row) => row,
                Err(err) => {
                    warn!(queue_id = %record.id, %err, "store: skipping malformed queue row");
                    continue;
                }
            };

            let assoc_filter = format!("queue_id='{}'", record.id);
            let assoc_rows = self
                .client
                .list_records("matchmaker_queue_map_pool", Some(&assoc_filter), None)
                .await
                .unwrap_or_default();

            let map_pools = assoc_rows
                .iter()
                .filter_map(|assoc| match Self::parse_record::<QueueMapPoolRow>(assoc) {
                    Ok(a) => Some(QueueMapPoolAssoc {
                        pool_id: a.pool_id,
                        min_rating: a.min_rating,
                        max_rating: a.max_rating,
                    }),
                    Err(err) => {
                        warn!(queue_id = %record.id, %err, "store: skipping malformed map pool association");
                        None
                    }
                })
                .collect();

            queues.push(QueueDefinition {
                id: record.id,
                technical_name: row.technical_name,
                team_size: row.team_size,
                params: row.params,
                featured_mod: row.featured_mod,
                rating_type: row.rating_type,
                map_pools,
            });
        }

        Ok(queues)
    }

    async fn list_map_pools(&self) -> Result<Vec<MapPoolDefinition>, StoreError> {
        let rows = self.client.list_records("map_pool", None, None).await?;

        let mut pools = Vec::with_capacity(rows.len());
        for record in rows {
            let name = record
                .fields
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let entry_filter = format!("pool_id='{}'", record.id);
            let entry_rows = self
                .client
                .list_records("map_pool_map_version", Some(&entry_filter), None)
                .await
                .unwrap_or_default();

            let entries = entry_rows
                .iter()
                .filter_map(|r| match Self::parse_record::<MapPoolEntryRowRaw>(r) {
                    Ok(raw) => Some(MapPoolEntryRow {
                        weight: raw.weight,
                        map_params: raw.map_params,
                        map_id: raw.map_id,
                        filename: raw.filename,
                        display_name: raw.display_name,
                    }),
                    Err(err) => {
                        warn!(pool_id = %record.id, %err, "store: skipping malformed map pool entry");
                        None
                    }
                })
                .collect();

            pools.push(MapPoolDefinition {
                id: record.id,
                name,
                entries,
            });
        }

        Ok(pools)
    }

    async fn recent_rating_journal(
        &self,
        rating_type: &str,
        limit: u32,
    ) -> Result<Vec<RatingJournalRow>, StoreError> {
        let filter = format!("rating_type='{}'", rating_type);
        let rows = self
            .client
            .list_records_limit("leaderboard_rating_journal", Some(&filter), Some("-id"), Some(limit))
            .await?;

        Ok(rows
            .iter()
            .filter_map(|r| Self::parse_record::<RatingJournalRowRaw>(r).ok())
            .map(|raw| RatingJournalRow {
                mean_before: raw.mean_before,
                deviation_before: raw.deviation_before,
            })
            .collect())
    }

    async fn recent_map_ids(
        &self,
        queue_id: &str,
        player_ids: &[String],
        since_hours: i64,
        limit: u32,
    ) -> Result<Vec<RecentMapRow>, StoreError> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        let since = chrono::Utc::now() - chrono::Duration::hours(since_hours);
        let mut result = Vec::new();
        for player_id in player_ids {
            let filter = format!(
                "queue_id='{}' && player_id='{}' && created>='{}'",
                queue_id,
                player_id,
                since.to_rfc3339()
            );

            let rows = self
                .client
                .list_records_limit(
                    "matchmaker_queue_game",
                    Some(&filter),
                    Some("-created"),
                    Some(limit),
                )
                .await?;

            result.extend(
                rows.iter()
                    .filter_map(|r| Self::parse_record::<RecentMapRowRaw>(r).ok())
                    .map(|raw| RecentMapRow {
                        player_id: raw.player_id,
                        map_id: raw.map_id,
                    }),
            );
        }

        Ok(result)
    }
}
