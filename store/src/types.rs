use serde::{Deserialize, Serialize};

/// One (map pool, rating band) association attached to a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMapPoolAssoc {
    pub pool_id: String,
    pub min_rating: f64,
    pub max_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDefinition {
    pub id: String,
    pub technical_name: String,
    pub team_size: u32,
    pub params: Option<serde_json::Value>,
    pub featured_mod: String,
    pub rating_type: String,
    pub map_pools: Vec<QueueMapPoolAssoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPoolEntryRow {
    pub weight: u32,
    pub map_params: Option<serde_json::Value>,
    pub map_id: Option<String>,
    pub filename: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPoolDefinition {
    pub id: String,
    pub name: String,
    pub entries: Vec<MapPoolEntryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingJournalRow {
    pub mean_before: f64,
    pub deviation_before: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMapRow {
    pub player_id: String,
    pub map_id: String,
}
