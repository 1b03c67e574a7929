use std::collections::HashMap;
use std::sync::Arc;

use common_net::player_connection::PlayerConnection;

use crate::rating::Rating;

pub type PlayerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Searching,
    Starting,
    Playing,
}

/// A player as the matchmaking core sees it: identity, per-rating-type
/// skill, and the transport capability needed to notify them.
pub struct Player {
    pub id: PlayerId,
    pub login: String,
    pub faction: String,
    pub ratings: HashMap<String, Rating>,
    pub connection: Option<Arc<dyn PlayerConnection>>,
}

impl Player {
    pub fn rating(&self, rating_type: &str) -> Option<Rating> {
        self.ratings.get(rating_type).copied()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_connected())
    }
}
