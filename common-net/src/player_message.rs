use serde::{Deserialize, Serialize};

/// Wire-shaped, transport-opaque message sent to a single player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerMessage {
    SearchInfo {
        queue_name: String,
        state: SearchState,
    },
    SearchTimeout {
        timeouts: Vec<TimeoutEntry>,
    },
    Notice {
        style: NoticeStyle,
        text: String,
    },
    MatchFound {
        queue_name: String,
    },
    MatchCancelled {
        game_id: Option<String>,
    },
    LaunchGame {
        is_host: bool,
        options: LaunchOptions,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeStyle {
    Info,
    Scores,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutEntry {
    pub player: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchOptions {
    pub mapname: String,
    pub expected_players: u32,
    pub game_options: serde_json::Value,
    pub team: u32,
    pub faction: String,
    pub map_position: u32,
}

pub fn encode(message: &PlayerMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

pub fn decode(bytes: &[u8]) -> Result<PlayerMessage, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_info_roundtrip() {
        let msg = PlayerMessage::SearchInfo {
            queue_name: "ladder1v1".into(),
            state: SearchState::Start,
        };
        let bytes = encode(&msg).expect("encode");
        let decoded = decode(&bytes).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn tagged_shape_is_snake_case() {
        let msg = PlayerMessage::MatchFound {
            queue_name: "tmm2v2".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "match_found");
    }
}
