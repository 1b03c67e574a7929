use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::player::PlayerId;

#[derive(Debug, Clone, Copy)]
pub struct Violation {
    pub ban_expires_at: DateTime<Utc>,
}

/// Tracks recent match-abandon offences and how long a player is timed out
/// from `start_search` as a result. Expired entries are evicted lazily on
/// the next query, never proactively swept.
pub struct ViolationService {
    ban_duration: chrono::Duration,
    offences: Mutex<HashMap<PlayerId, DateTime<Utc>>>,
}

impl ViolationService {
    pub fn new(ban_duration: Duration) -> Self {
        Self {
            ban_duration: chrono::Duration::from_std(ban_duration).unwrap_or(chrono::Duration::minutes(5)),
            offences: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_violations(&self, players: &[PlayerId]) -> HashMap<PlayerId, Violation> {
        let now = Utc::now();
        let mut guard = self.offences.lock().expect("violations lock poisoned");
        guard.retain(|_, expires| *expires > now);
        players
            .iter()
            .filter_map(|p| guard.get(p).map(|expires| (p.clone(), Violation { ban_expires_at: *expires })))
            .collect()
    }

    pub fn register_violations(&self, players: &[PlayerId]) {
        let expires_at = Utc::now() + self.ban_duration;
        let mut guard = self.offences.lock().expect("violations lock poisoned");
        for player in players {
            guard.insert(player.clone(), expires_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_violations_are_ignored() {
        let service = ViolationService::new(Duration::from_millis(0));
        service.register_violations(&["p1".to_string()]);
        std::thread::sleep(Duration::from_millis(5));
        let active = service.get_violations(&["p1".to_string()]);
        assert!(active.is_empty());
    }

    #[test]
    fn active_violation_is_reported() {
        let service = ViolationService::new(Duration::from_secs(300));
        service.register_violations(&["p1".to_string()]);
        let active = service.get_violations(&["p1".to_string()]);
        assert_eq!(active.len(), 1);
    }
}
