use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use uuid::Uuid;

use crate::player::Player;

#[derive(Clone)]
pub enum SearchOutcome {
    Pending,
    Matched { queue_name: String },
    Cancelled,
}

/// A pending request to be matched in one queue. Players share a Search
/// when they queue together as a party; a Search is cancellable up until
/// the moment it is matched, after which cancellation has no effect
/// (edge-triggered: `cancel()`/`resolve_matched()` race to flip
/// `SearchOutcome::Pending` exactly once).
pub struct Search {
    pub id: Uuid,
    pub players: Vec<Arc<Player>>,
    pub rating_type: String,
    pub queue_name: String,
    pub created_at: Instant,
    tx: watch::Sender<SearchOutcome>,
    rx: watch::Receiver<SearchOutcome>,
}

impl Search {
    pub fn new(players: Vec<Arc<Player>>, rating_type: String, queue_name: String) -> Arc<Self> {
        let (tx, rx) = watch::channel(SearchOutcome::Pending);
        Arc::new(Self {
            id: Uuid::new_v4(),
            players,
            rating_type,
            queue_name,
            created_at: Instant::now(),
            tx,
            rx,
        })
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|p| p.id.as_str())
    }

    pub fn mean_rating(&self) -> f64 {
        if self.players.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .players
            .iter()
            .filter_map(|p| p.rating(&self.rating_type))
            .map(|r| r.mean)
            .sum();
        sum / self.players.len() as f64
    }

    pub fn min_displayed_rating(&self) -> f64 {
        self.players
            .iter()
            .filter_map(|p| p.rating(&self.rating_type))
            .map(|r| r.displayed())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.rx.borrow(), SearchOutcome::Pending)
    }

    /// Resolves the Search as matched in `queue_name`. Returns `true` only if
    /// this call performed the Pending -> Matched transition.
    pub fn resolve_matched(&self, queue_name: &str) -> bool {
        let mut did = false;
        let _ = self.tx.send_if_modified(|v| {
            if matches!(v, SearchOutcome::Pending) {
                *v = SearchOutcome::Matched {
                    queue_name: queue_name.to_string(),
                };
                did = true;
                true
            } else {
                false
            }
        });
        did
    }

    /// Cancels the Search. Returns `true` only if this call performed the
    /// Pending -> Cancelled transition (idempotent on repeat calls).
    pub fn cancel(&self) -> bool {
        let mut did = false;
        let _ = self.tx.send_if_modified(|v| {
            if matches!(v, SearchOutcome::Pending) {
                *v = SearchOutcome::Cancelled;
                did = true;
                true
            } else {
                false
            }
        });
        did
    }

    pub async fn await_match(&self) -> SearchOutcome {
        let mut rx = self.rx.clone();
        loop {
            if !matches!(*rx.borrow(), SearchOutcome::Pending) {
                return rx.borrow().clone();
            }
            if rx.changed().await.is_err() {
                return SearchOutcome::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::Rating;
    use std::collections::HashMap;

    fn player(id: &str, mean: f64) -> Arc<Player> {
        let mut ratings = HashMap::new();
        ratings.insert("global".to_string(), Rating::new(mean, 50.0));
        Arc::new(Player {
            id: id.to_string(),
            login: id.to_string(),
            faction: "uef".to_string(),
            ratings,
            connection: None,
        })
    }

    #[tokio::test]
    async fn cancel_is_edge_triggered_after_match() {
        let search = Search::new(vec![player("a", 1500.0)], "global".into(), "ladder1v1".into());
        assert!(search.resolve_matched("ladder1v1"));
        assert!(!search.cancel(), "cancel after match must be a no-op");
        match search.await_match().await {
            SearchOutcome::Matched { queue_name } => assert_eq!(queue_name, "ladder1v1"),
            _ => panic!("expected matched outcome"),
        }
    }

    #[tokio::test]
    async fn cancel_wakes_pending_search() {
        let search = Search::new(vec![player("a", 1500.0)], "global".into(), "ladder1v1".into());
        let search2 = search.clone();
        let handle = tokio::spawn(async move { search2.await_match().await });
        assert!(search.cancel());
        match handle.await.unwrap() {
            SearchOutcome::Cancelled => {}
            _ => panic!("expected cancelled outcome"),
        }
    }
}
