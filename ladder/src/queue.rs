use std::sync::Arc;
use std::time::Duration;

use crate::map_pool::MapPool;
use crate::search::Search;
use crate::team_matchmaker::Match;

#[derive(Debug, Clone)]
pub struct MapPoolBand {
    pub pool: MapPool,
    pub min_rating: f64,
    pub max_rating: f64,
}

/// Holds the active Searches for one named queue and turns them into
/// candidate Matches on each pop.
#[derive(Clone)]
pub struct MatchmakerQueue {
    pub id: String,
    pub technical_name: String,
    pub featured_mod: String,
    pub rating_type: String,
    pub team_size: u32,
    pub params: Option<serde_json::Value>,
    pub rating_peak: f64,
    map_pools: Vec<MapPoolBand>,
    searches: Vec<Arc<Search>>,
}

impl MatchmakerQueue {
    pub fn new(
        id: String,
        technical_name: String,
        featured_mod: String,
        rating_type: String,
        team_size: u32,
        params: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id,
            technical_name,
            featured_mod,
            rating_type,
            team_size,
            params,
            rating_peak: 1000.0,
            map_pools: Vec::new(),
            searches: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.searches.iter().filter(|s| s.is_pending()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueue(&mut self, search: Arc<Search>) {
        self.searches.push(search);
    }

    pub fn add_map_pool(&mut self, pool: MapPool, min_rating: f64, max_rating: f64) {
        self.map_pools.push(MapPoolBand {
            pool,
            min_rating,
            max_rating,
        });
    }

    pub fn clear_map_pools(&mut self) {
        self.map_pools.clear();
    }

    /// Removes every Search from the queue, cancelling none of them itself -
    /// the caller (service-level refresh, on queue removal) owns that.
    pub fn drain_searches(&mut self) -> Vec<Arc<Search>> {
        std::mem::take(&mut self.searches)
    }

    pub fn get_map_pool_for_rating(&self, rating: f64) -> Option<&MapPool> {
        self.map_pools
            .iter()
            .find(|band| rating >= band.min_rating && rating <= band.max_rating)
            .map(|band| &band.pool)
    }

    pub fn get_game_options(&self) -> Option<serde_json::Value> {
        self.params.clone()
    }

    /// Drops Searches that are no longer pending (matched by a previous pop,
    /// or cancelled) from the active set.
    fn prune_resolved(&mut self) {
        self.searches.retain(|s| s.is_pending());
    }

    /// Builds candidate Matches by greedily packing pending Searches into
    /// teams of `team_size` players (sorted by rating so parties land next
    /// to similarly-rated opponents), then pairing adjacent teams. The
    /// rating tolerance between opposing teams widens with the age of the
    /// oldest participating Search.
    fn build_candidates(&mut self, team_size: u32) -> Vec<Match> {
        self.prune_resolved();

        let mut pending: Vec<Arc<Search>> = self
            .searches
            .iter()
            .filter(|s| s.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.mean_rating().partial_cmp(&b.mean_rating()).unwrap());

        let mut teams: Vec<Vec<Arc<Search>>> = Vec::new();
        let mut current: Vec<Arc<Search>> = Vec::new();
        let mut current_size: u32 = 0;

        for search in pending {
            let size = search.players.len() as u32;
            if size > team_size {
                continue;
            }
            if current_size + size > team_size {
                current = vec![search];
                current_size = size;
                continue;
            }
            current_size += size;
            current.push(search);
            if current_size == team_size {
                teams.push(std::mem::take(&mut current));
                current_size = 0;
            }
        }

        let mut candidates = Vec::new();
        let mut i = 0;
        while i + 1 < teams.len() {
            let team_a = teams[i].clone();
            let team_b = teams[i + 1].clone();

            let rating_a = team_mean(&team_a);
            let rating_b = team_mean(&team_b);
            let oldest_wait = team_a
                .iter()
                .chain(team_b.iter())
                .map(|s| s.created_at.elapsed())
                .max()
                .unwrap_or(Duration::ZERO);

            let tolerance = 100.0 + oldest_wait.as_secs_f64() * 5.0;
            let diff = (rating_a - rating_b).abs();

            if diff <= tolerance {
                let quality = (1.0 - (diff / tolerance.max(1.0))).clamp(0.0, 1.0);
                candidates.push(Match { team_a, team_b, quality });
            }

            i += 2;
        }

        candidates
    }

    pub fn find_matches(&mut self) -> Vec<Match> {
        debug_assert!(self.team_size >= 2);
        self.build_candidates(self.team_size)
    }

    pub fn find_matches_1v1(&mut self) -> Vec<Match> {
        debug_assert_eq!(self.team_size, 1);
        self.build_candidates(1)
    }

    /// Resolves each picked Match's Searches and invokes `on_matched` for
    /// every one (intended to run inside the pop critical section: fast,
    /// no awaits).
    pub fn found_matches(&mut self, picked: &[Match], mut on_matched: impl FnMut(&Match, &str)) {
        for m in picked {
            for search in m.team_a.iter().chain(m.team_b.iter()) {
                search.resolve_matched(&self.technical_name);
            }
            on_matched(m, &self.technical_name);
        }
        self.prune_resolved();
    }
}

fn team_mean(team: &[Arc<Search>]) -> f64 {
    if team.is_empty() {
        return 0.0;
    }
    team.iter().map(|s| s.mean_rating()).sum::<f64>() / team.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::rating::Rating;
    use std::collections::HashMap;

    fn search(id: &str, mean: f64) -> Arc<Search> {
        let mut ratings = HashMap::new();
        ratings.insert("global".to_string(), Rating::new(mean, 50.0));
        let player = Arc::new(Player {
            id: id.to_string(),
            login: id.to_string(),
            faction: "uef".into(),
            ratings,
            connection: None,
        });
        Search::new(vec![player], "global".into(), "ladder1v1".into())
    }

    #[test]
    fn pairs_two_equal_rating_1v1_searches() {
        let mut queue = MatchmakerQueue::new(
            "q1".into(),
            "ladder1v1".into(),
            "faf".into(),
            "global".into(),
            1,
            None,
        );
        queue.enqueue(search("a", 1500.0));
        queue.enqueue(search("b", 1500.0));

        let candidates = queue.find_matches_1v1();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].team_a.len(), 1);
        assert_eq!(candidates[0].team_b.len(), 1);
    }
}
