use std::collections::HashSet;
use std::sync::Arc;

use crate::search::Search;

/// A candidate or picked pairing of two teams, each a list of Searches whose
/// combined player count equals the owning queue's team size.
#[derive(Clone)]
pub struct Match {
    pub team_a: Vec<Arc<Search>>,
    pub team_b: Vec<Arc<Search>>,
    pub quality: f64,
}

impl Match {
    fn player_ids(&self) -> HashSet<&str> {
        self.team_a
            .iter()
            .chain(self.team_b.iter())
            .flat_map(|s| s.player_ids())
            .collect()
    }
}

/// Picks a maximum pairwise-disjoint subset of candidate Matches: most
/// matches first, then highest summed quality, then earliest input order.
pub struct TeamMatchMaker;

impl TeamMatchMaker {
    pub fn pick_noncolliding(candidates: &[Match]) -> Vec<Match> {
        let id_sets: Vec<HashSet<&str>> = candidates.iter().map(|m| m.player_ids()).collect();
        let n = candidates.len();

        let mut best_indices: Vec<usize> = Vec::new();
        let mut best_score = (0usize, 0.0f64);

        fn collides(a: usize, b: usize, id_sets: &[HashSet<&str>]) -> bool {
            id_sets[a].intersection(&id_sets[b]).next().is_some()
        }

        fn recurse(
            i: usize,
            n: usize,
            chosen: &mut Vec<usize>,
            score: (usize, f64),
            candidates: &[Match],
            id_sets: &[HashSet<&str>],
            best_indices: &mut Vec<usize>,
            best_score: &mut (usize, f64),
        ) {
            if i == n {
                if score.0 > best_score.0 || (score.0 == best_score.0 && score.1 > best_score.1) {
                    *best_score = score;
                    *best_indices = chosen.clone();
                }
                return;
            }

            let collides_with_chosen = chosen.iter().any(|&c| collides(c, i, id_sets));
            if !collides_with_chosen {
                chosen.push(i);
                recurse(
                    i + 1,
                    n,
                    chosen,
                    (score.0 + 1, score.1 + candidates[i].quality),
                    candidates,
                    id_sets,
                    best_indices,
                    best_score,
                );
                chosen.pop();
            }

            recurse(
                i + 1,
                n,
                chosen,
                score,
                candidates,
                id_sets,
                best_indices,
                best_score,
            );
        }

        let mut chosen = Vec::new();
        recurse(
            0,
            n,
            &mut chosen,
            (0, 0.0),
            candidates,
            &id_sets,
            &mut best_indices,
            &mut best_score,
        );

        best_indices.into_iter().map(|i| candidates[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::rating::Rating;
    use std::collections::HashMap;

    fn search(id: &str) -> Arc<Search> {
        let mut ratings = HashMap::new();
        ratings.insert("global".to_string(), Rating::new(1500.0, 50.0));
        let player = Arc::new(Player {
            id: id.to_string(),
            login: id.to_string(),
            faction: "uef".into(),
            ratings,
            connection: None,
        });
        Search::new(vec![player], "global".into(), "ladder1v1".into())
    }

    fn single_match(ids_a: &[&str], ids_b: &[&str], quality: f64) -> Match {
        Match {
            team_a: ids_a.iter().map(|id| search(id)).collect(),
            team_b: ids_b.iter().map(|id| search(id)).collect(),
            quality,
        }
    }

    #[test]
    fn picks_maximum_noncolliding_set() {
        let m1 = single_match(&["a"], &["b"], 1.0);
        let m2 = single_match(&["b"], &["c"], 1.0);
        let m3 = single_match(&["c"], &["d"], 1.0);
        let picked = TeamMatchMaker::pick_noncolliding(&[m1, m2, m3]);
        assert_eq!(picked.len(), 2);
    }
}
