use rand::distributions::WeightedIndex;
use rand::prelude::*;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum MapEntry {
    Concrete {
        id: String,
        display_name: String,
        filename: String,
        weight: u32,
    },
    Generated {
        params: serde_json::Value,
        weight: u32,
    },
}

impl MapEntry {
    fn weight(&self) -> u32 {
        match self {
            MapEntry::Concrete { weight, .. } | MapEntry::Generated { weight, .. } => *weight,
        }
    }

    fn recent_key(&self) -> Option<&str> {
        match self {
            MapEntry::Concrete { id, .. } => Some(id.as_str()),
            MapEntry::Generated { .. } => None,
        }
    }
}

/// Resolves a `MapEntry::Generated` descriptor to a concrete map file. Kept
/// as an opaque capability the matchmaking core depends on but never
/// implements - the actual generator is an external collaborator.
pub trait MapGenerator: Send + Sync {
    fn generate(&self, params: &serde_json::Value) -> String;
}

pub struct ResolvedMap {
    pub display_name: String,
    pub filename: String,
}

#[derive(Error, Debug)]
pub enum MapPoolError {
    #[error("map pool is empty")]
    EmptyPool,
}

#[derive(Debug, Clone)]
pub struct MapPool {
    pub id: String,
    pub name: String,
    pub entries: Vec<MapEntry>,
}

impl MapPool {
    /// Picks one entry, preferring the least-recently-played maps and
    /// weighting among ties by the entry's configured weight.
    pub fn choose_map(
        &self,
        recently_played_map_ids: &[String],
        generator: &dyn MapGenerator,
    ) -> Result<ResolvedMap, MapPoolError> {
        if self.entries.is_empty() {
            return Err(MapPoolError::EmptyPool);
        }

        let penalties: Vec<usize> = self
            .entries
            .iter()
            .map(|entry| match entry.recent_key() {
                Some(key) => recently_played_map_ids.iter().filter(|m| m.as_str() == key).count(),
                None => 0,
            })
            .collect();

        let min_penalty = *penalties.iter().min().unwrap();

        let candidates: Vec<(&MapEntry, u32)> = self
            .entries
            .iter()
            .zip(penalties.iter())
            .filter(|(_, penalty)| **penalty == min_penalty)
            .map(|(entry, _)| (entry, entry.weight().max(1)))
            .collect();

        let weights: Vec<u32> = candidates.iter().map(|(_, w)| *w).collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| MapPoolError::EmptyPool)?;
        let mut rng = thread_rng();
        let chosen = candidates[dist.sample(&mut rng)].0;

        Ok(match chosen {
            MapEntry::Concrete {
                display_name,
                filename,
                ..
            } => ResolvedMap {
                display_name: display_name.clone(),
                filename: filename.clone(),
            },
            MapEntry::Generated { params, .. } => ResolvedMap {
                display_name: "Generated Map".to_string(),
                filename: generator.generate(params),
            },
        })
    }
}

pub struct NullGenerator;

impl MapGenerator for NullGenerator {
    fn generate(&self, _params: &serde_json::Value) -> String {
        "generated_map.scmap".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(weights: &[(&str, u32)]) -> MapPool {
        MapPool {
            id: "p1".into(),
            name: "Test Pool".into(),
            entries: weights
                .iter()
                .map(|(id, w)| MapEntry::Concrete {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    filename: format!("{id}.scmap"),
                    weight: *w,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_pool_errors() {
        let pool = pool(&[]);
        assert!(matches!(
            pool.choose_map(&[], &NullGenerator),
            Err(MapPoolError::EmptyPool)
        ));
    }

    #[test]
    fn anti_repetition_avoids_recently_played() {
        let pool = pool(&[("x", 1), ("y", 1), ("z", 1)]);
        let recent = vec!["x".to_string(), "x".to_string(), "y".to_string()];
        for _ in 0..20 {
            let chosen = pool.choose_map(&recent, &NullGenerator).unwrap();
            assert_eq!(chosen.filename, "z.scmap");
        }
    }

    #[test]
    fn tied_penalty_still_returns_an_entry() {
        let pool = pool(&[("x", 1), ("y", 1)]);
        let recent = vec!["x".to_string(), "y".to_string()];
        assert!(pool.choose_map(&recent, &NullGenerator).is_ok());
    }
}
