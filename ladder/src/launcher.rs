use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::warn;

use common_net::player_message::{LaunchOptions, PlayerMessage, SearchState};

use crate::error::{LaunchError, MatchOutcome};
use crate::map_pool::MapGenerator;
use crate::player::{Player, PlayerId};
use crate::queue::MatchmakerQueue;
use crate::team_matchmaker::Match;
use crate::violation::ViolationService;

/// The external game-object factory. Out of scope for this core: it owns
/// game lifecycle once created, we only need a narrow trait to drive it.
#[async_trait]
pub trait GameService: Send + Sync {
    async fn create_game(&self, spec: GameSpec) -> Result<Arc<dyn Game>, LaunchError>;
}

#[derive(Debug, Clone)]
pub struct GameSpec {
    pub name: String,
    pub game_mode: String,
    pub host: PlayerId,
    pub rating_type: String,
    pub max_players: u32,
    pub map_file_path: String,
    pub options: serde_json::Value,
}

#[async_trait]
pub trait Game: Send + Sync {
    fn id(&self) -> String;
    async fn wait_hosted(&self);
    async fn wait_launched(&self);
    async fn on_finish(&self);
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub player_id: PlayerId,
    pub start_spot: u32,
    pub army: u32,
    pub color: u32,
    pub team: u32,
    pub faction: String,
}

const HOST_TIMEOUT: Duration = Duration::from_secs(60);
const GUEST_TIMEOUT_BASE: Duration = Duration::from_secs(60);
const GUEST_TIMEOUT_PER_GUEST: Duration = Duration::from_secs(10);

pub struct MatchLauncher;

impl MatchLauncher {
    /// Selects a map, creates the game, assigns slots, and drives the
    /// host/guest launch handshake. Always invokes `violations` and sends
    /// `match_cancelled` on failure before returning.
    pub async fn start_game(
        m: &Match,
        queue: &MatchmakerQueue,
        recent_map_ids: &[String],
        generator: &dyn MapGenerator,
        game_service: &dyn GameService,
        violations: &ViolationService,
    ) -> Result<(), LaunchError> {
        let team_a: Vec<Arc<Player>> = m.team_a.iter().flat_map(|s| s.players.clone()).collect();
        let team_b: Vec<Arc<Player>> = m.team_b.iter().flat_map(|s| s.players.clone()).collect();
        let host = team_a[0].clone();

        let result = Self::run(queue, &team_a, &team_b, &host, recent_map_ids, generator, game_service).await;

        if let Err(err) = &result {
            let all_players: Vec<&Arc<Player>> = team_a.iter().chain(team_b.iter()).collect();
            for player in &all_players {
                if let Some(conn) = &player.connection {
                    let _ = conn
                        .send(PlayerMessage::MatchCancelled { game_id: None })
                        .await;
                }
            }
            let abandoners = err.abandoners();
            if !abandoners.is_empty() {
                violations.register_violations(&abandoners);
            }
            warn!(queue = %queue.technical_name, %err, "match launch failed");
        }

        result
    }

    async fn run(
        queue: &MatchmakerQueue,
        team_a: &[Arc<Player>],
        team_b: &[Arc<Player>],
        host: &Arc<Player>,
        recent_map_ids: &[String],
        generator: &dyn MapGenerator,
        game_service: &dyn GameService,
    ) -> Result<(), LaunchError> {
        let all_players: Vec<&Arc<Player>> = team_a.iter().chain(team_b.iter()).collect();

        let min_rating = all_players
            .iter()
            .filter_map(|p| p.rating(&queue.rating_type))
            .map(|r| r.displayed())
            .fold(f64::INFINITY, f64::min);

        let pool = queue
            .get_map_pool_for_rating(min_rating)
            .ok_or(LaunchError::EmptyPool)?;
        let map = pool
            .choose_map(recent_map_ids, generator)
            .map_err(|_| LaunchError::EmptyPool)?;

        let game_options = queue.get_game_options().unwrap_or(serde_json::json!({}));

        let spec = GameSpec {
            name: format!("{} vs {}", host.login, team_b.first().map(|p| p.login.as_str()).unwrap_or("?")),
            game_mode: queue.featured_mod.clone(),
            host: host.id.clone(),
            rating_type: queue.rating_type.clone(),
            max_players: (team_a.len() + team_b.len()) as u32,
            map_file_path: map.filename.clone(),
            options: game_options,
        };

        let game = game_service.create_game(spec).await?;

        let slots = Self::assign_slots(team_a, team_b, &queue.rating_type);

        if !host.is_connected() {
            let _ = game.on_finish().await;
            return Err(LaunchError::NotConnected(vec![host.id.clone()]));
        }

        let host_slot = slots.iter().find(|s| s.player_id == host.id);
        if let Some(conn) = &host.connection {
            let _ = conn
                .send(PlayerMessage::LaunchGame {
                    is_host: true,
                    options: slot_options(host_slot, &map.filename, slots.len() as u32),
                })
                .await;
        }

        let hosted = tokio::time::timeout(HOST_TIMEOUT, game.wait_hosted()).await;
        let guests: Vec<&Arc<Player>> = all_players.iter().copied().filter(|p| p.id != host.id).collect();

        if hosted.is_err() {
            // Legacy clients keep waiting unless told to stop; send guest
            // launches anyway before failing so old builds don't hang.
            for guest in &guests {
                if let Some(conn) = &guest.connection {
                    let slot = slots.iter().find(|s| s.player_id == guest.id);
                    let _ = conn
                        .send(PlayerMessage::LaunchGame {
                            is_host: false,
                            options: slot_options(slot, &map.filename, slots.len() as u32),
                        })
                        .await;
                }
            }
            let _ = game.on_finish().await;
            return Err(LaunchError::NotConnected(vec![host.id.clone()]));
        }

        let unreachable_guests: Vec<PlayerId> =
            guests.iter().filter(|g| !g.is_connected()).map(|g| g.id.clone()).collect();
        if !unreachable_guests.is_empty() {
            let _ = game.on_finish().await;
            return Err(LaunchError::NotConnected(unreachable_guests));
        }

        for guest in &guests {
            if let Some(conn) = &guest.connection {
                let slot = slots.iter().find(|s| s.player_id == guest.id);
                let _ = conn
                    .send(PlayerMessage::LaunchGame {
                        is_host: false,
                        options: slot_options(slot, &map.filename, slots.len() as u32),
                    })
                    .await;
            }
        }

        let launch_timeout = GUEST_TIMEOUT_BASE + GUEST_TIMEOUT_PER_GUEST * guests.len() as u32;
        if tokio::time::timeout(launch_timeout, game.wait_launched()).await.is_err() {
            let not_yet: Vec<PlayerId> = guests.iter().map(|g| g.id.clone()).collect();
            let _ = game.on_finish().await;
            return Err(LaunchError::NotConnected(not_yet));
        }

        Ok(())
    }

    fn assign_slots(team_a: &[Arc<Player>], team_b: &[Arc<Player>], rating_type: &str) -> Vec<Slot> {
        let mut a_sorted = team_a.to_vec();
        a_sorted.sort_by(|x, y| {
            x.rating(rating_type)
                .map(|r| r.mean)
                .partial_cmp(&y.rating(rating_type).map(|r| r.mean))
                .unwrap()
        });
        let mut b_sorted = team_b.to_vec();
        b_sorted.sort_by(|x, y| {
            x.rating(rating_type)
                .map(|r| r.mean)
                .partial_cmp(&y.rating(rating_type).map(|r| r.mean))
                .unwrap()
        });

        let mut pairs: Vec<(Arc<Player>, Arc<Player>)> =
            a_sorted.into_iter().zip(b_sorted).collect();
        pairs.shuffle(&mut rand::thread_rng());

        let mut slots = Vec::with_capacity(pairs.len() * 2);
        for (index, (a, b)) in pairs.into_iter().enumerate() {
            let slot_base = (index * 2) as u32 + 1;
            slots.push(Slot {
                player_id: a.id.clone(),
                start_spot: slot_base,
                army: slot_base,
                color: slot_base,
                team: 2,
                faction: a.faction.clone(),
            });
            slots.push(Slot {
                player_id: b.id.clone(),
                start_spot: slot_base + 1,
                army: slot_base + 1,
                color: slot_base + 1,
                team: 3,
                faction: b.faction.clone(),
            });
        }
        slots
    }
}

fn slot_options(slot: Option<&Slot>, mapname: &str, expected_players: u32) -> LaunchOptions {
    let slot = slot.cloned().unwrap_or(Slot {
        player_id: String::new(),
        start_spot: 0,
        army: 0,
        color: 0,
        team: 0,
        faction: String::new(),
    });
    LaunchOptions {
        mapname: mapname.to_string(),
        expected_players,
        game_options: serde_json::json!({}),
        team: slot.team,
        faction: slot.faction,
        map_position: slot.start_spot,
    }
}

pub fn notify_stop_search(queue_name: &str) -> PlayerMessage {
    PlayerMessage::SearchInfo {
        queue_name: queue_name.to_string(),
        state: SearchState::Stop,
    }
}

pub fn outcome_of(result: &Result<(), LaunchError>) -> MatchOutcome {
    match result {
        Ok(()) => MatchOutcome::Successful,
        Err(err) => err.outcome(),
    }
}
