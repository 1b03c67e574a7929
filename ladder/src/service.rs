use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use common_net::metrics::ladder_metrics;
use common_net::player_message::{NoticeStyle, PlayerMessage, SearchState, TimeoutEntry};
use common_net::shutdown::ShutdownReceiver;
use store::QueueStore;

use crate::config::LadderConfig;
use crate::error::{LadderError, MatchOutcome};
use crate::launcher::{GameService, MatchLauncher};
use crate::map_pool::{MapEntry, MapGenerator, MapPool};
use crate::player::{Player, PlayerId, PlayerState};
use crate::pop_timer::PopTimer;
use crate::queue::MatchmakerQueue;
use crate::search::Search;
use crate::team_matchmaker::{Match, TeamMatchMaker};
use crate::violation::ViolationService;

struct PlayerRuntime {
    state: PlayerState,
    informed_rating_progress: bool,
}

impl Default for PlayerRuntime {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            informed_rating_progress: false,
        }
    }
}

struct LadderState {
    queues: HashMap<String, MatchmakerQueue>,
    player_searches: HashMap<PlayerId, HashMap<String, Arc<Search>>>,
    player_runtime: HashMap<PlayerId, PlayerRuntime>,
}

/// Owns every active queue, dispatches start/cancel requests, and drives the
/// periodic pop loop that turns Searches into launched games.
pub struct LadderService {
    state: RwLock<LadderState>,
    violations: ViolationService,
    store: Arc<dyn QueueStore>,
    map_generator: Arc<dyn MapGenerator>,
    game_service: Arc<dyn GameService>,
    pop_timer: PopTimer,
    anti_repetition_limit: u32,
}

impl LadderService {
    pub fn new(
        config: &LadderConfig,
        store: Arc<dyn QueueStore>,
        map_generator: Arc<dyn MapGenerator>,
        game_service: Arc<dyn GameService>,
    ) -> Self {
        Self {
            state: RwLock::new(LadderState {
                queues: HashMap::new(),
                player_searches: HashMap::new(),
                player_runtime: HashMap::new(),
            }),
            violations: ViolationService::new(config.violation_ban),
            store,
            map_generator,
            game_service,
            pop_timer: PopTimer::new(
                config.pop_base_interval,
                config.pop_min_interval,
                config.pop_max_interval,
            ),
            anti_repetition_limit: config.anti_repetition_limit,
        }
    }

    pub async fn start_search(&self, players: Vec<Arc<Player>>, queue_name: &str, rating_type: &str) {
        let player_ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let active = self.violations.get_violations(&player_ids);

        if !active.is_empty() {
            let longest = active.values().map(|v| v.ban_expires_at).max().unwrap();
            let minutes = (longest - chrono::Utc::now()).num_minutes().max(0);
            let timeouts: Vec<TimeoutEntry> = active
                .iter()
                .map(|(p, v)| TimeoutEntry {
                    player: p.clone(),
                    expires_at: v.ban_expires_at,
                })
                .collect();
            for player in &players {
                if let Some(conn) = &player.connection {
                    let _ = conn
                        .send(PlayerMessage::SearchTimeout {
                            timeouts: timeouts.clone(),
                        })
                        .await;
                    let _ = conn
                        .send(PlayerMessage::SearchInfo {
                            queue_name: queue_name.to_string(),
                            state: SearchState::Stop,
                        })
                        .await;
                    let _ = conn
                        .send(PlayerMessage::Notice {
                            style: NoticeStyle::Info,
                            text: format!(
                                "You are timed out from matchmaking for {} more minute(s).",
                                minutes
                            ),
                        })
                        .await;
                }
            }
            return;
        }

        let mut guard = self.state.write().await;

        for player in &players {
            if let Some(existing) = guard
                .player_searches
                .entry(player.id.clone())
                .or_default()
                .remove(queue_name)
            {
                existing.cancel();
            }
        }

        let search = Search::new(players.clone(), rating_type.to_string(), queue_name.to_string());

        for player in &players {
            guard
                .player_searches
                .entry(player.id.clone())
                .or_default()
                .insert(queue_name.to_string(), search.clone());

            let rating_notice = {
                let runtime = guard.player_runtime.entry(player.id.clone()).or_default();
                runtime.state = PlayerState::Searching;
                if runtime.informed_rating_progress {
                    None
                } else if let Some(rating) = player.rating(rating_type) {
                    rating_progress_notice(rating.deviation).inspect(|_| {
                        runtime.informed_rating_progress = true;
                    })
                } else {
                    None
                }
            };

            if let Some(conn) = &player.connection {
                let _ = conn
                    .send(PlayerMessage::SearchInfo {
                        queue_name: queue_name.to_string(),
                        state: SearchState::Start,
                    })
                    .await;
                if let Some(text) = rating_notice {
                    let _ = conn
                        .send(PlayerMessage::Notice {
                            style: NoticeStyle::Info,
                            text,
                        })
                        .await;
                }
            }
        }

        if let Some(queue) = guard.queues.get_mut(queue_name) {
            queue.enqueue(search);
        } else {
            warn!(queue = queue_name, "start_search: unknown queue");
        }
    }

    pub async fn cancel_search(&self, player_id: &PlayerId, queue_name: Option<&str>) {
        let mut guard = self.state.write().await;

        let to_cancel: Vec<(String, Arc<Search>)> = match queue_name {
            Some(qn) => guard
                .player_searches
                .get_mut(player_id)
                .and_then(|m| m.remove(qn))
                .map(|s| vec![(qn.to_string(), s)])
                .unwrap_or_default(),
            None => guard
                .player_searches
                .get_mut(player_id)
                .map(|m| m.drain().collect())
                .unwrap_or_default(),
        };

        for (qn, search) in to_cancel {
            search.cancel();
            for participant in &search.players {
                if let Some(m) = guard.player_searches.get_mut(&participant.id) {
                    m.remove(&qn);
                }
                if let Some(conn) = &participant.connection {
                    let _ = conn
                        .send(PlayerMessage::SearchInfo {
                            queue_name: qn.clone(),
                            state: SearchState::Stop,
                        })
                        .await;
                }
                let has_remaining = guard
                    .player_searches
                    .get(&participant.id)
                    .is_some_and(|m| !m.is_empty());
                if !has_remaining {
                    if let Some(runtime) = guard.player_runtime.get_mut(&participant.id) {
                        if matches!(runtime.state, PlayerState::Searching) {
                            runtime.state = PlayerState::Idle;
                        }
                    }
                }
            }
        }
    }

    pub async fn on_connection_lost(&self, player_id: &PlayerId) {
        self.cancel_search(player_id, None).await;
        let mut guard = self.state.write().await;
        guard.player_runtime.remove(player_id);
        guard.player_searches.remove(player_id);
    }

    pub async fn refresh_from_store(&self) -> Result<(), LadderError> {
        let queue_defs = self.store.list_enabled_queues().await?;
        let pool_defs = self.store.list_map_pools().await?;
        let pools_by_id: HashMap<String, MapPool> = pool_defs
            .into_iter()
            .map(|def| {
                let entries = def
                    .entries
                    .iter()
                    .map(|row| match (&row.map_id, &row.filename) {
                        (Some(id), Some(filename)) => MapEntry::Concrete {
                            id: id.clone(),
                            display_name: row.display_name.clone().unwrap_or_else(|| id.clone()),
                            filename: filename.clone(),
                            weight: row.weight.max(1),
                        },
                        _ => MapEntry::Generated {
                            params: row.map_params.clone().unwrap_or_else(|| serde_json::json!({})),
                            weight: row.weight.max(1),
                        },
                    })
                    .collect();
                (
                    def.id.clone(),
                    MapPool {
                        id: def.id,
                        name: def.name,
                        entries,
                    },
                )
            })
            .collect();

        let mut rating_peaks: HashMap<String, f64> = HashMap::new();
        let rating_types: HashSet<String> = queue_defs.iter().map(|q| q.rating_type.clone()).collect();
        for rating_type in rating_types {
            match self.store.recent_rating_journal(&rating_type, 1000).await {
                Ok(rows) if !rows.is_empty() => {
                    let n = rows.len();
                    let sum: f64 = rows.iter().map(|r| r.mean_before - 3.0 * r.deviation_before).sum();
                    let peak = sum / n as f64;
                    if n < 100 {
                        warn!(rating_type, rows = n, "refresh: thin rating journal sample");
                    }
                    if !(600.0..=1200.0).contains(&peak) {
                        warn!(rating_type, peak, "refresh: rating peak outside expected band");
                    }
                    ladder_metrics().set_rating_peak(&rating_type, peak);
                    rating_peaks.insert(rating_type, peak);
                }
                Ok(_) => {
                    rating_peaks.insert(rating_type.clone(), 1000.0);
                    ladder_metrics().set_rating_peak(&rating_type, 1000.0);
                }
                Err(err) => {
                    warn!(rating_type, %err, "refresh: could not load rating journal");
                }
            }
        }

        let mut guard = self.state.write().await;

        // Queues are keyed by technical_name, the identifier players and
        // wire messages address them by; `id` is only the store's row key.
        let seen: HashSet<String> = queue_defs.iter().map(|q| q.technical_name.clone()).collect();
        let removed_names: Vec<String> = guard
            .queues
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();

        let mut orphaned_searches = Vec::new();
        for name in removed_names {
            if let Some(mut queue) = guard.queues.remove(&name) {
                orphaned_searches.extend(queue.drain_searches());
            }
        }

        for def in queue_defs {
            let peak = rating_peaks.get(&def.rating_type).copied().unwrap_or(1000.0);
            let queue = guard.queues.entry(def.technical_name.clone()).or_insert_with(|| {
                MatchmakerQueue::new(
                    def.id.clone(),
                    def.technical_name.clone(),
                    def.featured_mod.clone(),
                    def.rating_type.clone(),
                    def.team_size,
                    def.params.clone(),
                )
            });
            queue.technical_name = def.technical_name;
            queue.featured_mod = def.featured_mod;
            queue.rating_type = def.rating_type;
            queue.team_size = def.team_size;
            queue.params = def.params;
            queue.rating_peak = peak;
            queue.clear_map_pools();
            for assoc in &def.map_pools {
                if let Some(pool) = pools_by_id.get(&assoc.pool_id) {
                    queue.add_map_pool(pool.clone(), assoc.min_rating, assoc.max_rating);
                }
            }
        }

        drop(guard);

        for search in orphaned_searches {
            search.cancel();
            for participant in &search.players {
                if let Some(conn) = &participant.connection {
                    let _ = conn
                        .send(PlayerMessage::SearchInfo {
                            queue_name: search.queue_name.clone(),
                            state: SearchState::Stop,
                        })
                        .await;
                }
            }
        }

        Ok(())
    }

    /// One scheduled pop: collects candidates from every queue, picks a
    /// non-colliding set, resolves the winning Searches, then spawns the
    /// match launches outside the lock.
    pub async fn queue_pop_iteration(self: &Arc<Self>) {
        let mut deferred_messages: Vec<(Arc<Player>, PlayerMessage)> = Vec::new();
        let mut to_launch: Vec<(String, Match)> = Vec::new();
        let searching_players;
        let depths: Vec<(String, i64)>;

        {
            let mut guard = self.state.write().await;
            let LadderState {
                queues,
                player_searches,
                player_runtime,
            } = &mut *guard;

            let queue_names: Vec<String> = queues.keys().cloned().collect();
            let mut team_results = Vec::new();
            let mut onevone_results = Vec::new();

            for name in &queue_names {
                let queue = queues.get_mut(name).unwrap();
                if queue.team_size >= 2 {
                    team_results.push((name.clone(), queue.find_matches()));
                } else {
                    onevone_results.push((name.clone(), queue.find_matches_1v1()));
                }
            }

            let mut picked_by_queue: HashMap<String, Vec<Match>> = HashMap::new();
            let mut picked_ids: HashSet<String> = HashSet::new();

            for (name, candidates) in team_results {
                let picked = TeamMatchMaker::pick_noncolliding(&candidates);
                for m in &picked {
                    for s in m.team_a.iter().chain(m.team_b.iter()) {
                        for p in s.player_ids() {
                            picked_ids.insert(p.to_string());
                        }
                    }
                }
                picked_by_queue.entry(name).or_default().extend(picked);
            }

            for (name, candidates) in onevone_results {
                let accepted: Vec<Match> = candidates
                    .into_iter()
                    .filter(|m| {
                        !m.team_a
                            .iter()
                            .chain(m.team_b.iter())
                            .flat_map(|s| s.player_ids())
                            .any(|p| picked_ids.contains(p))
                    })
                    .collect();
                picked_by_queue.entry(name).or_default().extend(accepted);
            }

            for (name, picked) in picked_by_queue {
                if picked.is_empty() {
                    continue;
                }
                let queue = queues.get_mut(&name).unwrap();
                let mut launches = Vec::new();
                queue.found_matches(&picked, |m, qn| {
                    for search in m.team_a.iter().chain(m.team_b.iter()) {
                        for player in &search.players {
                            if let Some(runtime) = player_runtime.get_mut(&player.id) {
                                runtime.state = PlayerState::Starting;
                            }
                            deferred_messages.push((
                                player.clone(),
                                PlayerMessage::MatchFound {
                                    queue_name: qn.to_string(),
                                },
                            ));

                            if let Some(searches) = player_searches.get_mut(&player.id) {
                                let other_queues: Vec<String> = searches
                                    .keys()
                                    .filter(|k| k.as_str() != qn)
                                    .cloned()
                                    .collect();
                                for oq in other_queues {
                                    if let Some(other) = searches.remove(&oq) {
                                        if other.cancel() {
                                            for op in &other.players {
                                                deferred_messages.push((
                                                    op.clone(),
                                                    PlayerMessage::SearchInfo {
                                                        queue_name: oq.clone(),
                                                        state: SearchState::Stop,
                                                    },
                                                ));
                                            }
                                        }
                                    }
                                }
                                searches.remove(qn);
                            }
                        }
                    }
                    launches.push(m.clone());
                });
                for m in launches {
                    to_launch.push((name.clone(), m));
                }
            }

            searching_players = player_runtime
                .values()
                .filter(|r| matches!(r.state, PlayerState::Searching))
                .count() as i64;
            depths = queues
                .values()
                .map(|q| (q.technical_name.clone(), q.len() as i64))
                .collect();
        }

        ladder_metrics().set_searching_players(searching_players);
        for (name, depth) in depths {
            ladder_metrics().set_queue_depth(&name, depth);
        }

        for (player, message) in deferred_messages {
            if let Some(conn) = &player.connection {
                let _ = conn.send(message).await;
            }
        }

        for (queue_name, m) in to_launch {
            let service = self.clone();
            tokio::spawn(async move {
                service.launch_match(queue_name, m).await;
            });
        }
    }

    async fn launch_match(&self, queue_name: String, m: Match) {
        let all_players: Vec<PlayerId> = m
            .team_a
            .iter()
            .chain(m.team_b.iter())
            .flat_map(|s| s.players.iter().map(|p| p.id.clone()))
            .collect();

        let recent_maps = {
            let guard = self.state.read().await;
            let queue_id = guard
                .queues
                .values()
                .find(|q| q.technical_name == queue_name)
                .map(|q| q.id.clone());
            drop(guard);
            match queue_id {
                Some(id) => self
                    .store
                    .recent_map_ids(&id, &all_players, 24, self.anti_repetition_limit)
                    .await
                    .map(|rows| rows.into_iter().map(|r| r.map_id).collect::<Vec<_>>())
                    .unwrap_or_default(),
                None => Vec::new(),
            }
        };

        // Snapshot the queue and release the lock before the launch handshake,
        // which can run for up to the guest timeout (tens of seconds) and must
        // not block start_search/cancel_search/queue_pop_iteration meanwhile.
        let queue = {
            let guard = self.state.read().await;
            match guard.queues.values().find(|q| q.technical_name == queue_name) {
                Some(q) => q.clone(),
                None => {
                    warn!(queue = queue_name, "launch_match: queue disappeared before launch");
                    return;
                }
            }
        };

        let result = MatchLauncher::start_game(
            &m,
            &queue,
            &recent_maps,
            self.map_generator.as_ref(),
            self.game_service.as_ref(),
            &self.violations,
        )
        .await;
        let outcome = match &result {
            Ok(()) => MatchOutcome::Successful,
            Err(err) => err.outcome(),
        };
        ladder_metrics().inc_match(&queue_name, outcome.label());

        let mut state = self.state.write().await;
        for player_id in &all_players {
            if let Some(runtime) = state.player_runtime.get_mut(player_id) {
                if !matches!(runtime.state, PlayerState::Starting) {
                    continue;
                }
                runtime.state = match &result {
                    Ok(()) => PlayerState::Playing,
                    Err(_) => PlayerState::Idle,
                };
            }
        }
    }

    /// Drives the periodic pop loop until `shutdown` fires.
    pub async fn run_pop_loop(self: Arc<Self>, mut shutdown: ShutdownReceiver) {
        loop {
            let total_players = {
                let guard = self.state.read().await;
                guard
                    .player_runtime
                    .values()
                    .filter(|r| matches!(r.state, PlayerState::Searching))
                    .count()
            };

            if !self.pop_timer.next_pop(total_players, &mut shutdown).await {
                info!("ladder: pop loop shutting down");
                return;
            }

            self.queue_pop_iteration().await;
        }
    }

    pub async fn run_refresh_loop(self: Arc<Self>, mut shutdown: ShutdownReceiver) {
        if let Err(err) = self.refresh_from_store().await {
            error!(%err, "ladder: initial refresh failed");
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.refresh_from_store().await {
                        error!(%err, "ladder: periodic refresh failed");
                    }
                }
                _ = shutdown.changed() => {
                    return;
                }
            }
        }
    }
}

fn rating_progress_notice(deviation: f64) -> Option<String> {
    if deviation > 490.0 {
        Some("Welcome! Your rating is not yet calibrated.".to_string())
    } else if deviation > 250.0 {
        let percent = ((500.0 - deviation) / 2.5).round();
        Some(format!("Rating calibration {percent:.0}% complete."))
    } else {
        None
    }
}

pub async fn run(
    config: &LadderConfig,
    store: Arc<dyn QueueStore>,
    map_generator: Arc<dyn MapGenerator>,
    game_service: Arc<dyn GameService>,
    shutdown_rx: ShutdownReceiver,
) -> Result<(), LadderError> {
    let service = Arc::new(LadderService::new(config, store, map_generator, game_service));

    let metrics_task = common_net::metrics::spawn_metrics_exporter(
        config.metrics_addr,
        crate::config::METRICS_PATH,
        "ladder",
    );

    let mut join_set: JoinSet<()> = JoinSet::new();
    join_set.spawn(service.clone().run_refresh_loop(shutdown_rx.clone()));
    join_set.spawn(service.run_pop_loop(shutdown_rx));

    while join_set.join_next().await.is_some() {}
    metrics_task.abort();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::Rating;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use common_net::player_connection::{PlayerConnection, SendError};

    struct RecordingConnection {
        sent: Mutex<Vec<PlayerMessage>>,
    }

    impl RecordingConnection {
        fn new() -> Arc<Self> {
            Arc::new(Self { sent: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl PlayerConnection for RecordingConnection {
        async fn send(&self, message: PlayerMessage) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    struct NullGameService;

    #[async_trait]
    impl GameService for NullGameService {
        async fn create_game(
            &self,
            _spec: crate::launcher::GameSpec,
        ) -> Result<Arc<dyn crate::launcher::Game>, crate::error::LaunchError> {
            Err(crate::error::LaunchError::Unexpected("no game service in test".into()))
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl QueueStore for EmptyStore {
        async fn list_enabled_queues(&self) -> Result<Vec<store::QueueDefinition>, store::StoreError> {
            Ok(Vec::new())
        }
        async fn list_map_pools(&self) -> Result<Vec<store::MapPoolDefinition>, store::StoreError> {
            Ok(Vec::new())
        }
        async fn recent_rating_journal(
            &self,
            _rating_type: &str,
            _limit: u32,
        ) -> Result<Vec<store::RatingJournalRow>, store::StoreError> {
            Ok(Vec::new())
        }
        async fn recent_map_ids(
            &self,
            _queue_id: &str,
            _player_ids: &[String],
            _since_hours: i64,
            _limit: u32,
        ) -> Result<Vec<store::RecentMapRow>, store::StoreError> {
            Ok(Vec::new())
        }
    }

    fn player(id: &str, mean: f64, conn: Option<Arc<dyn PlayerConnection>>) -> Arc<Player> {
        let mut ratings = StdHashMap::new();
        ratings.insert("global".to_string(), Rating::new(mean, 50.0));
        Arc::new(Player {
            id: id.to_string(),
            login: id.to_string(),
            faction: "uef".into(),
            ratings,
            connection: conn,
        })
    }

    fn test_config() -> LadderConfig {
        LadderConfig {
            metrics_addr: "127.0.0.1:0".parse().unwrap(),
            store_url: "http://localhost".into(),
            pop_base_interval: Duration::from_millis(10),
            pop_min_interval: Duration::from_millis(1),
            pop_max_interval: Duration::from_millis(50),
            anti_repetition_limit: 3,
            violation_ban: Duration::from_secs(300),
        }
    }

    #[tokio::test]
    async fn single_1v1_match_found_and_cross_queue_search_cancelled() {
        let service = Arc::new(LadderService::new(
            &test_config(),
            Arc::new(EmptyStore),
            Arc::new(crate::map_pool::NullGenerator),
            Arc::new(NullGameService),
        ));

        {
            let mut guard = service.state.write().await;
            guard.queues.insert(
                "ladder1v1".into(),
                MatchmakerQueue::new("q1".into(), "ladder1v1".into(), "faf".into(), "global".into(), 1, None),
            );
        }

        let conn_a = RecordingConnection::new();
        let conn_b = RecordingConnection::new();
        let a = player("a", 1500.0, Some(conn_a.clone()));
        let b = player("b", 1500.0, Some(conn_b.clone()));

        service.start_search(vec![a.clone()], "ladder1v1", "global").await;
        service.start_search(vec![b.clone()], "ladder1v1", "global").await;

        service.queue_pop_iteration().await;

        let a_msgs = conn_a.sent.lock().unwrap();
        assert!(a_msgs
            .iter()
            .any(|m| matches!(m, PlayerMessage::MatchFound { queue_name } if queue_name == "ladder1v1")));
    }

    #[tokio::test]
    async fn timed_out_player_is_not_enqueued() {
        let service = Arc::new(LadderService::new(
            &test_config(),
            Arc::new(EmptyStore),
            Arc::new(crate::map_pool::NullGenerator),
            Arc::new(NullGameService),
        ));
        {
            let mut guard = service.state.write().await;
            guard.queues.insert(
                "ladder1v1".into(),
                MatchmakerQueue::new("q1".into(), "ladder1v1".into(), "faf".into(), "global".into(), 1, None),
            );
        }

        service.violations.register_violations(&["c".to_string()]);
        let conn_c = RecordingConnection::new();
        let c = player("c", 1500.0, Some(conn_c.clone()));
        service.start_search(vec![c.clone()], "ladder1v1", "global").await;

        let guard = service.state.read().await;
        assert_eq!(guard.queues.get("ladder1v1").unwrap().len(), 0);
        drop(guard);

        let msgs = conn_c.sent.lock().unwrap();
        assert!(msgs.iter().any(|m| matches!(m, PlayerMessage::SearchTimeout { .. })));
    }

    struct OkGame;

    #[async_trait]
    impl crate::launcher::Game for OkGame {
        fn id(&self) -> String {
            "g1".into()
        }
        async fn wait_hosted(&self) {}
        async fn wait_launched(&self) {}
        async fn on_finish(&self) {}
    }

    struct OkGameService;

    #[async_trait]
    impl GameService for OkGameService {
        async fn create_game(
            &self,
            _spec: crate::launcher::GameSpec,
        ) -> Result<Arc<dyn crate::launcher::Game>, crate::error::LaunchError> {
            Ok(Arc::new(OkGame))
        }
    }

    #[tokio::test]
    async fn successful_launch_leaves_player_playing_not_idle() {
        let service = Arc::new(LadderService::new(
            &test_config(),
            Arc::new(EmptyStore),
            Arc::new(crate::map_pool::NullGenerator),
            Arc::new(OkGameService),
        ));

        {
            let mut guard = service.state.write().await;
            let mut queue =
                MatchmakerQueue::new("q1".into(), "ladder1v1".into(), "faf".into(), "global".into(), 1, None);
            queue.add_map_pool(
                crate::map_pool::MapPool {
                    id: "p1".into(),
                    name: "default".into(),
                    entries: vec![crate::map_pool::MapEntry::Concrete {
                        id: "m1".into(),
                        display_name: "Map One".into(),
                        filename: "m1.scmap".into(),
                        weight: 1,
                    }],
                },
                0.0,
                5000.0,
            );
            guard.queues.insert("ladder1v1".into(), queue);
        }

        let conn_a = RecordingConnection::new();
        let conn_b = RecordingConnection::new();
        let a = player("a", 1500.0, Some(conn_a.clone()));
        let b = player("b", 1500.0, Some(conn_b.clone()));

        service.start_search(vec![a.clone()], "ladder1v1", "global").await;
        service.start_search(vec![b.clone()], "ladder1v1", "global").await;

        service.queue_pop_iteration().await;

        // queue_pop_iteration spawns the launch; give it a moment to finish.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let guard = service.state.read().await;
        assert_eq!(guard.player_runtime.get("a").map(|r| r.state), Some(PlayerState::Playing));
        assert_eq!(guard.player_runtime.get("b").map(|r| r.state), Some(PlayerState::Playing));
    }
}
