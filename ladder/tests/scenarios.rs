use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use common_net::player_connection::{PlayerConnection, SendError};
use common_net::player_message::PlayerMessage;
use store::{MapPoolDefinition, QueueDefinition, QueueStore};

use ladder::{
    Game, GameService, GameSpec, LadderConfig, LadderService, LaunchError, MapPool, MatchLauncher,
    MatchmakerQueue, NullGenerator, Player, Rating, Search, ViolationService,
};

struct RecordingConnection {
    connected: bool,
    sent: Mutex<Vec<PlayerMessage>>,
}

impl RecordingConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn disconnected() -> Arc<Self> {
        Arc::new(Self {
            connected: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<PlayerMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlayerConnection for RecordingConnection {
    async fn send(&self, message: PlayerMessage) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn player(id: &str, mean: f64, conn: Option<Arc<dyn PlayerConnection>>) -> Arc<Player> {
    let mut ratings = HashMap::new();
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

struct TwoQueueStore;

#[async_trait]
impl QueueStore for TwoQueueStore {
    async fn list_enabled_queues(&self) -> Result<Vec<QueueDefinition>, store::StoreError> {
        Ok(vec![
            QueueDefinition {
                id: "q-1v1".into(),
                technical_name: "ladder1v1".into(),
                team_size: 1,
                params: None,
                featured_mod: "faf".into(),
                rating_type: "global".into(),
                map_pools: Vec::new(),
            },
            QueueDefinition {
                id: "q-2v2".into(),
                technical_name: "tmm2v2".into(),
                team_size: 2,
                params: None,
                featured_mod: "faf".into(),
                rating_type: "global".into(),
                map_pools: Vec::new(),
            },
        ])
    }

    async fn list_map_pools(&self) -> Result<Vec<MapPoolDefinition>, store::StoreError> {
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

struct UnreachableGameService;

#[async_trait]
impl GameService for UnreachableGameService {
    async fn create_game(&self, _spec: GameSpec) -> Result<Arc<dyn Game>, LaunchError> {
        Err(LaunchError::Unexpected("not used in this scenario".into()))
    }
}

/// S3 - a player searching two queues at once has the other queue's Search
/// cancelled the moment one queue matches them.
#[tokio::test]
async fn cross_queue_search_is_cancelled_when_the_other_queue_matches() {
    let service = Arc::new(LadderService::new(
        &test_config(),
        Arc::new(TwoQueueStore),
        Arc::new(NullGenerator),
        Arc::new(UnreachableGameService),
    ));

    service.refresh_from_store().await.expect("refresh");

    let conn_d = RecordingConnection::new();
    let conn_e = RecordingConnection::new();
    let conn_f = RecordingConnection::new();
    let conn_g = RecordingConnection::new();

    let d = player("d", 1500.0, Some(conn_d.clone()));
    let e = player("e", 1500.0, Some(conn_e.clone()));
    let f = player("f", 1500.0, Some(conn_f.clone()));
    let g = player("g", 1500.0, Some(conn_g.clone()));

    // D also searches 1v1 alone, unrelated to the 2v2 party below.
    service.start_search(vec![d.clone()], "ladder1v1", "global").await;

    // D+E vs F+G in the 2v2 queue, as two parties.
    service.start_search(vec![d.clone(), e.clone()], "tmm2v2", "global").await;
    service.start_search(vec![f.clone(), g.clone()], "tmm2v2", "global").await;

    service.queue_pop_iteration().await;

    let d_msgs = conn_d.messages();
    assert!(
        d_msgs
            .iter()
            .any(|m| matches!(m, PlayerMessage::MatchFound { queue_name } if queue_name == "tmm2v2")),
        "D should be matched in tmm2v2, got {:?}",
        d_msgs
    );
    assert!(
        d_msgs.iter().any(|m| matches!(
            m,
            PlayerMessage::SearchInfo { queue_name, state: common_net::player_message::SearchState::Stop }
                if queue_name == "ladder1v1"
        )),
        "D's ladder1v1 search should have been cancelled and reported stopped, got {:?}",
        d_msgs
    );
}

/// S6 - a host who disconnects before the launch handshake aborts the match,
/// notifies every participant, and reports the host as a violator.
#[tokio::test]
async fn host_dropout_before_launch_is_attributed_to_host() {
    let mut queue = MatchmakerQueue::new(
        "q-1v1".into(),
        "ladder1v1".into(),
        "faf".into(),
        "global".into(),
        1,
        None,
    );
    queue.add_map_pool(
        MapPool {
            id: "p1".into(),
            name: "default".into(),
            entries: vec![ladder::MapEntry::Concrete {
                id: "m1".into(),
                display_name: "Map One".into(),
                filename: "m1.scmap".into(),
                weight: 1,
            }],
        },
        0.0,
        5000.0,
    );

    let conn_guest = RecordingConnection::new();
    let host = player("host", 1500.0, Some(RecordingConnection::disconnected()));
    let guest = player("guest", 1500.0, Some(conn_guest.clone()));

    struct OkGame;
    #[async_trait]
    impl Game for OkGame {
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
        async fn create_game(&self, _spec: GameSpec) -> Result<Arc<dyn Game>, LaunchError> {
            Ok(Arc::new(OkGame))
        }
    }

    let search_a = Search::new(vec![host.clone()], "global".into(), "ladder1v1".into());
    let search_b = Search::new(vec![guest.clone()], "global".into(), "ladder1v1".into());
    let m = ladder::Match {
        team_a: vec![search_a],
        team_b: vec![search_b],
        quality: 1.0,
    };

    let violations = ViolationService::new(Duration::from_secs(300));
    let result = MatchLauncher::start_game(
        &m,
        &queue,
        &[],
        &NullGenerator,
        &OkGameService,
        &violations,
    )
    .await;

    assert!(matches!(result, Err(LaunchError::NotConnected(ref players)) if players == &vec!["host".to_string()]));

    let guest_msgs = conn_guest.messages();
    assert!(guest_msgs
        .iter()
        .any(|m| matches!(m, PlayerMessage::MatchCancelled { game_id: None })));

    let active = violations.get_violations(&["host".to_string()]);
    assert_eq!(active.len(), 1, "host should be registered as a violator");
}
