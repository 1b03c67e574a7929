use std::{fs, path::Path, sync::Arc};

use async_trait::async_trait;
use common_net::shutdown;
use ladder::{Game, GameService, GameSpec, LadderConfig, LadderSettings, LaunchError, NullGenerator};
use pocketbase::PocketBaseClient;
use store::PocketBaseQueueStore;
use tracing::error;

/// Placeholder for the real game-hosting collaborator: creating a game is
/// someone else's responsibility in this workspace, so every attempt fails
/// fast rather than hanging a match launch.
struct UnimplementedGameService;

#[async_trait]
impl GameService for UnimplementedGameService {
    async fn create_game(&self, _spec: GameSpec) -> Result<Arc<dyn Game>, LaunchError> {
        Err(LaunchError::Unexpected(
            "no game-hosting backend wired into this server".to_string(),
        ))
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize, Default)]
pub struct ServerSettings {
    pub ladder: LadderSettings,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            ladder: LadderSettings::from_env()?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, BoxError> {
        let raw = fs::read_to_string(path).map_err(|err| Box::new(err) as BoxError)?;
        let settings = serde_json::from_str(&raw).map_err(|err| Box::new(err) as BoxError)?;
        Ok(settings)
    }

    pub fn into_config(self) -> Result<ServerConfig, BoxError> {
        ServerConfig::from_settings(self)
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub ladder: LadderConfig,
}

impl ServerConfig {
    pub fn from_settings(settings: ServerSettings) -> Result<Self, BoxError> {
        Ok(Self {
            ladder: LadderConfig::from_settings(settings.ladder)?,
        })
    }

    pub fn from_env() -> Result<Self, BoxError> {
        ServerSettings::from_env().and_then(Self::from_settings)
    }
}

pub async fn run() -> Result<(), BoxError> {
    let config = ServerConfig::from_env()?;
    run_with_ctrl_c(config).await
}

pub async fn run_with_ctrl_c(config: ServerConfig) -> Result<(), BoxError> {
    let (shutdown_tx, shutdown_rx) = shutdown::channel();

    let ctrl_c = tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "server: could not listen for ctrl_c");
        }
        shutdown::trigger(&shutdown_tx);
    });

    let result = run_with_shutdown(config, shutdown_rx).await;

    ctrl_c.abort();
    result
}

pub async fn run_with_shutdown(
    config: ServerConfig,
    shutdown_rx: shutdown::ShutdownReceiver,
) -> Result<(), BoxError> {
    let client = PocketBaseClient::new(&config.ladder.store_url);
    let store = Arc::new(PocketBaseQueueStore::new(client));

    // The game-object factory and map-generator integrations live outside
    // this core; no real implementation exists yet in this workspace.
    let game_service = Arc::new(UnimplementedGameService);

    ladder::run(
        &config.ladder,
        store,
        Arc::new(NullGenerator),
        game_service,
        shutdown_rx,
    )
    .await
    .map_err(|err| Box::new(err) as BoxError)
}
