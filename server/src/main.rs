use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use common_net::telemetry;
use server::{BoxError, ServerConfig, ServerSettings};

#[derive(Debug, Parser)]
#[command(author, version, about = "Matchmaking ladder server")]
struct ServerCli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[arg(long, value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, value_name = "URL")]
    store_url: Option<String>,
}

impl ServerCli {
    fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        std::env::var("SERVER_CONFIG_PATH").ok().map(PathBuf::from)
    }

    fn apply_overrides(&self, settings: &mut ServerSettings) {
        if let Some(addr) = self.metrics_addr {
            settings.ladder.metrics_addr = addr.to_string();
        }
        if let Some(url) = &self.store_url {
            settings.ladder.store_url = url.clone();
        }
    }
}

fn build_config(cli: &ServerCli) -> Result<ServerConfig, BoxError> {
    let mut settings = if let Some(path) = cli.resolve_config_path() {
        ServerSettings::from_file(&path)?
    } else {
        ServerSettings::from_env()?
    };

    cli.apply_overrides(&mut settings);

    settings.into_config()
}

#[tokio::main]
async fn main() {
    telemetry::init("server");

    let cli = ServerCli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "server: could not build configuration");
            return;
        }
    };

    if let Err(err) = server::run_with_ctrl_c(config).await {
        tracing::error!(%err, "server exited with error");
    }
}
