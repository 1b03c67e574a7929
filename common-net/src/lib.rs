pub mod message;
pub mod metrics;
pub mod player_connection;
pub mod player_message;
pub mod shutdown;
pub mod telemetry;
