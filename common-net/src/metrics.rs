use std::net::SocketAddr;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use once_cell::sync::OnceCell;
use prometheus::{
    register_int_counter_vec, register_int_gauge, register_int_gauge_vec, Encoder, IntCounterVec,
    IntGauge, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Metric set for the matchmaking core.
pub struct LadderMetrics {
    pub matches_total: IntCounterVec,
    pub leaderboard_rating_peak: IntGaugeVec,
    pub searching_players: IntGauge,
    pub queue_depth: IntGaugeVec,
}

impl LadderMetrics {
    pub fn inc_match(&self, queue: &str, outcome: &str) {
        self.matches_total.with_label_values(&[queue, outcome]).inc();
    }

    pub fn set_rating_peak(&self, rating_type: &str, peak: f64) {
        self.leaderboard_rating_peak
            .with_label_values(&[rating_type])
            .set(peak as i64);
    }

    pub fn set_searching_players(&self, count: i64) {
        self.searching_players.set(count);
    }

    pub fn set_queue_depth(&self, queue: &str, depth: i64) {
        self.queue_depth.with_label_values(&[queue]).set(depth);
    }
}

static LADDER_METRICS: OnceCell<LadderMetrics> = OnceCell::new();

pub fn ladder_metrics() -> &'static LadderMetrics {
    LADDER_METRICS.get_or_init(|| LadderMetrics {
        matches_total: register_int_counter_vec!(
            "ladder_matches_total",
            "Tong so tran dau theo queue va ket qua",
            &["queue", "outcome"]
        )
        .expect("register ladder_matches_total"),
        leaderboard_rating_peak: register_int_gauge_vec!(
            "ladder_leaderboard_rating_peak",
            "Rating peak uoc luong theo rating type",
            &["rating_type"]
        )
        .expect("register ladder_leaderboard_rating_peak"),
        searching_players: register_int_gauge!(
            "ladder_searching_players",
            "So luong player dang trong trang thai tim tran"
        )
        .expect("register ladder_searching_players"),
        queue_depth: register_int_gauge_vec!(
            "ladder_queue_depth",
            "So luong search dang cho trong tung queue",
            &["queue"]
        )
        .expect("register ladder_queue_depth"),
    })
}

pub fn metrics_router(metrics_path: &'static str) -> Router {
    Router::new().route(metrics_path, get(metrics_handler))
}

pub async fn serve_metrics(
    listener: TcpListener,
    metrics_path: &'static str,
) -> Result<(), BoxError> {
    let router = metrics_router(metrics_path);
    let std_listener = listener.into_std()?;
    std_listener.set_nonblocking(true)?;
    axum::Server::from_tcp(std_listener)?
        .serve(router.into_make_service())
        .await
        .map_err(|err| Box::new(err) as BoxError)
}

pub fn spawn_metrics_exporter(
    addr: SocketAddr,
    metrics_path: &'static str,
    service_name: &'static str,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = serve_metrics(listener, metrics_path).await {
                    error!(%err, service = service_name, %addr, path = metrics_path, "metrics exporter dung bat thuong");
                }
            }
            Err(err) => {
                error!(%err, service = service_name, %addr, path = metrics_path, "metrics exporter khong the bind");
            }
        }
    })
}

async fn metrics_handler() -> Response {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(%err, "metrics: encode failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let body = match String::from_utf8(buffer) {
        Ok(text) => text,
        Err(err) => {
            error!(%err, "metrics: invalid UTF-8");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], body).into_response()
}
