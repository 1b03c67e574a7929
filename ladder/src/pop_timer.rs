use std::time::Duration;

use tokio::sync::watch;

/// Paces queue pops: the busier the combined queues are, the shorter the
/// interval until the next pop, bounded to `[min_interval, max_interval]`.
pub struct PopTimer {
    base_interval: Duration,
    min_interval: Duration,
    max_interval: Duration,
}

impl PopTimer {
    pub fn new(base_interval: Duration, min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            base_interval,
            min_interval,
            max_interval,
        }
    }

    /// `f(n) = 1 / (1 + n / 10)`: halves the interval around 10 active
    /// players, asymptotically approaches zero as load grows, bounded
    /// below by `min_interval`.
    pub fn compute_interval(&self, total_players: usize) -> Duration {
        let factor = 1.0 / (1.0 + total_players as f64 / 10.0);
        self.base_interval.mul_f64(factor).clamp(self.min_interval, self.max_interval)
    }

    /// Suspends until the next pop is due. Returns `false` if `shutdown`
    /// fired first (prompt cancellation), `true` on a normal fire.
    pub async fn next_pop(&self, total_players: usize, shutdown: &mut watch::Receiver<bool>) -> bool {
        let interval = self.compute_interval(total_players);
        tokio::select! {
            _ = tokio::time::sleep(interval) => true,
            _ = shutdown.changed() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_shrinks_with_load_and_is_bounded() {
        let timer = PopTimer::new(
            Duration::from_millis(1000),
            Duration::from_millis(50),
            Duration::from_millis(2000),
        );
        let cold = timer.compute_interval(0);
        let hot = timer.compute_interval(1000);
        assert_eq!(cold, Duration::from_millis(1000));
        assert_eq!(hot, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn shutdown_cancels_promptly() {
        let timer = PopTimer::new(
            Duration::from_secs(60),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let (tx, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move { timer.next_pop(0, &mut rx).await });
        let _ = tx.send(true);
        let fired = handle.await.unwrap();
        assert!(!fired);
    }
}
