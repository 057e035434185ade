//! GCLoop - 期限切れオブジェクトの回収
//!
//! # フロー
//! 1. `sweep_interval` ごとに起床
//! 2. `Store::purge_expired()` で expires_at <= now のオブジェクトを削除
//! 3. shutdown が来たら抜ける
//!
//! The interval only bounds how long expired bytes linger on disk; reads
//! enforce expiry on their own.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::store::Store;

/// Handle to the background sweep.
/// - `request_shutdown()` で次の tick を待たずに止まる
/// - `shutdown_and_join()` で終了を待てる
pub struct GCLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl GCLoop {
    /// Start sweeping `store` every `interval`. The first sweep runs one
    /// interval after start.
    pub fn spawn(store: Store, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(gc_loop(store, interval, shutdown_rx));
        tracing::info!(interval_secs = interval.as_secs_f64(), "reclamation loop started");
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "reclamation loop join error");
        }
    }
}

async fn gc_loop(store: Store, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval() fires immediately; skip that tick
    ticker.tick().await;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // sender dropped: nobody can stop us any more, so stop now
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {
                store.purge_expired().await;
            }
        }
    }

    tracing::info!("reclamation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone, Utc};

    use crate::app::StoreBuilder;
    use crate::impls::InMemorySink;
    use crate::ports::FixedClock;

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_interval() {
        let sink = Arc::new(InMemorySink::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let store = StoreBuilder::new(sink.clone())
            .clock(clock.clone())
            .build()
            .unwrap();

        let mut source: &[u8] = b"x";
        store.put("a.txt", &mut source, Some(1)).await.unwrap();
        clock.advance(TimeDelta::minutes(1));

        let gc = GCLoop::spawn(store.clone(), Duration::from_secs(30));
        assert_eq!(sink.len(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(sink.is_empty());
        assert_eq!(store.stats().expired_unreclaimed, 0);
        gc.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_promptly() {
        let store = StoreBuilder::new(Arc::new(InMemorySink::new()))
            .build()
            .unwrap();
        let gc = GCLoop::spawn(store, Duration::from_secs(3600));

        tokio::time::timeout(Duration::from_secs(1), gc.shutdown_and_join())
            .await
            .unwrap();
    }
}
