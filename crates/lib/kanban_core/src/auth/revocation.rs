//! Revocation store: revoked access tokens and active refresh tokens.
//!
//! Both sets are keyed by [`Fingerprint`] and carry the token's own expiry.
//! Lookups ignore rows whose expiry has passed, so [`RevocationStore::gc`]
//! only reclaims space and can race freely with everything else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::AuthError;
use super::fingerprint::Fingerprint;

/// Rows removed by one garbage-collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub revoked: u64,
    pub refresh: u64,
}

/// Persistent revocation and refresh-token state.
///
/// Implementations must surface storage failures as errors; a failed
/// `is_revoked` must never read as "not revoked".
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark an access token as revoked until `expires_at`. Idempotent.
    async fn revoke(&self, fp: &Fingerprint, expires_at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Whether an unexpired revocation exists for this fingerprint.
    async fn is_revoked(&self, fp: &Fingerprint) -> Result<bool, AuthError>;

    /// Record a newly issued refresh token.
    async fn issue_refresh(
        &self,
        fp: &Fingerprint,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Atomically delete an unexpired refresh fingerprint, returning its
    /// user. Of two concurrent calls for one fingerprint at most one sees
    /// `Some`.
    async fn consume_refresh(&self, fp: &Fingerprint) -> Result<Option<Uuid>, AuthError>;

    /// Drop a refresh fingerprint without using it.
    async fn discard_refresh(&self, fp: &Fingerprint) -> Result<(), AuthError>;

    /// Drop every refresh fingerprint bound to a user.
    async fn discard_user_refresh(&self, user_id: Uuid) -> Result<u64, AuthError>;

    /// Delete expired rows from both sets.
    async fn gc(&self) -> Result<GcReport, AuthError>;
}

/// Shortest interval [`spawn_gc`] will sweep at.
pub const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

/// Run [`RevocationStore::gc`] every `every` until `cancel` fires.
///
/// Intervals below [`MIN_GC_INTERVAL`] are raised to it.
pub fn spawn_gc(
    store: Arc<dyn RevocationStore>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    if every < MIN_GC_INTERVAL {
        warn!(requested = ?every, using = ?MIN_GC_INTERVAL, "gc interval too short");
    }
    let every = every.max(MIN_GC_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match store.gc().await {
                    Ok(report) => debug!(
                        revoked = report.revoked,
                        refresh = report.refresh,
                        "revocation store gc pass"
                    ),
                    Err(e) => warn!(error = %e, "revocation store gc failed"),
                },
            }
        }
        debug!("revocation store gc stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryRevocationStore;

    #[tokio::test(start_paused = true)]
    async fn gc_task_collects_expired_rows_until_cancelled() {
        let store = Arc::new(MemoryRevocationStore::new());
        let past = Utc::now() - chrono::Duration::seconds(10);
        store.revoke(&Fingerprint::of("old"), past).await.unwrap();
        store
            .issue_refresh(&Fingerprint::of("stale"), Uuid::now_v7(), past)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_gc(store.clone(), Duration::from_secs(60), cancel.clone());

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.len(), (0, 0));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped_instead_of_panicking() {
        let store = Arc::new(MemoryRevocationStore::new());
        let past = Utc::now() - chrono::Duration::seconds(10);
        store.revoke(&Fingerprint::of("old"), past).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_gc(store.clone(), Duration::ZERO, cancel.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.len(), (0, 0));

        // Later rows are still swept on the clamped cadence.
        store.revoke(&Fingerprint::of("later"), past).await.unwrap();
        tokio::time::sleep(MIN_GC_INTERVAL * 2).await;
        assert_eq!(store.len(), (0, 0));

        cancel.cancel();
        handle.await.expect("gc task must not panic");
    }
}
