use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::config::SessionConfig;
use crate::storage::DataStore;

use super::passthrough::SessionPassthrough;
use super::session::sweep_expired_sessions;

/// Periodically delete stale persistent sessions and idle transient ones.
///
/// Runs every `clean_frequency` seconds, starting immediately. Failures are
/// logged and the next sweep runs as scheduled.
pub fn spawn_session_sweeper(
    store: DataStore,
    sessions: SessionPassthrough,
    config: &SessionConfig,
) -> JoinHandle<()> {
    let frequency = config.clean_frequency();
    let lifetime = config.persistent_lifetime();
    tracing::info!(?frequency, ?lifetime, "Starting session sweeper");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frequency);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = sweep_expired_sessions(&store, lifetime).await {
                tracing::error!("Failed to sweep persistent sessions: {}", e);
            }
            let purged = sessions.purge_expired().await;
            tracing::debug!(purged, "Purged idle transient sessions");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::main::session::create_session;
    use crate::test_utils::{insert_test_user, memory_store, session_count};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweeper_removes_stale_sessions() {
        // Given one stale and one fresh persistent session
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        create_session(&store, "fresh", Some("alice")).await.unwrap();
        create_session(&store, "stale", Some("alice")).await.unwrap();
        sqlx::query("UPDATE sessions SET last_used = last_used - 7200 WHERE id = ?")
            .bind("stale")
            .execute(store.as_sqlite().unwrap())
            .await
            .unwrap();

        // When the sweeper runs its first pass
        let config = SessionConfig {
            persistent_lifetime: 3600,
            ..SessionConfig::default()
        };
        let sessions = SessionPassthrough::new(store.clone(), config.transient_lifetime());
        let handle = spawn_session_sweeper(store.clone(), sessions, &config);

        // Then only the stale row disappears
        let mut remaining = session_count(&store).await;
        for _ in 0..50 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = session_count(&store).await;
        }
        handle.abort();

        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_sweeper_survives_zero_clean_frequency() {
        // Given a stale persistent session and a zero clean frequency
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        create_session(&store, "stale", Some("alice")).await.unwrap();
        sqlx::query("UPDATE sessions SET last_used = last_used - 7200 WHERE id = ?")
            .bind("stale")
            .execute(store.as_sqlite().unwrap())
            .await
            .unwrap();
        let config = SessionConfig {
            persistent_lifetime: 3600,
            clean_frequency: 0,
            ..SessionConfig::default()
        };

        // When the sweeper starts
        let sessions = SessionPassthrough::new(store.clone(), config.transient_lifetime());
        let handle = spawn_session_sweeper(store.clone(), sessions, &config);

        // Then it still sweeps and keeps running
        let mut remaining = session_count(&store).await;
        for _ in 0..50 {
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = session_count(&store).await;
        }
        assert_eq!(remaining, 0);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
