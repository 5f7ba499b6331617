use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::store::Store;

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Compact the store's WAL whenever more than `threshold` records have
/// been appended since the last compaction.
pub async fn run_compactor(store: Arc<Store>, threshold: u64) {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        interval.tick().await;
        maybe_compact(&store, threshold).await;
    }
}

/// One compactor pass. Returns whether a compaction ran.
pub async fn maybe_compact(store: &Store, threshold: u64) -> bool {
    let appends = store.appends_since_compact().await;
    if appends <= threshold {
        return false;
    }
    match store.compact().await {
        Ok(()) => {
            info!("compacted WAL after {appends} appends");
            true
        }
        Err(e) => {
            warn!("WAL compaction failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRoom;
    use std::path::PathBuf;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roombook_test_compactor");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn compacts_only_past_threshold() {
        let store = Store::open(&test_wal_path("threshold.wal")).unwrap();
        for i in 0..3 {
            store
                .insert_room(NewRoom {
                    name: format!("Room {i}"),
                    capacity: None,
                    is_active: true,
                    display_order: i,
                })
                .await
                .unwrap();
        }

        assert!(!maybe_compact(&store, 3).await);
        assert_eq!(store.appends_since_compact().await, 3);

        assert!(maybe_compact(&store, 2).await);
        assert_eq!(store.appends_since_compact().await, 0);
        assert_eq!(store.list_rooms(false).await.len(), 3);
    }
}
