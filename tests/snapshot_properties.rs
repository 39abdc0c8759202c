//! Property tests for snapshot fidelity.

mod common;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use common::{sqlite_store, strict_repository, CountingStore, RecordingPublisher};
use flagstate::adapters::cache::MokaSnapshotCache;
use flagstate::domain::models::{FeatureFlag, NewFeatureFlag};
use flagstate::domain::ports::SnapshotCache;
use flagstate::services::{decode_snapshot, encode_snapshot, RepositorySettings};

fn flag_strategy() -> impl Strategy<Value = FeatureFlag> {
    (
        1i64..1_000_000,
        "[a-zA-Z][a-zA-Z0-9_. -]{0,40}",
        any::<bool>(),
        0i64..4_102_444_800,
        0u32..1_000_000_000,
    )
        .prop_map(|(id, name, enabled, secs, nanos)| FeatureFlag {
            id,
            name,
            enabled,
            created_at: DateTime::<Utc>::from_timestamp(secs, nanos).unwrap_or_default(),
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_snapshot_decodes_to_original(flags in prop::collection::vec(flag_strategy(), 0..20)) {
        let bytes = encode_snapshot(&flags).unwrap();
        prop_assert_eq!(decode_snapshot(&bytes).unwrap(), flags);
    }

    #[test]
    fn prop_cache_hit_returns_snapshot_without_store_query(
        flags in prop::collection::vec(flag_strategy(), 0..20)
    ) {
        let (served, selects) = runtime().block_on(async {
            let store = CountingStore::new(sqlite_store().await);
            let cache = Arc::new(MokaSnapshotCache::new());
            let settings = RepositorySettings::default();
            let encoded = encode_snapshot(&flags).unwrap();
            cache
                .set(&settings.snapshot_key, encoded, Duration::from_secs(60))
                .await
                .unwrap();

            let repo = strict_repository(store.clone(), cache, RecordingPublisher::new(), settings);
            (repo.get_all().await.unwrap(), store.selects())
        });

        prop_assert_eq!(served, flags);
        prop_assert_eq!(selects, 0);
    }

    #[test]
    fn prop_miss_returns_store_contents_and_caches_them(
        specs in prop::collection::vec(("[a-z][a-z0-9-]{0,20}", any::<bool>()), 0..10)
    ) {
        let (served, cached, rows) = runtime().block_on(async {
            let store = CountingStore::new(sqlite_store().await);
            let cache = Arc::new(MokaSnapshotCache::new());
            let settings = RepositorySettings::default();
            let key = settings.snapshot_key.clone();
            let repo = strict_repository(
                store.clone(),
                cache.clone(),
                RecordingPublisher::new(),
                settings,
            );

            for (name, enabled) in &specs {
                repo.create(NewFeatureFlag::new(name.clone(), *enabled)).await.unwrap();
            }

            let served = repo.get_all().await.unwrap();
            let cached = decode_snapshot(&cache.get(&key).await.unwrap().unwrap()).unwrap();
            let rows = flagstate::FlagStore::select_all(store.as_ref()).await.unwrap();
            (served, cached, rows)
        });

        prop_assert_eq!(&served, &rows);
        prop_assert_eq!(&cached, &rows);
        prop_assert_eq!(served.len(), specs.len());
    }
}
