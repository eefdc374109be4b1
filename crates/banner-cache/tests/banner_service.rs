//! End-to-end behaviour of `BannerService` over the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use banner_cache::cache::LocalCacheBackend;
use banner_cache::{AppConfig, BannerError, BannerService, BannerServiceBuilder, ListenerExit};
use banner_db_memory::InMemoryBannerStorage;
use banner_storage::{BannerPatch, BannerQuery, NewBanner};
use common::wait_until;
use tokio_util::sync::CancellationToken;

async fn service_on(
    bus: &LocalCacheBackend,
) -> (BannerService<InMemoryBannerStorage>, Arc<InMemoryBannerStorage>) {
    let storage = Arc::new(InMemoryBannerStorage::new());
    let service = BannerServiceBuilder::new()
        .with_backend(Arc::new(bus.clone()))
        .build(Arc::clone(&storage))
        .await
        .expect("build service");
    (service, storage)
}

#[tokio::test]
async fn builder_without_redis_uses_local_backend() {
    let storage = Arc::new(InMemoryBannerStorage::new());
    let service = BannerServiceBuilder::new()
        .with_config(AppConfig::default())
        .build(storage)
        .await
        .expect("build service");

    assert_eq!(service.backend().backend_name(), "local");
    let id = service
        .create(NewBanner::new("hello", 42, vec![7]))
        .await
        .unwrap();
    assert_eq!(service.lookup(42, 7, false).await.unwrap().id, id);
}

#[tokio::test]
async fn lookup_maps_storage_errors() {
    let bus = LocalCacheBackend::new();
    let (service, _storage) = service_on(&bus).await;

    assert!(matches!(
        service.lookup(99, 1, false).await,
        Err(BannerError::NotFound)
    ));

    service
        .create(NewBanner::new("first", 1, vec![1, 2]))
        .await
        .unwrap();
    assert!(matches!(
        service.create(NewBanner::new("second", 1, vec![2])).await,
        Err(BannerError::AlreadyExists)
    ));
    assert!(matches!(
        service.create(NewBanner::new("untagged", 1, vec![])).await,
        Err(BannerError::Invalid(_))
    ));
    assert!(matches!(
        service.update(404, BannerPatch::default()).await,
        Err(BannerError::NotFound)
    ));
    assert!(matches!(
        service.delete_by_id(404).await,
        Err(BannerError::NotFound)
    ));
}

#[tokio::test]
async fn inactive_banner_is_hidden_from_users() {
    let bus = LocalCacheBackend::new();
    let (service, _storage) = service_on(&bus).await;
    service
        .create(NewBanner::new("draft", 3, vec![3]).with_active(false))
        .await
        .unwrap();

    let banner = service.lookup(3, 3, false).await.unwrap();
    assert!(!banner.is_active);
    assert!(matches!(
        service.lookup_for_user(3, 3, false).await,
        Err(BannerError::NotActive)
    ));
    assert!(matches!(
        service.lookup_for_user(3, 3, true).await,
        Err(BannerError::NotActive)
    ));
}

#[tokio::test]
async fn listing_reflects_writes_immediately() {
    let bus = LocalCacheBackend::new();
    let (service, _storage) = service_on(&bus).await;
    for tag in 1..=3 {
        service
            .create(NewBanner::new(format!("banner {tag}"), 5, vec![tag]))
            .await
            .unwrap();
    }

    let query = BannerQuery::new().with_feature(5).with_limit(2);
    assert_eq!(service.list_by_feature_tag(&query).await.unwrap().len(), 2);

    service
        .create(NewBanner::new("banner 4", 5, vec![4]))
        .await
        .unwrap();
    let all = BannerQuery::new().with_feature(5);
    assert_eq!(service.list_by_feature_tag(&all).await.unwrap().len(), 4);
}

#[tokio::test]
async fn delete_request_propagates_to_peer_instances() {
    let bus = LocalCacheBackend::new();
    let (first, first_storage) = service_on(&bus).await;
    let (second, second_storage) = service_on(&bus).await;
    for service in [&first, &second] {
        service
            .create(NewBanner::new("doomed", 42, vec![7]))
            .await
            .unwrap();
    }

    first.request_delete_by_feature_tag(42, 7).await.unwrap();

    for storage in [&first_storage, &second_storage] {
        let deleted = wait_until(Duration::from_secs(2), || async { storage.is_empty().await }).await;
        assert!(deleted);
    }
    assert!(matches!(
        second.lookup(42, 7, true).await,
        Err(BannerError::NotFound)
    ));
}

#[tokio::test]
async fn shutdown_stops_delete_listener() {
    let bus = LocalCacheBackend::new();
    let outer = CancellationToken::new();
    let service = BannerServiceBuilder::new()
        .with_backend(Arc::new(bus.clone()))
        .with_shutdown(outer.child_token())
        .build(Arc::new(InMemoryBannerStorage::new()))
        .await
        .unwrap();

    outer.cancel();
    let exit = tokio::time::timeout(Duration::from_secs(2), service.listener_stopped())
        .await
        .expect("listener should stop");
    assert_eq!(exit, ListenerExit::Cancelled);

    let other = BannerServiceBuilder::new()
        .with_backend(Arc::new(bus))
        .build(Arc::new(InMemoryBannerStorage::new()))
        .await
        .unwrap();
    other.shutdown();
    assert_eq!(other.listener_stopped().await, ListenerExit::Cancelled);
}
