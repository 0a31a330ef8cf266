//! Integration tests for the host registry service
//!
//! Exercises the registry consistency rules over real documents in a
//! temporary data directory: user bootstrap, global host uniqueness,
//! removal semantics, pagination windows, and artifact content.

use growhost_engine::errors::BotError;
use growhost_engine::hosts;
use growhost_engine::service::HostService;
use tempfile::TempDir;

async fn service(dir: &TempDir) -> HostService {
    HostService::open(dir.path().join("users.json"), dir.path().join("hosts"))
        .await
        .expect("service should open")
}

#[tokio::test]
async fn test_ensure_user_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    assert!(!service.user_exists("akio").await);

    let created = service.ensure_user("akio", 42).await.unwrap();
    assert!(created);
    assert!(service.user_exists("akio").await);
    assert!(service.hosts_page("akio", 0).await.is_empty());
    assert_eq!(service.total_pages("akio").await, 0);

    // Idempotent
    let created = service.ensure_user("akio", 42).await.unwrap();
    assert!(!created);
}

#[tokio::test]
async fn test_create_host_and_global_uniqueness() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    service.ensure_user("alice", 1).await.unwrap();
    service.ensure_user("bob", 2).await.unwrap();

    service.create_host("alice", "My-Host", "1.2.3.4").await.unwrap();

    assert!(service.host_exists("My-Host").await);
    assert!(service.user_owns_host("alice", "My-Host").await);

    // The same name is taken for every other user, regardless of casing
    let err = service.create_host("bob", "my-host", "5.6.7.8").await.unwrap_err();
    assert!(matches!(err, BotError::HostAlreadyExists(_)));

    // And for the owner too
    let err = service.create_host("alice", "My-Host", "9.9.9.9").await.unwrap_err();
    assert!(matches!(err, BotError::HostAlreadyExists(_)));
}

#[tokio::test]
async fn test_artifact_content_matches_template() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    service.ensure_user("alice", 1).await.unwrap();
    service.create_host("alice", "My-Host", "1.2.3.4").await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("hosts").join("my-host.txt")).unwrap();
    assert_eq!(content, hosts::generate_host_data("1.2.3.4"));
    assert_eq!(content.lines().count(), 5);
    for line in content.lines() {
        assert!(line.starts_with("1.2.3.4 "));
    }
    assert!(content.ends_with("1.2.3.4 YoruAkio"));
}

#[tokio::test]
async fn test_remove_host_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    service.ensure_user("alice", 1).await.unwrap();
    service.create_host("alice", "demo", "1.2.3.4").await.unwrap();

    service.remove_host("alice", "demo").await.unwrap();
    assert!(!service.host_exists("demo").await);
    assert!(!service.user_owns_host("alice", "demo").await);

    // Removing again fails: the artifact is gone
    let err = service.remove_host("alice", "demo").await.unwrap_err();
    assert!(matches!(err, BotError::HostNotFound(_)));
}

#[tokio::test]
async fn test_remove_deletes_orphaned_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    service.ensure_user("alice", 1).await.unwrap();

    // Artifact exists but no list references it (e.g. a stale flow)
    std::fs::write(
        dir.path().join("hosts").join("orphan.txt"),
        hosts::generate_host_data("1.1.1.1"),
    )
    .unwrap();

    assert!(service.host_exists("orphan").await);
    service.remove_host("alice", "orphan").await.unwrap();
    assert!(!service.host_exists("orphan").await);
}

#[tokio::test]
async fn test_pagination_windows() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    service.ensure_user("alice", 1).await.unwrap();
    for i in 0..12 {
        service
            .create_host("alice", &format!("host{}", i), "1.2.3.4")
            .await
            .unwrap();
    }

    assert_eq!(service.total_pages("alice").await, 3);
    assert_eq!(service.hosts_page("alice", 0).await.len(), 5);
    assert_eq!(service.hosts_page("alice", 2).await.len(), 2);
    assert!(service.hosts_page("alice", 3).await.is_empty());

    // Insertion order is display order
    assert_eq!(service.hosts_page("alice", 0).await[0], "host0");
    assert_eq!(service.hosts_page("alice", 2).await[1], "host11");
}

#[tokio::test]
async fn test_unknown_user_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir).await;

    assert!(!service.user_owns_host("ghost", "anything").await);
    assert_eq!(service.total_pages("ghost").await, 0);
    assert!(service.hosts_page("ghost", 0).await.is_empty());
}

#[tokio::test]
async fn test_registry_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let service = service(&dir).await;
        service.ensure_user("alice", 7).await.unwrap();
        service.create_host("alice", "My-Host", "1.2.3.4").await.unwrap();
    }

    let reopened = service(&dir).await;
    assert!(reopened.user_exists("alice").await);
    assert!(reopened.user_owns_host("alice", "My-Host").await);
    assert!(reopened.host_exists("my-host").await);

    // Persisted document uses the external layout
    let raw = std::fs::read_to_string(dir.path().join("users.json")).unwrap();
    assert!(raw.contains("\"chatId\": 7"));
    assert!(raw.contains("\"hostList\""));
    assert!(raw.contains("\"My-Host\""));
}
