//! Integration tests for the URL and visit stores
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests (needs DATABASE_URL)
//! - By default, both backends are tested; PostgreSQL is skipped without DATABASE_URL

use tinylink::models::{GeoInfo, NewUrl, UserAgentInfo, VisitRecord};
use tinylink::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true,
    }
}

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create PostgreSQL test storage
async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    if !db_url.starts_with("postgres") {
        return None;
    }
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

/// Codes unique per test run so PostgreSQL tests can share a database
fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

fn new_url(short_code: &str, manage_code: &str, session_id: &str, created_at: i64) -> NewUrl {
    NewUrl {
        short_code: short_code.to_string(),
        manage_code: manage_code.to_string(),
        original_url: format!("http://example.com/{}", short_code),
        session_id: session_id.to_string(),
        delete_after_minutes: None,
        created_at,
    }
}

fn visit(short_code: &str, country_code: &str, occurred_at: i64) -> VisitRecord {
    VisitRecord {
        short_code: short_code.to_string(),
        geo: GeoInfo {
            country: "Somewhere".to_string(),
            country_code: country_code.to_string(),
            city: "Town".to_string(),
            region: "Region".to_string(),
            ip: "203.0.113.5".to_string(),
        },
        referer: "https://news.example/".to_string(),
        user_agent: UserAgentInfo {
            browser: "Firefox".to_string(),
            os: "Linux".to_string(),
        },
        occurred_at,
    }
}

async fn check_create_and_lookup(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let manage = unique("m");
    let mut url = new_url(&short, &manage, "owner", 1_000);
    url.delete_after_minutes = Some(15);

    let created = storage.create(&url).await.unwrap();
    assert_eq!(created.short_code, short);
    assert_eq!(created.manage_code, manage);
    assert_eq!(created.session_id, "owner");
    assert_eq!(created.delete_after_minutes, Some(15));
    assert_eq!(created.created_at, 1_000);

    let by_short = storage.get_by_short_code(&short).await.unwrap();
    assert_eq!(by_short.id, created.id);

    let by_manage = storage.get_by_manage_code(&manage).await.unwrap();
    assert_eq!(by_manage.id, created.id);

    // The two keys are not interchangeable
    assert!(matches!(
        storage.get_by_short_code(&manage).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage.get_by_manage_code(&short).await,
        Err(StorageError::NotFound)
    ));
}

async fn check_duplicate_codes_conflict(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let manage = unique("m");
    storage
        .create(&new_url(&short, &manage, "owner", 1))
        .await
        .unwrap();

    let same_short = storage
        .create(&new_url(&short, &unique("m"), "owner", 2))
        .await;
    assert!(matches!(same_short, Err(StorageError::Conflict)));

    let same_manage = storage
        .create(&new_url(&unique("s"), &manage, "owner", 3))
        .await;
    assert!(matches!(same_manage, Err(StorageError::Conflict)));
}

async fn check_delete_is_owner_scoped(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let manage = unique("m");
    storage
        .create(&new_url(&short, &manage, "owner", 1))
        .await
        .unwrap();

    let wrong_owner = storage.delete(&manage, "intruder").await;
    assert!(matches!(wrong_owner, Err(StorageError::NotFound)));
    assert!(storage.get_by_short_code(&short).await.is_ok());

    let deleted = storage.delete(&manage, "owner").await.unwrap();
    assert_eq!(deleted.short_code, short);
    assert!(matches!(
        storage.get_by_short_code(&short).await,
        Err(StorageError::NotFound)
    ));

    let again = storage.delete(&manage, "owner").await;
    assert!(matches!(again, Err(StorageError::NotFound)));
}

async fn check_list_by_session(storage: Arc<dyn Storage>) {
    let session = unique("session");
    let mut shorts = Vec::new();

    for i in 0..5 {
        let short = unique("s");
        storage
            .create(&new_url(&short, &unique("m"), &session, 1_000 + i))
            .await
            .unwrap();
        shorts.push(short);
    }

    // Same timestamp as the newest link; insertion order breaks the tie
    let tie = unique("s");
    storage
        .create(&new_url(&tie, &unique("m"), &session, 1_004))
        .await
        .unwrap();

    storage
        .create(&new_url(&unique("s"), &unique("m"), "someone-else", 5_000))
        .await
        .unwrap();

    for i in 0..3 {
        storage.record_visit(&visit(&shorts[4], "us", i)).await.unwrap();
    }
    storage.record_visit(&visit(&shorts[0], "fr", 10)).await.unwrap();

    let all = storage.list_by_session(&session, 25).await.unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].short_code, tie);
    assert_eq!(all[1].short_code, shorts[4]);
    assert_eq!(all[5].short_code, shorts[0]);
    assert!(all
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));

    assert_eq!(all[0].total_visits, 0);
    assert_eq!(all[1].total_visits, 3);
    assert_eq!(all[5].total_visits, 1);

    let limited = storage.list_by_session(&session, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].short_code, tie);
    assert_eq!(limited[1].short_code, shorts[4]);

    let none = storage.list_by_session(&unique("nobody"), 25).await.unwrap();
    assert!(none.is_empty());
}

async fn check_visit_store(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let other = unique("s");
    for code in [&short, &other] {
        storage
            .create(&new_url(code, &unique("m"), "owner", 1))
            .await
            .unwrap();
    }

    storage.record_visit(&visit(&short, "us", 100)).await.unwrap();
    storage.record_visit(&visit(&short, "fr", 300)).await.unwrap();
    storage.record_visit(&visit(&short, "de", 200)).await.unwrap();
    storage.record_visit(&visit(&other, "jp", 50)).await.unwrap();

    let all = storage.get_all_for(&short).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|v| v.short_code == short));
    assert!(all.contains(&visit(&short, "fr", 300)));

    assert_eq!(storage.count_for(&short).await.unwrap(), 3);

    let recent = storage.get_recent_for(&short, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].occurred_at, 300);
    assert_eq!(recent[1].occurred_at, 200);

    assert_eq!(storage.delete_all_for(&short).await.unwrap(), 3);
    assert!(storage.get_all_for(&short).await.unwrap().is_empty());

    // Idempotent
    assert_eq!(storage.delete_all_for(&short).await.unwrap(), 0);

    // Other links untouched
    assert_eq!(storage.count_for(&other).await.unwrap(), 1);
}

async fn check_visit_requires_live_link(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let manage = unique("m");

    let missing = storage.record_visit(&visit(&short, "us", 1)).await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
    assert_eq!(storage.count_for(&short).await.unwrap(), 0);

    storage
        .create(&new_url(&short, &manage, "owner", 1))
        .await
        .unwrap();
    storage.record_visit(&visit(&short, "us", 2)).await.unwrap();

    storage.delete(&manage, "owner").await.unwrap();
    storage.delete_all_for(&short).await.unwrap();

    // A capture landing after the cascade leaves nothing behind
    let late = storage.record_visit(&visit(&short, "fr", 3)).await;
    assert!(matches!(late, Err(StorageError::NotFound)));
    assert!(storage.get_all_for(&short).await.unwrap().is_empty());
}

async fn check_list_expirable(storage: Arc<dyn Storage>) {
    let forever = unique("s");
    let zero = unique("s");
    let expiring = unique("s");

    storage
        .create(&new_url(&forever, &unique("m"), "owner", 1))
        .await
        .unwrap();

    let mut url = new_url(&zero, &unique("m"), "owner", 1);
    url.delete_after_minutes = Some(0);
    storage.create(&url).await.unwrap();

    let mut url = new_url(&expiring, &unique("m"), "owner", 1);
    url.delete_after_minutes = Some(5);
    storage.create(&url).await.unwrap();

    let candidates = storage.list_expirable().await.unwrap();
    assert!(candidates.iter().any(|u| u.short_code == expiring));
    assert!(!candidates.iter().any(|u| u.short_code == forever));
    assert!(!candidates.iter().any(|u| u.short_code == zero));
}

async fn check_concurrent_creation_conflicts(storage: Arc<dyn Storage>) {
    let short = unique("s");
    let mut handles = vec![];

    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        let short = short.clone();
        let handle = tokio::spawn(async move {
            storage_clone
                .create(&new_url(&short, &unique("m"), &format!("user{}", i), i))
                .await
        });
        handles.push(handle);
    }

    // Exactly one should succeed, others should get Conflict error
    let mut success_count = 0;
    let mut conflict_count = 0;

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one creation should succeed");
    assert_eq!(conflict_count, 9, "All others should get conflict");
}

macro_rules! backend_tests {
    ($($name:ident => $check:ident),* $(,)?) => {
        mod sqlite {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    if !should_test_backend("sqlite") {
                        return;
                    }
                    $check(create_sqlite_storage().await).await;
                }
            )*
        }

        mod postgres {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    if !should_test_backend("postgres") {
                        return;
                    }
                    let Some(storage) = create_postgres_storage().await else {
                        return;
                    };
                    $check(storage).await;
                }
            )*
        }
    };
}

backend_tests! {
    test_create_and_lookup => check_create_and_lookup,
    test_duplicate_codes_conflict => check_duplicate_codes_conflict,
    test_delete_is_owner_scoped => check_delete_is_owner_scoped,
    test_list_by_session => check_list_by_session,
    test_visit_store => check_visit_store,
    test_visit_requires_live_link => check_visit_requires_live_link,
    test_list_expirable => check_list_expirable,
    test_concurrent_creation_conflicts => check_concurrent_creation_conflicts,
}
