use chrono::{DateTime, TimeZone, Utc};
use forwarder_core::db::ForwardingAddressStore;
use forwarder_core::domain::{Completion, ForwardingAddress, ForwardingStatus};
use forwarder_core::services::CallbackNotifier;
use mockito::Matcher;
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let migrator = Migrator::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await
        .unwrap();
    migrator.run(&pool).await.unwrap();

    pool
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
}

async fn completed_record(
    store: &ForwardingAddressStore,
    input_address: &str,
    callback: &str,
) -> ForwardingAddress {
    let mut record = store
        .create("1Dest", input_address, callback, created_at())
        .await
        .unwrap();

    record
        .mark_completed(Completion {
            input_transaction_hash: "in-hash-1".to_string(),
            transaction_hash: Some("fwd-hash-1".to_string()),
            value: 250_000,
            fwd_miners_fee: 500,
            input_miners_fee: 450,
            signed_fwd_transaction: None,
            payee_addresses: None,
        })
        .unwrap();
    store
        .update_transition(&record, ForwardingStatus::Pending)
        .await
        .unwrap();

    record
}

#[tokio::test]
async fn test_delivers_and_marks_confirmed() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let record = completed_record(&store, "1Mock", &format!("{}/cb", server.url())).await;

    let mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("input_address".into(), "1Mock".into()),
            Matcher::UrlEncoded("value".into(), "250000".into()),
            Matcher::UrlEncoded("transaction_hash".into(), "fwd-hash-1".into()),
            Matcher::UrlEncoded("destination_address".into(), "1Dest".into()),
        ]))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.swept, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);

    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(fetched.is_confirmed_by_client);
    assert_eq!(fetched.confirm_callback_attempt, 1);
    assert_eq!(fetched.callback_number_of_errors, 0);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_acknowledgement_body_is_trimmed() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let record = completed_record(&store, "1Mock", &format!("{}/cb", server.url())).await;

    let _mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("ok\n")
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.delivered, 1);
    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(fetched.is_confirmed_by_client);
}

#[tokio::test]
async fn test_unacknowledged_body_counts_failure() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let record = completed_record(&store, "1Mock", &format!("{}/cb", server.url())).await;

    let _mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("thanks")
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 1);

    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(!fetched.is_confirmed_by_client);
    assert_eq!(fetched.confirm_callback_attempt, 1);
    assert_eq!(fetched.callback_number_of_errors, 1);
}

#[tokio::test]
async fn test_http_error_counts_failure() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let record = completed_record(&store, "1Mock", &format!("{}/cb", server.url())).await;

    let _mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("ok")
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.failed, 1);
    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(!fetched.is_confirmed_by_client);
}

#[tokio::test]
async fn test_invalid_stored_callback_counts_failure() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);

    // The store accepts what the boundary rejected; delivery must cope.
    let record = completed_record(&store, "1Mock", "not a url").await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.swept, 1);
    assert_eq!(report.failed, 1);

    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(!fetched.is_confirmed_by_client);
    assert_eq!(fetched.callback_number_of_errors, 1);
}

#[tokio::test]
async fn test_pending_records_are_not_swept() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    store
        .create("1Dest", "1Pending", &format!("{}/cb", server.url()), created_at())
        .await
        .unwrap();

    let mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store, 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.swept, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_rebuilds_url_from_current_state() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let record = completed_record(&store, "1Mock", &format!("{}/cb", server.url())).await;

    let rejected = server
        .mock("GET", "/cb")
        .match_query(Matcher::UrlEncoded("confirmations".into(), "0".into()))
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();
    assert_eq!(report.failed, 1);

    // The monitor keeps counting confirmations; the next attempt must carry
    // the fresh count.
    store.set_confirmations(record.id, 3).await.unwrap();

    let acknowledged = server
        .mock("GET", "/cb")
        .match_query(Matcher::UrlEncoded("confirmations".into(), "3".into()))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let report = notifier.run_once().await.unwrap();
    assert_eq!(report.delivered, 1);

    let fetched = store.get_by_id(record.id).await.unwrap().unwrap();
    assert!(fetched.is_confirmed_by_client);
    assert_eq!(fetched.confirm_callback_attempt, 2);
    assert_eq!(fetched.callback_number_of_errors, 1);

    rejected.assert_async().await;
    acknowledged.assert_async().await;
}

#[tokio::test]
async fn test_one_bad_record_does_not_block_batch() {
    let pool = setup_test_db().await;
    let store = ForwardingAddressStore::new(pool);
    let mut server = mockito::Server::new_async().await;

    let broken = completed_record(&store, "1Broken", "not a url").await;
    let healthy = completed_record(&store, "1Healthy", &format!("{}/cb", server.url())).await;

    let _mock = server
        .mock("GET", "/cb")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let notifier = CallbackNotifier::new(store.clone(), 1, 5);
    let report = notifier.run_once().await.unwrap();

    assert_eq!(report.swept, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);

    let broken = store.get_by_id(broken.id).await.unwrap().unwrap();
    assert!(!broken.is_confirmed_by_client);
    let healthy = store.get_by_id(healthy.id).await.unwrap().unwrap();
    assert!(healthy.is_confirmed_by_client);
}
