use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use httpmock::MockServer;
use poolmap::{
    AppConfig, AppServices, Catalog, HttpTransport, Reconciler, Store, StoreEvent, TickOutcome,
};
use serde_json::json;

async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn batches_follow_server_then_empty_on_failure() {
    let server = MockServer::start_async().await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method("GET").path("/batches");
            then.status(200).json_body(json!([{ "id": "b1" }]));
        })
        .await;

    // No trailing slash on purpose; the store normalizes it.
    let store = Arc::new(Store::new(Catalog::default(), Some(server.base_url())));
    let transport = HttpTransport::new(Duration::from_secs(10)).unwrap();
    let reconciler = Reconciler::new(Arc::clone(&store), Arc::new(transport));

    assert!(matches!(
        reconciler.tick().await,
        TickOutcome::Applied { count: 1, .. }
    ));
    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].id().map(|id| id.to_string()).as_deref(), Some("b1"));
    ok.assert_async().await;

    ok.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/batches");
            then.status(500);
        })
        .await;

    assert!(matches!(
        reconciler.tick().await,
        TickOutcome::Failed { .. }
    ));
    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn unreachable_server_leaves_batches_empty() {
    let store = Arc::new(Store::new(
        Catalog::default(),
        Some("http://127.0.0.1:9".into()),
    ));
    store.set_batches(vec![json!({ "id": "stale" }).into()]);
    let transport = HttpTransport::new(Duration::from_millis(500)).unwrap();
    let reconciler = Reconciler::new(Arc::clone(&store), Arc::new(transport));

    assert!(matches!(
        reconciler.tick().await,
        TickOutcome::Failed { .. }
    ));
    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn services_reconcile_periodically_and_notify() {
    let server = MockServer::start_async().await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method("GET").path("/batches");
            then.status(200)
                .json_body(json!([{ "batch_id": "b1", "name": "north", "is_working": true }]));
        })
        .await;

    let config = AppConfig {
        server: Some(format!("{}///", server.base_url())),
        reconcile_interval_ms: 100,
        ..AppConfig::default()
    };
    let services = AppServices::with_transport(
        &config,
        Catalog::default(),
        Arc::new(HttpTransport::new(Duration::from_secs(10)).unwrap()),
    );

    let replaced = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&replaced);
    services.store.subscribe(move |event: &StoreEvent| {
        if let StoreEvent::BatchesReplaced { .. } = event {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(wait_for(|| services.store.batches().len() == 1).await);
    assert!(services.store.batches()[0].is_working());

    // Identical snapshots do not re-notify.
    let mut polls = 0;
    while ok.hits_async().await < 3 && polls < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        polls += 1;
    }
    assert!(ok.hits_async().await >= 3);
    assert_eq!(replaced.load(Ordering::SeqCst), 1);

    ok.delete_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method("GET").path("/batches");
            then.status(503);
        })
        .await;
    assert!(wait_for(|| services.store.batches().is_empty()).await);
    let mut polls = 0;
    while failing.hits_async().await < 1 && polls < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        polls += 1;
    }
    assert!(failing.hits_async().await >= 1);
    assert!(services.store.batches().is_empty());
    assert_eq!(replaced.load(Ordering::SeqCst), 2);

    services.shutdown().await;
}
