use std::{sync::Arc, time::Duration};

use httpmock::MockServer;
use poolmap::{
    BatchId, Catalog, Dispatcher, HttpTransport, NewBatch, RunOptions, Store, TransportError,
};
use serde_json::json;

fn dispatcher(server: Option<String>) -> (Arc<Store>, Dispatcher) {
    let store = Arc::new(Store::new(Catalog::default(), server));
    let transport = HttpTransport::new(Duration::from_secs(10)).unwrap();
    let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::new(transport));
    (store, dispatcher)
}

#[tokio::test]
async fn run_batch_posts_options_and_leaves_store_alone() {
    let server = MockServer::start_async().await;
    let run = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/batches/b-7/run")
                .json_body(json!({ "coverage": 0.005, "sleep_min": 0, "sleep_max": 3 }));
            then.status(200).json_body(json!([{ "id": "ignored" }]));
        })
        .await;

    let (store, dispatcher) = dispatcher(Some(format!("{}/", server.base_url())));
    let dispatch = dispatcher.run_batch(BatchId::from("b-7"), RunOptions::default());
    assert!(!dispatch.is_offline());
    assert!(matches!(dispatch.outcome().await, Some(Ok(()))));

    run.assert_async().await;
    // Command responses never reach the store.
    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn create_batch_failure_is_reported_through_the_handle() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method("POST").path("/batches");
            then.status(400);
        })
        .await;

    let (_, dispatcher) = dispatcher(Some(server.base_url()));
    let outcome = dispatcher
        .add_batch(NewBatch {
            name: "harbour".into(),
            width: 1000,
            height: 1000,
            zoom_level: 18,
            nodes: vec![[54.35, 18.65], [54.36, 18.66]],
        })
        .outcome()
        .await;

    create.assert_async().await;
    match outcome {
        Some(Err(TransportError::Status { status, .. })) => assert_eq!(status, 400),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn batch_ids_are_path_encoded() {
    let server = MockServer::start_async().await;
    let osm = server
        .mock_async(|when, then| {
            when.method("POST").path("/batches/a%2Fb/osm");
            then.status(204);
        })
        .await;

    let (_, dispatcher) = dispatcher(Some(server.base_url()));
    let outcome = dispatcher.trigger_osm(BatchId::from("a/b")).outcome().await;
    assert!(matches!(outcome, Some(Ok(()))));
    osm.assert_async().await;
}

#[tokio::test]
async fn offline_commands_and_lookups_are_noops() {
    let (_, dispatcher) = dispatcher(None);
    assert!(dispatcher.trigger_osm(BatchId::from("b1")).is_offline());
    assert!(dispatcher
        .run_batch(BatchId::from("b1"), RunOptions::default())
        .is_offline());
    assert!(dispatcher.polygon_pools(42).await.is_none());
}

#[tokio::test]
async fn polygon_pools_are_fetched_per_polygon() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/polygon/336075");
            then.status(200)
                .json_body(json!([{ "clean": false, "address": "Dluga 1" }]));
        })
        .await;

    let (store, dispatcher) = dispatcher(Some(server.base_url()));
    let pools = dispatcher.polygon_pools(336075).await.unwrap().unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].clean, Some(false));
    assert!(store.pools().is_empty());
}
