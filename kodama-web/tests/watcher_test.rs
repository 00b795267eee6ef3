
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use fixture::FixtureBuilder;
use kodama_web::state::AppState;

/// Poll until the snapshot holds the expected node and instance counts
async fn wait_for_counts(state: &Arc<AppState>, nodes: usize, instances: usize) {
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let (n, i, _) = state.counts().await;
            if n == nodes && i == instances {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    assert!(
        result.is_ok(),
        "expected {nodes} nodes and {instances} instances, have {:?}",
        state.counts().await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watcher_reloads_on_rewritten_listing() {
    let fixture = FixtureBuilder::new()
        .add_node("n1", "ONLINE", 1, 4)
        .add_instance("a", "RUNNING", "n1", "eu-central")
        .write();
    let state = AppState::with_data_dir(&fixture.data_dir());
    state.reload().await;
    assert_eq!(state.counts().await, (1, 1, 0));

    let _watcher = kodama_web::start_file_watcher(state.clone())
        .unwrap()
        .expect("watcher for configured data dir");
    let mut rx = state.subscribe();

    let fixture = fixture
        .add_node("n2", "ONLINE", 0, 4)
        .add_instance("b", "STARTING", "n2", "eu-central")
        .write();

    wait_for_counts(&state, 2, 2).await;
    let update = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    assert!(update.is_ok(), "expected an update notification");
    drop(fixture);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watcher_creates_missing_data_dir() {
    let fixture = FixtureBuilder::new();
    let data_dir = fixture.data_dir().join("exports");
    assert!(!data_dir.exists());

    let state = AppState::with_data_dir(&data_dir);
    state.reload().await;
    assert_eq!(state.counts().await, (0, 0, 0));

    let _watcher = kodama_web::start_file_watcher(state.clone())
        .unwrap()
        .expect("watcher for configured data dir");
    assert!(data_dir.is_dir());

    let nodes = vec![FixtureBuilder::node_json("n1", "ONLINE", 0, 2)];
    fs::write(
        data_dir.join("nodes.json"),
        serde_json::to_string(&nodes).unwrap(),
    )
    .unwrap();

    wait_for_counts(&state, 1, 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watcher_keeps_snapshot_on_broken_listing() {
    let fixture = FixtureBuilder::new().add_node("n1", "ONLINE", 1, 4).write();
    let state = AppState::with_data_dir(&fixture.data_dir());

    let _watcher = kodama_web::start_file_watcher(state.clone())
        .unwrap()
        .expect("watcher for configured data dir");
    state.reload().await;
    assert_eq!(state.counts().await, (1, 0, 0));

    fs::write(fixture.data_dir().join("nodes.json"), "not json").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(state.counts().await, (1, 0, 0));

    let fixture = fixture.add_node("n2", "ONLINE", 0, 4).write();
    wait_for_counts(&state, 2, 0).await;
    drop(fixture);
}

#[tokio::test]
async fn test_watcher_without_data_dir_is_none() {
    let watcher = kodama_web::start_file_watcher(AppState::new()).unwrap();
    assert!(watcher.is_none());
}
