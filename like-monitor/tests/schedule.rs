//! Background loop behavior under paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::*;
use like_monitor::export::{CsvExportSink, ExportDir};
use like_monitor::monitor::{BatchVerifier, MonitorService};
use like_monitor::notification::NotificationService;
use like_monitor::scheduler::ScheduleLoop;

async fn start_loop(
    extra: &[(&str, serde_json::Value)],
) -> (Arc<FakeOrders>, Arc<like_monitor::config::ConfigService>, CancellationToken, tokio::task::JoinHandle<()>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = monitor_config(extra).await;
    let orders = FakeOrders::new(vec![]);
    let monitor = Arc::new(MonitorService::new(
        config.clone(),
        orders.clone(),
        BatchVerifier::new(
            FakeProvisioner::new(Provision::Credentials(1)),
            Arc::new(FakeFetcher::default()),
        ),
        Arc::new(CsvExportSink::new(ExportDir::Fixed(dir.path().to_path_buf()))),
        Arc::new(NotificationService::new()),
    ));
    let cancel = CancellationToken::new();
    let handle = Arc::new(ScheduleLoop::new(monitor, config.clone(), cancel.clone())).start();
    (orders, config, cancel, handle, dir)
}

#[tokio::test(start_paused = true)]
async fn test_active_loop_runs_a_pass_every_interval() {
    let (orders, _config, cancel, handle, _dir) =
        start_loop(&[("IS_AUTO_EXPORT", json!("1"))]).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(orders.query_count(), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(orders.query_count(), 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_idle_loop_wakes_when_flag_is_enabled() {
    let (orders, config, cancel, handle, _dir) =
        start_loop(&[("IS_AUTO_EXPORT", json!(false))]).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(orders.query_count(), 0);

    config.update_value("IS_AUTO_EXPORT", "true").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(orders.query_count(), 1);

    // Active again: the next pass waits for the full interval.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(orders.query_count(), 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_pass_does_not_stop_loop() {
    let (orders, config, cancel, handle, _dir) = start_loop(&[
        ("IS_AUTO_EXPORT", json!(true)),
        ("EXPORT_TIME_OFFSET", json!(-5)),
    ])
    .await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(orders.query_count(), 0);

    config.update_value("EXPORT_TIME_OFFSET", "60").await.unwrap();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(orders.query_count(), 1);
    assert!(!handle.is_finished());

    cancel.cancel();
    handle.await.unwrap();
}
