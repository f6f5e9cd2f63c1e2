//! Verification, aggregation and export driven through fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::*;
use like_monitor::Error;
use like_monitor::export::{CSV_HEADERS, CsvExportSink, ExportDir, ExportFiles};
use like_monitor::monitor::{BatchVerifier, FetchOutcome, MonitorService, PassTrigger, aggregate};
use like_monitor::notification::{NotificationEvent, NotificationService};

fn link(n: usize) -> String {
    format!("https://v.douyin.com/{n}/")
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_stay_aligned_when_later_orders_finish_first() {
    let n = 8;
    let mut fetcher = FakeFetcher::default();
    for i in 0..n {
        fetcher.counts.insert(link(i), 100 + i as u64);
        fetcher
            .delays
            .insert(link(i), Duration::from_millis(((n - i) * 50) as u64));
    }
    let orders: Vec<_> = (0..n)
        .map(|i| order(i as i64, "点赞", &link(i), 100, 0))
        .collect();

    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(n)), Arc::new(fetcher));
    let outcomes = verifier.verify(&orders, 4).await;

    assert_eq!(outcomes.len(), n);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(*outcome, FetchOutcome::Resolved(100 + i as u64));
    }
}

#[tokio::test]
async fn test_empty_batch_provisions_nothing() {
    let fetcher = Arc::new(FakeFetcher::default());
    let provisioner = FakeProvisioner::new(Provision::Credentials(3));
    let verifier = BatchVerifier::new(provisioner.clone(), fetcher.clone());

    assert!(verifier.verify(&[], 10).await.is_empty());
    assert!(provisioner.requested.lock().is_empty());
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_never_exceed_workers() {
    let n = 20;
    let mut fetcher = FakeFetcher::default();
    for i in 0..n {
        fetcher.counts.insert(link(i), 500);
        fetcher
            .delays
            .insert(link(i), Duration::from_millis(10 + (i % 4) as u64 * 25));
    }
    let fetcher = Arc::new(fetcher);
    let orders: Vec<_> = (0..n)
        .map(|i| order(i as i64, "点赞", &link(i), 100, 0))
        .collect();

    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(n)), fetcher.clone());
    let outcomes = verifier.verify(&orders, 3).await;

    assert_eq!(outcomes, vec![FetchOutcome::Resolved(500); n]);
    assert_eq!(fetcher.call_count(), n);
    assert_eq!(fetcher.peak_in_flight(), 3);

    // Fewer orders than workers: the pool shrinks to the batch.
    let small = Arc::new(FakeFetcher::with_counts(&[(link(0).as_str(), 1), (link(1).as_str(), 1)]));
    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(2)), small.clone());
    verifier.verify(&orders[..2], 10).await;
    assert!(small.peak_in_flight() <= 2);
}

#[tokio::test]
async fn test_zero_credentials_fail_closed_without_fetching() {
    let fetcher = Arc::new(FakeFetcher::with_counts(&[]));
    let provisioner = FakeProvisioner::new(Provision::Credentials(0));
    let orders: Vec<_> = (0..5)
        .map(|i| order(i, "点赞", &link(i as usize), 10, 0))
        .collect();

    let verifier = BatchVerifier::new(provisioner.clone(), fetcher.clone());
    let outcomes = verifier.verify(&orders, 10).await;

    assert_eq!(outcomes, vec![FetchOutcome::Unresolved; 5]);
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(*provisioner.requested.lock(), vec![5]);
}

#[tokio::test]
async fn test_provisioning_error_fails_closed() {
    let fetcher = Arc::new(FakeFetcher::with_counts(&[("https://v.douyin.com/0/", 5)]));
    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Fail), fetcher.clone());

    let outcomes = verifier.verify(&[order(1, "点赞", "https://v.douyin.com/0/", 10, 0)], 10).await;
    assert_eq!(outcomes, vec![FetchOutcome::Unresolved]);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_retry_moves_to_next_candidate_proxy() {
    let mut fetcher = FakeFetcher::with_counts(&[("https://v.douyin.com/a/", 77)]);
    fetcher.broken_proxies = vec!["10.0.0.0".to_string(), "10.0.0.1".to_string()];
    let fetcher = Arc::new(fetcher);

    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(3)), fetcher.clone());
    let outcomes = verifier
        .verify(&[order(1, "点赞", "https://v.douyin.com/a/", 10, 0)], 1)
        .await;

    assert_eq!(outcomes, vec![FetchOutcome::Resolved(77)]);
    let hosts: Vec<_> = fetcher
        .attempts
        .lock()
        .iter()
        .map(|(_, host)| host.clone().unwrap())
        .collect();
    assert_eq!(hosts, vec!["10.0.0.0", "10.0.0.1", "10.0.0.2"]);
}

#[tokio::test]
async fn test_exhausted_retries_count_as_full_shortfall() {
    let fetcher = Arc::new(FakeFetcher::with_counts(&[]));
    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(1)), fetcher.clone());
    let orders = vec![order(1, "点赞", "https://v.douyin.com/gone/", 300, 20)];

    let outcomes = verifier.verify(&orders, 2).await;
    assert_eq!(outcomes, vec![FetchOutcome::Unresolved]);
    assert_eq!(fetcher.call_count(), 3);

    let groups = aggregate(&orders, &outcomes);
    let records = groups.get("点赞").unwrap();
    assert_eq!(records[0].shortfall, 300);
    assert_eq!(records[0].current_count, None);
}

#[tokio::test]
async fn test_only_short_orders_are_reported() {
    let fetcher = Arc::new(FakeFetcher::with_counts(&[
        ("https://v.douyin.com/A/", 80),
        ("https://v.douyin.com/B/", 70),
    ]));
    let orders = vec![
        order(1, "点赞", "https://v.douyin.com/A/", 100, 0),
        order(2, "点赞", "https://v.douyin.com/B/", 50, 10),
    ];

    let verifier = BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(2)), fetcher);
    let groups = aggregate(&orders, &verifier.verify(&orders, 10).await);

    assert_eq!(groups.record_count(), 1);
    let record = &groups.get("点赞").unwrap()[0];
    assert_eq!(record.order_id, 1);
    assert_eq!(record.shortfall, 20);
    assert_eq!(record.current_count, Some(80));
}

#[tokio::test]
async fn test_groups_keep_query_order() {
    let orders = vec![
        order(1, "点赞", "l1", 10, 0),
        order(2, "关注", "l2", 10, 0),
        order(3, "点赞", "l3", 10, 0),
        order(4, "", "l4", 10, 0),
    ];
    let groups = aggregate(&orders, &[FetchOutcome::Unresolved; 4]);

    let names: Vec<_> = groups.iter().map(|g| g.product_name.as_str()).collect();
    assert_eq!(names, vec!["点赞", "关注", "unknown"]);
    let ids: Vec<_> = groups.get("点赞").unwrap().iter().map(|r| r.order_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

fn monitor_service(
    config: Arc<like_monitor::config::ConfigService>,
    orders: Arc<FakeOrders>,
    fetcher: Arc<FakeFetcher>,
    export_dir: &std::path::Path,
    channel: Arc<RecordingChannel>,
) -> MonitorService {
    MonitorService::new(
        config,
        orders,
        BatchVerifier::new(FakeProvisioner::new(Provision::Credentials(4)), fetcher),
        Arc::new(CsvExportSink::new(ExportDir::Fixed(export_dir.to_path_buf()))),
        Arc::new(NotificationService::new().with_channel(channel)),
    )
}

#[tokio::test]
async fn test_run_pass_exports_one_file_per_product() {
    let dir = tempfile::tempdir().unwrap();
    let config = monitor_config(&[]).await;
    let orders = FakeOrders::new(vec![
        order(1, "点赞/快速", "https://v.douyin.com/A/", 100, 0),
        order(2, "点赞/快速", "https://v.douyin.com/B/", 50, 10),
        order(3, "关注", "https://v.douyin.com/C/", 40, 0),
    ]);
    let fetcher = Arc::new(FakeFetcher::with_counts(&[
        ("https://v.douyin.com/A/", 80),
        ("https://v.douyin.com/B/", 70),
    ]));
    let channel = Arc::new(RecordingChannel::default());
    let service = monitor_service(config, orders.clone(), fetcher, dir.path(), channel.clone());

    let report = service.run_pass(PassTrigger::OnDemand).await.unwrap();

    assert_eq!(report.orders, 3);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.deficient, 2);
    assert_eq!(report.files.len(), 2);
    assert!(report.failed_exports.is_empty());
    assert!(report.refunds.is_empty());
    assert!(report.files[0].ends_with("_点赞_快速.csv"));
    assert!(report.files[1].ends_with("_关注.csv"));

    let (ids, window) = orders.queries.lock()[0].clone();
    assert_eq!(ids, vec![42]);
    assert_eq!(window.end - window.start, 300);

    let files = ExportFiles::new(ExportDir::Fixed(dir.path().to_path_buf()));
    let table = files.read_table(&report.files[1]).await.unwrap();
    assert_eq!(table.headers, CSV_HEADERS.to_vec());
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][6], "40");
    assert_eq!(table.rows[0][10], "");

    let events = channel.events.lock();
    assert!(matches!(
        events.as_slice(),
        [NotificationEvent::PassCompleted { deficient_orders: 2, .. }]
    ));
}

#[tokio::test]
async fn test_run_pass_without_required_settings_fails_and_notifies_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(&[("EXPORT_TIME_OFFSET", json!(0))]).await;
    let orders = FakeOrders::new(vec![]);
    let channel = Arc::new(RecordingChannel::default());
    let service = monitor_service(
        config,
        orders.clone(),
        Arc::new(FakeFetcher::default()),
        dir.path(),
        channel.clone(),
    );

    let err = service.run_pass(PassTrigger::OnDemand).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(orders.query_count(), 0);
    assert!(matches!(
        channel.events.lock().as_slice(),
        [NotificationEvent::PassFailed { .. }]
    ));

    assert!(service.run_pass(PassTrigger::Scheduled).await.is_err());
    assert_eq!(channel.events.lock().len(), 1);
}
