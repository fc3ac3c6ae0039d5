//! Executor behavior against uncooperative endpoints.
//!
//! No live Leaf is needed: every call outcome, including a failed one,
//! produces exactly one row in the result log, which is the property these
//! tests pin down.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use loadtest::client::LeafClient;
use loadtest::collector::Collector;
use loadtest::config::{PhaseType, TestPhase};
use loadtest::executor::{ConstantExecutor, RampingExecutor};
use loadtest::payload::{DataProvider, EchoProvider};

fn echo_provider() -> Arc<DataProvider> {
    Arc::new(DataProvider::Echo(EchoProvider::new(64, 128, 1)))
}

fn phase(phase_type: PhaseType, duration: Duration, rps: (i64, i64, i64)) -> TestPhase {
    TestPhase {
        name: None,
        phase_type,
        image_tag: "hyperfaas-echo:latest".to_owned(),
        function_id: "function-1".to_owned(),
        start_time: Duration::ZERO,
        duration,
        start_rps: rps.0,
        end_rps: rps.1,
        step: rps.2,
    }
}

/// An address nothing listens on; calls fail fast with a refused connection.
fn unreachable_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    address.to_string()
}

fn read_rows(path: &std::path::Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|row| row.unwrap()).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn constant_phase_records_one_row_per_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let collector = Arc::new(Collector::new(&path).unwrap());
    let client = LeafClient::connect(&unreachable_address(), Duration::from_secs(5)).unwrap();

    let phase = phase(PhaseType::Constant, Duration::from_secs(3), (5, 0, 0));
    ConstantExecutor::new(client, Arc::clone(&collector), echo_provider())
        .execute(Instant::now() + Duration::from_secs(30), &phase)
        .await;
    collector.close();

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 15);
    for row in &rows {
        assert_eq!(row.len(), 14);
        assert_ne!(&row[4], "Ok");
        assert!(!row[5].is_empty());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ramping_phase_steps_the_rate_each_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let collector = Arc::new(Collector::new(&path).unwrap());
    let client = LeafClient::connect(&unreachable_address(), Duration::from_secs(5)).unwrap();

    // 1 + 2 + 3 calls over the three ticks.
    let phase = phase(PhaseType::Variable, Duration::from_secs(3), (1, 3, 1));
    RampingExecutor::new(client, Arc::clone(&collector), echo_provider())
        .execute(Instant::now() + Duration::from_secs(30), &phase)
        .await;
    collector.close();

    assert_eq!(read_rows(&path).len(), 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_leaf_turns_into_deadline_exceeded_rows() {
    // A listener that accepts connections and never speaks; calls hang until
    // the per-call deadline cuts them off.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let collector = Arc::new(Collector::new(&path).unwrap());
    let client = LeafClient::connect(&address, Duration::from_secs(1)).unwrap();

    let phase = phase(PhaseType::Constant, Duration::from_secs(2), (2, 0, 0));
    ConstantExecutor::new(client, Arc::clone(&collector), echo_provider())
        .execute(Instant::now() + Duration::from_secs(30), &phase)
        .await;
    collector.close();
    drop(listener);

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert_eq!(&row[4], "DeadlineExceeded");
        assert!(!row[5].is_empty());
        assert_eq!(&row[7], "0");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_deadline_means_zero_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let collector = Arc::new(Collector::new(&path).unwrap());
    let client = LeafClient::connect(&unreachable_address(), Duration::from_secs(5)).unwrap();

    let phase = phase(PhaseType::Constant, Duration::from_secs(3), (5, 0, 0));
    ConstantExecutor::new(client, Arc::clone(&collector), echo_provider())
        .execute(Instant::now(), &phase)
        .await;
    collector.close();

    assert!(read_rows(&path).is_empty());
}
