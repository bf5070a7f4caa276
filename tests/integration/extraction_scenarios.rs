//! End-to-end extraction runs against the scripted backend.

use std::sync::Arc;

use printavo_exporter::checkpoint::{CheckpointStore, Phase};
use printavo_exporter::ledger::ErrorLedger;
use printavo_exporter::orchestrator::Orchestrator;
use printavo_exporter::store::FsRecordStore;
use printavo_exporter::{OrderKind, OrderRecord};

use super::support::{test_config, test_scheduler, FailureMode, FakeOrder, ScriptedTransport};

fn build_orchestrator(
    dir: &std::path::Path,
    transport: Arc<ScriptedTransport>,
) -> Orchestrator {
    let config = test_config(dir);
    let scheduler = test_scheduler(transport, &config);
    let store = Arc::new(FsRecordStore::new(dir).unwrap());
    let checkpoint_store = CheckpointStore::new(dir.join("checkpoint.json"));
    let ledger = ErrorLedger::new(dir.join("errors.jsonl"));
    Orchestrator::new(scheduler, store, checkpoint_store, ledger, config)
}

#[tokio::test]
async fn test_full_run_extracts_all_orders() {
    let dir = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            FakeOrder::new("inv-104", 104).with_attachments(2, 1, 3),
            FakeOrder::new("inv-103", 103),
            FakeOrder::new("inv-102", 102),
        ],
        vec![FakeOrder::new("quo-9", 9), FakeOrder::new("quo-8", 8)],
    ));

    let summary = build_orchestrator(dir.path(), transport.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.invoices_completed, 3);
    assert_eq!(summary.quotes_completed, 2);
    assert_eq!(summary.orders_failed, 0);
    assert!(!summary.interrupted);

    // One record per order, under the right partition
    for visual_id in ["104", "103", "102"] {
        assert!(dir.path().join("invoices").join(format!("{visual_id}.json")).exists());
    }
    for visual_id in ["9", "8"] {
        assert!(dir.path().join("quotes").join(format!("{visual_id}.json")).exists());
    }

    // Records carry the merged sub-documents
    let contents =
        std::fs::read_to_string(dir.path().join("invoices").join("104.json")).unwrap();
    let record: OrderRecord = serde_json::from_str(&contents).unwrap();
    assert_eq!(record.kind, OrderKind::Invoice);
    assert_eq!(record.internal_id, "inv-104");
    assert_eq!(record.header.nickname.as_deref(), Some("Job 104"));
    assert_eq!(record.line_item_groups.as_ref().unwrap().len(), 1);
    assert_eq!(record.attachment_counts.production_files, 2);
    assert_eq!(record.attachment_counts.line_item_mockups, 1);
    assert_eq!(record.attachment_counts.imprint_mockups, 3);

    // Run summary and final checkpoint are persisted
    assert!(dir.path().join("summary.json").exists());
    let checkpoint = CheckpointStore::new(dir.path().join("checkpoint.json"))
        .load()
        .unwrap();
    assert_eq!(checkpoint.phase(), Phase::Done);

    // Three sub-queries for each of the five orders, none repeated
    assert_eq!(transport.order_calls.load(std::sync::atomic::Ordering::SeqCst), 15);
}

#[tokio::test]
async fn test_persistent_failure_goes_to_ledger_and_run_continues() {
    let dir = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            FakeOrder::new("inv-104", 104),
            FakeOrder::new("inv-103", 103),
            FakeOrder::new("inv-102", 102),
        ],
        vec![],
    ));
    // 103's line item tree never comes back
    transport.fail("lineItems:inv-103", FailureMode::AlwaysTransient);

    let summary = build_orchestrator(dir.path(), transport)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.invoices_completed, 2);
    assert_eq!(summary.orders_failed, 1);

    // No partial record for the failed order
    assert!(dir.path().join("invoices").join("104.json").exists());
    assert!(!dir.path().join("invoices").join("103.json").exists());
    assert!(dir.path().join("invoices").join("102.json").exists());

    let entries = ErrorLedger::new(dir.path().join("errors.jsonl"))
        .read_all()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].visual_id, "103");
    assert_eq!(entries[0].internal_id, "inv-103");
    assert_eq!(entries[0].kind, OrderKind::Invoice);
    assert!(entries[0].message.contains("line item tree"));
}

#[tokio::test]
async fn test_deleted_order_between_listing_and_fetch() {
    let dir = tempfile::TempDir::new().unwrap();
    // The listing advertises an id the order queries resolve to null
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            FakeOrder::new("inv-51", 51),
            FakeOrder::new("inv-50", 50).deleted(),
        ],
        vec![],
    ));

    let summary = build_orchestrator(dir.path(), transport)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.invoices_completed, 1);
    assert_eq!(summary.orders_failed, 1);
    assert!(dir.path().join("invoices").join("51.json").exists());
    assert!(!dir.path().join("invoices").join("50.json").exists());

    let entries = ErrorLedger::new(dir.path().join("errors.jsonl"))
        .read_all()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].message.contains("no order"));
}

#[tokio::test]
async fn test_empty_account_completes_cleanly() {
    let dir = tempfile::TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));

    let summary = build_orchestrator(dir.path(), transport.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total_completed(), 0);
    assert_eq!(summary.orders_failed, 0);
    assert!(dir.path().join("summary.json").exists());
    // Only the two listing walks happened
    assert_eq!(transport.order_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(transport.total_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}
