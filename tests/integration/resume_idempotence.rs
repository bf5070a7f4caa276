//! Resume behavior: restarting never re-fetches finished orders.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use printavo_exporter::checkpoint::{Checkpoint, CheckpointStore, Phase};
use printavo_exporter::ledger::ErrorLedger;
use printavo_exporter::order::AttachmentCounts;
use printavo_exporter::orchestrator::Orchestrator;
use printavo_exporter::interrupt::InterruptFlag;
use printavo_exporter::store::FsRecordStore;
use printavo_exporter::OrderKind;

use super::support::{test_config, test_scheduler, FakeOrder, ScriptedTransport};

fn build_orchestrator(dir: &std::path::Path, transport: Arc<ScriptedTransport>) -> Orchestrator {
    let config = test_config(dir);
    let scheduler = test_scheduler(transport, &config);
    let store = Arc::new(FsRecordStore::new(dir).unwrap());
    let checkpoint_store = CheckpointStore::new(dir.join("checkpoint.json"));
    let ledger = ErrorLedger::new(dir.join("errors.jsonl"));
    Orchestrator::new(scheduler, store, checkpoint_store, ledger, config)
}

fn sample_orders() -> (Vec<FakeOrder>, Vec<FakeOrder>) {
    (
        vec![
            FakeOrder::new("inv-104", 104),
            FakeOrder::new("inv-103", 103),
            FakeOrder::new("inv-102", 102),
        ],
        vec![FakeOrder::new("quo-9", 9)],
    )
}

#[tokio::test]
async fn test_restart_with_existing_records_skips_all_fetches() {
    let dir = tempfile::TempDir::new().unwrap();
    let (invoices, quotes) = sample_orders();

    let first = Arc::new(ScriptedTransport::new(invoices.clone(), quotes.clone()));
    build_orchestrator(dir.path(), first).run().await.unwrap();

    // Lose the checkpoint; the records themselves carry resume truth
    std::fs::remove_file(dir.path().join("checkpoint.json")).unwrap();

    let second = Arc::new(ScriptedTransport::new(invoices, quotes));
    let summary = build_orchestrator(dir.path(), second.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.orders_skipped, 4);
    // Listings are walked fresh each run; per-order queries are not issued
    assert_eq!(second.order_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.total_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resume_from_quote_phase_skips_invoice_catalog() {
    let dir = tempfile::TempDir::new().unwrap();
    let (invoices, quotes) = sample_orders();

    // Seed a checkpoint already past the invoice phase
    let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
    let mut checkpoint = Checkpoint::new();
    for order in &invoices {
        checkpoint.record_completed(
            OrderKind::Invoice,
            &order.visual_id.to_string(),
            AttachmentCounts::default(),
        );
    }
    checkpoint.advance_phase();
    assert_eq!(checkpoint.phase(), Phase::Quotes);
    store.save(&checkpoint).unwrap();

    let transport = Arc::new(ScriptedTransport::new(invoices, quotes));
    let summary = build_orchestrator(dir.path(), transport.clone())
        .run()
        .await
        .unwrap();

    // Quote was extracted; invoice listing was never requested
    assert_eq!(summary.quotes_completed, 1);
    assert!(dir.path().join("quotes").join("9.json").exists());
    assert!(!dir.path().join("invoices").join("104.json").exists());
    // 1 quote listing page + 3 sub-queries for the single quote
    assert_eq!(transport.total_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_completed_run_is_a_noop() {
    let dir = tempfile::TempDir::new().unwrap();
    let (invoices, quotes) = sample_orders();

    let first = Arc::new(ScriptedTransport::new(invoices.clone(), quotes.clone()));
    build_orchestrator(dir.path(), first).run().await.unwrap();

    // Checkpoint is Done; the second run issues no requests at all
    let second = Arc::new(ScriptedTransport::new(invoices, quotes));
    let summary = build_orchestrator(dir.path(), second.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total_completed(), 4);
    assert_eq!(second.total_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_interrupt_before_start_saves_checkpoint_and_skips_work() {
    let dir = tempfile::TempDir::new().unwrap();
    let (invoices, quotes) = sample_orders();
    let transport = Arc::new(ScriptedTransport::new(invoices, quotes));

    let interrupt = InterruptFlag::shared();
    interrupt.raise();

    let summary = build_orchestrator(dir.path(), transport.clone())
        .with_interrupt(interrupt)
        .run()
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.total_completed(), 0);
    // The catalog walk ran, but no order was fetched
    assert_eq!(transport.order_calls.load(Ordering::SeqCst), 0);
    // Interrupted runs never write a summary file
    assert!(!dir.path().join("summary.json").exists());
    // The checkpoint is on disk, still in the invoice phase
    let checkpoint = CheckpointStore::new(dir.path().join("checkpoint.json"))
        .load()
        .unwrap();
    assert_eq!(checkpoint.phase(), Phase::Invoices);
}
