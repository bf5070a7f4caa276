//! On-disk record format contract.
//!
//! Downstream consumers read these JSON files directly, so the field names
//! and shapes are part of the public surface.

use serde_json::{json, Value};

use printavo_exporter::fetch::OrderParts;
use printavo_exporter::merge::merge_order;
use printavo_exporter::OrderKind;

fn sample_record_json() -> Value {
    let parts = OrderParts {
        header: serde_json::from_value(json!({
            "id": "inv-104",
            "visualId": 104,
            "nickname": "Spring run",
            "total": 480.00,
            "amountPaid": 480.00
        }))
        .unwrap(),
        line_items: serde_json::from_value(json!({
            "id": "inv-104",
            "lineItemGroups": { "nodes": [ { "id": "grp-1", "position": 1 } ] }
        }))
        .unwrap(),
        files: serde_json::from_value(json!({
            "id": "inv-104",
            "productionFiles": { "nodes": [ { "id": "pf-1", "fileName": "art.pdf" } ] },
            "fees": { "nodes": [] }
        }))
        .unwrap(),
    };
    let record = merge_order(OrderKind::Invoice, parts).unwrap();
    serde_json::to_value(&record).unwrap()
}

#[test]
fn test_record_top_level_fields_are_camel_case() {
    let value = sample_record_json();
    let obj = value.as_object().unwrap();

    for field in [
        "kind",
        "internalId",
        "visualId",
        "extractedAt",
        "header",
        "lineItemGroups",
        "productionFiles",
        "attachmentCounts",
    ] {
        assert!(obj.contains_key(field), "missing field: {field}");
    }
}

#[test]
fn test_record_kind_serializes_as_snake_case_token() {
    let value = sample_record_json();
    assert_eq!(value["kind"], json!("invoice"));
}

#[test]
fn test_record_ids_and_counts() {
    let value = sample_record_json();
    assert_eq!(value["internalId"], json!("inv-104"));
    assert_eq!(value["visualId"], json!("104"));
    assert_eq!(value["attachmentCounts"]["productionFiles"], json!(1));
    assert_eq!(value["attachmentCounts"]["lineItemMockups"], json!(0));
}

#[test]
fn test_absent_collections_serialize_as_null_not_empty() {
    let value = sample_record_json();
    // fees was present-but-empty; expenses never arrived
    assert!(value["fees"].is_object());
    assert!(value["expenses"].is_null());
}
