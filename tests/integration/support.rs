//! Shared test support: a scripted in-memory GraphQL backend.
//!
//! [`ScriptedTransport`] implements [`GraphTransport`] over a fixed set of
//! fake orders, with per-route failure injection. Routing is by operation
//! name, matching how the real backend dispatches on the query document.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use printavo_exporter::config::ExporterConfig;
use printavo_exporter::scheduler::{PacingGate, Scheduler};
use printavo_exporter::transport::{GraphTransport, TransportError, TransportResult};
use printavo_exporter::OrderKind;

/// A fake order the scripted backend can serve.
#[derive(Debug, Clone)]
pub struct FakeOrder {
    pub internal_id: String,
    pub visual_id: u64,
    pub nickname: String,
    /// Production files on the order
    pub production_files: u32,
    /// Mockups on the single line item
    pub line_item_mockups: u32,
    /// Mockups on the single imprint
    pub imprint_mockups: u32,
    /// Listed, but order queries resolve to null (deleted remotely between
    /// the listing walk and the fetch)
    pub deleted: bool,
}

impl FakeOrder {
    pub fn new(internal_id: &str, visual_id: u64) -> Self {
        Self {
            internal_id: internal_id.to_string(),
            visual_id,
            nickname: format!("Job {visual_id}"),
            production_files: 1,
            line_item_mockups: 1,
            imprint_mockups: 1,
            deleted: false,
        }
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn with_attachments(mut self, production: u32, line_item: u32, imprint: u32) -> Self {
        self.production_files = production;
        self.line_item_mockups = line_item;
        self.imprint_mockups = imprint;
        self
    }

    fn header_json(&self, kind: OrderKind) -> Value {
        json!({
            kind.order_field(): {
                "id": self.internal_id,
                "visualId": self.visual_id,
                "nickname": self.nickname,
                "createdAt": "2024-03-01T10:00:00Z",
                "total": 250.00,
                "amountOutstanding": 0,
                "status": { "id": "st-1", "name": "COMPLETED" },
                "contact": { "id": "ct-1", "fullName": "Jordan Doe", "email": "jordan@example.net" }
            }
        })
    }

    fn line_items_json(&self, kind: OrderKind) -> Value {
        let mockups = |count: u32, prefix: &str| -> Value {
            let nodes: Vec<Value> = (0..count)
                .map(|i| {
                    json!({
                        "id": format!("{prefix}-{}-{i}", self.visual_id),
                        "fileName": format!("{prefix}-{i}.png"),
                        "url": format!("https://files.example.net/{prefix}-{i}.png"),
                        "mimeType": "image/png"
                    })
                })
                .collect();
            json!({ "nodes": nodes })
        };

        json!({
            kind.order_field(): {
                "id": self.internal_id,
                "lineItemGroups": {
                    "nodes": [
                        {
                            "id": format!("grp-{}", self.visual_id),
                            "position": 1,
                            "imprints": {
                                "nodes": [
                                    {
                                        "id": format!("imp-{}", self.visual_id),
                                        "typeOfWork": "Screen Print",
                                        "mockups": mockups(self.imprint_mockups, "imp-mock")
                                    }
                                ]
                            },
                            "lineItems": {
                                "nodes": [
                                    {
                                        "id": format!("li-{}", self.visual_id),
                                        "description": "Tee",
                                        "color": "Black",
                                        "price": 12.50,
                                        "sizes": [
                                            { "size": "M", "quantity": 10 },
                                            { "size": "L", "quantity": 5 }
                                        ],
                                        "mockups": mockups(self.line_item_mockups, "li-mock")
                                    }
                                ]
                            }
                        }
                    ]
                }
            }
        })
    }

    fn files_json(&self, kind: OrderKind) -> Value {
        let files: Vec<Value> = (0..self.production_files)
            .map(|i| {
                json!({
                    "id": format!("pf-{}-{i}", self.visual_id),
                    "fileName": format!("art-{i}.pdf"),
                    "url": format!("https://files.example.net/art-{i}.pdf"),
                    "mimeType": "application/pdf"
                })
            })
            .collect();

        json!({
            kind.order_field(): {
                "id": self.internal_id,
                "productionFiles": { "nodes": files },
                "fees": { "nodes": [ { "id": "fee-1", "description": "Rush", "amount": 25.00, "taxable": true } ] },
                "expenses": { "nodes": [] },
                "tasks": { "nodes": [] },
                "transactions": { "nodes": [ { "id": "tx-1", "amount": 250.00, "category": "payment" } ] }
            }
        })
    }
}

/// Failure injection for one route.
#[derive(Debug, Clone)]
pub enum FailureMode {
    /// Fail transiently this many times, then serve normally
    TransientTimes(u32),
    /// Every call fails transiently
    AlwaysTransient,
    /// Every call fails fatally
    Fatal,
}

/// Scripted backend shared behind `Arc<dyn GraphTransport>`.
#[derive(Default)]
pub struct ScriptedTransport {
    invoices: Vec<FakeOrder>,
    quotes: Vec<FakeOrder>,
    failures: Mutex<HashMap<String, FailureMode>>,
    /// All calls, listings included
    pub total_calls: AtomicU32,
    /// Per-order sub-query calls only
    pub order_calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(invoices: Vec<FakeOrder>, quotes: Vec<FakeOrder>) -> Self {
        Self {
            invoices,
            quotes,
            ..Default::default()
        }
    }

    /// Inject a failure for one route. Route keys are
    /// `"{operation}:{internal_id}"` for order queries (operations:
    /// `header`, `lineItems`, `files`) and `"listing:{invoices|quotes}"`
    /// for listing pages.
    pub fn fail(&self, route: &str, mode: FailureMode) {
        self.failures
            .lock()
            .unwrap()
            .insert(route.to_string(), mode);
    }

    fn check_failure(&self, route: &str) -> Result<(), TransportError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(route) {
            None => Ok(()),
            Some(FailureMode::AlwaysTransient) => {
                Err(TransportError::Transient(format!("{route}: injected")))
            }
            Some(FailureMode::Fatal) => {
                Err(TransportError::Fatal(format!("{route}: injected")))
            }
            Some(FailureMode::TransientTimes(remaining)) => {
                if *remaining > 0 {
                    *remaining -= 1;
                    Err(TransportError::Transient(format!("{route}: injected")))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn listing(&self, kind: OrderKind, variables: &Value) -> TransportResult {
        let orders = match kind {
            OrderKind::Invoice => &self.invoices,
            OrderKind::Quote => &self.quotes,
        };

        let first = variables["first"].as_u64().unwrap_or(25) as usize;
        let offset: usize = variables["after"]
            .as_str()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        let window: Vec<Value> = orders
            .iter()
            .skip(offset)
            .take(first)
            .map(|o| json!({ "id": o.internal_id, "visualId": o.visual_id }))
            .collect();
        let has_next = offset + window.len() < orders.len();
        let end_cursor = if has_next {
            Some((offset + window.len()).to_string())
        } else {
            None
        };

        Ok(json!({
            kind.listing_field(): {
                "totalNodes": orders.len(),
                "pageInfo": { "hasNextPage": has_next, "endCursor": end_cursor },
                "nodes": window
            }
        }))
    }

    fn find_order(&self, kind: OrderKind, id: &str) -> Option<&FakeOrder> {
        let orders = match kind {
            OrderKind::Invoice => &self.invoices,
            OrderKind::Quote => &self.quotes,
        };
        orders
            .iter()
            .find(|o| o.internal_id == id && !o.deleted)
    }
}

#[async_trait]
impl GraphTransport for ScriptedTransport {
    async fn execute(&self, query: &str, variables: Value) -> TransportResult {
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let kind = if query.contains("quotes(") || query.contains("quote(") {
            OrderKind::Quote
        } else {
            OrderKind::Invoice
        };

        if query.contains("query listOrders") {
            let route = format!("listing:{}", kind.listing_field());
            self.check_failure(&route)?;
            return self.listing(kind, &variables);
        }

        self.order_calls.fetch_add(1, Ordering::SeqCst);

        let operation = if query.contains("query orderHeader") {
            "header"
        } else if query.contains("query orderLineItems") {
            "lineItems"
        } else {
            "files"
        };

        let id = variables["id"].as_str().unwrap_or_default().to_string();
        self.check_failure(&format!("{operation}:{id}"))?;

        let Some(order) = self.find_order(kind, &id) else {
            return Ok(json!({ kind.order_field(): null }));
        };

        Ok(match operation {
            "header" => order.header_json(kind),
            "lineItems" => order.line_items_json(kind),
            _ => order.files_json(kind),
        })
    }
}

/// A fast test configuration rooted at `output_dir`.
pub fn test_config(output_dir: &Path) -> ExporterConfig {
    let mut config = ExporterConfig::new(
        "owner@shop.example".to_string(),
        "test-token-1234".to_string(),
        output_dir.to_path_buf(),
    );
    config.min_request_delay = Duration::from_millis(1);
    config.retry_base_delay = Duration::from_millis(1);
    config.page_size = 10;
    config
}

/// A scheduler over a scripted transport with test-speed pacing.
pub fn test_scheduler(transport: Arc<ScriptedTransport>, config: &ExporterConfig) -> Scheduler {
    Scheduler::new(
        transport,
        Arc::new(PacingGate::new(config.min_request_delay)),
        config.max_attempts,
        config.retry_base_delay,
    )
}
