//! Order data model: the three sub-documents and the merged record.
//!
//! Nested collections are modeled as `Option<Connection<T>>` so "the field
//! was absent from the response" stays distinguishable from "the collection
//! is empty". Money fields use [`Decimal`] throughout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::OrderKind;

/// Deserialize Printavo's `visualId`, which arrives as a JSON number, into
/// the string form used as the storage key.
pub fn visual_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    })
}

/// A bounded page of nodes from a GraphQL connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection<T> {
    /// The page's nodes
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Connection<T> {
    /// Number of nodes on this page.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the page is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Order status as configured in the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatus {
    /// Status id
    pub id: Option<String>,
    /// Status display name
    pub name: Option<String>,
}

/// Account owner reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Owner email
    pub email: Option<String>,
}

/// Customer contact on the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact id
    pub id: Option<String>,
    /// Full display name
    pub full_name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

/// Billing or shipping address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Company name
    pub company_name: Option<String>,
    /// Customer name
    pub customer_name: Option<String>,
    /// Street address line 1
    pub address1: Option<String>,
    /// Street address line 2
    pub address2: Option<String>,
    /// City
    pub city: Option<String>,
    /// State ISO code
    pub state_iso: Option<String>,
    /// Postal code
    pub zip_code: Option<String>,
    /// Country ISO code
    pub country_iso: Option<String>,
}

/// Header sub-document: order metadata without nested collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    /// Internal GraphQL node id
    pub id: String,
    /// Shop-visible sequence number
    #[serde(deserialize_with = "visual_id_string")]
    pub visual_id: String,
    /// Order nickname
    pub nickname: Option<String>,
    /// Creation timestamp (RFC3339 as returned by the API)
    pub created_at: Option<String>,
    /// Due date
    pub due_at: Option<String>,
    /// Customer-facing note
    pub customer_note: Option<String>,
    /// Production note
    pub production_note: Option<String>,
    /// Order total
    pub total: Option<Decimal>,
    /// Subtotal before fees
    pub subtotal: Option<Decimal>,
    /// Amount still owed
    pub amount_outstanding: Option<Decimal>,
    /// Amount already paid
    pub amount_paid: Option<Decimal>,
    /// Workflow status
    pub status: Option<OrderStatus>,
    /// Account owner
    pub owner: Option<Owner>,
    /// Customer contact
    pub contact: Option<Contact>,
    /// Billing address
    pub billing_address: Option<Address>,
    /// Shipping address
    pub shipping_address: Option<Address>,
}

/// A mockup or production file attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    /// Attachment id
    pub id: String,
    /// Original file name
    pub file_name: Option<String>,
    /// Download URL (consumed out-of-band by the file downloader)
    pub url: Option<String>,
    /// MIME type
    pub mime_type: Option<String>,
}

/// Per-size quantity on a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeEntry {
    /// Size label (S, M, XL, ...)
    pub size: Option<String>,
    /// Quantity for this size
    pub quantity: Option<i64>,
}

/// An imprint (decoration) on a line item group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imprint {
    /// Imprint id
    pub id: String,
    /// Decoration method
    pub type_of_work: Option<String>,
    /// Freeform details
    pub details: Option<String>,
    /// Imprint mockups
    pub mockups: Option<Connection<FileAttachment>>,
}

/// A single line item within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Line item id
    pub id: String,
    /// Item description
    pub description: Option<String>,
    /// Garment color
    pub color: Option<String>,
    /// Catalog item number
    pub item_number: Option<String>,
    /// Unit price
    pub price: Option<Decimal>,
    /// Per-size quantities
    pub sizes: Option<Vec<SizeEntry>>,
    /// Line item mockups
    pub mockups: Option<Connection<FileAttachment>>,
}

/// A group of line items sharing imprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemGroup {
    /// Group id
    pub id: String,
    /// Display position
    pub position: Option<i64>,
    /// Imprints applied to this group
    pub imprints: Option<Connection<Imprint>>,
    /// Line items in this group
    pub line_items: Option<Connection<LineItem>>,
}

/// Line item tree sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemTree {
    /// Internal GraphQL node id (must match the header's)
    pub id: String,
    /// Line item groups
    pub line_item_groups: Option<Connection<LineItemGroup>>,
}

/// A flat fee on the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    /// Fee id
    pub id: String,
    /// Description
    pub description: Option<String>,
    /// Amount
    pub amount: Option<Decimal>,
    /// Whether tax applies
    pub taxable: Option<bool>,
}

/// An expense recorded against the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Expense id
    pub id: String,
    /// Name
    pub name: Option<String>,
    /// Amount
    pub amount: Option<Decimal>,
    /// Date incurred
    pub expense_date: Option<String>,
}

/// A task attached to the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id
    pub id: String,
    /// Name
    pub name: Option<String>,
    /// Completion flag
    pub completed: Option<bool>,
    /// Due date
    pub due_at: Option<String>,
}

/// A payment or refund transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction id
    pub id: String,
    /// Amount
    pub amount: Option<Decimal>,
    /// Category (payment, refund, ...)
    pub category: Option<String>,
    /// What the transaction was for
    pub transacted_for: Option<String>,
    /// Transaction date
    pub transaction_date: Option<String>,
}

/// Files-and-financial sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesFinancial {
    /// Internal GraphQL node id (must match the header's)
    pub id: String,
    /// Production file attachments
    pub production_files: Option<Connection<FileAttachment>>,
    /// Fees
    pub fees: Option<Connection<Fee>>,
    /// Expenses
    pub expenses: Option<Connection<Expense>>,
    /// Tasks
    pub tasks: Option<Connection<Task>>,
    /// Transactions
    pub transactions: Option<Connection<Transaction>>,
}

/// Derived attachment counters, computed at merge time by counting elements
/// in the merged nested collections. No field-level validation is involved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentCounts {
    /// Production files on the order
    pub production_files: u64,
    /// Mockups attached to line items
    pub line_item_mockups: u64,
    /// Mockups attached to imprints
    pub imprint_mockups: u64,
}

impl AttachmentCounts {
    /// Total attachments across all categories.
    pub fn total(&self) -> u64 {
        self.production_files + self.line_item_mockups + self.imprint_mockups
    }

    /// Accumulate another order's counts into this running total.
    pub fn add(&mut self, other: &AttachmentCounts) {
        self.production_files += other.production_files;
        self.line_item_mockups += other.line_item_mockups;
        self.imprint_mockups += other.imprint_mockups;
    }
}

/// The merged, canonical unit of output: the union of the three
/// sub-documents plus extraction metadata.
///
/// Written exactly once per (kind, visual id); an existing record is never
/// overwritten on later runs. On disk a record is always fully merged or
/// absent - never partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Which listing this order came from
    pub kind: OrderKind,
    /// Internal GraphQL node id
    pub internal_id: String,
    /// Shop-visible sequence number (the storage key)
    pub visual_id: String,
    /// When this record was extracted
    pub extracted_at: DateTime<Utc>,
    /// Header metadata
    pub header: OrderHeader,
    /// Line item groups
    pub line_item_groups: Option<Connection<LineItemGroup>>,
    /// Production files
    pub production_files: Option<Connection<FileAttachment>>,
    /// Fees
    pub fees: Option<Connection<Fee>>,
    /// Expenses
    pub expenses: Option<Connection<Expense>>,
    /// Tasks
    pub tasks: Option<Connection<Task>>,
    /// Transactions
    pub transactions: Option<Connection<Transaction>>,
    /// Derived attachment counters
    pub attachment_counts: AttachmentCounts,
}
