//! Merger: combines the three sub-documents into one canonical record.
//!
//! Pure and side-effect free. The only check performed is the internal-id
//! consistency invariant: merging sub-documents from different orders would
//! silently corrupt the output, so a mismatch fails loudly and the order is
//! treated as failed. Beyond that the merge is a field union plus element
//! counting - no business validation.

use chrono::Utc;

use crate::fetch::OrderParts;
use crate::order::{AttachmentCounts, OrderRecord};
use crate::OrderKind;

/// Merge invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Two sub-documents carry different internal ids
    #[error(
        "internal id mismatch: header has {header_id}, {other_document} has {other_id} - refusing to merge"
    )]
    IdMismatch {
        /// Internal id from the header sub-document
        header_id: String,
        /// Which sub-document disagreed
        other_document: &'static str,
        /// Its internal id
        other_id: String,
    },
}

/// Merge the three sub-documents into one [`OrderRecord`].
///
/// Verifies all three carry the same internal id, unions their fields and
/// computes the derived attachment counters by counting elements in the
/// merged nested collections.
pub fn merge_order(kind: OrderKind, parts: OrderParts) -> Result<OrderRecord, MergeError> {
    let OrderParts {
        header,
        line_items,
        files,
    } = parts;

    if line_items.id != header.id {
        return Err(MergeError::IdMismatch {
            header_id: header.id,
            other_document: "line item tree",
            other_id: line_items.id,
        });
    }
    if files.id != header.id {
        return Err(MergeError::IdMismatch {
            header_id: header.id,
            other_document: "files and financial",
            other_id: files.id,
        });
    }

    let attachment_counts = count_attachments(&line_items, &files);

    Ok(OrderRecord {
        kind,
        internal_id: header.id.clone(),
        visual_id: header.visual_id.clone(),
        extracted_at: Utc::now(),
        header,
        line_item_groups: line_items.line_item_groups,
        production_files: files.production_files,
        fees: files.fees,
        expenses: files.expenses,
        tasks: files.tasks,
        transactions: files.transactions,
        attachment_counts,
    })
}

fn count_attachments(
    line_items: &crate::order::LineItemTree,
    files: &crate::order::FilesFinancial,
) -> AttachmentCounts {
    let mut counts = AttachmentCounts {
        production_files: files
            .production_files
            .as_ref()
            .map(|c| c.len() as u64)
            .unwrap_or(0),
        ..AttachmentCounts::default()
    };

    if let Some(groups) = &line_items.line_item_groups {
        for group in &groups.nodes {
            if let Some(items) = &group.line_items {
                for item in &items.nodes {
                    if let Some(mockups) = &item.mockups {
                        counts.line_item_mockups += mockups.len() as u64;
                    }
                }
            }
            if let Some(imprints) = &group.imprints {
                for imprint in &imprints.nodes {
                    if let Some(mockups) = &imprint.mockups {
                        counts.imprint_mockups += mockups.len() as u64;
                    }
                }
            }
        }
    }

    counts
}
