//! Catalog walker: cursor pagination over the order listings.
//!
//! Produces the complete ordered id sequence for one order kind. The remote
//! sorts by visual id descending, so the newest (most valuable) orders are
//! discovered and processed first - that ordering is what makes interrupting
//! and resuming a long run cheap in practice.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::order::visual_id_string;
use crate::queries;
use crate::scheduler::Scheduler;
use crate::transport::TransportError;
use crate::{OrderKind, OrderRef};

/// Upper bound on listing pages per kind, guarding against a remote that
/// keeps returning `hasNextPage: true` with a stuck cursor.
const MAX_PAGES: usize = 10_000;

/// Catalog errors. Any of these aborts the current phase: a partially known
/// id catalog cannot be trusted, because a missing page means unknown gaps.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A listing page could not be fetched after retries
    #[error("failed to fetch catalog page {page} for {kind}: {source}")]
    PageFailure {
        /// Which order kind was being listed
        kind: OrderKind,
        /// 1-indexed page number
        page: usize,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// A listing page did not have the expected shape
    #[error("malformed catalog page {page} for {kind}: {message}")]
    MalformedPage {
        /// Which order kind was being listed
        kind: OrderKind,
        /// 1-indexed page number
        page: usize,
        /// Parse failure detail
        message: String,
    },

    /// The pagination loop exceeded [`MAX_PAGES`]
    #[error("catalog for {kind} exceeded {MAX_PAGES} pages - cursor loop suspected")]
    PageLimitExceeded {
        /// Which order kind was being listed
        kind: OrderKind,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingPage {
    total_nodes: Option<u64>,
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<ListingNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingNode {
    id: String,
    #[serde(deserialize_with = "visual_id_string")]
    visual_id: String,
}

/// Walks one kind's listing to completion.
pub struct CatalogWalker<'a> {
    scheduler: &'a Scheduler,
    page_size: u32,
}

impl<'a> CatalogWalker<'a> {
    /// Create a walker issuing pages of `page_size` through `scheduler`.
    pub fn new(scheduler: &'a Scheduler, page_size: u32) -> Self {
        Self {
            scheduler,
            page_size,
        }
    }

    /// Fetch the complete ordered id sequence for `kind`.
    ///
    /// Trusts only `hasNextPage` and `endCursor`; the total count hint is
    /// used solely for a completeness warning. An empty kind yields an
    /// empty vector.
    pub async fn walk(&self, kind: OrderKind) -> Result<Vec<OrderRef>, CatalogError> {
        let query = queries::listing_query(kind);
        let mut refs: Vec<OrderRef> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut total_hint: Option<u64> = None;

        for page in 1..=MAX_PAGES {
            let variables = json!({
                "first": self.page_size,
                "after": cursor,
            });

            let data = self
                .scheduler
                .execute(&query, variables)
                .await
                .map_err(|source| CatalogError::PageFailure { kind, page, source })?;

            let listing: ListingPage = serde_json::from_value(
                data.get(kind.listing_field()).cloned().unwrap_or_default(),
            )
            .map_err(|e| CatalogError::MalformedPage {
                kind,
                page,
                message: e.to_string(),
            })?;

            debug!(
                kind = %kind,
                page,
                nodes = listing.nodes.len(),
                has_next = listing.page_info.has_next_page,
                "Fetched catalog page"
            );

            total_hint = total_hint.or(listing.total_nodes);
            refs.extend(
                listing
                    .nodes
                    .into_iter()
                    .map(|n| OrderRef::new(n.id, n.visual_id)),
            );

            if !listing.page_info.has_next_page {
                if let Some(expected) = total_hint {
                    if expected != refs.len() as u64 {
                        // The hint can lag the live listing; not fatal.
                        warn!(
                            kind = %kind,
                            expected,
                            walked = refs.len(),
                            "Listing total count disagrees with walked id count"
                        );
                    }
                }
                info!(kind = %kind, orders = refs.len(), pages = page, "Catalog walk complete");
                return Ok(refs);
            }

            cursor = listing.page_info.end_cursor;
        }

        Err(CatalogError::PageLimitExceeded { kind })
    }
}
