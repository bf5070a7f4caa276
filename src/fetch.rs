//! Split fetcher: the three complexity-bounded sub-queries for one order.
//!
//! The sub-queries run concurrently through [`futures_util::try_join`]; the
//! shared pacing gate still serializes the actual requests, so fan-out here
//! never violates the global rate ceiling. If any sub-query fails - fatally
//! or by exhausting its retries - the whole order fetch fails and the partial
//! sub-document set is discarded. Nothing downstream ever sees fewer than
//! three sub-documents.

use futures_util::try_join;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::order::{FilesFinancial, LineItemTree, OrderHeader};
use crate::queries;
use crate::scheduler::Scheduler;
use crate::transport::TransportError;
use crate::{OrderKind, OrderRef};

/// Errors while fetching one order's sub-documents.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A sub-query failed in transport (after retries, or fatally)
    #[error("{sub_document} sub-query failed: {source}")]
    Transport {
        /// Which sub-document was being fetched
        sub_document: &'static str,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// The remote returned no node for the requested id
    #[error("{sub_document} sub-query returned no order for id {internal_id}")]
    MissingOrder {
        /// Which sub-document was being fetched
        sub_document: &'static str,
        /// The internal id that was requested
        internal_id: String,
    },

    /// A sub-document did not have the expected shape
    #[error("failed to parse {sub_document} sub-document: {message}")]
    Parse {
        /// Which sub-document was being parsed
        sub_document: &'static str,
        /// Parse failure detail
        message: String,
    },
}

/// The three raw sub-documents for one order, ready for merging.
#[derive(Debug, Clone)]
pub struct OrderParts {
    /// Header sub-document
    pub header: OrderHeader,
    /// Line item tree sub-document
    pub line_items: LineItemTree,
    /// Files-and-financial sub-document
    pub files: FilesFinancial,
}

/// Issues the per-order sub-queries through the shared scheduler.
pub struct SplitFetcher<'a> {
    scheduler: &'a Scheduler,
}

impl<'a> SplitFetcher<'a> {
    /// Create a fetcher over the shared scheduler.
    pub fn new(scheduler: &'a Scheduler) -> Self {
        Self { scheduler }
    }

    /// Fetch all three sub-documents for one order.
    pub async fn fetch(&self, kind: OrderKind, order: &OrderRef) -> Result<OrderParts, FetchError> {
        debug!(kind = %kind, visual_id = %order.visual_id, "Fetching order sub-documents");

        let (header, line_items, files) = try_join!(
            self.fetch_part::<OrderHeader>(kind, order, "header", queries::header_query(kind)),
            self.fetch_part::<LineItemTree>(
                kind,
                order,
                "line item tree",
                queries::line_item_query(kind)
            ),
            self.fetch_part::<FilesFinancial>(
                kind,
                order,
                "files and financial",
                queries::files_financial_query(kind)
            ),
        )?;

        Ok(OrderParts {
            header,
            line_items,
            files,
        })
    }

    /// Fetch and parse one sub-document.
    async fn fetch_part<T: DeserializeOwned>(
        &self,
        kind: OrderKind,
        order: &OrderRef,
        sub_document: &'static str,
        query: String,
    ) -> Result<T, FetchError> {
        let variables = json!({ "id": order.internal_id });
        let data = self
            .scheduler
            .execute(&query, variables)
            .await
            .map_err(|source| FetchError::Transport {
                sub_document,
                source,
            })?;

        let node = match data.get(kind.order_field()) {
            Some(Value::Null) | None => {
                return Err(FetchError::MissingOrder {
                    sub_document,
                    internal_id: order.internal_id.clone(),
                })
            }
            Some(node) => node.clone(),
        };

        serde_json::from_value(node).map_err(|e| FetchError::Parse {
            sub_document,
            message: e.to_string(),
        })
    }
}
