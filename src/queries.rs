//! GraphQL documents for the listing and per-order sub-queries.
//!
//! Every nested connection carries an explicit `first:` bound so each
//! document stays under Printavo's per-query complexity ceiling regardless
//! of order size. Raising these bounds raises query cost; the current values
//! keep the heaviest document (the line item tree) comfortably under the
//! ceiling while covering real-world orders in one page per level.

use crate::OrderKind;

/// Line item groups requested per order.
pub const GROUPS_PER_ORDER: u32 = 25;
/// Line items requested per group.
pub const LINE_ITEMS_PER_GROUP: u32 = 50;
/// Imprints (decorations) requested per group.
pub const IMPRINTS_PER_GROUP: u32 = 25;
/// Mockups requested per line item or imprint.
pub const MOCKUPS_PER_ITEM: u32 = 10;
/// Production files requested per order.
pub const FILES_PER_ORDER: u32 = 50;
/// Fees, expenses, tasks and transactions requested per order.
pub const FINANCIAL_PER_ORDER: u32 = 25;

/// Paginated listing of (id, visualId) pairs, newest visual ids first.
pub fn listing_query(kind: OrderKind) -> String {
    format!(
        r#"query listOrders($first: Int!, $after: String) {{
  {field}(first: $first, after: $after, sortDescending: true) {{
    totalNodes
    pageInfo {{
      hasNextPage
      endCursor
    }}
    nodes {{
      id
      visualId
    }}
  }}
}}"#,
        field = kind.listing_field()
    )
}

/// Order header: metadata, status, contact and addresses. No unbounded
/// nesting, cheapest of the three sub-queries.
pub fn header_query(kind: OrderKind) -> String {
    format!(
        r#"query orderHeader($id: ID!) {{
  {field}(id: $id) {{
    id
    visualId
    nickname
    createdAt
    dueAt
    customerNote
    productionNote
    total
    subtotal
    amountOutstanding
    amountPaid
    status {{
      id
      name
    }}
    owner {{
      email
    }}
    contact {{
      id
      fullName
      email
      phone
    }}
    billingAddress {{
      companyName
      customerName
      address1
      address2
      city
      stateIso
      zipCode
      countryIso
    }}
    shippingAddress {{
      companyName
      customerName
      address1
      address2
      city
      stateIso
      zipCode
      countryIso
    }}
  }}
}}"#,
        field = kind.order_field()
    )
}

/// Line item tree: groups, each with a bounded page of imprints (and their
/// mockups) and a bounded page of line items (sizes and mockups).
pub fn line_item_query(kind: OrderKind) -> String {
    format!(
        r#"query orderLineItems($id: ID!) {{
  {field}(id: $id) {{
    id
    lineItemGroups(first: {groups}) {{
      nodes {{
        id
        position
        imprints(first: {imprints}) {{
          nodes {{
            id
            typeOfWork
            details
            mockups(first: {mockups}) {{
              nodes {{
                id
                fileName
                url
                mimeType
              }}
            }}
          }}
        }}
        lineItems(first: {line_items}) {{
          nodes {{
            id
            description
            color
            itemNumber
            price
            sizes {{
              size
              quantity
            }}
            mockups(first: {mockups}) {{
              nodes {{
                id
                fileName
                url
                mimeType
              }}
            }}
          }}
        }}
      }}
    }}
  }}
}}"#,
        field = kind.order_field(),
        groups = GROUPS_PER_ORDER,
        imprints = IMPRINTS_PER_GROUP,
        line_items = LINE_ITEMS_PER_GROUP,
        mockups = MOCKUPS_PER_ITEM,
    )
}

/// Production files plus the financial records: fees, expenses, tasks and
/// transactions.
pub fn files_financial_query(kind: OrderKind) -> String {
    format!(
        r#"query orderFilesFinancial($id: ID!) {{
  {field}(id: $id) {{
    id
    productionFiles(first: {files}) {{
      nodes {{
        id
        fileName
        url
        mimeType
      }}
    }}
    fees(first: {financial}) {{
      nodes {{
        id
        description
        amount
        taxable
      }}
    }}
    expenses(first: {financial}) {{
      nodes {{
        id
        name
        amount
        expenseDate
      }}
    }}
    tasks(first: {financial}) {{
      nodes {{
        id
        name
        completed
        dueAt
      }}
    }}
    transactions(first: {financial}) {{
      nodes {{
        id
        amount
        category
        transactedFor
        transactionDate
      }}
    }}
  }}
}}"#,
        field = kind.order_field(),
        files = FILES_PER_ORDER,
        financial = FINANCIAL_PER_ORDER,
    )
}
