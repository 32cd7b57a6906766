//! Matching-core error types.

use thiserror::Error;

use crate::order::OrderKind;

/// Failures surfaced by a single book.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    /// The order was routed to a book for a different symbol. The market
    /// keys books by symbol before admission, so hitting this means a
    /// routing bug upstream.
    #[error("symbol mismatch: book trades {book}, order is for {order}")]
    SymbolMismatch { book: String, order: String },

    /// Only limit orders are honored; the protocol reserves the rest.
    #[error("unsupported order type {0:?}")]
    UnsupportedKind(OrderKind),

    /// Admission after the book closed.
    #[error("book for {0} is closed")]
    Closed(String),
}

/// Failures surfaced by the market dispatcher.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market is not open")]
    Closed,

    #[error(transparent)]
    Book(#[from] BookError),

    /// Could not start the matcher thread for a newly opened book.
    #[error("failed to start matcher: {0}")]
    Spawn(#[from] std::io::Error),
}
