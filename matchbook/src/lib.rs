//! Limit-order matching core with price-time priority.
//!
//! One [`Book`] per ticker symbol, each with its own matcher thread that
//! drains crossing bid/ask pairs; a [`Market`] dispatcher that owns every
//! book, routes orders by symbol, and stamps process-wide monotonic order
//! ids. Admission is cheap (a heap push under the book lock); all matching
//! work happens on the matcher thread.

pub mod book;
pub mod error;
pub mod market;
pub mod order;
mod sched;

pub use book::Book;
pub use error::{BookError, MarketError};
pub use market::{Market, MarketStats};
pub use order::{Order, OrderKind, Side};
