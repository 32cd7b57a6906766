//! Market dispatcher: routes orders to per-symbol books and stamps ids.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::book::Book;
use crate::error::MarketError;
use crate::order::Order;

struct MarketState {
    books: HashMap<String, Book>,
    next_order_id: u64,
    open: bool,
}

/// Aggregate counters across every open book.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarketStats {
    pub symbols: usize,
    pub total_volume: u64,
    pub total_orders_filled: u64,
}

/// Process-wide order router. A single lock covers the book table and the
/// id counter, so order ids are strictly increasing in the order admissions
/// acquire it. Books are opened on the first order for an unknown symbol
/// and live until the market closes.
pub struct Market {
    state: Mutex<MarketState>,
}

impl Market {
    pub fn open() -> Market {
        info!("market open");
        Market {
            state: Mutex::new(MarketState {
                books: HashMap::new(),
                next_order_id: 0,
                open: true,
            }),
        }
    }

    /// Stamps the order with the next market-wide id and hands it to its
    /// symbol's book, opening the book first if this is a new symbol.
    /// Returns the assigned id. The id is consumed even when the book
    /// rejects the order.
    pub fn process_order(&self, mut order: Order) -> Result<u64, MarketError> {
        let mut state = self.state.lock();

        if !state.open {
            return Err(MarketError::Closed);
        }

        order.id = state.next_order_id;
        state.next_order_id += 1;
        let id = order.id;

        let book = match state.books.entry(order.symbol.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Book::open(order.symbol.clone())?),
        };
        book.process_order(order)?;

        Ok(id)
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Closes every book (joining each matcher) and stops admissions.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        state.open = false;
        info!("market close");

        for (_, mut book) in state.books.drain() {
            book.close();
        }
    }

    pub fn total_volume(&self) -> u64 {
        let state = self.state.lock();
        state.books.values().map(Book::volume).sum()
    }

    pub fn total_orders_filled(&self) -> u64 {
        let state = self.state.lock();
        state.books.values().map(Book::orders_filled).sum()
    }

    pub fn stats(&self) -> MarketStats {
        let state = self.state.lock();
        MarketStats {
            symbols: state.books.len(),
            total_volume: state.books.values().map(Book::volume).sum(),
            total_orders_filled: state.books.values().map(Book::orders_filled).sum(),
        }
    }

    /// Best (bid, ask) of `symbol`'s book, each as (price, quantity).
    /// `None` when no book exists for the symbol yet.
    #[allow(clippy::type_complexity)]
    pub fn best_prices(&self, symbol: &str) -> Option<(Option<(f64, u64)>, Option<(f64, u64)>)> {
        let state = self.state.lock();
        let book = state.books.get(symbol)?;
        Some((book.best_bid(), book.best_ask()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::tests::wait_until;
    use crate::order::{Order, OrderKind, Side};

    #[test]
    fn first_order_gets_id_zero() {
        let market = Market::open();

        let a = market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.0, 10))
            .unwrap();
        let b = market
            .process_order(Order::limit(Side::Buy, "AAPL", 8.9, 10))
            .unwrap();
        let c = market
            .process_order(Order::limit(Side::Buy, "TSLA", 100.0, 10))
            .unwrap();

        assert_eq!((a, b, c), (0, 1, 2));
        market.close();
    }

    #[test]
    fn id_consumed_even_on_rejection() {
        let market = Market::open();

        market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.0, 10))
            .unwrap();
        market
            .process_order(Order::new(OrderKind::Market, Side::Buy, "AAPL", 9.0, 10))
            .unwrap_err();
        let id = market
            .process_order(Order::limit(Side::Buy, "AAPL", 8.9, 10))
            .unwrap();

        assert_eq!(id, 2);
        market.close();
    }

    #[test]
    fn unknown_symbol_opens_a_book() {
        let market = Market::open();
        assert_eq!(market.stats().symbols, 0);

        market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.0, 10))
            .unwrap();
        market
            .process_order(Order::limit(Side::Sell, "TSLA", 101.0, 10))
            .unwrap();
        market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.1, 10))
            .unwrap();

        assert_eq!(market.stats().symbols, 2);
        assert_eq!(market.best_prices("AAPL").unwrap().0, Some((9.1, 10)));
        assert_eq!(market.best_prices("MSFT"), None);
        market.close();
    }

    #[test]
    fn totals_aggregate_across_books() {
        let market = Market::open();

        market
            .process_order(Order::limit(Side::Buy, "AAPL", 10.0, 100))
            .unwrap();
        market
            .process_order(Order::limit(Side::Sell, "AAPL", 10.0, 100))
            .unwrap();
        market
            .process_order(Order::limit(Side::Buy, "TSLA", 200.0, 40))
            .unwrap();
        market
            .process_order(Order::limit(Side::Sell, "TSLA", 200.0, 40))
            .unwrap();

        assert!(wait_until(|| market.total_volume() == 140));
        assert_eq!(market.total_orders_filled(), 4);

        let stats = market.stats();
        assert_eq!(stats.total_volume, 140);
        assert_eq!(stats.total_orders_filled, 4);
        market.close();
    }

    #[test]
    fn closed_market_rejects_orders() {
        let market = Market::open();
        market.close();

        let err = market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.0, 10))
            .unwrap_err();
        assert!(matches!(err, MarketError::Closed));
        assert!(!market.is_open());

        // Closing twice is a no-op.
        market.close();
    }

    #[test]
    fn close_empties_the_book_table() {
        let market = Market::open();
        market
            .process_order(Order::limit(Side::Buy, "AAPL", 9.0, 10))
            .unwrap();

        market.close();
        assert_eq!(market.total_volume(), 0);
        assert_eq!(market.stats().symbols, 0);
    }
}
