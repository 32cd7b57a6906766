//! Per-symbol order book and its matcher thread.
//!
//! Each book keeps a max-heap of bids and a min-heap of asks, both keyed by
//! (price, arrival time). A dedicated matcher thread sleeps on the book's
//! condition variable and drains crossing pairs whenever an admission wakes
//! it. After every matcher pass the book is non-crossing: either side is
//! empty or the top bid sits strictly below the top ask.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::BookError;
use crate::order::{Order, OrderKind, Side};
use crate::sched;

/// Two prices are considered equal when they differ by less than machine
/// epsilon. A fixed threshold misbehaves for prices far from 1.0; integer
/// price ticks are the known fix, not adopted here.
pub(crate) fn price_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

/// Highest price first; ties go to the earlier arrival.
struct BidPriority(Order);

impl PartialEq for BidPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BidPriority {}

impl PartialOrd for BidPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BidPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        if price_eq(self.0.price, other.0.price) {
            other.0.timestamp_ms.cmp(&self.0.timestamp_ms)
        } else if self.0.price > other.0.price {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

/// Lowest price first; ties go to the earlier arrival.
struct AskPriority(Order);

impl PartialEq for AskPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AskPriority {}

impl PartialOrd for AskPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AskPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        if price_eq(self.0.price, other.0.price) {
            other.0.timestamp_ms.cmp(&self.0.timestamp_ms)
        } else if self.0.price < other.0.price {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

#[derive(Default)]
struct BookState {
    bids: BinaryHeap<BidPriority>,
    asks: BinaryHeap<AskPriority>,
    orders_filled: u64,
    volume: u64,
    open: bool,
}

struct BookShared {
    symbol: String,
    state: Mutex<BookState>,
    ready: Condvar,
}

/// One symbol's book. Owns its matcher thread for its whole open lifetime;
/// closing (or dropping) the book joins the matcher and releases any
/// resting orders.
pub struct Book {
    shared: Arc<BookShared>,
    matcher: Option<JoinHandle<()>>,
}

impl Book {
    /// Opens a book for `symbol` and starts its matcher thread.
    pub fn open(symbol: impl Into<String>) -> io::Result<Book> {
        let symbol = symbol.into();
        info!(symbol = %symbol, "opening book");

        let shared = Arc::new(BookShared {
            symbol: symbol.clone(),
            state: Mutex::new(BookState {
                open: true,
                ..BookState::default()
            }),
            ready: Condvar::new(),
        });

        let matcher = thread::Builder::new()
            .name(format!("matcher-{symbol}"))
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_matcher(&shared)
            })?;

        Ok(Book {
            shared,
            matcher: Some(matcher),
        })
    }

    /// Admits an order. Limit orders land in the side's heap and wake the
    /// matcher; anything else is rejected and stays with the caller.
    pub fn process_order(&self, order: Order) -> Result<(), BookError> {
        let mut state = self.shared.state.lock();

        if !state.open {
            return Err(BookError::Closed(self.shared.symbol.clone()));
        }
        if order.symbol != self.shared.symbol {
            warn!(
                book = %self.shared.symbol,
                order = %order.symbol,
                "order routed to the wrong book"
            );
            return Err(BookError::SymbolMismatch {
                book: self.shared.symbol.clone(),
                order: order.symbol,
            });
        }

        match order.kind {
            OrderKind::Limit => {
                match order.side {
                    Side::Buy => state.bids.push(BidPriority(order)),
                    Side::Sell => state.asks.push(AskPriority(order)),
                }
                self.shared.ready.notify_one();
                Ok(())
            }
            kind => Err(BookError::UnsupportedKind(kind)),
        }
    }

    /// Closes the book: stops admissions, wakes and joins the matcher, and
    /// drops any resting orders. Idempotent.
    pub fn close(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if !state.open {
                return;
            }
            state.open = false;
        }
        info!(symbol = %self.shared.symbol, "closing book");

        self.shared.ready.notify_one();
        if let Some(matcher) = self.matcher.take() {
            let _ = matcher.join();
        }
    }

    pub fn symbol(&self) -> &str {
        &self.shared.symbol
    }

    pub fn is_open(&self) -> bool {
        self.shared.state.lock().open
    }

    /// Cumulative quantity filled over the book's lifetime.
    pub fn volume(&self) -> u64 {
        self.shared.state.lock().volume
    }

    /// Count of orders removed from the book by complete fill.
    pub fn orders_filled(&self) -> u64 {
        self.shared.state.lock().orders_filled
    }

    /// Price and remaining quantity of the top bid.
    pub fn best_bid(&self) -> Option<(f64, u64)> {
        let state = self.shared.state.lock();
        state.bids.peek().map(|bid| (bid.0.price, bid.0.quantity))
    }

    /// Price and remaining quantity of the top ask.
    pub fn best_ask(&self) -> Option<(f64, u64)> {
        let state = self.shared.state.lock();
        state.asks.peek().map(|ask| (ask.0.price, ask.0.quantity))
    }

    /// (resting bids, resting asks).
    pub fn depth(&self) -> (usize, usize) {
        let state = self.shared.state.lock();
        (state.bids.len(), state.asks.len())
    }
}

impl Drop for Book {
    fn drop(&mut self) {
        self.close();
    }
}

fn crosses(bid_price: f64, ask_price: f64) -> bool {
    price_eq(bid_price, ask_price) || bid_price > ask_price
}

/// Matcher loop. Holds the book lock between condition-variable waits;
/// admissions and close both signal. Fills always execute at the
/// top-of-ask price, even when the ask is the aggressor; conventional
/// venues would use the resting order's price instead.
fn run_matcher(shared: &BookShared) {
    sched::elevate_matcher_priority();

    let mut state = shared.state.lock();
    while state.open {
        let (bid_qty, ask_price, ask_qty) = match (state.bids.peek(), state.asks.peek()) {
            (Some(bid), Some(ask)) if crosses(bid.0.price, ask.0.price) => {
                (bid.0.quantity, ask.0.price, ask.0.quantity)
            }
            _ => {
                shared.ready.wait(&mut state);
                continue;
            }
        };

        let quantity = bid_qty.min(ask_qty);
        state.volume += quantity;
        debug!(
            symbol = %shared.symbol,
            price = ask_price,
            quantity,
            "fill"
        );

        match bid_qty.cmp(&ask_qty) {
            Ordering::Equal => {
                // Both sides fill completely.
                state.orders_filled += 2;
                state.bids.pop();
                state.asks.pop();
            }
            Ordering::Greater => {
                // Ask fills completely, bid shrinks in place.
                state.orders_filled += 1;
                state.asks.pop();
                if let Some(mut bid) = state.bids.peek_mut() {
                    bid.0.quantity -= quantity;
                }
            }
            Ordering::Less => {
                // Bid fills completely, ask shrinks in place.
                state.orders_filled += 1;
                state.bids.pop();
                if let Some(mut ask) = state.asks.peek_mut() {
                    ask.0.quantity -= quantity;
                }
            }
        }
    }
}
