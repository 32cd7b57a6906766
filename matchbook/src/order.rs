use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// Order types the protocol surface reserves. Only [`OrderKind::Limit`] is
/// honored; a book rejects everything else at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    Cancel,
    Replace,
}

/// A resting or incoming order.
///
/// `id` is 0 until the market admits the order and stamps a process-wide
/// monotonic id. Once admitted, only `quantity` changes (shrinking on
/// partial fills); the order is dropped when it reaches zero or when its
/// book closes.
#[derive(Clone, Debug)]
pub struct Order {
    pub id: u64,
    /// Millisecond wall clock, set at construction. Time priority within a
    /// price level is decided by this stamp, not by the id.
    pub timestamp_ms: u64,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: f64,
    pub quantity: u64,
}

impl Order {
    pub fn new(
        kind: OrderKind,
        side: Side,
        symbol: impl Into<String>,
        price: f64,
        quantity: u64,
    ) -> Self {
        Order {
            id: 0,
            timestamp_ms: now_ms(),
            symbol: symbol.into(),
            side,
            kind,
            price,
            quantity,
        }
    }

    /// Limit-order shorthand used all over the tests and demos.
    pub fn limit(side: Side, symbol: impl Into<String>, price: f64, quantity: u64) -> Self {
        Order::new(OrderKind::Limit, side, symbol, price, quantity)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_is_unadmitted() {
        let o = Order::limit(Side::Buy, "AAPL", 10.0, 100);

        assert_eq!(o.id, 0);
        assert_eq!(o.kind, OrderKind::Limit);
        assert_eq!(o.side, Side::Buy);
        assert_eq!(o.symbol, "AAPL");
        assert_eq!(o.quantity, 100);
        assert!(o.timestamp_ms > 0);
    }
}
